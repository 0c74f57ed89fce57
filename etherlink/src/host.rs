//! Capabilities the embedding page provides to the core.

use std::rc::Rc;

/// The hosting context.
pub trait Host {
    /// Reloads the whole page. Called when the wallet switches chains, since no
    /// in-memory state survives a chain change safely.
    fn reload(&self);

    /// Wall-clock time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

impl<T: Host + ?Sized> Host for Rc<T> {
    fn reload(&self) {
        (**self).reload();
    }

    fn now_millis(&self) -> u64 {
        (**self).now_millis()
    }
}
