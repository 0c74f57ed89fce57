//! Route estimates and the debounced scheduler that requests them.
//!
//! An estimate is advisory: any estimator failure is replaced by
//! [`RouteEstimate::fallback`] and never reaches the user.
//!
//! [`EstimateScheduler`] turns a stream of input changes into estimator calls:
//!
//! 1. Every [`EstimateScheduler::schedule`] call cancels the pending quiet-window
//!    timer and starts a new one.
//! 2. Only the timer that survives the whole window calls the estimator.
//! 3. Each call carries a sequence number; a response that resolves after a newer
//!    call was scheduled is discarded.

use std::cell::{Cell, RefCell};
use std::error::Error;
use std::fmt;
use std::pin::pin;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::{Either, select};
use serde::{Deserialize, Deserializer, Serialize, de};
use tokio_util::sync::CancellationToken;

use crate::intent::BridgeIntent;

/// Risk rating of a bridge route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RiskScore {
    /// Low risk
    Low,
    /// Medium risk
    Medium,
    /// High risk
    High,
}

impl RiskScore {
    /// Returns the display label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a risk score.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown risk score {0:?}")]
pub struct RiskScoreParseError(String);

impl FromStr for RiskScore {
    type Err = RiskScoreParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(RiskScoreParseError(s.into())),
        }
    }
}

impl<'de> Deserialize<'de> for RiskScore {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}

/// Predicted cost, duration and risk of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEstimate {
    /// Gas fee in ETH, as text
    pub estimated_gas: String,
    /// Duration in minutes, as text
    pub estimated_time: String,
    /// Route risk
    pub risk_score: RiskScore,
    /// Short commentary
    pub message: String,
}

impl RouteEstimate {
    /// The estimate shown whenever the estimator fails.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            estimated_gas: "0.0042".into(),
            estimated_time: "12".into(),
            risk_score: RiskScore::Low,
            message: "Standard bridge protocol engaged.".into(),
        }
    }
}

/// Estimator input, a snapshot of the form at scheduling time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteQuery {
    /// Amount as entered
    pub amount: String,
    /// Token symbol (e.g. `"USDC"`)
    pub token_symbol: String,
    /// Source network display name
    pub from_network: String,
    /// Destination network display name
    pub to_network: String,
}

/// Any estimator failure: transport, parse, timeout.
#[derive(Debug, thiserror::Error)]
#[error("Route estimation failed: {0}")]
pub struct EstimationFailure(#[source] Box<dyn Error + Send + Sync>);

impl EstimationFailure {
    /// Wraps an underlying error.
    pub fn new(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self(err.into())
    }
}

/// Produces route estimates.
#[async_trait(?Send)]
pub trait RouteEstimator {
    /// Estimates a route.
    ///
    /// # Errors
    ///
    /// Returns [`EstimationFailure`] on any failure; callers substitute the fallback.
    async fn estimate(&self, query: &RouteQuery) -> Result<RouteEstimate, EstimationFailure>;
}

#[async_trait(?Send)]
impl<T: RouteEstimator + ?Sized> RouteEstimator for Rc<T> {
    async fn estimate(&self, query: &RouteQuery) -> Result<RouteEstimate, EstimationFailure> {
        (**self).estimate(query).await
    }
}

/// Runs the estimator, substituting [`RouteEstimate::fallback`] on failure.
pub async fn estimate_or_fallback<E>(estimator: &E, query: &RouteQuery) -> RouteEstimate
where
    E: RouteEstimator + ?Sized,
{
    match estimator.estimate(query).await {
        Ok(estimate) => estimate,
        Err(err) => {
            log_failure(query, &err);
            RouteEstimate::fallback()
        }
    }
}

#[cfg(feature = "telemetry")]
fn log_failure(query: &RouteQuery, err: &EstimationFailure) {
    tracing::warn!(
        token = %query.token_symbol,
        from = %query.from_network,
        to = %query.to_network,
        error = %err,
        "Route estimation failed, using fallback"
    );
}

#[cfg(not(feature = "telemetry"))]
fn log_failure(_query: &RouteQuery, _err: &EstimationFailure) {}

/// A source of delays on the host event loop.
#[async_trait(?Send)]
pub trait Timer {
    /// Completes after `duration`.
    async fn sleep(&self, duration: Duration);
}

/// [`Timer`] backed by `tokio::time`.
#[cfg(feature = "tokio")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

#[cfg(feature = "tokio")]
#[async_trait(?Send)]
impl Timer for TokioTimer {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Result of one [`EstimateScheduler::schedule`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EstimateOutcome {
    /// A newer input arrived before the quiet window elapsed.
    Superseded,
    /// The input was not quotable; the current estimate was cleared.
    Cleared,
    /// The estimator answered after a newer input was scheduled; the answer was dropped.
    Stale,
    /// A fresh estimate, now current.
    Ready(RouteEstimate),
}

/// Debounced, last-input-wins estimate requests.
pub struct EstimateScheduler<E, T> {
    estimator: E,
    timer: T,
    window: Duration,
    sequence: Cell<u64>,
    pending: RefCell<Option<CancellationToken>>,
    current: RefCell<Option<RouteEstimate>>,
    analyzing: Cell<Option<u64>>,
}

impl<E, T> fmt::Debug for EstimateScheduler<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EstimateScheduler")
            .field("window", &self.window)
            .field("sequence", &self.sequence.get())
            .field("current", &self.current.borrow())
            .field("analyzing", &self.analyzing.get().is_some())
            .finish_non_exhaustive()
    }
}

impl<E, T> EstimateScheduler<E, T>
where
    E: RouteEstimator,
    T: Timer,
{
    /// Creates a scheduler with the given quiet window.
    pub const fn new(estimator: E, timer: T, window: Duration) -> Self {
        Self {
            estimator,
            timer,
            window,
            sequence: Cell::new(0),
            pending: RefCell::new(None),
            current: RefCell::new(None),
            analyzing: Cell::new(None),
        }
    }

    /// The most recent accepted estimate.
    pub fn current(&self) -> Option<RouteEstimate> {
        self.current.borrow().clone()
    }

    /// Returns `true` while the latest scheduled estimate is being computed.
    pub fn is_analyzing(&self) -> bool {
        self.analyzing.get().is_some()
    }

    /// Drops the current estimate, cancels the pending timer and marks every
    /// in-flight request stale.
    pub fn invalidate(&self) {
        self.next_sequence();
        if let Some(token) = self.pending.borrow_mut().take() {
            token.cancel();
        }
        self.analyzing.set(None);
        self.current.replace(None);
    }

    /// Records an input change and, if no newer change arrives within the
    /// quiet window, estimates the intent as it was at this call.
    pub async fn schedule(&self, intent: &BridgeIntent) -> EstimateOutcome {
        let query = intent.route_query();
        let seq = self.next_sequence();

        let token = CancellationToken::new();
        if let Some(previous) = self.pending.replace(Some(token.clone())) {
            previous.cancel();
        }

        let quiet = pin!(self.timer.sleep(self.window));
        let cancelled = pin!(token.cancelled());
        if let Either::Right(_) = select(quiet, cancelled).await {
            return EstimateOutcome::Superseded;
        }
        // Both may be ready on the same poll; the cancellation takes precedence.
        if token.is_cancelled() || self.sequence.get() != seq {
            return EstimateOutcome::Superseded;
        }
        self.pending.replace(None);

        let Some(query) = query else {
            self.current.replace(None);
            return EstimateOutcome::Cleared;
        };

        self.analyzing.set(Some(seq));
        let estimate = estimate_or_fallback(&self.estimator, &query).await;
        if self.analyzing.get() == Some(seq) {
            self.analyzing.set(None);
        }

        if self.sequence.get() != seq {
            #[cfg(feature = "telemetry")]
            tracing::debug!(seq, latest = self.sequence.get(), "Discarding stale estimate");
            return EstimateOutcome::Stale;
        }
        self.current.replace(Some(estimate.clone()));
        EstimateOutcome::Ready(estimate)
    }

    fn next_sequence(&self) -> u64 {
        let next = self.sequence.get() + 1;
        self.sequence.set(next);
        next
    }
}
