//! In-memory log of submitted bridge transactions, newest first.

use std::collections::VecDeque;

use serde::Serialize;

/// Status of a logged transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    /// Sent, outcome unknown.
    Pending,
    /// Accepted by the wallet.
    Completed,
    /// Failed after submission.
    Failed,
}

/// One submitted transfer. Never mutated after it is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Identifier, unique within the log
    pub id: String,
    /// Submission time, milliseconds since the Unix epoch
    pub timestamp: u64,
    /// Source network display name
    pub from_network: String,
    /// Destination network display name
    pub to_network: String,
    /// Token symbol
    pub token: String,
    /// Amount as entered
    pub amount: String,
    /// Status
    pub status: TxStatus,
    /// Transaction hash returned by the wallet
    pub hash: String,
    /// Estimate commentary shown alongside the entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_message: Option<String>,
}

/// Ordered transaction log.
#[derive(Debug, Clone, Default)]
pub struct TransactionLog {
    entries: VecDeque<TransactionRecord>,
    next_id: u64,
}

impl TransactionLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves an identifier for a record about to be created.
    pub fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("tx-{}", self.next_id)
    }

    /// Prepends a record.
    pub fn record(&mut self, record: TransactionRecord) {
        self.entries.push_front(record);
    }

    /// Records, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &TransactionRecord> {
        self.entries.iter()
    }

    /// The most recent record.
    #[must_use]
    pub fn latest(&self) -> Option<&TransactionRecord> {
        self.entries.front()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(log: &mut TransactionLog, hash: &str) -> TransactionRecord {
        TransactionRecord {
            id: log.allocate_id(),
            timestamp: 1_700_000_000_000,
            from_network: "Sepolia Testnet".into(),
            to_network: "Ethereum Mainnet".into(),
            token: "ETH".into(),
            amount: "1".into(),
            status: TxStatus::Completed,
            hash: hash.into(),
            ai_message: None,
        }
    }

    #[test]
    fn test_newest_first_with_unique_ids() {
        let mut log = TransactionLog::new();
        let first = record(&mut log, "0x01");
        let second = record(&mut log, "0x02");
        log.record(first);
        log.record(second);

        let hashes: Vec<_> = log.entries().map(|r| r.hash.as_str()).collect();
        assert_eq!(hashes, ["0x02", "0x01"]);
        assert_eq!(log.len(), 2);
        assert_ne!(log.entries[0].id, log.entries[1].id);
        assert_eq!(log.latest().map(|r| r.hash.as_str()), Some("0x02"));
    }

    #[test]
    fn test_record_serialization() {
        let mut log = TransactionLog::new();
        let mut rec = record(&mut log, "0xabc123");
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["fromNetwork"], "Sepolia Testnet");
        assert!(json.get("aiMessage").is_none());

        rec.ai_message = Some("Low congestion.".into());
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["aiMessage"], "Low congestion.");
    }
}
