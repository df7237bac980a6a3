use std::sync::Mutex;

use crate::domain::{LlmError, UsageRecord};

/// Append-only sink for per-invocation usage records. There is no update or
/// delete path.
pub trait UsageLog: Send + Sync {
    fn append(&self, record: UsageRecord) -> Result<(), LlmError>;

    /// Snapshot of all records in append order.
    fn records(&self) -> Result<Vec<UsageRecord>, LlmError>;
}

#[derive(Debug, Default)]
pub struct InMemoryUsageLog {
    records: Mutex<Vec<UsageRecord>>,
}

impl InMemoryUsageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UsageLog for InMemoryUsageLog {
    fn append(&self, record: UsageRecord) -> Result<(), LlmError> {
        self.records
            .lock()
            .map_err(|_| LlmError::internal("usage log lock poisoned"))?
            .push(record);
        Ok(())
    }

    fn records(&self) -> Result<Vec<UsageRecord>, LlmError> {
        let records = self
            .records
            .lock()
            .map_err(|_| LlmError::internal("usage log lock poisoned"))?;
        Ok(records.clone())
    }
}
