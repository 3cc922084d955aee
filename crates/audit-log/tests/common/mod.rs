#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use log_engine::{LogRec, Target, TargetError};
use tokio::sync::Semaphore;

/// Keeps delivered records in memory. Writes wait for a permit when gated.
#[derive(Clone, Default)]
pub struct MemoryTarget {
    pub records: Arc<Mutex<Vec<LogRec>>>,
    gate: Option<Arc<Semaphore>>,
    fail_flush: bool,
}

impl MemoryTarget {
    /// A target whose writes block until [`Semaphore::add_permits`] is called.
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let target = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (target, gate)
    }

    pub fn failing_flush() -> Self {
        Self {
            fail_flush: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.field("event").and_then(|v| v.as_str()).map(String::from))
            .collect()
    }
}

impl Target for MemoryTarget {
    async fn write(&mut self, rec: &LogRec) -> Result<(), TargetError> {
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.records.lock().unwrap().push(rec.clone());
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), TargetError> {
        if self.fail_flush {
            return Err(TargetError::Flush(std::io::Error::other("device gone")));
        }
        Ok(())
    }
}
