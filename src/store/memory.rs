use super::ConversionLog;
use crate::core::conversion::ConversionRecord;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory conversion log, lost when the process exits
#[derive(Clone, Default)]
pub struct MemoryConversionLog {
    inner: Arc<Mutex<Vec<ConversionRecord>>>,
}

impl MemoryConversionLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversionLog for MemoryConversionLog {
    async fn append(&self, record: &ConversionRecord) -> Result<()> {
        let mut records = self.inner.lock().await;
        records.push(record.clone());
        debug!("Memory log APPEND, {} records", records.len());
        Ok(())
    }

    async fn records(&self) -> Result<Vec<ConversionRecord>> {
        Ok(self.inner.lock().await.clone())
    }
}
