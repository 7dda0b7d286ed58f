pub mod disk;
pub mod memory;

use crate::core::config::{AppConfig, StoreBackend};
use crate::core::conversion::{Ack, ConversionRecord, ConversionRecorder, NewConversion, RecordError};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use disk::DiskConversionLog;
use memory::MemoryConversionLog;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Append-only storage for conversion records.
#[async_trait]
pub trait ConversionLog: Send + Sync {
    async fn append(&self, record: &ConversionRecord) -> Result<()>;

    /// All records, oldest first.
    async fn records(&self) -> Result<Vec<ConversionRecord>>;
}

/// Records conversions into a [`ConversionLog`], if one is connected.
///
/// Without a connected log every valid submission fails fast with
/// [`RecordError::StoreUnavailable`]; the rest of the service keeps running.
#[derive(Clone)]
pub struct StoreRecorder {
    log: Option<Arc<dyn ConversionLog>>,
}

impl StoreRecorder {
    pub fn new(log: Arc<dyn ConversionLog>) -> Self {
        Self { log: Some(log) }
    }

    pub fn unavailable() -> Self {
        Self { log: None }
    }

    pub fn is_connected(&self) -> bool {
        self.log.is_some()
    }

    /// Opens the configured store. A disk store that cannot be opened leaves
    /// the recorder disconnected instead of failing startup.
    pub fn open(config: &AppConfig) -> Self {
        match config.store.backend {
            StoreBackend::None => {
                info!("Conversion store disabled, history will not be saved");
                Self::unavailable()
            }
            StoreBackend::Memory => {
                info!("Using in-memory conversion store");
                Self::new(Arc::new(MemoryConversionLog::new()))
            }
            StoreBackend::Disk => match config.data_path().and_then(|p| DiskConversionLog::open(&p)) {
                Ok(log) => {
                    info!("Conversion store connected");
                    Self::new(Arc::new(log))
                }
                Err(e) => {
                    warn!(
                        error = %format!("{e:#}"),
                        "Conversion store unavailable, history will not be saved"
                    );
                    Self::unavailable()
                }
            },
        }
    }
}

#[async_trait]
impl ConversionRecorder for StoreRecorder {
    #[instrument(name = "RecordConversion", skip_all)]
    async fn record(&self, conversion: NewConversion) -> Result<Ack, RecordError> {
        let record = conversion.into_record(Utc::now())?;
        let log = self.log.as_ref().ok_or(RecordError::StoreUnavailable)?;

        log.append(&record).await.map_err(|e| RecordError::Write {
            details: format!("{e:#}"),
        })?;
        debug!(from = %record.from, to = %record.to, "Conversion saved");
        Ok(Ack::saved())
    }
}
