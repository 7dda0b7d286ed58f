use super::ConversionLog;
use crate::core::conversion::ConversionRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const PARTITION: &str = "conversions";

/// Conversion log persisted in a fjall keyspace.
///
/// Keys are big-endian sequence numbers so iteration order is insertion
/// order; values are JSON-encoded records.
pub struct DiskConversionLog {
    keyspace: Keyspace,
    partition: PartitionHandle,
    next_id: AtomicU64,
}

impl DiskConversionLog {
    pub fn open(db_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(db_path)
            .with_context(|| format!("Failed to create data directory: {}", db_path.display()))?;

        let keyspace = Config::new(db_path.join("conversions_db"))
            .open()
            .context("Failed to open conversion store")?;
        let partition = keyspace
            .open_partition(PARTITION, PartitionCreateOptions::default())
            .context("Failed to open conversions partition")?;

        let next_id = match partition.last_key_value()? {
            Some((key, _)) => decode_key(&key)? + 1,
            None => 0,
        };
        debug!("Opened conversion store at {}, next id {next_id}", db_path.display());

        Ok(Self {
            keyspace,
            partition,
            next_id: AtomicU64::new(next_id),
        })
    }
}

fn decode_key(key: &[u8]) -> Result<u64> {
    let bytes = <[u8; 8]>::try_from(key).context("Corrupt conversion key")?;
    Ok(u64::from_be_bytes(bytes))
}

#[async_trait]
impl ConversionLog for DiskConversionLog {
    async fn append(&self, record: &ConversionRecord) -> Result<()> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.partition
            .insert(id.to_be_bytes().to_vec(), serde_json::to_vec(record)?)?;
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Conversion store APPEND id {id}");
        Ok(())
    }

    async fn records(&self) -> Result<Vec<ConversionRecord>> {
        self.partition
            .iter()
            .map(|item| {
                let (_, value) = item?;
                Ok(serde_json::from_slice(&value)?)
            })
            .collect()
    }
}
