//! Core domain abstractions

pub mod config;
pub mod conversion;
pub mod log;
pub mod rates;

// Re-export main types for cleaner imports
pub use conversion::{Ack, ConversionRecord, ConversionRecorder, NewConversion, RecordError};
pub use rates::{GatewayError, RateDocument, RateGateway, RateSnapshot, RateTable};
