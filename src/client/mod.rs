//! Client side of the converter: the conversion flow and its driver

pub mod flow;
pub mod session;

pub use flow::{ConversionOutcome, ConverterState, FetchTicket, Phase};
pub use session::{ConverterSession, RecordDispatcher};
