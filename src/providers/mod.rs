pub mod backend;
pub mod exchangerate_api;

pub use backend::BackendClient;
pub use exchangerate_api::ExchangeRateApiProvider;
