pub mod exchange;

pub use exchange::{ExchangeService, InitiateExchange};
