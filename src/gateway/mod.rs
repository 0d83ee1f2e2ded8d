//! Outbound messaging gateway (Evolution API).

pub mod evolution;
pub mod types;

pub use evolution::EvolutionClient;
pub use types::{recipient_number, GatewayError, GatewayResult, SendOptions};
