pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod fleet_oauth;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;
pub mod types;

#[cfg(test)]
mod test_support;

pub use error::GatewayError;
pub use router::{GatewayState, gateway_router};
