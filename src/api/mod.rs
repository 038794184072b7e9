pub mod fleet_api;

pub use fleet_api::{FleetApi, build_http_client};
