pub mod auth;
pub mod fleet_request;

pub use auth::{AuthenticatedUser, JwtIssuer};
pub use fleet_request::FleetRequest;
