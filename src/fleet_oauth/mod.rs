pub mod credentials;
pub mod endpoints;

pub use credentials::{TokenGrant, UserCredential};
pub use endpoints::FleetOauthClient;
