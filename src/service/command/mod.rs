//! Signed vehicle command dispatch.
//!
//! - `catalog`: REST command name → typed action
//! - `transport`: the protocol seam (`VehicleTransport` / `VehicleSession`)
//! - `dispatcher`: per-VIN serialization, session reuse, outcome mapping

pub mod account;
pub mod catalog;
pub mod dispatcher;
pub mod outcome;
pub mod session_cache;
pub mod transport;

pub use account::VehicleAccount;
pub use catalog::{CommandCatalog, VehicleAction};
pub use dispatcher::{CommandDispatcher, VIN_LENGTH};
pub use outcome::CommandOutcome;
pub use session_cache::SessionCache;
pub use transport::{
    CommandParameters, ProtocolError, RestOnlyTransport, SessionState, VehicleSession,
    VehicleTransport,
};
