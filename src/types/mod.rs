pub mod command;
pub mod upstream;

pub use command::{CommandResponse, CommandResult};
pub use upstream::{UpstreamRequest, UpstreamResponse};
