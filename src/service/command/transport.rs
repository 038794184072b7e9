use crate::service::command::account::VehicleAccount;
use crate::service::command::catalog::{CommandCatalog, VehicleAction};
use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::{Map, Value};
use thiserror::Error as ThisError;

/// Parameters accompanying a command, as sent by the caller.
pub type CommandParameters = Map<String, Value>;

/// Opaque handshake state a vehicle session can resume from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState(pub Vec<u8>);

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ProtocolError {
    /// Expected refusal reported by the vehicle, e.g. "already_set".
    #[error("{0}")]
    Nominal(String),

    /// The command is only reachable through the REST endpoint.
    #[error("command must be sent via the REST API")]
    UseRest,

    #[error("vehicle does not support the signed command protocol")]
    ProtocolNotSupported,

    #[error("command not implemented: {0}")]
    NotImplemented(String),

    #[error("invalid command parameters: {0}")]
    InvalidParameters(String),

    #[error("{message}")]
    Http { status: StatusCode, message: String },

    #[error("{0}")]
    Transport(String),
}

/// Connects to vehicles over the signed command protocol.
#[async_trait]
pub trait VehicleTransport: Send + Sync {
    /// Turn a command name plus parameters into a typed action.
    async fn resolve(
        &self,
        command: &str,
        params: &CommandParameters,
    ) -> Result<VehicleAction, ProtocolError> {
        CommandCatalog::resolve(command, params)
    }

    async fn connect(
        &self,
        account: &VehicleAccount,
        vin: &str,
    ) -> Result<Box<dyn VehicleSession>, ProtocolError>;
}

/// One authenticated conversation with a single vehicle.
#[async_trait]
pub trait VehicleSession: Send {
    async fn start_session(&mut self, cached: Option<SessionState>) -> Result<(), ProtocolError>;

    async fn execute(&mut self, action: &VehicleAction) -> Result<(), ProtocolError>;

    /// Current handshake state, if any, to be cached for the next command.
    fn session_state(&self) -> Option<SessionState>;

    async fn disconnect(&mut self);
}

/// Transport for deployments without a command signing key: every command goes to REST.
#[derive(Debug, Default, Clone, Copy)]
pub struct RestOnlyTransport;

#[async_trait]
impl VehicleTransport for RestOnlyTransport {
    async fn connect(
        &self,
        _account: &VehicleAccount,
        _vin: &str,
    ) -> Result<Box<dyn VehicleSession>, ProtocolError> {
        Ok(Box::new(RestOnlySession))
    }
}

struct RestOnlySession;

#[async_trait]
impl VehicleSession for RestOnlySession {
    async fn start_session(&mut self, _cached: Option<SessionState>) -> Result<(), ProtocolError> {
        Err(ProtocolError::ProtocolNotSupported)
    }

    async fn execute(&mut self, _action: &VehicleAction) -> Result<(), ProtocolError> {
        Err(ProtocolError::UseRest)
    }

    fn session_state(&self) -> Option<SessionState> {
        None
    }

    async fn disconnect(&mut self) {}
}
