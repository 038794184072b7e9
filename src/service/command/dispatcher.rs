use crate::config::CommandConfig;
use crate::error::GatewayError;
use crate::service::command::account::VehicleAccount;
use crate::service::command::outcome::CommandOutcome;
use crate::service::command::session_cache::SessionCache;
use crate::service::command::transport::{CommandParameters, VehicleTransport};
use crate::service::keyed_lock::KeyedLocks;
use crate::types::command::CommandResponse;
use axum::body::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

pub const VIN_LENGTH: usize = 17;

/// Grace period for closing a session after the command deadline passed.
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// Runs signed vehicle commands, at most one in flight per VIN.
pub struct CommandDispatcher {
    transport: Arc<dyn VehicleTransport>,
    sessions: SessionCache,
    vin_locks: KeyedLocks,
    timeout: Duration,
    user_agent: String,
}

impl CommandDispatcher {
    pub fn new(transport: Arc<dyn VehicleTransport>, cfg: &CommandConfig, user_agent: &str) -> Self {
        Self {
            transport,
            sessions: SessionCache::new(cfg.session_cache_size),
            vin_locks: KeyedLocks::new(),
            timeout: cfg.timeout(),
            user_agent: user_agent.to_string(),
        }
    }

    /// Run on a background task so a caller hanging up does not cancel a command mid-flight.
    pub async fn execute_detached(
        self: &Arc<Self>,
        vin: String,
        command: String,
        payload: Bytes,
        access_token: String,
    ) -> CommandOutcome {
        let this = Arc::clone(self);
        let task = tokio::spawn(async move {
            this.execute(&vin, &command, &payload, &access_token).await
        });
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => CommandOutcome::rejected(GatewayError::Transport(format!(
                "command task failed: {e}"
            ))),
        }
    }

    pub async fn execute(
        &self,
        vin: &str,
        command: &str,
        payload: &[u8],
        access_token: &str,
    ) -> CommandOutcome {
        if access_token.is_empty() {
            return CommandOutcome::rejected(GatewayError::Unauthenticated(
                "missing oauth token".to_string(),
            ));
        }
        if vin.len() != VIN_LENGTH {
            return CommandOutcome::rejected(GatewayError::Validation(format!(
                "vin must be {VIN_LENGTH} characters"
            )));
        }
        if command.is_empty() {
            return CommandOutcome::rejected(GatewayError::Validation(
                "command is required".to_string(),
            ));
        }
        let params = match parse_parameters(payload) {
            Ok(p) => p,
            Err(e) => return CommandOutcome::rejected(e),
        };

        let deadline = Instant::now() + self.timeout;
        let action = match timeout_at(deadline, self.transport.resolve(command, &params)).await {
            Ok(Ok(action)) => action,
            Ok(Err(e)) => {
                debug!(vin, command, error = %e, "command not handled by signed protocol");
                return CommandOutcome::from_classification(command, e);
            }
            Err(_) => return CommandOutcome::timed_out(),
        };

        let Ok(_vin_guard) = timeout_at(deadline, self.vin_locks.lock(vin)).await else {
            warn!(vin, command, "timed out waiting for vehicle lock");
            return CommandOutcome::timed_out();
        };

        let account = match VehicleAccount::from_token(access_token, &self.user_agent) {
            Ok(a) => a,
            Err(e) => {
                return CommandOutcome::rejected(GatewayError::Forbidden(format!(
                    "cannot build vehicle account: {e}"
                )));
            }
        };

        let mut session = match timeout_at(deadline, self.transport.connect(&account, vin)).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                warn!(vin, error = %e, "vehicle connect failed");
                return CommandOutcome::from_execution(e);
            }
            Err(_) => return CommandOutcome::timed_out(),
        };

        let cached = self.sessions.get(vin).await;
        let started = match timeout_at(deadline, session.start_session(cached)).await {
            Ok(r) => r.map_err(CommandOutcome::from_execution),
            Err(_) => Err(CommandOutcome::timed_out()),
        };
        let result = match started {
            Ok(()) => match timeout_at(deadline, session.execute(&action)).await {
                Ok(r) => r.map_err(CommandOutcome::from_execution),
                Err(_) => Err(CommandOutcome::timed_out()),
            },
            Err(outcome) => Err(outcome),
        };

        if let Some(state) = session.session_state() {
            self.sessions.put(vin, state).await;
        }
        if tokio::time::timeout(DISCONNECT_GRACE, session.disconnect())
            .await
            .is_err()
        {
            warn!(vin, "vehicle disconnect timed out");
        }

        match result {
            Ok(()) => {
                info!(vin, command, "vehicle command executed");
                CommandOutcome::Executed(CommandResponse::success())
            }
            Err(outcome) => outcome,
        }
    }
}

fn parse_parameters(payload: &[u8]) -> Result<CommandParameters, GatewayError> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Ok(CommandParameters::new());
    }
    serde_json::from_slice::<CommandParameters>(payload)
        .map_err(|e| GatewayError::Validation(format!("invalid command payload: {e}")))
}
