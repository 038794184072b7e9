use crate::error::GatewayError;
use crate::middleware::{AuthenticatedUser, FleetRequest};
use crate::router::GatewayState;
use crate::service::command::CommandOutcome;
use crate::service::user_tokens::proxy_lead_time;
use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use tracing::{debug, info};

const REST_COMMAND_PATH: &str = "/api/1/vehicles/{vehicle_tag}/command/{*command_path}";

/// POST /api/vehicles/{vehicle_tag}/command/{*command_path}
///
/// Tries the signed protocol first; commands it cannot carry go to the REST endpoint.
pub async fn vehicle_command(
    State(state): State<GatewayState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    req: FleetRequest,
) -> Result<Response, GatewayError> {
    let vin = req
        .param("vehicle_tag")
        .ok_or_else(|| GatewayError::Validation("vehicle tag is required".to_string()))?
        .to_string();
    let command = req
        .param("command_path")
        .and_then(|p| p.trim_matches('/').split('/').next())
        .unwrap_or_default()
        .to_string();

    let credential = state.tokens.load(user_id).await?;
    let credential = state
        .tokens
        .ensure_valid(credential, proxy_lead_time())
        .await?;

    if !state.commands_enabled {
        debug!(%vin, %command, "signed commands disabled, using REST");
        return forward_to_rest(&state, credential, &req).await;
    }

    let outcome = state
        .dispatcher
        .execute_detached(
            vin.clone(),
            command.clone(),
            req.body.clone(),
            credential.access_token.clone(),
        )
        .await;

    match outcome {
        CommandOutcome::Executed(reply) => Ok(Json(reply).into_response()),
        CommandOutcome::NominalReject(reason) => {
            info!(%vin, %command, %reason, "vehicle refused command");
            Ok(Json(crate::types::CommandResponse::nominal(reason)).into_response())
        }
        CommandOutcome::UseFallback => {
            debug!(%vin, %command, "falling back to REST command endpoint");
            forward_to_rest(&state, credential, &req).await
        }
        CommandOutcome::NotImplemented(name) => Err(GatewayError::NotImplemented(format!(
            "command '{name}' is not supported"
        ))),
        CommandOutcome::Rejected(err) => Err(err),
    }
}

async fn forward_to_rest(
    state: &GatewayState,
    credential: crate::fleet_oauth::UserCredential,
    req: &FleetRequest,
) -> Result<Response, GatewayError> {
    let upstream = req.to_upstream(REST_COMMAND_PATH)?;
    let resp = state.proxy.forward_with(credential, upstream).await?;
    Ok(resp.into_response())
}
