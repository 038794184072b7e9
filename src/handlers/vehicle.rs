use crate::error::GatewayError;
use crate::middleware::{AuthenticatedUser, FleetRequest};
use crate::router::GatewayState;
use crate::types::upstream::UpstreamResponse;
use axum::extract::State;
use axum::routing::{MethodFilter, MethodRouter, on};
use tracing::debug;

/// A gateway endpoint that forwards to one Fleet API resource.
pub struct FleetRoute {
    pub filter: MethodFilter,
    pub path: &'static str,
    pub upstream: &'static str,
}

const fn route(filter: MethodFilter, path: &'static str, upstream: &'static str) -> FleetRoute {
    FleetRoute {
        filter,
        path,
        upstream,
    }
}

pub static FLEET_ROUTES: &[FleetRoute] = &[
    route(MethodFilter::GET, "/api/products", "/api/1/products"),
    route(MethodFilter::GET, "/api/users/me", "/api/1/users/me"),
    route(MethodFilter::GET, "/api/users/region", "/api/1/users/region"),
    route(MethodFilter::GET, "/api/users/orders", "/api/1/users/orders"),
    route(MethodFilter::GET, "/api/users/feature_config", "/api/1/users/feature_config"),
    route(MethodFilter::GET, "/api/vehicles", "/api/1/vehicles"),
    route(MethodFilter::GET, "/api/vehicles/{vehicle_tag}", "/api/1/vehicles/{vehicle_tag}"),
    route(
        MethodFilter::GET,
        "/api/vehicles/{vehicle_tag}/vehicle_data",
        "/api/1/vehicles/{vehicle_tag}/vehicle_data",
    ),
    route(
        MethodFilter::POST,
        "/api/vehicles/{vehicle_tag}/wake_up",
        "/api/1/vehicles/{vehicle_tag}/wake_up",
    ),
    route(
        MethodFilter::GET,
        "/api/vehicles/{vehicle_tag}/mobile_enabled",
        "/api/1/vehicles/{vehicle_tag}/mobile_enabled",
    ),
    route(
        MethodFilter::GET,
        "/api/vehicles/{vehicle_tag}/nearby_charging_sites",
        "/api/1/vehicles/{vehicle_tag}/nearby_charging_sites",
    ),
    route(
        MethodFilter::GET,
        "/api/vehicles/{vehicle_tag}/recent_alerts",
        "/api/1/vehicles/{vehicle_tag}/recent_alerts",
    ),
    route(
        MethodFilter::GET,
        "/api/vehicles/{vehicle_tag}/release_notes",
        "/api/1/vehicles/{vehicle_tag}/release_notes",
    ),
    route(
        MethodFilter::GET,
        "/api/vehicles/{vehicle_tag}/service_data",
        "/api/1/vehicles/{vehicle_tag}/service_data",
    ),
    route(
        MethodFilter::GET,
        "/api/vehicles/{vehicle_tag}/drivers",
        "/api/1/vehicles/{vehicle_tag}/drivers",
    ),
    route(
        MethodFilter::DELETE,
        "/api/vehicles/{vehicle_tag}/drivers",
        "/api/1/vehicles/{vehicle_tag}/drivers",
    ),
    route(
        MethodFilter::GET,
        "/api/vehicles/{vehicle_tag}/invitations",
        "/api/1/vehicles/{vehicle_tag}/invitations",
    ),
    route(
        MethodFilter::POST,
        "/api/vehicles/{vehicle_tag}/invitations",
        "/api/1/vehicles/{vehicle_tag}/invitations",
    ),
    route(
        MethodFilter::POST,
        "/api/vehicles/{vehicle_tag}/invitations/{invitation_id}/revoke",
        "/api/1/vehicles/{vehicle_tag}/invitations/{invitation_id}/revoke",
    ),
    route(
        MethodFilter::POST,
        "/api/vehicles/{vehicle_tag}/signed_command",
        "/api/1/vehicles/{vehicle_tag}/signed_command",
    ),
    route(
        MethodFilter::GET,
        "/api/vehicles/{vehicle_tag}/fleet_telemetry_config",
        "/api/1/vehicles/{vehicle_tag}/fleet_telemetry_config",
    ),
    route(
        MethodFilter::DELETE,
        "/api/vehicles/{vehicle_tag}/fleet_telemetry_config",
        "/api/1/vehicles/{vehicle_tag}/fleet_telemetry_config",
    ),
    route(
        MethodFilter::GET,
        "/api/vehicles/{vehicle_tag}/fleet_telemetry_errors",
        "/api/1/vehicles/{vehicle_tag}/fleet_telemetry_errors",
    ),
    route(
        MethodFilter::POST,
        "/api/vehicles/fleet_telemetry_config",
        "/api/1/vehicles/fleet_telemetry_config",
    ),
    route(MethodFilter::POST, "/api/vehicles/fleet_status", "/api/1/vehicles/fleet_status"),
    route(MethodFilter::GET, "/api/subscriptions", "/api/1/subscriptions"),
    route(MethodFilter::GET, "/api/vehicle_subscriptions", "/api/1/vehicle_subscriptions"),
    route(MethodFilter::GET, "/api/dx/vehicles/options", "/api/1/dx/vehicles/options"),
    route(MethodFilter::GET, "/api/dx/warranty/details", "/api/1/dx/warranty/details"),
    route(MethodFilter::GET, "/api/dx/charging/history", "/api/1/dx/charging/history"),
    route(
        MethodFilter::GET,
        "/api/dx/vehicles/upgrades/eligibility",
        "/api/1/dx/vehicles/upgrades/eligibility",
    ),
    route(
        MethodFilter::GET,
        "/api/dx/vehicles/subscriptions/eligibility",
        "/api/1/dx/vehicles/subscriptions/eligibility",
    ),
];

/// Method router forwarding `route` through the caller's credential.
pub fn method_router(route: &'static FleetRoute) -> MethodRouter<GatewayState> {
    on(
        route.filter,
        move |State(state): State<GatewayState>,
              AuthenticatedUser(user_id): AuthenticatedUser,
              req: FleetRequest| async move {
            forward(&state, user_id, &req, route.upstream).await
        },
    )
}

async fn forward(
    state: &GatewayState,
    user_id: uuid::Uuid,
    req: &FleetRequest,
    upstream: &'static str,
) -> Result<UpstreamResponse, GatewayError> {
    let upstream_req = req.to_upstream(upstream)?;
    debug!(%user_id, method = %upstream_req.method, path = %upstream_req.path, "proxying Fleet API request");
    state.proxy.forward(user_id, upstream_req).await
}
