use crate::error::GatewayError;
use crate::router::GatewayState;
use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use oauth2::CsrfToken;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

const STATE_COOKIE: &str = "fleet_login_state";
const USER_COOKIE: &str = "fleet_login_user";

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub jwt: IssuedJwt,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IssuedJwt {
    pub token: String,
    pub expires_in: i64,
    pub issuer: String,
}

/// GET /api/login -> redirects to the provider's consent page.
///
/// `user_id` re-links an existing gateway user instead of minting a new one.
pub async fn login_redirect(
    State(state): State<GatewayState>,
    Query(query): Query<LoginQuery>,
    jar: PrivateCookieJar,
) -> Result<Response, GatewayError> {
    let relink = match query.user_id.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            Uuid::parse_str(raw)
                .map_err(|_| GatewayError::Validation("user_id must be a UUID".to_string()))?,
        ),
        None => None,
    };

    let csrf = CsrfToken::new_random();
    let mut jar = jar.add(build_cookie(STATE_COOKIE, csrf.secret().clone()));
    if let Some(user_id) = relink {
        jar = jar.add(build_cookie(USER_COOKIE, user_id.to_string()));
    }
    let auth_url = state.tokens.oauth().authorize_url(csrf);

    info!(relink = relink.is_some(), "Dispatching OAuth redirect");
    Ok((
        jar,
        (StatusCode::FOUND, [(header::LOCATION, auth_url.to_string())]),
    )
        .into_response())
}

/// GET /api/login/callback -> stores the user's credential and issues a gateway JWT.
pub async fn login_callback(
    State(state): State<GatewayState>,
    Query(query): Query<CallbackQuery>,
    jar: PrivateCookieJar,
) -> Response {
    let (expected_state, relink, jar) = match load_login_session(jar) {
        Ok(data) => data,
        Err((jar, err)) => return respond_with_error(jar, err),
    };

    if let Some(error) = query.error.as_deref() {
        let detail = query.error_description.as_deref().unwrap_or_default();
        warn!(error, detail, "provider denied authorization");
        return respond_with_error(
            jar,
            GatewayError::OauthFlow(format!("authorization denied: {error} {detail}").trim().to_string()),
        );
    }

    let state_ok = query
        .state
        .as_deref()
        .is_some_and(|s| bool::from(s.as_bytes().ct_eq(expected_state.as_bytes())));
    if !state_ok {
        return respond_with_error(
            jar,
            GatewayError::OauthFlow("CSRF token mismatch".to_string()),
        );
    }

    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        return respond_with_error(
            jar,
            GatewayError::Validation("authorization code is required".to_string()),
        );
    };

    let user_id = relink.unwrap_or_else(Uuid::new_v4);
    let exchanged = state.tokens.exchange_code(user_id, code).await.map_err(|e| match e {
        GatewayError::Oauth2Server { error } => {
            GatewayError::OauthFlow(format!("code exchange rejected: {error}"))
        }
        other => other,
    });
    if let Err(err) = exchanged {
        return respond_with_error(jar, err);
    }

    let token = match state.jwt.issue(user_id) {
        Ok(t) => t,
        Err(err) => return respond_with_error(jar, err),
    };

    info!(%user_id, "Login completed");
    let body = LoginResponse {
        user_id,
        jwt: IssuedJwt {
            token,
            expires_in: state.jwt.ttl_secs(),
            issuer: state.jwt.issuer().to_string(),
        },
    };
    (jar, Json(body)).into_response()
}

fn load_login_session(
    jar: PrivateCookieJar,
) -> Result<(String, Option<Uuid>, PrivateCookieJar), (PrivateCookieJar, GatewayError)> {
    let Some(expected) = jar.get(STATE_COOKIE).map(|c| c.value().to_owned()) else {
        return Err((
            clear_login_cookies(jar),
            GatewayError::OauthFlow("Missing login state cookie".to_string()),
        ));
    };
    let relink = jar
        .get(USER_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok());
    Ok((expected, relink, clear_login_cookies(jar)))
}

fn clear_login_cookies(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(clear_cookie(STATE_COOKIE))
        .remove(clear_cookie(USER_COOKIE))
}

fn build_cookie(name: &str, value: String) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::minutes(15))
        .build()
}

fn clear_cookie(name: &str) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn respond_with_error(jar: PrivateCookieJar, err: GatewayError) -> Response {
    (jar, err.into_response()).into_response()
}
