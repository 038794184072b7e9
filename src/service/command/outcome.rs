use crate::error::GatewayError;
use crate::service::command::transport::ProtocolError;
use crate::types::command::CommandResponse;
use axum::body::Bytes;

const DEFAULT_NOMINAL_REASON: &str = "nominal failure";

/// What the dispatcher decided for one command.
#[derive(Debug)]
pub enum CommandOutcome {
    Executed(CommandResponse),
    /// Vehicle refused for an expected reason; still a 200 to the caller.
    NominalReject(String),
    /// Forward the original request to the Fleet REST endpoint instead.
    UseFallback,
    NotImplemented(String),
    Rejected(GatewayError),
}

impl CommandOutcome {
    /// Mapping for errors raised while resolving a command name into an action.
    pub fn from_classification(command: &str, err: ProtocolError) -> Self {
        match err {
            ProtocolError::Nominal(reason) => CommandOutcome::nominal(reason),
            ProtocolError::UseRest | ProtocolError::ProtocolNotSupported => CommandOutcome::UseFallback,
            ProtocolError::NotImplemented(_) => CommandOutcome::NotImplemented(command.to_string()),
            ProtocolError::Http { status, message } => CommandOutcome::Rejected(GatewayError::Upstream {
                status,
                content_type: Some("application/json".to_string()),
                body: Bytes::from(message),
            }),
            other => CommandOutcome::Rejected(GatewayError::Validation(other.to_string())),
        }
    }

    /// Mapping for errors raised by a live session.
    pub fn from_execution(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Nominal(reason) => CommandOutcome::nominal(reason),
            ProtocolError::UseRest | ProtocolError::ProtocolNotSupported => CommandOutcome::UseFallback,
            other => CommandOutcome::Rejected(GatewayError::Transport(other.to_string())),
        }
    }

    /// A refusal without a reason still reports one to the caller.
    fn nominal(reason: String) -> Self {
        if reason.trim().is_empty() {
            CommandOutcome::NominalReject(DEFAULT_NOMINAL_REASON.to_string())
        } else {
            CommandOutcome::NominalReject(reason)
        }
    }

    pub fn rejected(err: GatewayError) -> Self {
        CommandOutcome::Rejected(err)
    }

    pub fn timed_out() -> Self {
        CommandOutcome::Rejected(GatewayError::Timeout("vehicle command timed out".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn classification_errors_map_to_caller_statuses() {
        assert!(matches!(
            CommandOutcome::from_classification("x", ProtocolError::UseRest),
            CommandOutcome::UseFallback
        ));
        assert!(matches!(
            CommandOutcome::from_classification("make_coffee", ProtocolError::NotImplemented("make_coffee".into())),
            CommandOutcome::NotImplemented(c) if c == "make_coffee"
        ));
        match CommandOutcome::from_classification(
            "x",
            ProtocolError::InvalidParameters("missing 'percent'".into()),
        ) {
            CommandOutcome::Rejected(e) => assert_eq!(e.status(), StatusCode::BAD_REQUEST),
            other => panic!("unexpected outcome: {other:?}"),
        }
        match CommandOutcome::from_classification(
            "x",
            ProtocolError::Http {
                status: StatusCode::TOO_MANY_REQUESTS,
                message: r#"{"error":"rate limited"}"#.into(),
            },
        ) {
            CommandOutcome::Rejected(e) => assert_eq!(e.status(), StatusCode::TOO_MANY_REQUESTS),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn execution_failures_are_internal_unless_nominal_or_fallback() {
        assert!(matches!(
            CommandOutcome::from_execution(ProtocolError::Nominal("already_set".into())),
            CommandOutcome::NominalReject(r) if r == "already_set"
        ));
        assert!(matches!(
            CommandOutcome::from_execution(ProtocolError::UseRest),
            CommandOutcome::UseFallback
        ));
        match CommandOutcome::from_execution(ProtocolError::InvalidParameters("x".into())) {
            CommandOutcome::Rejected(e) => assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn empty_nominal_reason_is_replaced() {
        assert!(matches!(
            CommandOutcome::from_execution(ProtocolError::Nominal(String::new())),
            CommandOutcome::NominalReject(r) if r == "nominal failure"
        ));
        assert!(matches!(
            CommandOutcome::from_classification("x", ProtocolError::Nominal("  ".into())),
            CommandOutcome::NominalReject(r) if r == "nominal failure"
        ));
    }
}
