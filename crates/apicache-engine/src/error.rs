//! Cache engine error types

use apicache_domain::{DomainError, ValueKind};
use thiserror::Error;

/// Value codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("No reconstructor registered for tag '{0}'")]
    UnknownTag(String),

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Invalid {tag} payload: {reason}")]
    InvalidTaggedValue { tag: String, reason: String },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Non-finite float {0} cannot be encoded")]
    NonFiniteFloat(f64),

    #[error("Value nested deeper than {0} levels")]
    DepthExceeded(usize),

    #[error("No encoder registered for {0} values")]
    Unsupported(ValueKind),

    #[error("Conversion error: {0}")]
    Convert(#[from] DomainError),
}

/// Cache engine errors
///
/// None of these reach callers of decorated operations; the decorators log
/// them and fall back to computing the result.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Store connection error: {0}")]
    Connection(String),

    #[error("Store authentication failed: {0}")]
    Auth(String),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Store operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Argument of type {type_name} cannot be fingerprinted")]
    UnkeyableArgument { type_name: &'static str },

    #[error("Store error: {0}")]
    Store(String),
}

impl From<DomainError> for CacheError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidNamespace { .. } => Self::InvalidConfig(err.to_string()),
            other => Self::Codec(CodecError::Convert(other)),
        }
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if is_auth_error(&err) {
            Self::Auth(err.to_string())
        } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            Self::Connection(err.to_string())
        } else {
            Self::Store(err.to_string())
        }
    }
}

#[cfg(feature = "redis")]
pub(crate) fn is_auth_error(err: &redis::RedisError) -> bool {
    err.kind() == redis::ErrorKind::AuthenticationFailed
        || matches!(err.code(), Some("NOAUTH" | "WRONGPASS"))
}

pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(all(test, feature = "redis"))]
mod tests {
    use super::*;

    fn server_error(line: &[u8]) -> redis::RedisError {
        redis::parse_redis_value(line)
            .unwrap()
            .extract_error()
            .unwrap_err()
    }

    #[test]
    fn test_authentication_failed_maps_to_auth() {
        let err = redis::RedisError::from((
            redis::ErrorKind::AuthenticationFailed,
            "Password authentication failed",
        ));
        assert!(matches!(CacheError::from(err), CacheError::Auth(_)));
    }

    #[test]
    fn test_wrongpass_and_noauth_map_to_auth() {
        let wrongpass = server_error(b"-WRONGPASS invalid username-password pair\r\n");
        assert_eq!(wrongpass.code(), Some("WRONGPASS"));
        assert!(matches!(CacheError::from(wrongpass), CacheError::Auth(_)));

        let noauth = server_error(b"-NOAUTH Authentication required.\r\n");
        assert!(matches!(CacheError::from(noauth), CacheError::Auth(_)));
    }

    #[test]
    fn test_other_server_errors_map_to_store() {
        let err = server_error(b"-ERR unknown command\r\n");
        assert!(matches!(CacheError::from(err), CacheError::Store(_)));
    }

    #[test]
    fn test_refused_io_maps_to_connection() {
        let io = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
        let err = redis::RedisError::from(io);
        assert!(matches!(CacheError::from(err), CacheError::Connection(_)));
    }
}
