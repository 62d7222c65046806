//! Error taxonomy of the correlation core.
//!
//! Every error is session- or event-scoped; nothing here is fatal to the
//! host process. Remote-surface errors are folded into the taxonomy at this
//! boundary so engine code matches on intent, not on transport details.

use thiserror::Error;

use iris_helpdesk::HelpdeskApiError;
use iris_media::TranscodeError;
use iris_transport::TransportClientError;

#[derive(Debug, Error)]
/// Enumerates supported `CorrelationError` values.
pub enum CorrelationError {
    #[error("helpdesk configuration missing: {0}")]
    ConfigurationMissing(String),
    #[error("thread resolution failed: {0}")]
    ResolutionFailed(String),
    #[error("attachment transcode failed: {0}")]
    TranscodeFailed(#[from] TranscodeError),
    #[error("remote call failed: {0}")]
    RemoteCallFailed(String),
    #[error("transport not connected")]
    NotConnected,
}

impl From<HelpdeskApiError> for CorrelationError {
    fn from(error: HelpdeskApiError) -> Self {
        match error {
            HelpdeskApiError::ConfigurationMissing { detail } => Self::ConfigurationMissing(detail),
            other => Self::RemoteCallFailed(other.to_string()),
        }
    }
}

impl From<TransportClientError> for CorrelationError {
    fn from(error: TransportClientError) -> Self {
        match error {
            TransportClientError::NotConnected => Self::NotConnected,
            other => Self::RemoteCallFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use iris_helpdesk::HelpdeskApiError;
    use iris_transport::TransportClientError;

    use super::CorrelationError;

    #[test]
    fn unit_helpdesk_errors_fold_into_taxonomy() {
        let config = CorrelationError::from(HelpdeskApiError::ConfigurationMissing {
            detail: "agent_token".to_string(),
        });
        assert!(matches!(config, CorrelationError::ConfigurationMissing(_)));

        let remote = CorrelationError::from(HelpdeskApiError::RequestFailed {
            status: 503,
            detail: "down".to_string(),
        });
        assert!(matches!(remote, CorrelationError::RemoteCallFailed(_)));
    }

    #[test]
    fn unit_transport_errors_fold_into_taxonomy() {
        assert!(matches!(
            CorrelationError::from(TransportClientError::NotConnected),
            CorrelationError::NotConnected
        ));
        assert!(matches!(
            CorrelationError::from(TransportClientError::SendFailed("x".to_string())),
            CorrelationError::RemoteCallFailed(_)
        ));
    }
}
