// mise/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MiseError {
    /// The remote resource no longer exists. Triggers ledger cleanup on reads;
    /// on a failed mutation `detail` is the server's reason, if it gave one.
    #[error("Resource not found: {resource}{}", detail_suffix(.detail))]
    NotFound { resource: String, detail: Option<String> },

    /// Network or server failure on a read that may be retried.
    #[error("Transient failure: {0}")]
    Transient(String),

    /// The server refused the request. `detail` carries the server-provided reason, if any.
    #[error("Request rejected by server (status {status}){}", detail_suffix(.detail))]
    Rejected { status: u16, detail: Option<String> },

    #[error("Action '{action}' failed: {message}")]
    ActionFailed { action: String, message: String },

    #[error("Payment for order {order_id} not confirmed after {attempts} attempts")]
    ExhaustedPoll { order_id: String, attempts: u32 },

    #[error("Another action is already in flight for connection {busy_with}")]
    Busy { busy_with: String },

    #[error("Illegal transition '{action}' from status '{from}'")]
    IllegalTransition { action: String, from: String },

    #[error("Storage unavailable: {0}")]
    Storage(String),

    #[error("Malformed payload: {0}")]
    Decode(String),

    #[error("Internal mise error: {0}")]
    Internal(String),

    #[error("Error in collaborator or external operation. Source: {source}")]
    External {
        #[source]
        source: AnyhowError,
    },
}

impl MiseError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        MiseError::NotFound {
            resource: resource.into(),
            detail: None,
        }
    }

    pub fn not_found_with_detail(resource: impl Into<String>, detail: Option<String>) -> Self {
        MiseError::NotFound {
            resource: resource.into(),
            detail,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, MiseError::NotFound { .. })
    }

    /// Server-provided reason suitable for showing to the user verbatim.
    pub fn server_detail(&self) -> Option<&str> {
        match self {
            MiseError::Rejected { detail, .. } | MiseError::NotFound { detail, .. } => {
                detail.as_deref().filter(|d| !d.trim().is_empty())
            }
            MiseError::ActionFailed { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

impl From<AnyhowError> for MiseError {
    fn from(err: AnyhowError) -> Self {
        // Unwrap a MiseError that went through anyhow instead of nesting it.
        match err.downcast::<MiseError>() {
            Ok(inner) => inner,
            Err(err) => MiseError::External { source: err },
        }
    }
}

impl From<serde_json::Error> for MiseError {
    fn from(err: serde_json::Error) -> Self {
        MiseError::Decode(err.to_string())
    }
}

pub type MiseResult<T, E = MiseError> = std::result::Result<T, E>;
