// mise_orders/src/errors.rs

use mise::MiseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("HTTP Client Error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Orders Engine Error: {source}")]
  Engine {
    #[from] // Allows conversion from mise::MiseError
    source: MiseError,
  },

  #[error("Background task failed: {0}")]
  Task(#[from] tokio::task::JoinError),

  #[error("Internal Error: {0}")]
  Internal(String),
}

// Allow anyhow::Error to be converted into AppError for code that uses `?` on anyhow::Result.
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<AppError>() {
      Ok(app_err) => app_err,
      Err(err) => match err.downcast::<MiseError>() {
        Ok(source) => AppError::Engine { source },
        Err(err) => AppError::Internal(err.to_string()),
      },
    }
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;
