//! Application error type surfaced at the HTTP boundary.

use crate::codes::{Code, DisplayMessage, Language};
use crate::scheduler::SchedulerError;

/// An error carrying an application [`Code`] and a raw message.
///
/// The raw message is logged and reported in `metadata.error.message`; the
/// localized display text comes from the code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    code: Code,
    message: String,
}

impl AppError {
    #[must_use]
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(Code::BadRequest, message)
    }

    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(Code::Unauthorized, message)
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Code::NotFound, message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Code::InternalServerError, message)
    }

    #[must_use]
    pub fn deadline_exceeded() -> Self {
        Self::new(Code::ContextDeadlineExceeded, "Context Deadline Exceeded")
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Resolve the localized display text for this error.
    #[must_use]
    pub fn display(&self, language: Language) -> DisplayMessage {
        self.code.display(language)
    }
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        let code = match &err {
            SchedulerError::TaskNotFound(_) => Code::NotFound,
            SchedulerError::DuplicateTag(_)
            | SchedulerError::InvalidCadence { .. }
            | SchedulerError::AlreadyStarted
            | SchedulerError::Interrupted { .. } => Code::InternalServerError,
        };
        Self::new(code, err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_not_found_maps_to_not_found() {
        let err: AppError = SchedulerError::TaskNotFound("Nope".to_string()).into();
        assert_eq!(err.code(), Code::NotFound);
        assert!(err.message().contains("Nope"));
    }

    #[test]
    fn test_anyhow_maps_to_internal() {
        let err: AppError = anyhow::anyhow!("disk on fire").into();
        assert_eq!(err.code(), Code::InternalServerError);
        assert_eq!(err.to_string(), "disk on fire");
    }

    #[test]
    fn test_deadline_exceeded() {
        let err = AppError::deadline_exceeded();
        assert_eq!(err.code(), Code::ContextDeadlineExceeded);
        assert_eq!(err.display(Language::English).title, "Request Timeout");
    }
}
