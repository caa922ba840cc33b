//! Domain error types.

/// Top-level error type for trademo.
#[derive(Debug, thiserror::Error)]
pub enum DashError {
    #[error("backend returned {status}: {detail}")]
    Backend { status: u16, detail: String },

    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("{reason}")]
    InvalidInput { reason: String },

    #[error("export failed: {reason}")]
    Export { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DashError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// The message shown to a user in the dashboard.
    ///
    /// Backend failures show only the detail the backend sent, the way a
    /// browser client would surface `detail` from a FastAPI error body.
    pub fn user_message(&self) -> String {
        match self {
            DashError::Backend { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

impl From<csv::Error> for DashError {
    fn from(err: csv::Error) -> Self {
        DashError::Export {
            reason: err.to_string(),
        }
    }
}

impl From<&DashError> for std::process::ExitCode {
    fn from(err: &DashError) -> Self {
        let code: u8 = match err {
            DashError::Io(_) => 1,
            DashError::ConfigParse { .. }
            | DashError::ConfigMissing { .. }
            | DashError::ConfigInvalid { .. } => 2,
            DashError::Backend { .. } | DashError::Transport { .. } | DashError::Decode { .. } => 3,
            DashError::InvalidInput { .. } => 4,
            DashError::Export { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_shows_detail_to_user() {
        let err = DashError::Backend {
            status: 404,
            detail: "Strategy not found".into(),
        };
        assert_eq!(err.user_message(), "Strategy not found");
        assert_eq!(err.to_string(), "backend returned 404: Strategy not found");
    }

    #[test]
    fn invalid_input_message_is_bare_reason() {
        let err = DashError::invalid_input("Fill all fields properly");
        assert_eq!(err.user_message(), "Fill all fields properly");
    }

    #[test]
    fn config_missing_formats_section_and_key() {
        let err = DashError::ConfigMissing {
            section: "backend".into(),
            key: "base_url".into(),
        };
        assert_eq!(err.to_string(), "missing config key [backend] base_url");
    }
}
