use serde::{Deserialize, Serialize};

/// Every failure the widget can surface to the user.
///
/// All variants are recoverable: the controller turns them into a notice and
/// keeps running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WidgetError {
    /// Bad file type/size, missing recipient, nothing selected.
    Validation { message: String },
    /// The request never produced a response (connect failure, timeout).
    Network { message: String },
    /// Non-2xx status or a body missing the expected field.
    Server { message: String },
    Internal { message: String },
}

impl WidgetError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Validation { message }
            | Self::Network { message }
            | Self::Server { message }
            | Self::Internal { message } => message,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

impl From<reqwest::Error> for WidgetError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() || err.is_status() {
            return Self::server(err.to_string());
        }
        Self::network(err.to_string())
    }
}

impl std::fmt::Display for WidgetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation { message } => write!(f, "Validation: {}", message),
            Self::Network { message } => write!(f, "Network: {}", message),
            Self::Server { message } => write!(f, "Server: {}", message),
            Self::Internal { message } => write!(f, "Internal: {}", message),
        }
    }
}

impl std::error::Error for WidgetError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_as_tagged_object() {
        let err = WidgetError::validation("File size must be less than 5MB");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["type"], "validation");
        assert_eq!(value["message"], "File size must be less than 5MB");
    }

    #[test]
    fn test_display_prefixes_kind() {
        assert_eq!(
            WidgetError::server("boom").to_string(),
            "Server: boom".to_string()
        );
        assert_eq!(WidgetError::network("down").message(), "down");
    }
}
