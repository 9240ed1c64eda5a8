use std::fmt;

/// Result type for gridmind operations
pub type Result<T> = std::result::Result<T, GridmindError>;

/// Main error type for the gridmind library
#[derive(Debug, Clone)]
pub enum GridmindError {
    /// Invalid parameter name or value
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// IO errors (file operations)
    IoError(String),

    /// Serialization/deserialization errors
    SerializationError(String),

    /// Invalid action index
    InvalidAction {
        action: usize,
        max_actions: usize,
    },

    /// The trainer worker is gone
    Disconnected(String),
}

impl fmt::Display for GridmindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridmindError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            GridmindError::IoError(msg) => write!(f, "IO error: {}", msg),
            GridmindError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            GridmindError::InvalidAction { action, max_actions } => {
                write!(f, "Invalid action {}: must be less than {}", action, max_actions)
            }
            GridmindError::Disconnected(msg) => write!(f, "Trainer disconnected: {}", msg),
        }
    }
}

impl std::error::Error for GridmindError {}

// Conversion from std::io::Error
impl From<std::io::Error> for GridmindError {
    fn from(err: std::io::Error) -> Self {
        GridmindError::IoError(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for GridmindError {
    fn from(err: serde_json::Error) -> Self {
        GridmindError::SerializationError(err.to_string())
    }
}

impl GridmindError {
    pub fn invalid_parameter<S: Into<String>, R: Into<String>>(name: S, reason: R) -> Self {
        GridmindError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
