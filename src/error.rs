use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or input location that caused the error (e.g., "series[2].videos", "coverUrl")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected shape, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "source_parser", "regex_editor")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the ingestion pipeline.
///
/// Per-item validation failures are not errors at this level: they travel as
/// data inside [`crate::types::ItemResult::error`].
#[derive(Debug, Error)]
pub enum Error {
    /// Source input is malformed or contains nothing importable.
    #[error("Parse error: {message}{}", format_context(.context))]
    Parse {
        message: String,
        context: ErrorContext,
    },

    /// A user-supplied pattern does not compile under the given flags.
    #[error("Invalid pattern `{pattern}`: {message}")]
    PatternCompile { pattern: String, message: String },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    /// The requested transition is not allowed from the current state.
    #[error("Invalid state: {message}{}", format_context(.context))]
    InvalidState {
        message: String,
        context: ErrorContext,
    },

    /// A preview no longer matches the current edit parameters.
    #[error("Stale preview: {message}")]
    StalePreview { message: String },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    /// The gateway call itself failed (connection, timeout, undecodable body).
    #[error("Network transport error: {message}")]
    Transport { message: String },

    /// The gateway answered with a non-success status.
    #[error("Remote error: HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return Error::Remote {
                status: status.as_u16(),
                message: e.to_string(),
            };
        }
        Error::Transport {
            message: e.to_string(),
        }
    }
}

impl Error {
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    pub fn parse_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Parse {
            message: msg.into(),
            context,
        }
    }

    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState {
            message: msg.into(),
            context: ErrorContext::new().with_source("regex_editor"),
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Error::Transport {
            message: msg.into(),
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Parse { context, .. }
            | Error::Validation { context, .. }
            | Error::InvalidState { context, .. }
            | Error::Configuration { context, .. }
            | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }

    /// The message shown next to each item of a unit that failed as a whole.
    pub fn surface_message(&self) -> String {
        match self {
            Error::Transport { message } => message.clone(),
            Error::Remote { status, message } if message.is_empty() => format!("HTTP {status}"),
            Error::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether the failure is local and must be corrected by hand before retrying.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Error::Parse { .. } | Error::PatternCompile { .. } | Error::Validation { .. }
        )
    }
}
