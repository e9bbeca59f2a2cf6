use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MailFetchError>;

/// Exit code for argument and configuration failures.
pub const EXIT_USAGE: u8 = 1;
/// Exit code for any failure after the configuration was accepted.
pub const EXIT_RUNTIME: u8 = 2;

#[derive(Error, Debug)]
pub enum MailFetchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Authentication error: {message}")]
    Auth {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Failed to fetch {url}: {message}")]
    PageFetch {
        url: String,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl MailFetchError {
    pub fn page_fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PageFetch {
            url: url.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Category name shown next to the message on the console.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::ConfigFile { .. } | Self::ConfigParse { .. } => {
                "ConfigurationError"
            }
            Self::Auth { .. } => "AuthenticationError",
            Self::PageFetch { .. } => "PageFetchError",
            Self::Write { .. } | Self::Json(_) => "WriterError",
            Self::Logging(_) => "LoggingError",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            "ConfigurationError" => EXIT_USAGE,
            _ => EXIT_RUNTIME,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_use_usage_exit_code() {
        let err = MailFetchError::Config("missing --username".into());
        assert_eq!(err.kind(), "ConfigurationError");
        assert_eq!(err.exit_code(), EXIT_USAGE);
    }

    #[test]
    fn runtime_errors_use_runtime_exit_code() {
        let fetch = MailFetchError::page_fetch("https://example.test/next", "HTTP 500");
        assert_eq!(fetch.kind(), "PageFetchError");
        assert_eq!(fetch.exit_code(), EXIT_RUNTIME);

        let write = MailFetchError::write(
            "/tmp/out.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(write.kind(), "WriterError");
        assert_eq!(write.exit_code(), EXIT_RUNTIME);
        assert!(write.to_string().contains("/tmp/out.json"));
    }
}
