//! Error types and handling for `stylecast`

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for the `stylecast` library
#[derive(Error, Debug)]
pub enum StyleError {
    /// Configuration is incomplete or invalid, e.g. a missing credential
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The forecast source could not be reached (timeout, connection failure)
    #[error("Forecast source unavailable: {message}")]
    SourceUnavailable { message: String },

    /// The forecast source answered but refused the request
    #[error("Forecast source rejected the request: {message}")]
    SourceRejected { message: String },

    /// The source is reachable but holds nothing for the requested date
    #[error("No forecast available yet for {date}: {message}")]
    NoForecast { date: NaiveDate, message: String },

    /// Chat completion failed
    #[error("Generation error: {message}")]
    Generation { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Stable tag for each error condition, so callers never match on text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    SourceUnavailable,
    SourceRejected,
    DataGap,
    Generation,
    InvalidInput,
    Io,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::SourceUnavailable => "source-unavailable",
            ErrorKind::SourceRejected => "source-rejected",
            ErrorKind::DataGap => "data-gap",
            ErrorKind::Generation => "generation",
            ErrorKind::InvalidInput => "invalid-input",
            ErrorKind::Io => "io",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StyleError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new source-unavailable error
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::SourceUnavailable {
            message: message.into(),
        }
    }

    /// Create a new source-rejected error
    pub fn rejected<S: Into<String>>(message: S) -> Self {
        Self::SourceRejected {
            message: message.into(),
        }
    }

    /// Create a new data-gap error for `date`
    pub fn no_forecast<S: Into<String>>(date: NaiveDate, message: S) -> Self {
        Self::NoForecast {
            date,
            message: message.into(),
        }
    }

    /// Create a new generation error
    pub fn generation<S: Into<String>>(message: S) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            StyleError::Config { .. } => ErrorKind::Configuration,
            StyleError::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            StyleError::SourceRejected { .. } => ErrorKind::SourceRejected,
            StyleError::NoForecast { .. } => ErrorKind::DataGap,
            StyleError::Generation { .. } => ErrorKind::Generation,
            StyleError::Validation { .. } => ErrorKind::InvalidInput,
            StyleError::Io { .. } => ErrorKind::Io,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            StyleError::Config { message } => {
                format!("Configuration incomplete: {message}")
            }
            StyleError::SourceUnavailable { .. } => {
                "Weather service is unavailable right now. Please try again later.".to_string()
            }
            StyleError::SourceRejected { message } => {
                format!("Weather service rejected the request: {message}")
            }
            StyleError::NoForecast { date, .. } => {
                format!(
                    "No forecast has been published for {date} yet. Forecasts are updated a few times a day; try a nearer date or check back later."
                )
            }
            StyleError::Generation { .. } => {
                "Something went wrong while generating the recommendation. Please try again."
                    .to_string()
            }
            StyleError::Validation { message } => format!("Invalid input: {message}"),
            StyleError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for StyleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            StyleError::unavailable(err.to_string())
        } else if err.is_decode() {
            StyleError::rejected(format!("unreadable response: {err}"))
        } else {
            StyleError::unavailable(err.to_string())
        }
    }
}
