//! `stylecast` - weather-aware outfit advice
//!
//! This library fetches a short-range forecast, condenses it into a daily
//! summary, and asks a chat model for outfit recommendations tailored to a
//! user's styling profile.

pub mod advisor;
pub mod chat;
pub mod config;
pub mod error;
pub mod forecast;
pub mod logging;
pub mod models;
pub mod normalizer;
pub mod prompt;
pub mod regions;
pub mod session;

// Re-export core types for public API
pub use advisor::{Advisor, TurnError, TurnReply};
pub use chat::{ChatClient, ChatMessage, ChatRequest, OpenAiClient, Role};
pub use config::StyleConfig;
pub use error::{ErrorKind, StyleError};
pub use forecast::{ForecastSource, KmaSource, LocationQuery, OpenWeatherMapSource};
pub use models::{ForecastRecord, ForecastSummary, LocationCoordinate, Observation, Temperature};
pub use session::{SessionContext, UserProfile};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, StyleError>;
