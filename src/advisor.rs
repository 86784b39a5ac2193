//! One conversational turn: forecast, prompt, streamed advice
//!
//! Each turn runs sequentially. Credentials are checked and the forecast is
//! fetched and condensed before the user message is recorded and the chat
//! model is asked. A weather failure never reaches the model and leaves the
//! history untouched, so the message can be sent again as is.

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::chat::{ChatClient, OpenAiClient};
use crate::config::StyleConfig;
use crate::error::ErrorKind;
use crate::forecast::{self, ForecastSource};
use crate::models::ForecastSummary;
use crate::session::SessionContext;
use crate::{StyleError, prompt};

/// Successful turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub summary: ForecastSummary,
    pub answer: String,
}

/// Failed turn, tagged by the stage that failed
#[derive(Error, Debug)]
pub enum TurnError {
    #[error("{0}")]
    Configuration(#[source] StyleError),

    #[error("{0}")]
    Input(#[source] StyleError),

    #[error("{0}")]
    Weather(#[source] StyleError),

    #[error("{0}")]
    Generation(#[source] StyleError),
}

impl TurnError {
    fn inner(&self) -> &StyleError {
        match self {
            TurnError::Configuration(e)
            | TurnError::Input(e)
            | TurnError::Weather(e)
            | TurnError::Generation(e) => e,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.inner().kind()
    }

    #[must_use]
    pub fn user_message(&self) -> String {
        self.inner().user_message()
    }
}

pub struct Advisor {
    config: StyleConfig,
    source: Box<dyn ForecastSource>,
    chat: Box<dyn ChatClient>,
}

impl Advisor {
    #[must_use]
    pub fn new(
        config: StyleConfig,
        source: Box<dyn ForecastSource>,
        chat: Box<dyn ChatClient>,
    ) -> Self {
        Self {
            config,
            source,
            chat,
        }
    }

    /// Build the configured forecast source and chat client
    pub fn from_config(config: StyleConfig) -> crate::Result<Self> {
        let source = forecast::from_config(&config)?;
        let chat = Box::new(OpenAiClient::new(&config)?);
        Ok(Self::new(config, source, chat))
    }

    #[must_use]
    pub fn config(&self) -> &StyleConfig {
        &self.config
    }

    /// Answer `message` for `session`, streaming the advice into `sink`.
    ///
    /// On success the answer is appended to the session history. On a
    /// generation failure the user message stays in history and nothing
    /// else is added.
    #[instrument(skip_all, fields(source = self.source.name()))]
    pub async fn handle_turn(
        &self,
        session: &mut SessionContext,
        message: &str,
        now: NaiveDateTime,
        sink: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<TurnReply, TurnError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(TurnError::Input(StyleError::validation(
                "Message cannot be empty",
            )));
        }

        self.config
            .forecast_credential()
            .and_then(|_| self.config.chat_credential())
            .map_err(TurnError::Configuration)?;

        let summary = forecast::summarize(
            self.source.as_ref(),
            session.location(),
            session.target_date(),
            now,
            &self.config.normalizer,
        )
        .await
        .map_err(|e| {
            warn!(kind = %e.kind(), "Forecast failed: {}", e);
            TurnError::Weather(e)
        })?;
        info!(
            "Forecast for {} on {}: {}, {}",
            summary.location,
            summary.date,
            summary.temperature.format(),
            summary.sky
        );
        session.push_user(message);

        let request = prompt::build_request(&summary, &session.profile, message);
        let answer = self
            .chat
            .stream_completion(&request, sink)
            .await
            .map_err(|e| {
                warn!("Chat completion failed: {}", e);
                TurnError::Generation(e)
            })?;

        session.push_assistant(answer.clone());
        Ok(TurnReply { summary, answer })
    }
}
