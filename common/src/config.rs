use crate::agent::{ChatStage, RetryPolicy, Session, MAX_ATTEMPTS};
use crate::db::Database;
use crate::error::{AskDbError, Result};
use crate::llm::{ChatModel, GeminiClient};
use std::path::PathBuf;
use std::sync::Arc;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_DATABASE: &str = "database.db";
pub const DEFAULT_SQL_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_RESPONSE_MODEL: &str = "gemini-1.5-flash";

/// everything needed to start a session, with defaults applied
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub database: PathBuf,
    pub sql_model: String,
    pub response_model: String,
    pub retry: RetryPolicy,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl Settings {
    /// validate raw inputs; a missing api key fails here, before any client
    /// or session exists
    pub fn resolve(
        api_key: Option<String>,
        database: Option<PathBuf>,
        sql_model: Option<String>,
        response_model: Option<String>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let api_key = non_blank(api_key).ok_or_else(|| {
            AskDbError::Config(format!(
                "{} is not set; add it to the environment or a .env file",
                API_KEY_ENV
            ))
        })?;

        if !(1..=MAX_ATTEMPTS).contains(&retry.max_attempts) {
            return Err(AskDbError::Config(format!(
                "max attempts must be between 1 and {}, got {}",
                MAX_ATTEMPTS, retry.max_attempts
            )));
        }

        Ok(Self {
            api_key,
            database: database.unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE)),
            sql_model: non_blank(sql_model).unwrap_or_else(|| DEFAULT_SQL_MODEL.to_string()),
            response_model: non_blank(response_model)
                .unwrap_or_else(|| DEFAULT_RESPONSE_MODEL.to_string()),
            retry,
        })
    }

    pub fn gemini_client(&self) -> Result<GeminiClient> {
        GeminiClient::new(self.api_key.clone())
    }

    /// open the database and build both stages on top of `model`
    pub fn open_session(&self, model: Arc<dyn ChatModel>) -> Result<Session> {
        let db = Database::open(&self.database)?;

        tracing::info!(
            sql_model = %self.sql_model,
            response_model = %self.response_model,
            max_attempts = self.retry.max_attempts,
            "session ready"
        );

        Ok(Session::new(
            db,
            ChatStage::sql(Arc::clone(&model), self.sql_model.clone()),
            ChatStage::response(model, self.response_model.clone()),
            self.retry.clone(),
        ))
    }
}
