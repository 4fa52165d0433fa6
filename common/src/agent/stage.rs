use crate::agent::parser::{extract_json, require_str};
use crate::agent::prompt::{
    build_response_task_prompt, build_sql_task_prompt, sql_system_prompt, RESPONSE_SYSTEM_PROMPT,
};
use crate::db::QueryResultSet;
use crate::error::Result;
use crate::llm::{ChatModel, ChatRequest, ConversationHistory};
use serde_json::Value;
use std::sync::Arc;

/// low temperature: sql correctness over phrasing
pub const SQL_TEMPERATURE: f32 = 0.3;

/// higher temperature: natural answers over determinism
pub const RESPONSE_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlGenerationResult {
    pub sql_query: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseResult {
    pub message: String,
}

/// one model-invocation step with its own system instruction, sampling
/// temperature and private conversation history
pub struct ChatStage {
    name: &'static str,
    model: Arc<dyn ChatModel>,
    model_name: String,
    system: String,
    temperature: f32,
    history: ConversationHistory,
}

impl ChatStage {
    pub fn new(
        name: &'static str,
        model: Arc<dyn ChatModel>,
        model_name: impl Into<String>,
        system: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            name,
            model,
            model_name: model_name.into(),
            system: system.into(),
            temperature,
            history: ConversationHistory::new(),
        }
    }

    /// query generation stage seeded with the schema description
    pub fn sql(model: Arc<dyn ChatModel>, model_name: impl Into<String>) -> Self {
        Self::new("sql", model, model_name, sql_system_prompt(), SQL_TEMPERATURE)
    }

    /// response generation stage seeded with the answer-formatting instruction
    pub fn response(model: Arc<dyn ChatModel>, model_name: impl Into<String>) -> Self {
        Self::new(
            "response",
            model,
            model_name,
            RESPONSE_SYSTEM_PROMPT,
            RESPONSE_TEMPERATURE,
        )
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut ConversationHistory {
        &mut self.history
    }

    /// send `prompt` with the accumulated history; the exchange is recorded
    /// once the provider answers, whatever the caller later makes of the reply
    pub async fn send(&mut self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model_name,
            system: &self.system,
            temperature: self.temperature,
            history: self.history.messages(),
            prompt,
        };

        let reply = self.model.generate(&request).await?;
        tracing::debug!(
            stage = self.name,
            provider = self.model.name(),
            "model output:\n{}",
            reply
        );

        self.history.push_turn(prompt, reply.clone());
        Ok(reply)
    }
}

#[tracing::instrument(skip(stage), fields(llm.stage = stage.name()))]
pub async fn generate_sql(stage: &mut ChatStage, question: &str) -> Result<SqlGenerationResult> {
    let raw = stage.send(&build_sql_task_prompt(question)).await?;
    let value = extract_json(&raw)?;

    let sql_query = require_str(&value, "sqlQuery")?.to_string();
    let description = value
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    tracing::info!(description = %description, "extracted sql query: {}", sql_query);
    Ok(SqlGenerationResult {
        sql_query,
        description,
    })
}

#[tracing::instrument(skip(stage, results), fields(llm.stage = stage.name(), rows = results.len()))]
pub async fn generate_response(
    stage: &mut ChatStage,
    results: &QueryResultSet,
) -> Result<ResponseResult> {
    let rows_json = results.rows_json()?;
    let raw = stage.send(&build_response_task_prompt(&rows_json)).await?;
    let value = extract_json(&raw)?;

    let message = require_str(&value, "message")?.to_string();
    Ok(ResponseResult { message })
}
