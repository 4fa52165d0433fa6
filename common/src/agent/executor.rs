use crate::agent::stage::{generate_response, generate_sql, ChatStage};
use crate::db::{Database, QueryResultSet};
use crate::error::{AskDbError, Result};
use crate::llm::Checkpoint;
use std::time::{Duration, Instant};

/// hard ceiling on full pipeline runs per question
pub const MAX_ATTEMPTS: usize = 4;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// full pipeline runs per question, capped at `MAX_ATTEMPTS`
    pub max_attempts: usize,
    /// pause between a failed attempt and the next one
    pub retry_delay: Duration,
    /// truncate both histories back to where a failed attempt started
    pub rollback_failed_turns: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            rollback_failed_turns: false,
        }
    }
}

/// what the interface shows for one question
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub message: String,
    pub rows: Option<QueryResultSet>,
}

impl Answer {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            rows: None,
        }
    }
}

/// owns the database handle and both chat stages for the life of a
/// conversation. `ask` takes `&mut self`, so one question runs at a time.
pub struct Session {
    db: Database,
    sql_stage: ChatStage,
    response_stage: ChatStage,
    policy: RetryPolicy,
}

impl Session {
    pub fn new(
        db: Database,
        sql_stage: ChatStage,
        response_stage: ChatStage,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            db,
            sql_stage,
            response_stage,
            policy,
        }
    }

    pub fn sql_stage(&self) -> &ChatStage {
        &self.sql_stage
    }

    pub fn response_stage(&self) -> &ChatStage {
        &self.response_stage
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// answer `question` in plain language alongside the rows behind it.
    ///
    /// every failure (model output, sql, provider) aborts the current attempt
    /// and the whole pipeline restarts; after the last attempt the error is
    /// folded into the returned message. nothing is raised past this point.
    #[tracing::instrument(skip(self), fields(max_attempts = self.policy.max_attempts))]
    pub async fn ask(&mut self, question: &str) -> Answer {
        let question = question.trim();
        if question.is_empty() {
            return Answer::failure("Please enter a question about the employee database.");
        }

        let max_attempts = self.policy.max_attempts.clamp(1, MAX_ATTEMPTS);
        let start = Instant::now();
        let mut last_error: Option<AskDbError> = None;

        tracing::info!("processing question: {}", question);

        for attempt in 1..=max_attempts {
            let checkpoints = (
                self.sql_stage.history().checkpoint(),
                self.response_stage.history().checkpoint(),
            );

            match self.run_attempt(question).await {
                Ok((message, rows)) => {
                    tracing::info!(
                        attempt,
                        rows = rows.len(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "question answered"
                    );
                    return Answer {
                        message,
                        rows: Some(rows),
                    };
                }
                Err(e) => {
                    tracing::warn!("attempt {}/{} failed: {}", attempt, max_attempts, e);

                    if self.policy.rollback_failed_turns {
                        self.rollback(checkpoints);
                    }
                    last_error = Some(e);

                    if attempt < max_attempts {
                        tracing::info!("retrying in {:?}", self.policy.retry_delay);
                        tokio::time::sleep(self.policy.retry_delay).await;
                    }
                }
            }
        }

        tracing::error!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "all {} attempts failed",
            max_attempts
        );

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt was made".to_string());
        Answer::failure(format!("Sorry, I encountered an error: {}", reason))
    }

    /// one end-to-end pass: generate sql, run it, phrase the result
    async fn run_attempt(&mut self, question: &str) -> Result<(String, QueryResultSet)> {
        let generated = generate_sql(&mut self.sql_stage, question).await?;

        let rows = self.db.execute(&generated.sql_query)?;
        tracing::debug!("query results: {}", rows.rows_json()?);

        let response = generate_response(&mut self.response_stage, &rows).await?;
        Ok((response.message, rows))
    }

    fn rollback(&mut self, (sql, response): (Checkpoint, Checkpoint)) {
        self.sql_stage.history_mut().rollback(sql);
        self.response_stage.history_mut().rollback(response);
        tracing::debug!("rolled back failed turns");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::testing::ScriptedModel;
    use serde_json::json;
    use std::sync::Arc;

    const COUNT_SQL: &str =
        r#"{"sqlQuery": "SELECT COUNT(*) FROM employees;", "description": "Counts all employees"}"#;
    const COUNT_MESSAGE: &str = r#"{"message": "There are 3 employees in the company."}"#;

    fn seeded_db() -> Database {
        let db = Database::in_memory().unwrap();
        db.connection()
            .execute_batch(
                "INSERT INTO employees VALUES (10001, '1953-09-02', 'Georgi', 'Facello', 'M', '1986-06-26');
                 INSERT INTO employees VALUES (10002, '1964-06-02', 'Bezalel', 'Simmel', 'F', '1985-11-21');
                 INSERT INTO employees VALUES (10003, '1959-12-03', 'Parto', 'Bamford', 'M', '1986-08-28');",
            )
            .unwrap();
        db
    }

    fn policy(rollback_failed_turns: bool) -> RetryPolicy {
        RetryPolicy {
            max_attempts: MAX_ATTEMPTS,
            retry_delay: Duration::ZERO,
            rollback_failed_turns,
        }
    }

    fn session(
        sql: &Arc<ScriptedModel>,
        response: &Arc<ScriptedModel>,
        policy: RetryPolicy,
    ) -> Session {
        Session::new(
            seeded_db(),
            ChatStage::sql(sql.clone(), "gemini-1.5-pro"),
            ChatStage::response(response.clone(), "gemini-1.5-flash"),
            policy,
        )
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.retry_delay, Duration::from_secs(1));
        assert!(!policy.rollback_failed_turns);
    }

    #[tokio::test]
    async fn test_count_employees_scenario() {
        let sql = Arc::new(ScriptedModel::new().reply(COUNT_SQL));
        let response = Arc::new(ScriptedModel::new().reply(COUNT_MESSAGE));
        let mut session = session(&sql, &response, policy(false));

        let answer = session.ask("How many employees are in the company").await;

        assert_eq!(answer.message, "There are 3 employees in the company.");
        let rows = answer.rows.unwrap();
        assert_eq!(rows.rows, vec![vec![json!(3)]]);
        assert_eq!(sql.call_count(), 1);
        assert_eq!(response.call_count(), 1);
        assert!(response.calls()[0].prompt.contains("[[3]]"));
    }

    #[tokio::test]
    async fn test_invalid_sql_retries_and_keeps_failed_turn() {
        let sql = Arc::new(
            ScriptedModel::new()
                .reply(r#"{"sqlQuery": "SELEC COUNT(*) FROM employees", "description": "typo"}"#)
                .reply(COUNT_SQL),
        );
        let response = Arc::new(ScriptedModel::new().reply(COUNT_MESSAGE));
        let mut session = session(&sql, &response, policy(false));

        let answer = session.ask("How many employees are in the company").await;

        assert_eq!(answer.message, "There are 3 employees in the company.");
        assert!(answer.rows.is_some());
        assert_eq!(sql.call_count(), 2);
        // the failed turn is replayed to the model on the retry
        assert_eq!(sql.calls()[1].history_len, 2);
        assert_eq!(session.sql_stage().history().turn_count(), 2);
        assert_eq!(response.call_count(), 1);
    }

    #[tokio::test]
    async fn test_rollback_drops_failed_turns() {
        let sql = Arc::new(
            ScriptedModel::new()
                .reply(r#"{"sqlQuery": "SELECT nope FROM employees"}"#)
                .reply(COUNT_SQL),
        );
        let response = Arc::new(ScriptedModel::new().reply(COUNT_MESSAGE));
        let mut session = session(&sql, &response, policy(true));

        let answer = session.ask("How many employees are in the company").await;

        assert!(answer.rows.is_some());
        assert_eq!(sql.calls()[1].history_len, 0);
        assert_eq!(session.sql_stage().history().turn_count(), 1);
        assert_eq!(session.response_stage().history().turn_count(), 1);
    }

    #[tokio::test]
    async fn test_response_failure_regenerates_sql() {
        let sql = Arc::new(ScriptedModel::new().reply(COUNT_SQL).reply(COUNT_SQL));
        let response = Arc::new(
            ScriptedModel::new()
                .reply("I think there are three.")
                .reply(COUNT_MESSAGE),
        );
        let mut session = session(&sql, &response, policy(false));

        let answer = session.ask("How many employees are in the company").await;

        assert_eq!(answer.message, "There are 3 employees in the company.");
        assert_eq!(sql.call_count(), 2);
        assert_eq!(response.call_count(), 2);
        assert_eq!(session.response_stage().history().turn_count(), 2);
    }

    #[tokio::test]
    async fn test_all_attempts_fail() {
        let sql = Arc::new(
            ScriptedModel::new()
                .fail("rate limited")
                .reply("no json here")
                .reply(r#"{"description": "forgot the query"}"#)
                .reply(r#"{"sqlQuery": "SELECT * FROM staff"}"#)
                .reply(COUNT_SQL),
        );
        let response = Arc::new(ScriptedModel::new().reply(COUNT_MESSAGE));
        let mut session = session(&sql, &response, policy(false));

        let answer = session.ask("Who is the highest paid employee?").await;

        assert!(answer.rows.is_none());
        assert!(answer.message.starts_with("Sorry, I encountered an error: "));
        assert!(answer.message.contains("no such table: staff"));
        assert_eq!(sql.call_count(), MAX_ATTEMPTS);
        assert_eq!(response.call_count(), 0);
    }

    #[tokio::test]
    async fn test_attempt_bound_is_respected() {
        let sql = Arc::new(ScriptedModel::new());
        let response = Arc::new(ScriptedModel::new());
        let mut session = session(
            &sql,
            &response,
            RetryPolicy {
                max_attempts: 2,
                ..policy(false)
            },
        );

        let answer = session.ask("En yaşlı kişi kim?").await;

        assert!(answer.rows.is_none());
        assert!(answer.message.contains("script exhausted"));
        assert_eq!(sql.call_count(), 2);
    }

    #[tokio::test]
    async fn test_attempts_never_exceed_ceiling() {
        let sql = Arc::new(ScriptedModel::new());
        let response = Arc::new(ScriptedModel::new());
        let mut session = session(
            &sql,
            &response,
            RetryPolicy {
                max_attempts: 10,
                ..policy(false)
            },
        );

        let answer = session.ask("Şirkette kaç çalışan var?").await;

        assert!(answer.rows.is_none());
        assert_eq!(sql.call_count(), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_empty_question_skips_models() {
        let sql = Arc::new(ScriptedModel::new().reply(COUNT_SQL));
        let response = Arc::new(ScriptedModel::new().reply(COUNT_MESSAGE));
        let mut session = session(&sql, &response, policy(false));

        let answer = session.ask("   ").await;

        assert!(answer.rows.is_none());
        assert!(!answer.message.is_empty());
        assert_eq!(sql.call_count(), 0);
        assert_eq!(response.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_result_set_is_success() {
        let sql = Arc::new(ScriptedModel::new().reply(
            r#"{"sqlQuery": "SELECT first_name FROM employees WHERE hire_date < '1980-01-01'"}"#,
        ));
        let response = Arc::new(
            ScriptedModel::new().reply(r#"{"message": "Nobody joined before 1980."}"#),
        );
        let mut session = session(&sql, &response, policy(false));

        let answer = session.ask("Who joined before 1980?").await;

        let rows = answer.rows.unwrap();
        assert!(rows.is_empty());
        assert!(response.calls()[0].prompt.contains("results: []"));
    }
}
