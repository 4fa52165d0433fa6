pub mod prompt;
pub mod parser;
pub mod stage;
pub mod executor;

pub use prompt::{build_response_task_prompt, build_sql_task_prompt, sql_system_prompt, RESPONSE_SYSTEM_PROMPT};
pub use parser::{extract_json, require_str};
pub use stage::{generate_response, generate_sql, ChatStage, ResponseResult, SqlGenerationResult};
pub use executor::{Answer, RetryPolicy, Session, MAX_ATTEMPTS};
