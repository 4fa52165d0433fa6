use crate::schema::schema_description;

pub const SQL_RESPONSE_FORMAT: &str = r#"{
    "sqlQuery": "YOUR_SQL_QUERY_HERE",
    "description": "BRIEF_DESCRIPTION_OF_QUERY"
}"#;

pub const MESSAGE_RESPONSE_FORMAT: &str = r#"{
    "message": "YOUR_RESPONSE_HERE"
}"#;

pub const RESPONSE_SYSTEM_PROMPT: &str = concat!(
    "You are a helpful assistant that generates natural language responses based on database query results.\n",
    "Take the query results and create a clear, concise, and informative response.\n",
    "Answer in the language the user asked the question in.\n",
    "Return the response in this exact format:\n",
    r#"{
    "message": "YOUR_RESPONSE_HERE"
}"#,
);

/// system instruction for the sql stage: the full schema followed by the
/// response contract
pub fn sql_system_prompt() -> String {
    format!(
        "{}\n\
         The database engine is SQLite; use SQLite syntax and write exactly one statement.\n\
         Generate only a SQL query based on the question. Return the response in this exact format:\n{}",
        schema_description(),
        SQL_RESPONSE_FORMAT
    )
}

pub fn build_sql_task_prompt(question: &str) -> String {
    format!(
        "Generate a SQL query for this question: {}\n\
         Respond only with a JSON object in the specified format.",
        question
    )
}

pub fn build_response_task_prompt(results_json: &str) -> String {
    format!(
        "The database query returned these results: {}\n\
         Create a natural language response in the specified JSON format.",
        results_json
    )
}
