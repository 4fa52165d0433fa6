use anyhow::Result;
use common::agent::Session;
use common::config::Settings;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

pub const TITLE: &str = "Two-Model Employee Database Chatbot";

pub const EXAMPLES: &[&str] = &[
    "How many employees are in the company",
    "Who is the highest paid employee and what is his position?",
    "En yaşlı kişi kim?",
    "Şirkette kaç çalışan var?",
    "Do you know a person joined the company before 1998. Can you give me a name.",
];

const PROMPT: &str = "askdb> ";

#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Question(&'a str),
    ListExamples,
    Example(usize),
    Exit,
    Unknown(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }

    let Some(command) = line.strip_prefix('/') else {
        return Input::Question(line);
    };

    let mut parts = command.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("exit" | "quit"), None) => Input::Exit,
        (Some("examples"), None) => Input::ListExamples,
        (Some("example"), Some(n)) => match n.parse::<usize>() {
            Ok(n) if (1..=EXAMPLES.len()).contains(&n) => Input::Example(n),
            _ => Input::Unknown(line),
        },
        _ => Input::Unknown(line),
    }
}

fn print_examples() {
    println!("Examples:");
    for (idx, example) in EXAMPLES.iter().enumerate() {
        println!("  {}. {}", idx + 1, example);
    }
}

fn print_banner(settings: &Settings) {
    println!("{}", TITLE);
    println!(
        "Ask questions about employee data using natural language. \
         Powered by {} (SQL) and {} (Response).",
        settings.sql_model, settings.response_model
    );
    println!();
    print_examples();
    println!();
    println!("Type /example N to ask an example, /examples to list them, /exit to quit.");
}

async fn answer(session: &mut Session, question: &str) {
    let answer = session.ask(question).await;
    crate::table::print_answer(&answer);
    println!();
}

/// read questions until eof or /exit; every question goes through the same
/// session, so both models see the conversation so far
pub async fn run(session: &mut Session, settings: &Settings) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    print_banner(settings);

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        match parse_input(&line) {
            Input::Empty => {}
            Input::Exit => break,
            Input::ListExamples => print_examples(),
            Input::Example(n) => {
                let question = EXAMPLES[n - 1];
                println!("> {}", question);
                answer(session, question).await;
            }
            Input::Question(question) => {
                editor.add_history_entry(question)?;
                answer(session, question).await;
            }
            Input::Unknown(command) => {
                println!("unknown command: {}", command);
            }
        }
    }

    tracing::debug!(
        sql_turns = session.sql_stage().history().turn_count(),
        response_turns = session.response_stage().history().turn_count(),
        "chat ended"
    );
    Ok(())
}
