use common::agent::Answer;
use common::db::QueryResultSet;
use serde_json::Value;

const MAX_COLUMN_WIDTH: usize = 40;

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.replace('\n', " "),
        other => other.to_string(),
    }
}

fn truncate_value(value: &str, max_width: usize) -> String {
    if value.chars().count() <= max_width {
        return value.to_string();
    }
    let kept: String = value.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", kept)
}

fn pad(value: &str, width: usize) -> String {
    let len = value.chars().count();
    format!("{}{}", value, " ".repeat(width.saturating_sub(len)))
}

fn border(widths: &[usize], left: char, mid: char, right: char) -> String {
    let mut line = String::new();
    line.push(left);
    for (idx, width) in widths.iter().enumerate() {
        line.push_str(&"─".repeat(width + 2));
        line.push(if idx == widths.len() - 1 { right } else { mid });
    }
    line
}

fn row_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::from("│");
    for (cell, width) in cells.iter().zip(widths) {
        line.push(' ');
        line.push_str(&pad(&truncate_value(cell, *width), *width));
        line.push_str(" │");
    }
    line
}

/// box-drawn table of a result set with a row count footer
pub fn render(result: &QueryResultSet) -> String {
    let row_word = if result.len() == 1 { "row" } else { "rows" };
    let footer = format!("({} {})", result.len(), row_word);

    if result.columns.is_empty() {
        return footer;
    }

    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    let widths: Vec<usize> = result
        .columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let data = rows
                .iter()
                .filter_map(|r| r.get(idx))
                .map(|c| c.chars().count())
                .max()
                .unwrap_or(0);
            data.max(name.chars().count()).min(MAX_COLUMN_WIDTH)
        })
        .collect();

    let mut lines = vec![
        border(&widths, '┌', '┬', '┐'),
        row_line(&result.columns, &widths),
        border(&widths, '├', '┼', '┤'),
    ];
    for row in &rows {
        lines.push(row_line(row, &widths));
    }
    lines.push(border(&widths, '└', '┴', '┘'));
    lines.push(footer);

    lines.join("\n")
}

/// answer text, then the table behind it when the question succeeded
pub fn format_answer(answer: &Answer) -> String {
    match &answer.rows {
        Some(rows) => format!("{}\n\n{}", answer.message, render(rows)),
        None => answer.message.clone(),
    }
}

pub fn print_answer(answer: &Answer) {
    println!("{}", format_answer(answer));
}
