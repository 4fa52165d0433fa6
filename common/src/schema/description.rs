use super::tables::{Column, Table, TABLES};
use std::fmt::Write;

fn describe_column(column: &Column) -> String {
    let mut line = format!("{}: type {}", column.name, column.sql_type);
    if column.primary_key {
        line.push_str(", primary key");
    }
    if let Some(fk) = column.references {
        let _ = write!(
            line,
            ", foreign key referencing {}({})",
            fk.table, fk.column
        );
    }
    if column.nullable {
        line.push_str(", nullable");
    }
    line
}

fn describe_table(table: &Table) -> String {
    let mut text = format!("Table: {}\nColumns:\n", table.name);
    for column in table.columns {
        text.push_str(&describe_column(column));
        text.push('\n');
    }
    text
}

/// plain-text description of every table, handed to the sql model as context
pub fn schema_description() -> String {
    let tables: Vec<String> = TABLES.iter().map(describe_table).collect();

    format!(
        "You are provided with a database schema that contains multiple tables, \
         each with specific columns and properties. Here are the details of the tables:\n\n{}",
        tables.join("\n")
    )
}

fn table_ddl(table: &Table) -> String {
    let mut lines: Vec<String> = table
        .columns
        .iter()
        .map(|c| {
            if c.nullable {
                format!("  {} {}", c.name, c.sql_type)
            } else {
                format!("  {} {} NOT NULL", c.name, c.sql_type)
            }
        })
        .collect();

    let pk = table.primary_key();
    if !pk.is_empty() {
        lines.push(format!("  PRIMARY KEY ({})", pk.join(", ")));
    }

    for column in table.columns {
        if let Some(fk) = column.references {
            lines.push(format!(
                "  FOREIGN KEY ({}) REFERENCES {}({})",
                column.name, fk.table, fk.column
            ));
        }
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
        table.name,
        lines.join(",\n")
    )
}

/// sqlite ddl for the whole inventory, in dependency-safe order
pub fn create_tables_sql() -> String {
    TABLES
        .iter()
        .map(table_ddl)
        .collect::<Vec<_>>()
        .join("\n\n")
}
