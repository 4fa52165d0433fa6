/// foreign key target of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub primary_key: bool,
    pub nullable: bool,
    pub references: Option<ForeignKey>,
}

impl Column {
    const fn new(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            name,
            sql_type,
            primary_key: false,
            nullable: false,
            references: None,
        }
    }

    const fn primary_key(self) -> Self {
        Self {
            primary_key: true,
            ..self
        }
    }

    const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }

    const fn references(self, table: &'static str, column: &'static str) -> Self {
        Self {
            references: Some(ForeignKey { table, column }),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl Table {
    pub fn primary_key(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name)
            .collect()
    }
}

/// the fixed employee database inventory. generated sql is only valid if these
/// names and types match the store exactly.
pub static TABLES: &[Table] = &[
    Table {
        name: "departments",
        columns: &[
            Column::new("dept_no", "char(4)").primary_key(),
            Column::new("dept_name", "varchar(40)"),
        ],
    },
    Table {
        name: "dept_emp",
        columns: &[
            Column::new("emp_no", "INTEGER").primary_key(),
            Column::new("dept_no", "char(4)")
                .primary_key()
                .references("departments", "dept_no"),
            Column::new("from_date", "date"),
            Column::new("to_date", "date"),
        ],
    },
    Table {
        name: "dept_manager",
        columns: &[
            Column::new("dept_no", "char(4)")
                .primary_key()
                .references("departments", "dept_no"),
            Column::new("emp_no", "INTEGER")
                .primary_key()
                .references("employees", "emp_no"),
            Column::new("from_date", "date"),
            Column::new("to_date", "date"),
        ],
    },
    Table {
        name: "employees",
        columns: &[
            Column::new("emp_no", "INTEGER").primary_key(),
            Column::new("birth_date", "date"),
            Column::new("first_name", "varchar(14)"),
            Column::new("last_name", "varchar(16)"),
            Column::new("gender", "TEXT"),
            Column::new("hire_date", "date"),
        ],
    },
    Table {
        name: "salaries",
        columns: &[
            Column::new("emp_no", "INTEGER")
                .primary_key()
                .references("employees", "emp_no"),
            Column::new("salary", "INTEGER"),
            Column::new("from_date", "date").primary_key(),
            Column::new("to_date", "date"),
        ],
    },
    Table {
        name: "titles",
        columns: &[
            Column::new("emp_no", "INTEGER")
                .primary_key()
                .references("employees", "emp_no"),
            Column::new("title", "varchar(50)"),
            Column::new("from_date", "date").primary_key(),
            Column::new("to_date", "date").nullable(),
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn find_table(name: &str) -> Option<&'static Table> {
        TABLES.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    fn column<'a>(table: &'a Table, name: &str) -> Option<&'a Column> {
        table.columns.iter().find(|c| c.name == name)
    }

    #[test]
    fn test_six_fixed_tables() {
        let names: Vec<&str> = TABLES.iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "departments",
                "dept_emp",
                "dept_manager",
                "employees",
                "salaries",
                "titles"
            ]
        );
    }

    #[test]
    fn test_composite_primary_keys() {
        let salaries = find_table("salaries").unwrap();
        assert_eq!(salaries.primary_key(), vec!["emp_no", "from_date"]);

        let dept_emp = find_table("DEPT_EMP").unwrap();
        assert_eq!(dept_emp.primary_key(), vec!["emp_no", "dept_no"]);
    }

    #[test]
    fn test_foreign_keys_point_at_known_columns() {
        for table in TABLES {
            for column in table.columns {
                if let Some(fk) = column.references {
                    let target = find_table(fk.table).unwrap();
                    assert!(
                        self::column(target, fk.column).is_some(),
                        "{}.{} references missing {}.{}",
                        table.name,
                        column.name,
                        fk.table,
                        fk.column
                    );
                }
            }
        }
    }

    #[test]
    fn test_only_titles_to_date_is_nullable() {
        let nullable: Vec<(&str, &str)> = TABLES
            .iter()
            .flat_map(|t| t.columns.iter().map(move |c| (t, c)))
            .filter(|(_, c)| c.nullable)
            .map(|(t, c)| (t.name, c.name))
            .collect();
        assert_eq!(nullable, vec![("titles", "to_date")]);
    }
}
