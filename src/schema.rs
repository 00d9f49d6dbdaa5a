//! Explicit schema definitions and the DDL rendered from them.

use crate::error::{Error, Result};
use crate::query::Value;

/// Schema definition for the SQLite database
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Schema {
    pub tables: Vec<TableDefinition>,
}

impl Schema {
    pub fn new() -> Self {
        Self { tables: Vec::new() }
    }

    pub fn add_table(mut self, table: TableDefinition) -> Self {
        self.tables.push(table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.iter().find(|t| t.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    pub constraints: Vec<ColumnConstraint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Text,
    Real,
    Blob,
}

impl DataType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            DataType::Integer => "INTEGER",
            DataType::Text => "TEXT",
            DataType::Real => "REAL",
            DataType::Blob => "BLOB",
        }
    }

    /// Whether `value` may be stored in a column of this type. Nulls are
    /// checked separately against `NOT NULL`.
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (DataType::Integer, Value::Integer(_) | Value::Boolean(_))
                | (DataType::Real, Value::Real(_) | Value::Integer(_))
                | (DataType::Text, Value::Text(_))
                | (DataType::Blob, Value::Blob(_))
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnConstraint {
    PrimaryKey,
    AutoIncrement,
    NotNull,
    Unique,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            constraints: Vec::new(),
        }
    }

    fn with_constraint(mut self, constraint: ColumnConstraint) -> Self {
        if !self.constraints.contains(&constraint) {
            self.constraints.push(constraint);
        }
        self
    }

    pub fn primary_key(self) -> Self {
        self.with_constraint(ColumnConstraint::PrimaryKey)
    }

    /// Store-assigned, monotonically increasing key. Implies `primary_key()`.
    pub fn autoincrement(self) -> Self {
        self.primary_key()
            .with_constraint(ColumnConstraint::AutoIncrement)
    }

    pub fn not_null(self) -> Self {
        self.with_constraint(ColumnConstraint::NotNull)
    }

    pub fn unique(self) -> Self {
        self.with_constraint(ColumnConstraint::Unique)
    }

    pub fn has(&self, constraint: ColumnConstraint) -> bool {
        self.constraints.contains(&constraint)
    }

    pub fn is_primary_key(&self) -> bool {
        self.has(ColumnConstraint::PrimaryKey)
    }

    /// A value must be supplied on insert.
    fn is_required(&self) -> bool {
        self.has(ColumnConstraint::NotNull) && !self.has(ColumnConstraint::AutoIncrement)
    }

    fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", quote_ident(&self.name), self.data_type.as_sql());
        if self.is_primary_key() {
            sql.push_str(" PRIMARY KEY");
        }
        if self.has(ColumnConstraint::AutoIncrement) {
            sql.push_str(" AUTOINCREMENT");
        }
        if self.has(ColumnConstraint::NotNull) {
            sql.push_str(" NOT NULL");
        }
        if self.has(ColumnConstraint::Unique) {
            sql.push_str(" UNIQUE");
        }
        sql
    }
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.is_primary_key())
    }

    /// `CREATE TABLE IF NOT EXISTS`, so re-running it never touches data.
    pub fn create_table_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(ColumnDefinition::to_sql)
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(&self.name),
            columns
        )
    }

    /// Check a single column assignment against the definition.
    pub fn validate_value(&self, column: &str, value: &Value) -> Result<&ColumnDefinition> {
        let def = self.column(column).ok_or_else(|| {
            Error::Schema(format!("table {} has no column {column}", self.name))
        })?;
        if value.is_null() && def.has(ColumnConstraint::NotNull) {
            return Err(Error::ConstraintViolation(format!(
                "{}.{} may not be null",
                self.name, def.name
            )));
        }
        if !def.data_type.accepts(value) {
            return Err(Error::ConstraintViolation(format!(
                "{}.{} expects {}, got {}",
                self.name,
                def.name,
                def.data_type.as_sql(),
                value.type_name()
            )));
        }
        Ok(def)
    }

    /// Check a full row about to be inserted: known columns, matching types,
    /// and every required column present.
    pub fn validate_insert(&self, values: &[(&str, Value)]) -> Result<()> {
        for (column, value) in values {
            self.validate_value(column, value)?;
        }
        for def in self.columns.iter().filter(|c| c.is_required()) {
            if !values.iter().any(|(column, _)| *column == def.name) {
                return Err(Error::ConstraintViolation(format!(
                    "{}.{} is required",
                    self.name, def.name
                )));
            }
        }
        Ok(())
    }
}

/// Quote an SQL identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::users_table;

    #[test]
    fn renders_idempotent_create_table() {
        assert_eq!(
            users_table().create_table_sql(),
            r#"CREATE TABLE IF NOT EXISTS "users" ("id" INTEGER PRIMARY KEY AUTOINCREMENT, "name" TEXT NOT NULL, "age" INTEGER NOT NULL)"#
        );
    }

    #[test]
    fn missing_required_column_is_a_constraint_violation() {
        let err = users_table()
            .validate_insert(&[("name", Value::from("Alice"))])
            .unwrap_err();
        assert!(err.is_constraint_violation(), "{err}");
        assert!(err.to_string().contains("users.age is required"));
    }

    #[test]
    fn autoincrement_key_is_not_required() {
        users_table()
            .validate_insert(&[("name", Value::from("Alice")), ("age", Value::Integer(25))])
            .unwrap();
    }

    #[test]
    fn null_and_type_mismatch_are_rejected() {
        let table = users_table();
        assert!(table
            .validate_value("name", &Value::Null)
            .unwrap_err()
            .is_constraint_violation());
        assert!(table
            .validate_value("age", &Value::from("old"))
            .unwrap_err()
            .is_constraint_violation());
        assert!(matches!(
            table.validate_value("email", &Value::Null),
            Err(Error::Schema(_))
        ));
    }

    #[test]
    fn schema_looks_up_tables_by_name() {
        let schema = Schema::new().add_table(users_table());
        assert!(schema.table("users").is_some());
        assert!(schema.table("accounts").is_none());
    }

    #[test]
    fn quotes_embedded_quotes() {
        assert_eq!(quote_ident(r#"we"ird"#), r#""we""ird""#);
    }
}
