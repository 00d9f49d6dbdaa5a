use std::fmt;

use rusqlite::Row;

use crate::error::{Error, Result};
use crate::query::Value;
use crate::schema::{ColumnDefinition, DataType, TableDefinition};
use crate::sqlite::Record;

pub const USERS_TABLE: &str = "users";

/// `users(id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, age INTEGER NOT NULL)`
pub fn users_table() -> TableDefinition {
    TableDefinition::new(USERS_TABLE)
        .with_column(ColumnDefinition::new("id", DataType::Integer).autoincrement())
        .with_column(ColumnDefinition::new("name", DataType::Text).not_null())
        .with_column(ColumnDefinition::new("age", DataType::Integer).not_null())
}

/// A user row. Transient until a session inserts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
    pub age: i64,
}

impl User {
    pub fn new(name: impl Into<String>, age: i64) -> Self {
        Self {
            id: None,
            name: name.into(),
            age,
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<User(name={}, age={})>", self.name, self.age)
    }
}

impl Record for User {
    const TABLE: &'static str = USERS_TABLE;

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", Value::Text(self.name.clone())),
            ("age", Value::Integer(self.age)),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: Some(row.get("id")?),
            name: row.get("name")?,
            age: row.get("age")?,
        })
    }

    fn set_value(&mut self, column: &str, value: Value) -> Result<()> {
        let mismatch = || {
            Error::Schema(format!(
                "cannot set users.{column} to {}",
                value.type_name()
            ))
        };
        match column {
            "name" => self.name = value.as_text().ok_or_else(mismatch)?.to_string(),
            "age" => self.age = value.as_integer().ok_or_else(mismatch)?,
            _ => return Err(mismatch()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_like_a_repr() {
        assert_eq!(User::new("Alice", 25).to_string(), "<User(name=Alice, age=25)>");
    }

    #[test]
    fn set_value_mirrors_updates() {
        let mut user = User::new("Alice", 25);
        user.set_value("age", Value::Integer(26)).unwrap();
        user.set_value("name", Value::from("Alicia")).unwrap();
        assert_eq!(user, User::new("Alicia", 26));
        assert!(user.set_value("age", Value::from("old")).is_err());
        assert!(user.set_value("email", Value::Null).is_err());
    }
}
