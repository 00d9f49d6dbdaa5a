//! Store-native predicates.
//!
//! A [`Query`] never filters in memory: it is rendered into a SQL clause with
//! positional parameters and handed to SQLite.

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue};

use crate::error::{Error, Result};
use crate::schema::{quote_ident, TableDefinition};

/// Core value types for SQLite operations
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Boolean(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Text(_) => "TEXT",
            Value::Blob(_) => "BLOB",
            Value::Boolean(_) => "BOOLEAN",
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(v) => ToSqlOutput::from(*v),
            Value::Real(v) => ToSqlOutput::from(*v),
            Value::Text(v) => ToSqlOutput::from(v.as_str()),
            Value::Blob(v) => ToSqlOutput::from(v.as_slice()),
            Value::Boolean(v) => ToSqlOutput::from(*v),
        })
    }
}

/// Query operators for building filters
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOperator {
    Equal(Value),
    NotEqual(Value),
    GreaterThan(Value),
    GreaterThanOrEqual(Value),
    LessThan(Value),
    LessThanOrEqual(Value),
    Like(String),
    In(Vec<Value>),
}

impl QueryOperator {
    fn render(&self, column: &str, params: &mut Vec<Value>) -> String {
        let (op, value) = match self {
            QueryOperator::Equal(v) => ("=", v),
            QueryOperator::NotEqual(v) => ("<>", v),
            QueryOperator::GreaterThan(v) => (">", v),
            QueryOperator::GreaterThanOrEqual(v) => (">=", v),
            QueryOperator::LessThan(v) => ("<", v),
            QueryOperator::LessThanOrEqual(v) => ("<=", v),
            QueryOperator::Like(pattern) => {
                params.push(Value::Text(pattern.clone()));
                return format!("{column} LIKE ?");
            }
            QueryOperator::In(values) if values.is_empty() => return "0".to_string(),
            QueryOperator::In(values) => {
                params.extend(values.iter().cloned());
                let slots = vec!["?"; values.len()].join(", ");
                return format!("{column} IN ({slots})");
            }
        };
        match value {
            // `= NULL` never matches in SQL; mirror the intent instead.
            Value::Null if op == "=" => format!("{column} IS NULL"),
            Value::Null if op == "<>" => format!("{column} IS NOT NULL"),
            _ => {
                params.push(value.clone());
                format!("{column} {op} ?")
            }
        }
    }
}

/// Composable, immutable query: ANDed conditions, ordering and a limit
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Query {
    pub conditions: Vec<(String, QueryOperator)>,
    pub order_by: Vec<(String, bool)>, // (field, is_ascending)
    pub limit: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: &str, op: QueryOperator) -> Self {
        self.conditions.push((field.to_string(), op));
        self
    }

    /// Equality shorthand: `filter(field, Equal(value))`
    pub fn filter_by(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, QueryOperator::Equal(value.into()))
    }

    pub fn order_by(mut self, field: &str, ascending: bool) -> Self {
        self.order_by.push((field.to_string(), ascending));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render the `WHERE`/`ORDER BY`/`LIMIT` tail for `table`.
    ///
    /// Every referenced column must exist in the table definition. When no
    /// ordering is given, rows come back in primary key order.
    pub(crate) fn render(&self, table: &TableDefinition) -> Result<(String, Vec<Value>)> {
        let mut sql = String::new();
        let mut params = Vec::new();

        if !self.conditions.is_empty() {
            let clauses = self
                .conditions
                .iter()
                .map(|(field, op)| Ok(op.render(&checked_column(table, field)?, &mut params)))
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let ordering = if self.order_by.is_empty() {
            table
                .primary_key()
                .map(|pk| vec![format!("{} ASC", quote_ident(&pk.name))])
                .unwrap_or_default()
        } else {
            self.order_by
                .iter()
                .map(|(field, ascending)| {
                    let dir = if *ascending { "ASC" } else { "DESC" };
                    Ok(format!("{} {dir}", checked_column(table, field)?))
                })
                .collect::<Result<Vec<_>>>()?
        };
        if !ordering.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&ordering.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        Ok((sql, params))
    }
}

fn checked_column(table: &TableDefinition, field: &str) -> Result<String> {
    table
        .column(field)
        .map(|c| quote_ident(&c.name))
        .ok_or_else(|| Error::Schema(format!("table {} has no column {field}", table.name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::users_table;

    #[test]
    fn empty_query_orders_by_primary_key() {
        let (sql, params) = Query::new().render(&users_table()).unwrap();
        assert_eq!(sql, r#" ORDER BY "id" ASC"#);
        assert!(params.is_empty());
    }

    #[test]
    fn conditions_are_anded_in_order() {
        let query = Query::new()
            .filter("age", QueryOperator::GreaterThan(Value::Integer(28)))
            .filter_by("name", "Bob")
            .limit(1);
        let (sql, params) = query.render(&users_table()).unwrap();
        assert_eq!(
            sql,
            r#" WHERE "age" > ? AND "name" = ? ORDER BY "id" ASC LIMIT 1"#
        );
        assert_eq!(params, vec![Value::Integer(28), Value::from("Bob")]);
    }

    #[test]
    fn in_and_null_operators() {
        let query = Query::new()
            .filter("age", QueryOperator::In(vec![25.into(), 30.into()]))
            .filter("name", QueryOperator::NotEqual(Value::Null))
            .order_by("age", false);
        let (sql, params) = query.render(&users_table()).unwrap();
        assert_eq!(
            sql,
            r#" WHERE "age" IN (?, ?) AND "name" IS NOT NULL ORDER BY "age" DESC"#
        );
        assert_eq!(params.len(), 2);

        let (sql, _) = Query::new()
            .filter("age", QueryOperator::In(vec![]))
            .render(&users_table())
            .unwrap();
        assert!(sql.starts_with(" WHERE 0"));
    }

    #[test]
    fn unknown_column_is_rejected() {
        let err = Query::new()
            .filter_by("email", "a@b.c")
            .render(&users_table())
            .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }
}
