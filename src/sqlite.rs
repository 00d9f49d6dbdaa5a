use std::path::{Path, PathBuf};

use rusqlite::{params, params_from_iter, Connection, Row};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::query::{Query, Value};
use crate::schema::{quote_ident, ColumnDefinition, Schema, TableDefinition};

/// SQLite store configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteConfig {
    /// Path to the SQLite database file
    pub db_path: PathBuf,
    /// Schema definition for the database
    pub schema: Schema,
}

impl SqliteConfig {
    /// Create a new SQLite config with path and schema
    pub fn new(db_path: impl Into<PathBuf>, schema: Schema) -> Self {
        Self {
            db_path: db_path.into(),
            schema,
        }
    }
}

/// A plain data type stored as one row of a table in the schema.
///
/// The table must have a single integer primary key. A record whose `id()` is
/// `None` is transient; the session assigns the id on insert.
pub trait Record: Sized + Clone {
    /// Name of the table in the store's [`Schema`]
    const TABLE: &'static str;

    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);

    /// Column values to insert, primary key excluded
    fn values(&self) -> Vec<(&'static str, Value)>;

    /// Build a record from a row selected with every column of the table
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Mirror an update of `column` onto the in-memory record.
    ///
    /// Called on a copy before the store is written, so an error here leaves
    /// both the row and the record untouched.
    fn set_value(&mut self, column: &str, value: Value) -> Result<()>;
}

/// Handle on a file-backed SQLite store.
///
/// Holds no connection itself: each [`Session`] opens its own.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    config: SqliteConfig,
}

impl SqliteStore {
    pub fn new(config: SqliteConfig) -> Self {
        Self { config }
    }

    pub fn path(&self) -> &Path {
        &self.config.db_path
    }

    pub fn schema(&self) -> &Schema {
        &self.config.schema
    }

    fn connect(&self) -> Result<Connection> {
        Ok(Connection::open(&self.config.db_path)?)
    }

    /// Create every table of the schema that does not exist yet.
    pub fn initialize_schema(&self) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        for table in &self.config.schema.tables {
            let sql = table.create_table_sql();
            debug!(%sql, "ensuring table");
            tx.execute(&sql, [])?;
        }
        tx.commit()?;
        info!(
            path = %self.path().display(),
            tables = self.config.schema.tables.len(),
            "schema initialized"
        );
        Ok(())
    }

    /// Open a unit of work on the store.
    pub fn open_session(&self) -> Result<Session<'_>> {
        let conn = self.connect()?;
        info!(path = %self.path().display(), "session opened");
        Ok(Session { store: self, conn })
    }
}

/// A scoped unit of work owning one connection.
///
/// A transaction starts with the first write and ends at [`Session::commit`],
/// [`Session::rollback`] or [`Session::close`]. Pending changes that were
/// never committed are rolled back when the session closes or is dropped.
pub struct Session<'s> {
    store: &'s SqliteStore,
    conn: Connection,
}

impl<'s> Session<'s> {
    /// Whether uncommitted changes are pending.
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn table<R: Record>(&self) -> Result<&'s TableDefinition> {
        self.store.schema().table(R::TABLE).ok_or_else(|| {
            Error::Schema(format!("table {} is not part of the schema", R::TABLE))
        })
    }

    fn begin(&self) -> Result<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
            debug!("transaction started");
        }
        Ok(())
    }

    /// Add a transient record and assign its id.
    pub fn insert_one<R: Record>(&mut self, record: &mut R) -> Result<()> {
        let table = self.table::<R>()?;
        let values = insertable(table, &*record)?;
        self.begin()?;
        let id = self.insert_row(table, &values)?;
        record.set_id(id);
        Ok(())
    }

    /// Add a batch of transient records.
    ///
    /// Either the whole batch becomes pending or, if any record fails, none
    /// of it does and no ids are assigned.
    pub fn insert_many<R: Record>(&mut self, records: &mut [R]) -> Result<()> {
        let table = self.table::<R>()?;
        let rows = records
            .iter()
            .map(|record| insertable(table, record))
            .collect::<Result<Vec<_>>>()?;
        self.begin()?;
        self.conn.execute_batch("SAVEPOINT insert_many")?;

        let mut ids = Vec::with_capacity(rows.len());
        for values in &rows {
            match self.insert_row(table, values) {
                Ok(id) => ids.push(id),
                Err(err) => {
                    debug!(error = %err, inserted = ids.len(), "batch insert failed, undoing batch");
                    if let Err(undo_err) = self
                        .conn
                        .execute_batch("ROLLBACK TO insert_many; RELEASE insert_many")
                    {
                        warn!(error = %undo_err, "undoing failed batch failed");
                    }
                    return Err(err);
                }
            }
        }

        self.conn.execute_batch("RELEASE insert_many")?;
        for (record, id) in records.iter_mut().zip(ids) {
            record.set_id(id);
        }
        Ok(())
    }

    fn insert_row(&self, table: &TableDefinition, values: &[(&str, Value)]) -> Result<i64> {
        let sql = if values.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", quote_ident(&table.name))
        } else {
            let columns = values
                .iter()
                .map(|(column, _)| quote_ident(column))
                .collect::<Vec<_>>()
                .join(", ");
            let slots = vec!["?"; values.len()].join(", ");
            format!(
                "INSERT INTO {} ({columns}) VALUES ({slots})",
                quote_ident(&table.name)
            )
        };
        debug!(%sql, "insert");
        self.conn
            .execute(&sql, params_from_iter(values.iter().map(|(_, v)| v)))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Make pending changes durable. On failure they are rolled back.
    pub fn commit(&mut self) -> Result<()> {
        if self.conn.is_autocommit() {
            return Ok(());
        }
        if let Err(err) = self.conn.execute_batch("COMMIT") {
            warn!(error = %err, "commit failed, rolling back");
            if !self.conn.is_autocommit() {
                if let Err(rollback_err) = self.conn.execute_batch("ROLLBACK") {
                    warn!(error = %rollback_err, "rollback after failed commit failed");
                }
            }
            return Err(Error::Transaction(err));
        }
        debug!("transaction committed");
        Ok(())
    }

    /// Discard pending changes.
    pub fn rollback(&mut self) -> Result<()> {
        if self.conn.is_autocommit() {
            return Ok(());
        }
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(Error::Transaction)?;
        debug!("transaction rolled back");
        Ok(())
    }

    /// Every record of the table, in primary key order.
    pub fn query_all<R: Record>(&self) -> Result<Vec<R>> {
        self.query_filtered(&Query::new())
    }

    /// Records matching `query`, filtered by the store.
    pub fn query_filtered<R: Record>(&self, query: &Query) -> Result<Vec<R>> {
        let table = self.table::<R>()?;
        let (tail, params) = query.render(table)?;
        let sql = format!(
            "SELECT {} FROM {}{tail}",
            select_list(table),
            quote_ident(&table.name)
        );
        debug!(%sql, params = params.len(), "query");

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(params.iter()), R::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// First record matching `query`, or `None`.
    pub fn find_first<R: Record>(&self, query: &Query) -> Result<Option<R>> {
        let records = self.query_filtered(&query.clone().limit(1))?;
        Ok(records.into_iter().next())
    }

    /// Record with primary key `id`, or `None`.
    pub fn get<R: Record>(&self, id: i64) -> Result<Option<R>> {
        let table = self.table::<R>()?;
        let pk = primary_key(table)?;
        self.find_first(&Query::new().filter_by(&pk.name, id))
    }

    pub fn count<R: Record>(&self) -> Result<u64> {
        let table = self.table::<R>()?;
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&table.name));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Set `field` on a persistent record, in the store and in memory.
    ///
    /// Visible to this session at once, durable at the next commit.
    pub fn update_field<R: Record>(
        &mut self,
        record: &mut R,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        let table = self.table::<R>()?;
        let id = persistent_id(table, &*record)?;
        let pk = primary_key(table)?;
        let value = value.into();
        let column = table.validate_value(field, &value)?;
        if column.is_primary_key() {
            return Err(Error::Schema(format!(
                "{}.{} is the primary key and cannot change",
                table.name, column.name
            )));
        }
        let mut updated = record.clone();
        updated.set_value(field, value.clone())?;

        self.begin()?;
        let sql = format!(
            "UPDATE {} SET {} = ? WHERE {} = ?",
            quote_ident(&table.name),
            quote_ident(&column.name),
            quote_ident(&pk.name)
        );
        debug!(%sql, id, "update");
        let changed = self.conn.execute(&sql, params![value, id])?;
        if changed == 0 {
            return Err(stale(table, id));
        }
        *record = updated;
        Ok(())
    }

    /// Remove a persistent record. Final at the next commit.
    pub fn delete<R: Record>(&mut self, record: &R) -> Result<()> {
        let table = self.table::<R>()?;
        let id = persistent_id(table, record)?;
        let pk = primary_key(table)?;

        self.begin()?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            quote_ident(&table.name),
            quote_ident(&pk.name)
        );
        debug!(%sql, id, "delete");
        if self.conn.execute(&sql, [id])? == 0 {
            return Err(stale(table, id));
        }
        Ok(())
    }

    /// Release the session, discarding anything not committed.
    pub fn close(self) -> Result<()> {
        let discarded = !self.conn.is_autocommit();
        if discarded {
            self.conn
                .execute_batch("ROLLBACK")
                .map_err(Error::Transaction)?;
        }
        info!(discarded, "session closed");
        Ok(())
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if !self.conn.is_autocommit() {
            warn!("session dropped with uncommitted changes, rolling back");
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                warn!(error = %err, "rollback on drop failed");
            }
        }
    }
}

fn select_list(table: &TableDefinition) -> String {
    table
        .columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn primary_key(table: &TableDefinition) -> Result<&ColumnDefinition> {
    table
        .primary_key()
        .ok_or_else(|| Error::Schema(format!("table {} has no primary key", table.name)))
}

/// Values of a transient record that passes the table's insert rules.
fn insertable<R: Record>(
    table: &TableDefinition,
    record: &R,
) -> Result<Vec<(&'static str, Value)>> {
    if let Some(id) = record.id() {
        return Err(Error::Schema(format!(
            "{} row {id} is already persistent",
            table.name
        )));
    }
    let values = record.values();
    table.validate_insert(&values)?;
    Ok(values)
}

fn persistent_id<R: Record>(table: &TableDefinition, record: &R) -> Result<i64> {
    record.id().ok_or_else(|| {
        Error::Schema(format!("{} record is transient, insert it first", table.name))
    })
}

fn stale(table: &TableDefinition, id: i64) -> Error {
    Error::Schema(format!("{} row {id} no longer exists", table.name))
}
