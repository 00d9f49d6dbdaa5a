//! The create / insert / query / update / delete walkthrough.

use std::io::Write;

use anyhow::Result;

use crate::query::{Query, QueryOperator, Value};
use crate::sqlite::SqliteStore;
use crate::user::User;

/// Run the full sequence against `store`, writing status lines to `out`.
///
/// Any failure aborts the remaining steps. The session is rolled back and
/// released on every exit path.
pub fn run_demo(store: &SqliteStore, out: &mut impl Write) -> Result<()> {
    store.initialize_schema()?;
    let mut session = store.open_session()?;

    let mut alice = User::new("Alice", 25);
    session.insert_one(&mut alice)?;
    session.commit()?;

    let mut users = vec![
        User::new("Bob", 30),
        User::new("Carlos", 35),
        User::new("Diana", 28),
    ];
    session.insert_many(&mut users)?;
    session.commit()?;

    writeln!(out, "All users:")?;
    for user in session.query_all::<User>()? {
        writeln!(out, "{user}")?;
    }

    writeln!(out, "\nUsers older than 28:")?;
    let older = Query::new().filter("age", QueryOperator::GreaterThan(Value::Integer(28)));
    for user in session.query_filtered::<User>(&older)? {
        writeln!(out, "{user}")?;
    }

    if let Some(mut user) = session.find_first::<User>(&Query::new().filter_by("name", "Alice"))? {
        session.update_field(&mut user, "age", 26)?;
        session.commit()?;
    }

    if let Some(user) = session.find_first::<User>(&Query::new().filter_by("name", "Carlos"))? {
        session.delete(&user)?;
        session.commit()?;
    }

    writeln!(out, "\nData after updates:")?;
    for user in session.query_all::<User>()? {
        writeln!(out, "{user}")?;
    }

    session.close()?;
    Ok(())
}
