use tempfile::tempdir;
use user_store::demo::run_demo;
use user_store::{users_table, Schema, SqliteConfig, SqliteStore, User};

const EXPECTED: &str = "\
All users:
<User(name=Alice, age=25)>
<User(name=Bob, age=30)>
<User(name=Carlos, age=35)>
<User(name=Diana, age=28)>

Users older than 28:
<User(name=Bob, age=30)>
<User(name=Carlos, age=35)>

Data after updates:
<User(name=Alice, age=26)>
<User(name=Bob, age=30)>
<User(name=Diana, age=28)>
";

fn users_store(path: impl Into<std::path::PathBuf>) -> SqliteStore {
    SqliteStore::new(SqliteConfig::new(
        path,
        Schema::new().add_table(users_table()),
    ))
}

#[test]
fn demo_prints_each_stage_on_a_fresh_database() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = users_store(dir.path().join("users.db"));

    let mut out = Vec::new();
    run_demo(&store, &mut out)?;
    assert_eq!(String::from_utf8(out)?, EXPECTED);

    let session = store.open_session()?;
    assert_eq!(session.count::<User>()?, 3);
    assert!(!session.in_transaction());
    Ok(())
}

#[test]
fn demo_fails_when_the_store_cannot_be_opened() {
    let dir = tempdir().unwrap();
    let store = users_store(dir.path().join("missing").join("users.db"));

    let mut out = Vec::new();
    let err = run_demo(&store, &mut out).unwrap_err();
    assert!(err.downcast_ref::<user_store::Error>().is_some(), "{err:#}");
    assert!(out.is_empty());
}
