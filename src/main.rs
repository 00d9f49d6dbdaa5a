use anyhow::Result;
use tracing_subscriber::EnvFilter;
use user_store::demo::run_demo;
use user_store::{users_table, Schema, SqliteConfig, SqliteStore};

const DB_PATH: &str = "users.db";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let store = SqliteStore::new(SqliteConfig::new(
        DB_PATH,
        Schema::new().add_table(users_table()),
    ));
    run_demo(&store, &mut std::io::stdout().lock())
}
