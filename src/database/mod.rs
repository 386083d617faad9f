// Copyright 2024 Meal Planner Authors

use crate::error::{Error, Result};
use diesel::prelude::Connection as _;
use diesel::RunQueryDsl as _;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::path::Path;

pub mod models;
pub mod schema;

pub type Connection = diesel::sqlite::SqliteConnection;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

diesel::define_sql_function! {
    fn last_insert_rowid() -> diesel::sql_types::Integer;
}

/// Row id of the last `INSERT` made on this connection.
pub(crate) fn last_insert_id(conn: &mut Connection) -> diesel::QueryResult<i32> {
    diesel::select(last_insert_rowid()).get_result(conn)
}

/// Opens the database at `path` with foreign keys enforced and every pending migration applied.
pub fn establish_connection(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    let url = path.to_str().ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("database path {} is not valid UTF-8", path.display()),
        ))
    })?;
    let mut connection = Connection::establish(url)?;

    // Cascade, protect and set-null rules are all foreign key actions. SQLite only honours them
    // when this is switched on, and only per connection.
    diesel::sql_query("PRAGMA foreign_keys = ON").execute(&mut connection)?;

    let applied = connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(Error::Migration)?;
    for version in applied {
        log::info!("applied migration {version}");
    }
    Ok(connection)
}

/// Reverts every applied migration, leaving an empty database.
pub fn revert_all(conn: &mut Connection) -> Result<()> {
    let reverted = conn
        .revert_all_migrations(MIGRATIONS)
        .map_err(Error::Migration)?;
    for version in reverted {
        log::info!("reverted migration {version}");
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_connection() -> Connection {
    establish_connection(":memory:").unwrap()
}

#[test]
fn migrations() {
    use diesel::connection::SimpleConnection as _;

    let mut conn = test_connection();
    assert!(!conn.has_pending_migration(MIGRATIONS).unwrap());

    revert_all(&mut conn).unwrap();
    assert!(conn.has_pending_migration(MIGRATIONS).unwrap());

    conn.run_pending_migrations(MIGRATIONS).unwrap();
    conn.batch_execute("SELECT id FROM plan_supplements").unwrap();
}

#[test]
fn foreign_keys_enforced() {
    use diesel::ExpressionMethods as _;
    use schema::comments::dsl::*;

    let mut conn = test_connection();
    let err = diesel::insert_into(comments)
        .values((recipe_id.eq(42), contents.eq("orphan")))
        .execute(&mut conn)
        .map_err(Error::from)
        .unwrap_err();
    assert!(err.is_integrity_violation(), "{err}");
}
