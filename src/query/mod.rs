// Copyright 2024 Meal Planner Authors

//! Lifecycle operations for every entity.
//!
//! Writes that record who did something take the user explicitly. Deletions follow the rule
//! attached to each relationship: cascades and set-nulls are carried out by SQLite's foreign key
//! actions, and protected references are counted first so the caller learns what is in the way.

use crate::error::{Error, Result};

pub mod catalog;
pub mod deals;
pub mod plans;
pub mod recipes;
pub mod summary;
pub mod users;

#[cfg(test)]
mod testing;

fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

fn refuse_if_referenced(
    entity: &'static str,
    id: i32,
    dependent: &'static str,
    count: i64,
) -> Result<()> {
    if count > 0 {
        log::debug!("refusing to delete {entity} {id}: {count} {dependent} row(s) refer to it");
        Err(Error::Protected {
            entity,
            id,
            dependent,
            count,
        })
    } else {
        Ok(())
    }
}

fn ensure_deleted(deleted: usize, entity: &'static str, id: i32) -> Result<()> {
    if deleted == 0 {
        Err(Error::NotFound { entity, id })
    } else {
        log::info!("deleted {entity} {id}");
        Ok(())
    }
}

fn ensure_updated(updated: usize, entity: &'static str, id: i32) -> Result<()> {
    if updated == 0 {
        Err(Error::NotFound { entity, id })
    } else {
        log::debug!("updated {entity} {id}");
        Ok(())
    }
}

fn found<T>(row: Option<T>, entity: &'static str, id: i32) -> Result<T> {
    row.ok_or(Error::NotFound { entity, id })
}
