// Copyright 2024 Meal Planner Authors

//! Storage for a nutrition and meal-planning application: products and supplements with the
//! providers offering them, recipes with their ingredients, tags, comments and photos, and meal
//! plans built from recipes.
//!
//! Everything is kept in SQLite through diesel. Relationship rules (cascade, protect, set null)
//! are declared in the migrations and surfaced by the functions in [`query`].

pub mod database;
pub mod error;
pub mod media;
pub mod query;
pub mod validation;

pub use error::{Error, Result};
