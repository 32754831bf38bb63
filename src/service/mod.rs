//! Generic controller: entity-agnostic CRUD against the store.

mod controller;
pub use controller::{CrudController, DEFAULT_PAGE, DEFAULT_PER_PAGE, FALLBACK_PER_PAGE};
