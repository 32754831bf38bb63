//! Entity API: descriptor-driven CRUD REST backend.
//!
//! Entities are declared once as descriptors; startup synthesizes a default instance per
//! entity, generates its schema and binds its routes, then serves them through one generic
//! controller.

pub mod error;
pub mod handlers;
pub mod hash;
pub mod middleware;
pub mod migration;
pub mod model;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod settings;
pub mod sql;
pub mod startup;
pub mod state;
pub mod store;

pub use error::{AppError, ConfigError, DescriptorError};
pub use handlers::builtin_custom_routes;
pub use hash::{Argon2Hasher, PasswordHasher};
pub use model::{EntityDescriptor, EntityRegistry};
pub use routes::{build_router, CustomRoutes};
pub use service::CrudController;
pub use settings::Settings;
pub use startup::bootstrap;
pub use state::AppState;
pub use store::{connect, EntityStore, MemoryStore, PgStore};
