//! Entity metamodel: descriptors, registry, default-instance synthesis.

pub mod defaults;
pub mod descriptor;
pub mod entities;
pub mod registry;

pub use defaults::{synthesize, DefaultInstance};
pub use descriptor::*;
pub use registry::EntityRegistry;
