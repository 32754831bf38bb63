//! Safe SQL builder: identifiers from descriptors or quoted criteria names, values as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
