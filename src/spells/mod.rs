pub mod definitions;
pub mod registry;

pub use definitions::*;
pub use registry::SpellRegistry;
