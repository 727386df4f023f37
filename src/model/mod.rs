pub mod combatant;
pub mod state;
pub mod types;

pub use combatant::*;
pub use state::*;
pub use types::*;
