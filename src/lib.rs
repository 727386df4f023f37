pub mod codec;
pub mod combat;
pub mod commands;
pub mod config;
pub mod dice;
pub mod error;
pub mod events;
pub mod middleware;
pub mod model;
pub mod reducer;
pub mod resolvers;
pub mod rng;
pub mod rolls;
pub mod spells;
pub mod validator;

pub use codec::Snapshot;
pub use commands::Command;
pub use config::EngineConfig;
pub use error::{EngineError, RejectionCode, ValidationError};
pub use events::{EventEnvelope, EventPayload};
pub use middleware::{default_roll_middlewares, RollMiddleware};
pub use model::EncounterState;
pub use reducer::apply_command;
pub use spells::SpellRegistry;
pub use validator::validate_command;
