pub mod attack;
pub mod save;

pub use attack::{resolve_attack_spell, resolve_weapon_attack};
pub use save::{resolve_save_effect, SaveEffectSpec};
