//! Spell stat blocks: everything the reducer needs to resolve a `CastSpell`
//! without consulting any other data source.

use crate::model::types::Ability;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellEconomy {
    Action,
    BonusAction,
}

/// Fields shared by every spell, save or attack alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellBase {
    pub name: String,
    pub slot_level: u8,
    pub concentration: bool,
    pub economy: SpellEconomy,
    pub range_ft: i32,
    pub is_aoe: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveOnSuccess {
    Half,
    None,
}

/// A spell that forces a saving throw (`fireball`, `hold_person`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveSpell {
    pub base: SpellBase,
    pub save_ability: Ability,
    pub on_success: SaveOnSuccess,
    #[serde(default)]
    pub damage_formula: Option<String>,
    #[serde(default)]
    pub damage_type: Option<String>,
    #[serde(default)]
    pub on_fail_conditions: Vec<String>,
}

/// A spell that rolls a spell attack against AC (`guiding_bolt`, `ray_of_frost`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackSpell {
    pub base: SpellBase,
    pub damage_formula: String,
    pub damage_type: String,
    pub ranged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SpellDefinition {
    Save(SaveSpell),
    Attack(AttackSpell),
}

impl SpellDefinition {
    pub fn base(&self) -> &SpellBase {
        match self {
            SpellDefinition::Save(s) => &s.base,
            SpellDefinition::Attack(s) => &s.base,
        }
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }
}
