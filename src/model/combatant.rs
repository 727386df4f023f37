//! Combatant state and its supporting records.

use super::types::{Ability, CombatantId, EffectId, Position};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A single named weapon or natural attack a combatant can make.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttackProfile {
    pub to_hit_bonus: i64,
    pub damage_formula: String,
    pub damage_type: String,
    #[serde(default = "default_reach_ft")]
    pub reach_ft: i32,
    #[serde(default = "default_true")]
    pub uses_action: bool,
    #[serde(default)]
    pub uses_bonus_action: bool,
}

fn default_reach_ft() -> i32 {
    5
}

fn default_true() -> bool {
    true
}

/// A named attack sequence (e.g. "claw-claw-bite") spent as a single Action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Multiattack {
    pub attacks: Vec<String>,
}

/// A pointer from a combatant's `concentration` field to the effect it sustains.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EffectRef {
    pub effect_name: String,
    pub source_id: CombatantId,
    pub started_round: u32,
}

/// An effect anchored to a concentration (or standalone), capable of applying
/// conditions to its target for as long as it lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActiveEffect {
    pub id: EffectId,
    pub name: String,
    pub source_id: CombatantId,
    pub target_id: CombatantId,
    pub started_round: u32,
    #[serde(default)]
    pub duration_rounds: Option<u32>,
    #[serde(default)]
    pub concentration_owner_id: Option<CombatantId>,
    #[serde(default)]
    pub concentration_effect_name: Option<String>,
    #[serde(default)]
    pub applies_conditions: HashSet<String>,
}

/// A transient window during which the reducer awaits exactly one of
/// `UseReaction` / `DeclineReaction`; no other command is admitted while it
/// is open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReactionWindow {
    pub id: String,
    pub trigger: String,
    pub mover_id: CombatantId,
    pub threatened_by_id: CombatantId,
    pub reach_ft: i32,
}

/// A runtime participant in an encounter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    pub ac: i32,
    pub hp_current: i32,
    pub hp_max: i32,
    #[serde(default)]
    pub temp_hp: i32,
    pub speed_ft: i32,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub position: Position,

    // Spellcasting
    #[serde(default)]
    pub spellcasting_ability: Option<Ability>,
    #[serde(default)]
    pub spell_save_dc: Option<i32>,
    #[serde(default)]
    pub spell_attack_bonus: Option<i32>,
    #[serde(default)]
    pub spell_slots_current: HashMap<u8, u32>,
    #[serde(default)]
    pub spell_slots_max: HashMap<u8, u32>,
    #[serde(default)]
    pub concentration: Option<EffectRef>,

    // Defences
    #[serde(default)]
    pub save_bonuses: HashMap<Ability, i64>,
    #[serde(default)]
    pub damage_resistances: HashSet<String>,
    #[serde(default)]
    pub damage_vulnerabilities: HashSet<String>,
    #[serde(default)]
    pub damage_immunities: HashSet<String>,
    #[serde(default)]
    pub conditions: HashSet<String>,

    // Player-character rules
    #[serde(default)]
    pub is_player_character: bool,
    #[serde(default)]
    pub death_save_successes: u8,
    #[serde(default)]
    pub death_save_failures: u8,
    #[serde(default)]
    pub is_stable: bool,
    #[serde(default)]
    pub is_dead: bool,

    // Offence
    #[serde(default)]
    pub attacks: HashMap<String, AttackProfile>,
    #[serde(default)]
    pub multiattacks: HashMap<String, Multiattack>,
    #[serde(default = "default_attacks_per_action")]
    pub attacks_per_action: u32,

    // Turn-local resources, reset at BeginTurn
    #[serde(default)]
    pub action_available: bool,
    #[serde(default)]
    pub bonus_available: bool,
    #[serde(default)]
    pub reaction_available: bool,
    #[serde(default)]
    pub movement_remaining_ft: i32,
    #[serde(default)]
    pub attack_action_started: bool,
    #[serde(default)]
    pub attack_action_remaining: u32,
    #[serde(default)]
    pub no_opportunity_attacks_until_turn_end: bool,

    // Status
    #[serde(default)]
    pub surprised: bool,
    #[serde(default)]
    pub has_taken_first_turn: bool,
    #[serde(default)]
    pub initiative_bonus: i64,
}

fn default_attacks_per_action() -> u32 {
    1
}

impl Combatant {
    pub fn new(id: impl Into<String>, name: impl Into<String>, ac: i32, hp_max: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ac,
            hp_current: hp_max,
            hp_max,
            temp_hp: 0,
            speed_ft: 30,
            side: None,
            position: Position(0, 0),
            spellcasting_ability: None,
            spell_save_dc: None,
            spell_attack_bonus: None,
            spell_slots_current: HashMap::new(),
            spell_slots_max: HashMap::new(),
            concentration: None,
            save_bonuses: HashMap::new(),
            damage_resistances: HashSet::new(),
            damage_vulnerabilities: HashSet::new(),
            damage_immunities: HashSet::new(),
            conditions: HashSet::new(),
            is_player_character: false,
            death_save_successes: 0,
            death_save_failures: 0,
            is_stable: false,
            is_dead: false,
            attacks: HashMap::new(),
            multiattacks: HashMap::new(),
            attacks_per_action: 1,
            action_available: false,
            bonus_available: false,
            reaction_available: false,
            movement_remaining_ft: 0,
            attack_action_started: false,
            attack_action_remaining: 0,
            no_opportunity_attacks_until_turn_end: false,
            surprised: false,
            has_taken_first_turn: false,
            initiative_bonus: 0,
        }
    }

    pub fn has_condition(&self, tag: &str) -> bool {
        self.conditions.contains(tag)
    }

    /// Movement available this turn: 0 if a condition that prevents moving
    /// under one's own power is in effect.
    pub fn effective_speed_ft(&self) -> i32 {
        if self.has_condition(crate::model::types::UNCONSCIOUS)
            || self.has_condition(crate::model::types::GRAPPLED)
            || self.has_condition(crate::model::types::RESTRAINED)
        {
            0
        } else {
            self.speed_ft
        }
    }

    pub fn is_dying(&self) -> bool {
        self.is_player_character && self.hp_current == 0 && !self.is_dead && !self.is_stable
    }
}

/// `are_hostile(a, b)`: a `nil` side on either side is treated as hostile
/// (legacy fallback); otherwise hostile iff the sides differ.
pub fn are_hostile(a: &Combatant, b: &Combatant) -> bool {
    match (&a.side, &b.side) {
        (Some(sa), Some(sb)) => sa != sb,
        _ => true,
    }
}
