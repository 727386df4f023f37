//! The command surface: every externally issued intent the reducer accepts.
//!
//! A `Command` is untrusted input. [`crate::validator::validate_command`]
//! checks it against [`crate::model::EncounterState`] before
//! [`crate::reducer::apply_command`] ever touches it; a command that fails
//! validation never reaches the reducer's match arms, it becomes a single
//! `CommandRejected` event instead.

use crate::model::types::{Ability, AdvState, CombatantId};
use serde::{Deserialize, Serialize};

fn default_attack_economy() -> String {
    "action".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    StartCombat,

    SetInitiative {
        combatant_id: CombatantId,
        initiative: i32,
    },

    RollInitiative {
        combatant_id: CombatantId,
        bonus: i64,
    },

    FinalizeInitiativeOrder,

    BeginTurn {
        combatant_id: CombatantId,
    },

    EndTurn {
        combatant_id: CombatantId,
    },

    Disengage {
        combatant_id: CombatantId,
    },

    Move {
        mover_id: CombatantId,
        path: Vec<(i32, i32)>,
    },

    UseReaction {
        reactor_id: CombatantId,
        attack_name: String,
        #[serde(default)]
        adv_state: AdvState,
    },

    DeclineReaction {
        reactor_id: CombatantId,
    },

    Attack {
        attacker_id: CombatantId,
        target_id: CombatantId,
        attack_name: String,
        #[serde(default)]
        adv_state: AdvState,
        #[serde(default = "default_attack_economy")]
        economy: String,
    },

    Multiattack {
        attacker_id: CombatantId,
        target_id: CombatantId,
        multiattack_name: String,
        #[serde(default)]
        adv_state: AdvState,
    },

    CastSpell {
        caster_id: CombatantId,
        spell_name: String,
        target_ids: Vec<CombatantId>,
        #[serde(default)]
        slot_level: Option<u8>,
    },

    SaveEffect {
        source_id: CombatantId,
        target_ids: Vec<CombatantId>,
        effect_name: String,
        save_ability: Ability,
        dc: i32,
        #[serde(default)]
        adv_state: AdvState,
        on_success: String,
        #[serde(default)]
        damage_type: Option<String>,
        #[serde(default)]
        damage_formula: Option<String>,
        #[serde(default)]
        applies_conditions: Vec<String>,
    },

    ApplyCondition {
        target_id: CombatantId,
        condition: String,
    },

    RemoveCondition {
        target_id: CombatantId,
        condition: String,
    },

    RollDeathSave {
        combatant_id: CombatantId,
    },

    Stabilize {
        target_id: CombatantId,
        #[serde(default)]
        healer_id: Option<CombatantId>,
    },

    Heal {
        target_id: CombatantId,
        amount: i32,
        #[serde(default)]
        healer_id: Option<CombatantId>,
    },

    EndConcentration {
        combatant_id: CombatantId,
    },

    DealDamage {
        source_id: CombatantId,
        target_id: CombatantId,
        amount: i32,
        damage_type: String,
    },
}

impl Command {
    /// The combatant whose turn resources / eligibility the validator checks
    /// against, where the command names one.
    pub fn actor_id(&self) -> Option<&CombatantId> {
        match self {
            Command::StartCombat | Command::FinalizeInitiativeOrder => None,
            Command::SetInitiative { combatant_id, .. } => Some(combatant_id),
            Command::RollInitiative { combatant_id, .. } => Some(combatant_id),
            Command::BeginTurn { combatant_id } => Some(combatant_id),
            Command::EndTurn { combatant_id } => Some(combatant_id),
            Command::Disengage { combatant_id } => Some(combatant_id),
            Command::Move { mover_id, .. } => Some(mover_id),
            Command::UseReaction { reactor_id, .. } => Some(reactor_id),
            Command::DeclineReaction { reactor_id } => Some(reactor_id),
            Command::Attack { attacker_id, .. } => Some(attacker_id),
            Command::Multiattack { attacker_id, .. } => Some(attacker_id),
            Command::CastSpell { caster_id, .. } => Some(caster_id),
            Command::SaveEffect { source_id, .. } => Some(source_id),
            Command::ApplyCondition { .. } | Command::RemoveCondition { .. } => None,
            Command::RollDeathSave { combatant_id } => Some(combatant_id),
            Command::Stabilize { healer_id, .. } => healer_id.as_ref(),
            Command::Heal { healer_id, .. } => healer_id.as_ref(),
            Command::EndConcentration { combatant_id } => Some(combatant_id),
            Command::DealDamage { source_id, .. } => Some(source_id),
        }
    }

    /// The wire `type` tag, for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Command::StartCombat => "StartCombat",
            Command::SetInitiative { .. } => "SetInitiative",
            Command::RollInitiative { .. } => "RollInitiative",
            Command::FinalizeInitiativeOrder => "FinalizeInitiativeOrder",
            Command::BeginTurn { .. } => "BeginTurn",
            Command::EndTurn { .. } => "EndTurn",
            Command::Disengage { .. } => "Disengage",
            Command::Move { .. } => "Move",
            Command::UseReaction { .. } => "UseReaction",
            Command::DeclineReaction { .. } => "DeclineReaction",
            Command::Attack { .. } => "Attack",
            Command::Multiattack { .. } => "Multiattack",
            Command::CastSpell { .. } => "CastSpell",
            Command::SaveEffect { .. } => "SaveEffect",
            Command::ApplyCondition { .. } => "ApplyCondition",
            Command::RemoveCondition { .. } => "RemoveCondition",
            Command::RollDeathSave { .. } => "RollDeathSave",
            Command::Stabilize { .. } => "Stabilize",
            Command::Heal { .. } => "Heal",
            Command::EndConcentration { .. } => "EndConcentration",
            Command::DealDamage { .. } => "DealDamage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_round_trips_through_json() {
        let cmd = Command::Attack {
            attacker_id: "a".into(),
            target_id: "b".into(),
            attack_name: "longsword".into(),
            adv_state: AdvState::Normal,
            economy: "action".into(),
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"type\":\"Attack\""));
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(cmd, back);
    }

    #[test]
    fn actor_id_reads_the_named_combatant() {
        let cmd = Command::Move {
            mover_id: "m".into(),
            path: vec![(1, 0)],
        };
        assert_eq!(cmd.actor_id(), Some(&"m".to_string()));
    }
}
