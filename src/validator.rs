//! Command validation: the reducer's only gate. Every rejection the engine
//! can produce is decided here, before `reducer::apply_command` ever
//! touches state — a command that passes validation is guaranteed to apply
//! cleanly.

use crate::commands::Command;
use crate::error::{RejectionCode, ValidationError};
use crate::model::types::Phase;
use crate::model::{Combatant, EncounterState};
use crate::spells::SpellRegistry;

fn reject(code: RejectionCode, message: impl Into<String>) -> ValidationError {
    ValidationError::new(code, message)
}

fn require_combatant<'a>(
    state: &'a EncounterState,
    id: &str,
) -> Result<&'a Combatant, ValidationError> {
    state
        .combatants
        .get(id)
        .ok_or_else(|| reject(RejectionCode::UnknownCombatant, format!("no such combatant: {id}")))
}

fn require_in_turn(state: &EncounterState, actor_id: &str) -> Result<(), ValidationError> {
    if state.phase != Phase::InTurn {
        return Err(reject(RejectionCode::NotInTurn, "not currently in a turn"));
    }
    match &state.turn_owner_id {
        Some(owner) if owner == actor_id => Ok(()),
        _ => Err(reject(RejectionCode::NotYourTurn, "it is not this combatant's turn")),
    }
}

fn require_alive_and_able(actor: &Combatant) -> Result<(), ValidationError> {
    if actor.is_dead {
        return Err(reject(RejectionCode::Dead, "combatant is dead"));
    }
    if actor.has_condition(crate::model::types::UNCONSCIOUS)
        || actor.has_condition(crate::model::types::PARALYZED)
    {
        return Err(reject(
            RejectionCode::Incapacitated,
            "combatant cannot act while incapacitated",
        ));
    }
    if actor.surprised {
        return Err(reject(RejectionCode::SurprisedBlock, "combatant is surprised"));
    }
    Ok(())
}

/// Validate `cmd` against `state`. `spells` is consulted only for
/// `CastSpell`. Returns `Ok(())` when the reducer may safely apply `cmd`.
pub fn validate_command(
    state: &EncounterState,
    cmd: &Command,
    spells: &SpellRegistry,
) -> Result<(), ValidationError> {
    if state.reaction_window.is_some() && !matches!(cmd, Command::UseReaction { .. } | Command::DeclineReaction { .. }) {
        return Err(reject(RejectionCode::ReactionWindowOpen, "a reaction window is open"));
    }

    match cmd {
        Command::StartCombat => {
            if state.combat_started {
                return Err(reject(RejectionCode::CombatAlreadyStarted, "combat already started"));
            }
            if state.combatants.is_empty() {
                return Err(reject(RejectionCode::NoCombatants, "no combatants registered"));
            }
            Ok(())
        }

        Command::SetInitiative {
            combatant_id,
            initiative: _,
        } => {
            require_combatant(state, combatant_id)?;
            if state.initiative_finalized {
                return Err(reject(RejectionCode::InitiativeFinalized, "initiative order already finalized"));
            }
            Ok(())
        }

        Command::RollInitiative { combatant_id, .. } => {
            require_combatant(state, combatant_id)?;
            if state.initiative_finalized {
                return Err(reject(RejectionCode::InitiativeFinalized, "initiative order already finalized"));
            }
            Ok(())
        }

        Command::FinalizeInitiativeOrder => {
            if !state.combat_started {
                return Err(reject(RejectionCode::CombatNotStarted, "combat has not started"));
            }
            if state.initiatives.len() != state.combatants.len() {
                return Err(reject(
                    RejectionCode::MissingInitiative,
                    "not every combatant has a recorded initiative",
                ));
            }
            Ok(())
        }

        Command::BeginTurn { combatant_id } => {
            if !state.initiative_finalized {
                return Err(reject(RejectionCode::BadPhase, "initiative order not finalized"));
            }
            if state.phase == Phase::InTurn {
                return Err(reject(RejectionCode::AlreadyInTurn, "a turn is already in progress"));
            }
            match &state.turn_owner_id {
                Some(owner) if owner == combatant_id => Ok(()),
                _ => Err(reject(RejectionCode::NotYourTurn, "it is not this combatant's turn")),
            }
        }

        Command::EndTurn { combatant_id } => {
            require_in_turn_phase_only(state)?;
            match &state.turn_owner_id {
                Some(owner) if owner == combatant_id => Ok(()),
                _ => Err(reject(RejectionCode::NotYourTurn, "it is not this combatant's turn")),
            }
        }

        Command::Disengage { combatant_id } => {
            let actor = require_combatant(state, combatant_id)?;
            require_in_turn(state, combatant_id)?;
            require_alive_and_able(actor)?;
            if !actor.action_available {
                return Err(reject(RejectionCode::NoAction, "no action available"));
            }
            Ok(())
        }

        Command::Move { mover_id, path } => {
            let actor = require_combatant(state, mover_id)?;
            require_in_turn(state, mover_id)?;
            require_alive_and_able(actor)?;
            if actor.has_condition(crate::model::types::GRAPPLED)
                || actor.has_condition(crate::model::types::RESTRAINED)
            {
                return Err(reject(RejectionCode::ConditionBlocksMove, "a condition prevents movement"));
            }
            if path.is_empty() {
                return Err(reject(RejectionCode::EmptyPath, "movement path is empty"));
            }
            if actor.effective_speed_ft() <= 0 {
                return Err(reject(RejectionCode::NoMovement, "no movement remaining"));
            }
            Ok(())
        }

        Command::UseReaction { reactor_id, attack_name, .. } => {
            let actor = require_combatant(state, reactor_id)?;
            let window = state
                .reaction_window
                .as_ref()
                .ok_or_else(|| reject(RejectionCode::NoReactionWindow, "no reaction window is open"))?;
            if window.threatened_by_id != *reactor_id {
                return Err(reject(RejectionCode::NotEligibleReactor, "combatant is not the eligible reactor"));
            }
            if !actor.reaction_available {
                return Err(reject(RejectionCode::NoReaction, "no reaction available"));
            }
            if actor.surprised {
                return Err(reject(RejectionCode::SurprisedBlockReaction, "surprised combatants cannot react"));
            }
            if !actor.attacks.contains_key(attack_name) {
                return Err(reject(RejectionCode::UnknownAttack, format!("no such attack: {attack_name}")));
            }
            Ok(())
        }

        Command::DeclineReaction { reactor_id } => {
            require_combatant(state, reactor_id)?;
            let window = state
                .reaction_window
                .as_ref()
                .ok_or_else(|| reject(RejectionCode::NoReactionWindow, "no reaction window is open"))?;
            if window.threatened_by_id != *reactor_id {
                return Err(reject(RejectionCode::NotEligibleReactor, "combatant is not the eligible reactor"));
            }
            Ok(())
        }

        Command::Attack {
            attacker_id,
            target_id,
            attack_name,
            ..
        } => {
            let actor = require_combatant(state, attacker_id)?;
            require_in_turn(state, attacker_id)?;
            require_alive_and_able(actor)?;
            require_combatant(state, target_id)?;
            let profile = actor
                .attacks
                .get(attack_name)
                .ok_or_else(|| reject(RejectionCode::UnknownAttack, format!("no such attack: {attack_name}")))?;
            if profile.uses_action && actor.attack_action_started && actor.attack_action_remaining == 0 {
                return Err(reject(RejectionCode::NoAttacksRemaining, "no attacks remaining this action"));
            }
            if profile.uses_action && !actor.attack_action_started && !actor.action_available {
                return Err(reject(RejectionCode::AttackNotAction, "no action available for this attack"));
            }
            if profile.uses_bonus_action && !actor.bonus_available {
                return Err(reject(RejectionCode::AttackNotBonus, "no bonus action available for this attack"));
            }
            Ok(())
        }

        Command::Multiattack {
            attacker_id,
            target_id,
            multiattack_name,
            ..
        } => {
            let actor = require_combatant(state, attacker_id)?;
            require_in_turn(state, attacker_id)?;
            require_alive_and_able(actor)?;
            require_combatant(state, target_id)?;
            let multi = actor.multiattacks.get(multiattack_name).ok_or_else(|| {
                reject(RejectionCode::UnknownMultiattack, format!("no such multiattack: {multiattack_name}"))
            })?;
            if multi.attacks.is_empty() {
                return Err(reject(
                    RejectionCode::MultiattackMissingAttacks,
                    "multiattack names no attacks",
                ));
            }
            if !actor.action_available {
                return Err(reject(RejectionCode::NoAction, "no action available"));
            }
            Ok(())
        }

        Command::CastSpell {
            caster_id,
            spell_name,
            target_ids,
            slot_level,
        } => {
            let caster = require_combatant(state, caster_id)?;
            require_in_turn(state, caster_id)?;
            require_alive_and_able(caster)?;
            let spell = spells
                .get(spell_name)
                .ok_or_else(|| reject(RejectionCode::UnknownSpell, format!("no such spell: {spell_name}")))?;
            if target_ids.is_empty() {
                return Err(reject(RejectionCode::NoTargets, "no targets named"));
            }
            for id in target_ids {
                require_combatant(state, id)?;
            }
            let base = spell.base();
            if base.slot_level > 0 {
                let level = slot_level.unwrap_or(base.slot_level).max(base.slot_level);
                if caster.spell_save_dc.is_none() {
                    return Err(reject(RejectionCode::MissingSpellSaveDc, "caster has no spell save DC"));
                }
                let available = caster.spell_slots_current.get(&level).copied().unwrap_or(0);
                if level < base.slot_level {
                    return Err(reject(RejectionCode::SlotTooLow, "slot level too low for this spell"));
                }
                if available == 0 {
                    return Err(reject(RejectionCode::NoSpellSlot, "no spell slots of that level remain"));
                }
            }
            Ok(())
        }

        Command::SaveEffect {
            source_id,
            target_ids,
            save_ability: _,
            dc: _,
            ..
        } => {
            let actor = require_combatant(state, source_id)?;
            require_alive_and_able(actor)?;
            if target_ids.is_empty() {
                return Err(reject(RejectionCode::NoTargets, "no targets named"));
            }
            for id in target_ids {
                require_combatant(state, id)?;
            }
            Ok(())
        }

        Command::ApplyCondition { target_id, .. } | Command::RemoveCondition { target_id, .. } => {
            require_combatant(state, target_id)?;
            Ok(())
        }

        Command::RollDeathSave { combatant_id } => {
            let target = require_combatant(state, combatant_id)?;
            if !target.is_player_character {
                return Err(reject(RejectionCode::NotAPc, "only player characters roll death saves"));
            }
            if !target.is_dying() {
                return Err(reject(RejectionCode::NotDying, "combatant is not dying"));
            }
            Ok(())
        }

        Command::Stabilize { target_id, .. } => {
            let target = require_combatant(state, target_id)?;
            if !target.is_player_character {
                return Err(reject(RejectionCode::TargetNotPc, "target is not a player character"));
            }
            if target.is_dead {
                return Err(reject(RejectionCode::TargetDead, "target is dead"));
            }
            if target.is_stable {
                return Err(reject(RejectionCode::TargetAlreadyStable, "target is already stable"));
            }
            if !target.is_dying() {
                return Err(reject(RejectionCode::TargetNotDying, "target is not dying"));
            }
            Ok(())
        }

        Command::Heal { target_id, amount, .. } => {
            require_combatant(state, target_id)?;
            if *amount <= 0 {
                return Err(reject(RejectionCode::BadAmount, "heal amount must be positive"));
            }
            Ok(())
        }

        Command::EndConcentration { combatant_id } => {
            let actor = require_combatant(state, combatant_id)?;
            if actor.concentration.is_none() {
                return Err(reject(RejectionCode::NoConcentration, "combatant is not concentrating"));
            }
            Ok(())
        }

        Command::DealDamage {
            source_id,
            target_id,
            amount,
            ..
        } => {
            require_combatant(state, source_id)?;
            require_combatant(state, target_id)?;
            if *amount < 0 {
                return Err(reject(RejectionCode::BadAmount, "damage amount cannot be negative"));
            }
            Ok(())
        }
    }
}

fn require_in_turn_phase_only(state: &EncounterState) -> Result<(), ValidationError> {
    if state.phase != Phase::InTurn {
        return Err(reject(RejectionCode::NotInTurn, "not currently in a turn"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EncounterState;

    fn fresh_state() -> EncounterState {
        EncounterState::new(1).with_combatant(Combatant::new("a", "Fighter", 16, 20))
    }

    #[test]
    fn start_combat_rejects_empty_roster() {
        let state = EncounterState::new(1);
        let err = validate_command(&state, &Command::StartCombat, &SpellRegistry::core()).unwrap_err();
        assert_eq!(err.code, RejectionCode::NoCombatants);
    }

    #[test]
    fn start_combat_accepts_nonempty_roster() {
        let state = fresh_state();
        assert!(validate_command(&state, &Command::StartCombat, &SpellRegistry::core()).is_ok());
    }

    #[test]
    fn attack_rejects_unknown_combatant() {
        let state = fresh_state();
        let cmd = Command::Attack {
            attacker_id: "ghost".into(),
            target_id: "a".into(),
            attack_name: "sword".into(),
            adv_state: crate::model::types::AdvState::Normal,
            economy: "action".into(),
        };
        let err = validate_command(&state, &cmd, &SpellRegistry::core()).unwrap_err();
        assert_eq!(err.code, RejectionCode::UnknownCombatant);
    }

    #[test]
    fn cast_spell_rejects_unknown_spell_name() {
        let mut state = fresh_state();
        state.phase = Phase::InTurn;
        state.turn_owner_id = Some("a".into());
        let cmd = Command::CastSpell {
            caster_id: "a".into(),
            spell_name: "wish".into(),
            target_ids: vec!["a".into()],
            slot_level: None,
        };
        let err = validate_command(&state, &cmd, &SpellRegistry::core()).unwrap_err();
        assert_eq!(err.code, RejectionCode::UnknownSpell);
    }
}
