//! Weapon- and spell-attack resolution: roll to hit, roll damage, apply it.

use crate::combat::{adjust_damage_for_target, apply_damage_direct, apply_damage_with_temp_hp, maybe_run_concentration_check, maybe_transition_unconscious};
use crate::error::EngineError;
use crate::events::{EventEnvelope, EventPayload};
use crate::middleware::{effect_snapshot, run_attack_hooks, run_damage_hooks, RollMiddleware};
use crate::model::types::{combine_adv_states, AdvState, CombatantId};
use crate::model::EncounterState;
use crate::rolls::{roll_d20, roll_damage};
use crate::spells::AttackSpell;

/// Advantage/disadvantage derived from the target's and attacker's
/// conditions: restrained grants advantage to anyone attacking it; prone
/// grants advantage in melee and disadvantage at range; a restrained
/// attacker fights at disadvantage regardless of range.
fn condition_adv_state(
    state: &EncounterState,
    attacker_id: &CombatantId,
    target_id: &CombatantId,
    melee: bool,
) -> AdvState {
    let target = &state.combatants[target_id.as_str()];
    let mut adv = false;
    let mut dis = false;
    if target.has_condition(crate::model::types::RESTRAINED) {
        adv = true;
    }
    if target.has_condition(crate::model::types::PRONE) {
        if melee {
            adv = true;
        } else {
            dis = true;
        }
    }
    let attacker = &state.combatants[attacker_id.as_str()];
    if attacker.has_condition(crate::model::types::RESTRAINED) {
        dis = true;
    }
    match (adv, dis) {
        (true, true) => AdvState::Normal,
        (true, false) => AdvState::Advantage,
        (false, true) => AdvState::Disadvantage,
        (false, false) => AdvState::Normal,
    }
}

/// Resolve one weapon attack (used by `Attack`, each step of `Multiattack`,
/// and a reaction-triggered opportunity attack).
pub fn resolve_weapon_attack(
    state: &mut EncounterState,
    middlewares: &[Box<dyn RollMiddleware>],
    attacker_id: &CombatantId,
    target_id: &CombatantId,
    attack_name: &str,
    commanded_adv_state: AdvState,
) -> Result<Vec<EventEnvelope>, EngineError> {
    let profile = state.combatants[attacker_id.as_str()]
        .attacks
        .get(attack_name)
        .cloned()
        .ok_or_else(|| EngineError::MalformedState(format!("unknown attack {attack_name}")))?;

    let mut events = Vec::new();
    events.push(EventEnvelope::next(
        state,
        Some(attacker_id.clone()),
        EventPayload::AttackDeclared {
            attacker_id: attacker_id.clone(),
            target_id: target_id.clone(),
            attack_name: attack_name.to_string(),
            attack_kind: "weapon".to_string(),
            context: "action".to_string(),
            economy: "action".to_string(),
        },
    ));

    let melee = profile.reach_ft <= 5;
    let adv_state = combine_adv_states([condition_adv_state(state, attacker_id, target_id, melee), commanded_adv_state]);

    let effects = effect_snapshot(state);
    let mods = run_attack_hooks(middlewares, &effects, attacker_id, &mut state.rng);
    let roll_seq = state.seq;
    let roll = roll_d20(&mut state.rng, "attack", adv_state, mods, roll_seq);
    let target_ac = state.combatants[target_id.as_str()].ac;
    events.push(EventEnvelope::next(
        state,
        Some(attacker_id.clone()),
        EventPayload::AttackRolled {
            attacker_id: attacker_id.clone(),
            target_id: target_id.clone(),
            roll: roll.clone(),
            to_hit_bonus: profile.to_hit_bonus,
            target_ac,
        },
    ));

    if roll.nat == 1 {
        events.push(EventEnvelope::next(
            state,
            Some(attacker_id.clone()),
            EventPayload::MissConfirmed {
                attacker_id: attacker_id.clone(),
                target_id: target_id.clone(),
                margin: (roll.total + profile.to_hit_bonus) - target_ac as i64,
            },
        ));
        return Ok(events);
    }

    let total = roll.total + profile.to_hit_bonus;
    let margin = total - target_ac as i64;
    let auto_hit = roll.nat == 20;
    if margin < 0 && !auto_hit {
        events.push(EventEnvelope::next(
            state,
            Some(attacker_id.clone()),
            EventPayload::MissConfirmed {
                attacker_id: attacker_id.clone(),
                target_id: target_id.clone(),
                margin,
            },
        ));
        return Ok(events);
    }
    let target_unconscious = state.combatants[target_id.as_str()].has_condition(crate::model::types::UNCONSCIOUS);
    let is_critical = auto_hit || (melee && target_unconscious);
    events.push(EventEnvelope::next(
        state,
        Some(attacker_id.clone()),
        EventPayload::HitConfirmed {
            attacker_id: attacker_id.clone(),
            target_id: target_id.clone(),
            is_critical,
            margin,
        },
    ));

    let effects = effect_snapshot(state);
    let damage_mods = run_damage_hooks(middlewares, &effects, attacker_id, Some(target_id), &mut state.rng);
    let damage_roll_seq = state.seq;
    let damage_roll = roll_damage(&mut state.rng, &profile.damage_formula, is_critical, damage_mods, damage_roll_seq)?;
    events.push(EventEnvelope::next(
        state,
        Some(attacker_id.clone()),
        EventPayload::DamageRolled {
            attacker_id: attacker_id.clone(),
            target_id: target_id.clone(),
            roll: damage_roll.clone(),
            damage_type: profile.damage_type.clone(),
        },
    ));

    let (adjusted, modifier) = adjust_damage_for_target(state, target_id, damage_roll.total, &profile.damage_type);
    let (hp_before, hp_after) = apply_damage_with_temp_hp(state, target_id, adjusted);
    events.push(EventEnvelope::next(
        state,
        Some(attacker_id.clone()),
        EventPayload::DamageApplied {
            attacker_id: attacker_id.clone(),
            target_id: target_id.clone(),
            raw: damage_roll.total,
            adjusted,
            damage_type: profile.damage_type.clone(),
            hp_before,
            hp_after,
            modifier,
            is_critical,
        },
    ));

    events.extend(maybe_transition_unconscious(state, target_id, hp_after, "attack"));
    events.extend(maybe_run_concentration_check(state, target_id, adjusted, "attack"));

    Ok(events)
}

/// Resolve a spell attack roll (`guiding_bolt`, `ray_of_frost`): single
/// target, no condition-derived advantage, damage applied directly to hp
/// (bypasses temp_hp, matching the save-effect path).
pub fn resolve_attack_spell(
    state: &mut EncounterState,
    middlewares: &[Box<dyn RollMiddleware>],
    caster_id: &CombatantId,
    spell: &AttackSpell,
    to_hit_bonus: i64,
    target_id: &CombatantId,
) -> Result<Vec<EventEnvelope>, EngineError> {
    let mut events = Vec::new();
    events.push(EventEnvelope::next(
        state,
        Some(caster_id.clone()),
        EventPayload::AttackDeclared {
            attacker_id: caster_id.clone(),
            target_id: target_id.clone(),
            attack_name: spell.base.name.clone(),
            attack_kind: "spell".to_string(),
            context: "spell".to_string(),
            economy: "action".to_string(),
        },
    ));

    let effects = effect_snapshot(state);
    let mods = run_attack_hooks(middlewares, &effects, caster_id, &mut state.rng);
    let roll_seq = state.seq;
    let roll = roll_d20(&mut state.rng, "attack", AdvState::Normal, mods, roll_seq);
    let target_ac = state.combatants[target_id.as_str()].ac;
    events.push(EventEnvelope::next(
        state,
        Some(caster_id.clone()),
        EventPayload::AttackRolled {
            attacker_id: caster_id.clone(),
            target_id: target_id.clone(),
            roll: roll.clone(),
            to_hit_bonus,
            target_ac,
        },
    ));

    if roll.nat == 1 {
        events.push(EventEnvelope::next(
            state,
            Some(caster_id.clone()),
            EventPayload::MissConfirmed {
                attacker_id: caster_id.clone(),
                target_id: target_id.clone(),
                margin: (roll.total + to_hit_bonus) - target_ac as i64,
            },
        ));
        return Ok(events);
    }

    let total = roll.total + to_hit_bonus;
    let margin = total - target_ac as i64;
    let is_critical = roll.nat == 20;
    if margin < 0 && !is_critical {
        events.push(EventEnvelope::next(
            state,
            Some(caster_id.clone()),
            EventPayload::MissConfirmed {
                attacker_id: caster_id.clone(),
                target_id: target_id.clone(),
                margin,
            },
        ));
        return Ok(events);
    }
    events.push(EventEnvelope::next(
        state,
        Some(caster_id.clone()),
        EventPayload::HitConfirmed {
            attacker_id: caster_id.clone(),
            target_id: target_id.clone(),
            is_critical,
            margin,
        },
    ));

    let effects = effect_snapshot(state);
    let damage_mods = run_damage_hooks(middlewares, &effects, caster_id, Some(target_id), &mut state.rng);
    let damage_roll_seq = state.seq;
    let damage_roll = roll_damage(&mut state.rng, &spell.damage_formula, is_critical, damage_mods, damage_roll_seq)?;
    events.push(EventEnvelope::next(
        state,
        Some(caster_id.clone()),
        EventPayload::DamageRolled {
            attacker_id: caster_id.clone(),
            target_id: target_id.clone(),
            roll: damage_roll.clone(),
            damage_type: spell.damage_type.clone(),
        },
    ));

    let (adjusted, modifier) = adjust_damage_for_target(state, target_id, damage_roll.total, &spell.damage_type);
    let (hp_before, hp_after) = apply_damage_direct(state, target_id, adjusted);
    events.push(EventEnvelope::next(
        state,
        Some(caster_id.clone()),
        EventPayload::DamageApplied {
            attacker_id: caster_id.clone(),
            target_id: target_id.clone(),
            raw: damage_roll.total,
            adjusted,
            damage_type: spell.damage_type.clone(),
            hp_before,
            hp_after,
            modifier,
            is_critical,
        },
    ));

    events.extend(maybe_transition_unconscious(state, target_id, hp_after, "spell_attack"));
    events.extend(maybe_run_concentration_check(state, target_id, adjusted, "attack"));

    Ok(events)
}
