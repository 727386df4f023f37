//! Saving-throw resolution shared by the standalone `SaveEffect` command and
//! `CastSpell` against a save-based spell. Both paths share a single damage
//! roll across every target, and both apply damage directly to `hp_current`,
//! bypassing `temp_hp`.

use crate::combat::{adjust_damage_for_target, apply_damage_direct, maybe_run_concentration_check, maybe_transition_unconscious};
use crate::error::EngineError;
use crate::events::{EventEnvelope, EventPayload};
use crate::middleware::{effect_snapshot, run_damage_hooks, run_save_hooks, RollMiddleware};
use crate::model::types::{AdvState, Ability, CombatantId};
use crate::model::{ActiveEffect, EncounterState};
use crate::rolls::{roll_d20, roll_damage};

pub struct SaveEffectSpec<'a> {
    pub effect_name: &'a str,
    pub save_ability: Ability,
    pub dc: i32,
    pub adv_state: AdvState,
    pub on_success_half: bool,
    pub damage_formula: Option<&'a str>,
    pub damage_type: Option<&'a str>,
    pub on_fail_conditions: &'a [String],
    pub concentration_owner: Option<CombatantId>,
}

/// Resolve a save effect against every target in `target_ids`, sharing a
/// single damage roll (if the effect deals damage) across all of them.
pub fn resolve_save_effect(
    state: &mut EncounterState,
    middlewares: &[Box<dyn RollMiddleware>],
    source_id: &CombatantId,
    target_ids: &[CombatantId],
    spec: &SaveEffectSpec<'_>,
) -> Result<Vec<EventEnvelope>, EngineError> {
    let mut events = Vec::new();
    events.push(EventEnvelope::next(
        state,
        Some(source_id.clone()),
        EventPayload::SaveEffectDeclared {
            source_id: source_id.clone(),
            target_ids: target_ids.to_vec(),
            effect_name: spec.effect_name.to_string(),
            save_ability: format!("{:?}", spec.save_ability).to_lowercase(),
            dc: spec.dc,
            adv_state: spec.adv_state,
            on_success: if spec.on_success_half { "half".into() } else { "none".into() },
            damage_type: spec.damage_type.unwrap_or("").to_string(),
            damage_formula: spec.damage_formula.unwrap_or("").to_string(),
            economy: "action".to_string(),
        },
    ));

    let shared_damage_roll = if let Some(formula) = spec.damage_formula {
        let effects = effect_snapshot(state);
        let mods = run_damage_hooks(middlewares, &effects, source_id, None, &mut state.rng);
        let seq = state.seq;
        Some(roll_damage(&mut state.rng, formula, false, mods, seq)?)
    } else {
        None
    };

    for target_id in target_ids {
        let effects = effect_snapshot(state);
        let save_mods = run_save_hooks(middlewares, &effects, target_id, &mut state.rng);
        let save_bonus = state.combatants[target_id.as_str()]
            .save_bonuses
            .get(&spec.save_ability)
            .copied()
            .unwrap_or(0);
        let roll_seq = state.seq;
        let roll = roll_d20(&mut state.rng, "save", spec.adv_state, save_mods, roll_seq);
        events.push(EventEnvelope::next(
            state,
            Some(source_id.clone()),
            EventPayload::SavingThrowRolled {
                source_id: source_id.clone(),
                target_id: target_id.clone(),
                effect_name: spec.effect_name.to_string(),
                roll: roll.clone(),
                save_ability: format!("{:?}", spec.save_ability).to_lowercase(),
                dc: spec.dc,
                bonus: save_bonus,
            },
        ));

        let total = roll.total + save_bonus;
        let succeeded = total >= spec.dc as i64;
        let margin = total - spec.dc as i64;
        events.push(EventEnvelope::next(
            state,
            Some(source_id.clone()),
            if succeeded {
                EventPayload::SavingThrowSucceeded {
                    source_id: source_id.clone(),
                    target_id: target_id.clone(),
                    effect_name: spec.effect_name.to_string(),
                    margin,
                }
            } else {
                EventPayload::SavingThrowFailed {
                    source_id: source_id.clone(),
                    target_id: target_id.clone(),
                    effect_name: spec.effect_name.to_string(),
                    margin,
                }
            },
        ));

        if succeeded && spec.damage_formula.is_none() {
            events.push(EventEnvelope::next(
                state,
                Some(source_id.clone()),
                EventPayload::SaveEffectNegated {
                    source_id: source_id.clone(),
                    target_id: target_id.clone(),
                    effect_name: spec.effect_name.to_string(),
                },
            ));
            continue;
        }

        if !succeeded && !spec.on_fail_conditions.is_empty() {
            let effect_id = state.new_effect_id();
            let round = state.round;
            let effect = ActiveEffect {
                id: effect_id,
                name: spec.effect_name.to_string(),
                source_id: source_id.clone(),
                target_id: target_id.clone(),
                started_round: round,
                duration_rounds: None,
                concentration_owner_id: spec.concentration_owner.clone(),
                concentration_effect_name: spec.concentration_owner.as_ref().map(|_| spec.effect_name.to_string()),
                applies_conditions: spec.on_fail_conditions.iter().cloned().collect(),
            };
            state.effects.insert(effect_id, effect);
            events.push(EventEnvelope::next(
                state,
                Some(source_id.clone()),
                EventPayload::EffectApplied {
                    effect_id,
                    effect_name: spec.effect_name.to_string(),
                    source_id: source_id.clone(),
                    target_id: target_id.clone(),
                    concentration_owner_id: spec.concentration_owner.clone(),
                    concentration_effect_name: spec.concentration_owner.as_ref().map(|_| spec.effect_name.to_string()),
                    conditions: spec.on_fail_conditions.to_vec(),
                },
            ));
            for condition in spec.on_fail_conditions {
                state
                    .combatants
                    .get_mut(target_id)
                    .expect("target must exist")
                    .conditions
                    .insert(condition.clone());
                events.push(EventEnvelope::next(
                    state,
                    None,
                    EventPayload::ConditionApplied {
                        target_id: target_id.clone(),
                        condition: condition.clone(),
                        reason: format!("spell:{}", spec.effect_name),
                    },
                ));
            }
        }

        let Some(ref shared_roll) = shared_damage_roll else {
            continue;
        };
        events.push(EventEnvelope::next(
            state,
            Some(source_id.clone()),
            EventPayload::EffectDamageRolled {
                source_id: source_id.clone(),
                target_id: target_id.clone(),
                effect_name: spec.effect_name.to_string(),
                roll: shared_roll.clone(),
                damage_type: spec.damage_type.unwrap_or("").to_string(),
            },
        ));

        let raw = shared_roll.total;
        let adjusted = if succeeded && spec.on_success_half { raw / 2 } else { raw };
        let (adjusted_final, modifier) = adjust_damage_for_target(state, target_id, adjusted, spec.damage_type.unwrap_or(""));
        let (hp_before, hp_after) = apply_damage_direct(state, target_id, adjusted_final);
        events.push(EventEnvelope::next(
            state,
            Some(source_id.clone()),
            EventPayload::EffectDamageApplied {
                source_id: source_id.clone(),
                target_id: target_id.clone(),
                effect_name: spec.effect_name.to_string(),
                raw,
                adjusted,
                adjusted_final,
                damage_type: spec.damage_type.unwrap_or("").to_string(),
                hp_before,
                hp_after,
                modifier,
            },
        ));

        events.extend(maybe_transition_unconscious(state, target_id, hp_after, "effect"));
        events.extend(maybe_run_concentration_check(state, target_id, adjusted_final, "effect"));
    }

    Ok(events)
}
