//! Shared combat mechanics used by both the reducer and the spell
//! resolvers: damage adjustment, HP application, the unconscious
//! transition, and the concentration check.

use crate::events::{EventEnvelope, EventPayload};
use crate::model::types::{CombatantId, DamageModifier};
use crate::model::EncounterState;
use crate::rolls::roll_d20;

/// Adjust `raw` damage for the target's resistances/vulnerabilities/immunities.
/// Immunity takes precedence over either of the other two, matching the
/// usual tabletop stacking rule (they never combine).
pub fn adjust_damage_for_target(
    state: &EncounterState,
    target_id: &CombatantId,
    raw: i64,
    damage_type: &str,
) -> (i64, Option<DamageModifier>) {
    let target = &state.combatants[target_id.as_str()];
    if target.damage_immunities.contains(damage_type) {
        (0, Some(DamageModifier::Immune))
    } else if target.damage_resistances.contains(damage_type) {
        (raw / 2, Some(DamageModifier::Resistant))
    } else if target.damage_vulnerabilities.contains(damage_type) {
        (raw * 2, Some(DamageModifier::Vulnerable))
    } else {
        (raw, None)
    }
}

/// Apply `adjusted` damage directly to `hp_current`, ignoring `temp_hp`.
/// Used by the save-effect and spell-attack resolution paths, which bypass
/// temporary hit points entirely.
pub fn apply_damage_direct(state: &mut EncounterState, target_id: &CombatantId, adjusted: i64) -> (i32, i32) {
    let target = state.combatants.get_mut(target_id).expect("target must exist");
    let hp_before = target.hp_current;
    let hp_after = (hp_before as i64 - adjusted.max(0)).max(0) as i32;
    target.hp_current = hp_after;
    (hp_before, hp_after)
}

/// Apply `adjusted` damage, draining `temp_hp` first. Used by weapon-attack
/// resolution.
pub fn apply_damage_with_temp_hp(state: &mut EncounterState, target_id: &CombatantId, adjusted: i64) -> (i32, i32) {
    let target = state.combatants.get_mut(target_id).expect("target must exist");
    let hp_before = target.hp_current;
    let mut remaining = adjusted.max(0);
    if target.temp_hp > 0 {
        let drained = remaining.min(target.temp_hp as i64);
        target.temp_hp -= drained as i32;
        remaining -= drained;
    }
    let hp_after = (target.hp_current as i64 - remaining).max(0) as i32;
    target.hp_current = hp_after;
    (hp_before, hp_after)
}

/// After any damage application: if the target just dropped to 0 hp and
/// wasn't already unconscious, mark it so and (for player characters) reset
/// death-save counters and emit the transition events.
pub fn maybe_transition_unconscious(
    state: &mut EncounterState,
    target_id: &CombatantId,
    hp_after: i32,
    reason: &str,
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    if hp_after > 0 {
        return events;
    }
    let already_unconscious = state.combatants[target_id.as_str()].has_condition(crate::model::types::UNCONSCIOUS);
    if already_unconscious {
        return events;
    }
    let target = state.combatants.get_mut(target_id).expect("target must exist");
    target.conditions.insert(crate::model::types::UNCONSCIOUS.to_string());
    if target.is_player_character {
        target.death_save_successes = 0;
        target.death_save_failures = 0;
    }
    events.push(EventEnvelope::next(
        state,
        None,
        EventPayload::ConditionApplied {
            target_id: target_id.clone(),
            condition: crate::model::types::UNCONSCIOUS.to_string(),
            reason: reason.to_string(),
        },
    ));
    events.push(EventEnvelope::next(
        state,
        None,
        EventPayload::UnconsciousStateChanged {
            target_id: target_id.clone(),
            became_unconscious: true,
            reason: reason.to_string(),
        },
    ));
    events
}

/// Run a concentration check for `combatant_id` after taking `damage_taken`,
/// DC = max(10, floor(damage/2)). On failure, ends concentration and strips
/// every effect anchored to it.
pub fn maybe_run_concentration_check(
    state: &mut EncounterState,
    combatant_id: &CombatantId,
    damage_taken: i64,
    cause: &str,
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    let concentrating = state.combatants.get(combatant_id).and_then(|c| c.concentration.clone());
    let Some(effect_ref) = concentrating else {
        return events;
    };
    if damage_taken <= 0 {
        return events;
    }

    let incapacitated = {
        let target = &state.combatants[combatant_id.as_str()];
        target.hp_current == 0 || target.has_condition(crate::model::types::UNCONSCIOUS)
    };
    if incapacitated {
        events.push(EventEnvelope::next(
            state,
            Some(combatant_id.clone()),
            EventPayload::ConcentrationBroken {
                combatant_id: combatant_id.clone(),
                reason: "incapacitated".to_string(),
            },
        ));
        events.extend(end_concentration(state, combatant_id, &effect_ref.effect_name, "incapacitated"));
        return events;
    }

    let dc = (damage_taken / 2).max(10) as i32;
    events.push(EventEnvelope::next(
        state,
        Some(combatant_id.clone()),
        EventPayload::ConcentrationCheckTriggered {
            combatant_id: combatant_id.clone(),
            dc,
            damage_taken,
            cause: cause.to_string(),
        },
    ));

    let save_bonus = state.combatants[combatant_id.as_str()]
        .save_bonuses
        .get(&crate::model::types::Ability::Con)
        .copied()
        .unwrap_or(0);
    let (seq, _) = (state.seq, state.t);
    let roll = roll_d20(
        &mut state.rng,
        "concentration",
        crate::model::types::AdvState::Normal,
        Vec::new(),
        seq,
    );
    let total = roll.total + save_bonus;
    events.push(EventEnvelope::next(
        state,
        Some(combatant_id.clone()),
        EventPayload::ConcentrationCheckRolled {
            combatant_id: combatant_id.clone(),
            roll,
        },
    ));

    if total >= dc as i64 {
        events.push(EventEnvelope::next(
            state,
            Some(combatant_id.clone()),
            EventPayload::ConcentrationMaintained {
                combatant_id: combatant_id.clone(),
                total,
                dc,
            },
        ));
        return events;
    }

    events.push(EventEnvelope::next(
        state,
        Some(combatant_id.clone()),
        EventPayload::ConcentrationBroken {
            combatant_id: combatant_id.clone(),
            reason: "failed_save".to_string(),
        },
    ));
    events.extend(end_concentration(state, combatant_id, &effect_ref.effect_name, "broken"));
    events
}

/// End `combatant_id`'s concentration on `effect_name`: drop every effect it
/// anchors and clear the `concentration` pointer.
pub fn end_concentration(
    state: &mut EncounterState,
    combatant_id: &CombatantId,
    effect_name: &str,
    reason: &str,
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    let ended_ids: Vec<u64> = state
        .effects
        .values()
        .filter(|e| e.concentration_owner_id.as_deref() == Some(combatant_id.as_str()) && e.name == effect_name)
        .map(|e| e.id)
        .collect();
    for id in ended_ids {
        if let Some(effect) = state.effects.remove(&id) {
            let mut removed_conditions = Vec::new();
            if let Some(target) = state.combatants.get_mut(&effect.target_id) {
                for cond in &effect.applies_conditions {
                    target.conditions.remove(cond);
                    removed_conditions.push(cond.clone());
                }
            }
            events.push(EventEnvelope::next(
                state,
                None,
                EventPayload::EffectEnded {
                    effect_id: effect.id,
                    effect_name: effect.name.clone(),
                    removed_conditions,
                },
            ));
        }
    }
    if let Some(actor) = state.combatants.get_mut(combatant_id) {
        if actor.concentration.as_ref().map(|c| c.effect_name.as_str()) == Some(effect_name) {
            actor.concentration = None;
        }
    }
    events.push(EventEnvelope::next(
        state,
        Some(combatant_id.clone()),
        EventPayload::ConcentrationEnded {
            combatant_id: combatant_id.clone(),
            effect_name: effect_name.to_string(),
            reason: reason.to_string(),
        },
    ));
    events
}
