//! The reducer: `(state, command) -> (state', events)`.
//!
//! A command is validated first; a rejection becomes a single
//! `CommandRejected` event and never reaches the match arms below. Anything
//! that gets this far is guaranteed well-formed, so the arms themselves
//! only ever fail on a genuinely fatal condition (an unparseable dice
//! formula baked into static data), surfaced as `EngineError`.

use crate::combat::{
    adjust_damage_for_target, apply_damage_with_temp_hp, end_concentration, maybe_run_concentration_check,
    maybe_transition_unconscious,
};
use crate::commands::Command;
use crate::error::EngineError;
use crate::events::{EventEnvelope, EventPayload};
use crate::middleware::RollMiddleware;
use crate::model::combatant::EffectRef;
use crate::model::types::{AdvState, CombatantId, Phase};
use crate::model::EncounterState;
use crate::resolvers::{resolve_attack_spell, resolve_save_effect, resolve_weapon_attack, SaveEffectSpec};
use crate::rolls::roll_d20;
use crate::spells::{SpellDefinition, SpellEconomy, SpellRegistry};
use crate::validator::validate_command;

/// Apply `cmd` to `state`, returning the new state and the events produced.
/// Only a fatal, data-level failure (e.g. a malformed damage formula)
/// surfaces as `Err`; an invalid command becomes an `Ok` result carrying a
/// single `CommandRejected` event.
pub fn apply_command(
    mut state: EncounterState,
    cmd: Command,
    spells: &SpellRegistry,
    middlewares: &[Box<dyn RollMiddleware>],
) -> Result<(EncounterState, Vec<EventEnvelope>), EngineError> {
    log::debug!("dispatching command {}", cmd.type_name());
    if let Err(err) = validate_command(&state, &cmd, spells) {
        log::warn!("command rejected: {}", err.code.as_str());
        let command_json = serde_json::to_value(&cmd).unwrap_or(serde_json::Value::Null);
        let actor = cmd.actor_id().cloned();
        let event = EventEnvelope::next(
            &mut state,
            actor,
            EventPayload::CommandRejected {
                command: command_json,
                code: err.code.as_str().to_string(),
                message: err.message,
                meta: err.meta,
            },
        );
        return Ok((state, vec![event]));
    }

    let events = dispatch(&mut state, cmd, spells, middlewares)?;
    for event in &events {
        log::trace!("emitted event {}", event.payload.type_name());
    }
    Ok((state, events))
}

fn dispatch(
    state: &mut EncounterState,
    cmd: Command,
    spells: &SpellRegistry,
    middlewares: &[Box<dyn RollMiddleware>],
) -> Result<Vec<EventEnvelope>, EngineError> {
    match cmd {
        Command::StartCombat => {
            state.combat_started = true;
            state.phase = Phase::SetupInitiative;
            Ok(vec![EventEnvelope::next(state, None, EventPayload::CombatStarted)])
        }

        Command::SetInitiative { combatant_id, initiative } => {
            state.initiatives.insert(combatant_id.clone(), initiative);
            Ok(vec![EventEnvelope::next(
                state,
                Some(combatant_id.clone()),
                EventPayload::InitiativeSet { combatant_id, initiative },
            )])
        }

        Command::RollInitiative { combatant_id, bonus } => {
            let roll_seq = state.seq;
            let roll = roll_d20(&mut state.rng, "initiative", AdvState::Normal, Vec::new(), roll_seq);
            let total = (roll.total + bonus) as i32;
            state.initiatives.insert(combatant_id.clone(), total);
            Ok(vec![EventEnvelope::next(
                state,
                Some(combatant_id.clone()),
                EventPayload::InitiativeRolled { combatant_id, roll, bonus: bonus as i32 },
            )])
        }

        Command::FinalizeInitiativeOrder => {
            let mut ids: Vec<CombatantId> = state.combatants.keys().cloned().collect();
            ids.sort_by(|a, b| {
                let ia = state.initiatives.get(a).copied().unwrap_or(0);
                let ib = state.initiatives.get(b).copied().unwrap_or(0);
                ib.cmp(&ia).then_with(|| a.cmp(b))
            });
            state.initiative_order = ids.clone();
            state.initiative_finalized = true;
            state.turn_owner_id = ids.first().cloned();
            Ok(vec![EventEnvelope::next(
                state,
                None,
                EventPayload::InitiativeOrderFinalized { initiative_order: ids },
            )])
        }

        Command::BeginTurn { combatant_id } => {
            let owner_id = combatant_id;
            let mut events = Vec::new();
            if state.round == 1 && state.initiative_order.first() == Some(&owner_id) {
                events.push(EventEnvelope::next(state, None, EventPayload::RoundStarted));
            }
            {
                let owner = state.combatants.get_mut(&owner_id).expect("combatant must exist");
                owner.action_available = true;
                owner.bonus_available = true;
                owner.reaction_available = true;
                owner.movement_remaining_ft = owner.effective_speed_ft();
                owner.attack_action_started = false;
                owner.attack_action_remaining = 0;
            }
            state.phase = Phase::InTurn;
            let owner = &state.combatants[owner_id.as_str()];
            let owner_speed = owner.speed_ft;
            let pc_dying = owner.is_dying();
            if pc_dying {
                events.push(EventEnvelope::next(
                    state,
                    Some(owner_id.clone()),
                    EventPayload::DeathSaveRequired { combatant_id: owner_id.clone() },
                ));
            }
            events.push(EventEnvelope::next(state, Some(owner_id.clone()), EventPayload::TurnStarted));
            events.push(EventEnvelope::next(
                state,
                Some(owner_id.clone()),
                EventPayload::TurnResourcesReset {
                    action: true,
                    bonus: true,
                    reaction: true,
                    movement_ft: owner_speed,
                },
            ));
            state.combatants.get_mut(&owner_id).expect("combatant must exist").has_taken_first_turn = true;
            Ok(events)
        }

        Command::EndTurn { combatant_id } => {
            let owner_id = combatant_id;
            let mut events = vec![EventEnvelope::next(state, Some(owner_id.clone()), EventPayload::TurnEnded)];
            state
                .combatants
                .get_mut(&owner_id)
                .expect("combatant must exist")
                .no_opportunity_attacks_until_turn_end = false;

            let idx = state.initiative_order.iter().position(|id| *id == owner_id).unwrap_or(0);
            let next_idx = idx + 1;
            if next_idx >= state.initiative_order.len() {
                state.round += 1;
                state.turn_owner_id = state.initiative_order.first().cloned();
            } else {
                state.turn_owner_id = Some(state.initiative_order[next_idx].clone());
            }
            state.phase = Phase::Idle;
            if state.round > 1 {
                events.push(EventEnvelope::next(state, None, EventPayload::RoundStarted));
            }
            Ok(events)
        }

        Command::Disengage { combatant_id } => {
            {
                let actor = state.combatants.get_mut(&combatant_id).expect("combatant must exist");
                actor.action_available = false;
                actor.no_opportunity_attacks_until_turn_end = true;
            }
            Ok(vec![EventEnvelope::next(
                state,
                Some(combatant_id.clone()),
                EventPayload::DisengageApplied { combatant_id },
            )])
        }

        Command::Move { mover_id, path } => dispatch_move(state, mover_id, path),

        Command::UseReaction { reactor_id, attack_name, adv_state } => {
            let window = state.reaction_window.clone().expect("reaction window must be open");
            let mut events =
                resolve_weapon_attack(state, middlewares, &reactor_id, &window.mover_id, &attack_name, adv_state)?;
            state.combatants.get_mut(&reactor_id).expect("combatant must exist").reaction_available = false;
            state.reaction_window = None;
            state.phase = Phase::InTurn;
            events.push(EventEnvelope::next(
                state,
                Some(reactor_id),
                EventPayload::ReactionWindowClosed { window_id: window.id, closed_by: "reaction_used".to_string() },
            ));
            Ok(events)
        }

        Command::DeclineReaction { reactor_id } => {
            let window = state.reaction_window.take().expect("reaction window must be open");
            state.phase = Phase::InTurn;
            Ok(vec![EventEnvelope::next(
                state,
                Some(reactor_id),
                EventPayload::ReactionWindowClosed { window_id: window.id, closed_by: "declined".to_string() },
            )])
        }

        Command::Attack { attacker_id, target_id, attack_name, adv_state, economy: _ } => {
            let profile = state.combatants[attacker_id.as_str()]
                .attacks
                .get(&attack_name)
                .cloned()
                .expect("attack must exist");
            {
                let actor = state.combatants.get_mut(&attacker_id).expect("combatant must exist");
                if profile.uses_action {
                    if !actor.attack_action_started {
                        actor.action_available = false;
                        actor.attack_action_started = true;
                        actor.attack_action_remaining = actor.attacks_per_action.saturating_sub(1);
                    } else {
                        actor.attack_action_remaining = actor.attack_action_remaining.saturating_sub(1);
                    }
                }
                if profile.uses_bonus_action {
                    actor.bonus_available = false;
                }
            }
            resolve_weapon_attack(state, middlewares, &attacker_id, &target_id, &attack_name, adv_state)
        }

        Command::Multiattack { attacker_id, target_id, multiattack_name, adv_state } => {
            let attack_names = state.combatants[attacker_id.as_str()]
                .multiattacks
                .get(&multiattack_name)
                .cloned()
                .expect("multiattack must exist")
                .attacks;
            {
                let actor = state.combatants.get_mut(&attacker_id).expect("combatant must exist");
                actor.action_available = false;
                actor.attack_action_started = false;
                actor.attack_action_remaining = 0;
            }
            let mut events = vec![EventEnvelope::next(
                state,
                Some(attacker_id.clone()),
                EventPayload::MultiattackDeclared {
                    attacker_id: attacker_id.clone(),
                    target_id: target_id.clone(),
                    multiattack_name,
                    attacks: attack_names.clone(),
                },
            )];
            for attack_name in &attack_names {
                events.extend(resolve_weapon_attack(state, middlewares, &attacker_id, &target_id, attack_name, adv_state)?);
            }
            Ok(events)
        }

        Command::CastSpell { caster_id, spell_name, target_ids, slot_level } => {
            dispatch_cast_spell(state, middlewares, spells, caster_id, spell_name, target_ids, slot_level)
        }

        Command::SaveEffect {
            source_id,
            target_ids,
            save_ability,
            dc,
            adv_state,
            on_success,
            damage_type,
            damage_formula,
            applies_conditions,
        } => {
            state.combatants.get_mut(&source_id).expect("combatant must exist").action_available = false;
            let spec = SaveEffectSpec {
                effect_name: "save_effect",
                save_ability,
                dc,
                adv_state,
                on_success_half: on_success == "half",
                damage_formula: damage_formula.as_deref(),
                damage_type: damage_type.as_deref(),
                on_fail_conditions: &applies_conditions,
                concentration_owner: None,
            };
            resolve_save_effect(state, middlewares, &source_id, &target_ids, &spec)
        }

        Command::ApplyCondition { target_id, condition } => {
            state
                .combatants
                .get_mut(&target_id)
                .expect("combatant must exist")
                .conditions
                .insert(condition.clone());
            Ok(vec![EventEnvelope::next(
                state,
                None,
                EventPayload::ConditionApplied { target_id, condition, reason: "command".to_string() },
            )])
        }

        Command::RemoveCondition { target_id, condition } => {
            state.combatants.get_mut(&target_id).expect("combatant must exist").conditions.remove(&condition);
            Ok(vec![EventEnvelope::next(
                state,
                None,
                EventPayload::ConditionRemoved { target_id, condition, reason: "command".to_string() },
            )])
        }

        Command::RollDeathSave { combatant_id } => dispatch_death_save(state, combatant_id),

        Command::Stabilize { target_id, healer_id } => {
            if let Some(h) = &healer_id {
                state.combatants.get_mut(h).expect("combatant must exist").action_available = false;
            }
            {
                let target = state.combatants.get_mut(&target_id).expect("combatant must exist");
                target.is_stable = true;
                target.death_save_successes = 0;
                target.death_save_failures = 0;
            }
            Ok(vec![EventEnvelope::next(
                state,
                healer_id.clone(),
                EventPayload::Stabilized { healer_id, target_id, reason: "stabilize_action".to_string() },
            )])
        }

        Command::Heal { target_id, amount, healer_id } => {
            if let Some(h) = &healer_id {
                state.combatants.get_mut(h).expect("combatant must exist").action_available = false;
            }
            let (hp_before, hp_after) = {
                let target = state.combatants.get_mut(&target_id).expect("combatant must exist");
                let hp_before = target.hp_current;
                let hp_after = (hp_before + amount).min(target.hp_max);
                target.hp_current = hp_after;
                if hp_after > 0 {
                    target.is_stable = false;
                    target.death_save_successes = 0;
                    target.death_save_failures = 0;
                    target.conditions.remove(crate::model::types::UNCONSCIOUS);
                }
                (hp_before, hp_after)
            };
            Ok(vec![EventEnvelope::next(
                state,
                healer_id.clone(),
                EventPayload::Healed { healer_id, target_id, amount, hp_before, hp_after },
            )])
        }

        Command::EndConcentration { combatant_id } => {
            let effect_name = state.combatants[combatant_id.as_str()]
                .concentration
                .as_ref()
                .map(|c| c.effect_name.clone())
                .expect("combatant must be concentrating");
            Ok(end_concentration(state, &combatant_id, &effect_name, "ended_by_command"))
        }

        Command::DealDamage { source_id, target_id, amount, damage_type } => {
            let (adjusted, modifier) = adjust_damage_for_target(state, &target_id, amount as i64, &damage_type);
            let (hp_before, hp_after) = apply_damage_with_temp_hp(state, &target_id, adjusted);
            let mut events = vec![EventEnvelope::next(
                state,
                Some(source_id.clone()),
                EventPayload::DamageApplied {
                    attacker_id: source_id,
                    target_id: target_id.clone(),
                    raw: amount as i64,
                    adjusted,
                    damage_type,
                    hp_before,
                    hp_after,
                    modifier,
                    is_critical: false,
                },
            )];
            events.extend(maybe_transition_unconscious(state, &target_id, hp_after, "damage"));
            events.extend(maybe_run_concentration_check(state, &target_id, adjusted, "damage"));
            Ok(events)
        }
    }
}

fn dispatch_move(
    state: &mut EncounterState,
    mover_id: CombatantId,
    path: Vec<(i32, i32)>,
) -> Result<Vec<EventEnvelope>, EngineError> {
    use crate::model::types::Position;

    let from_pos = state.combatants[mover_id.as_str()].position;
    let mut events = vec![EventEnvelope::next(
        state,
        Some(mover_id.clone()),
        EventPayload::MovementStarted {
            mover_id: mover_id.clone(),
            from_pos: (from_pos.0, from_pos.1),
            path: path.clone(),
        },
    )];

    let no_oa = state.combatants[mover_id.as_str()].no_opportunity_attacks_until_turn_end;
    let mut current = from_pos;

    for &(x, y) in &path {
        let next_pos = Position(x, y);

        if !no_oa {
            let reach_ids: Vec<(CombatantId, i32)> = state
                .combatants
                .iter()
                .filter(|(id, c)| {
                    **id != mover_id
                        && c.hp_current > 0
                        && c.reaction_available
                        && !c.surprised
                        && crate::model::are_hostile(&state.combatants[mover_id.as_str()], c)
                })
                .flat_map(|(id, c)| c.attacks.values().map(move |a| (id.clone(), a.reach_ft)))
                .collect();

            for (threatener_id, reach_ft) in reach_ids {
                let threatener_pos = state.combatants[threatener_id.as_str()].position;
                let reach_squares = reach_ft / 5;
                let was_in_reach = current.chebyshev_squares(&threatener_pos) <= reach_squares;
                let still_in_reach = next_pos.chebyshev_squares(&threatener_pos) <= reach_squares;
                if was_in_reach && !still_in_reach {
                    let window_id = state.new_window_id();
                    state.reaction_window = Some(crate::model::combatant::ReactionWindow {
                        id: window_id.clone(),
                        trigger: "opportunity_attack".to_string(),
                        mover_id: mover_id.clone(),
                        threatened_by_id: threatener_id.clone(),
                        reach_ft,
                    });
                    state.phase = Phase::ReactionWindow;
                    events.push(EventEnvelope::next(
                        state,
                        Some(threatener_id.clone()),
                        EventPayload::OpportunityAttackTriggered {
                            mover_id: mover_id.clone(),
                            threatened_by_id: threatener_id.clone(),
                            reach_ft,
                        },
                    ));
                    events.push(EventEnvelope::next(
                        state,
                        Some(threatener_id.clone()),
                        EventPayload::ReactionWindowOpened {
                            window_id,
                            trigger: "opportunity_attack".to_string(),
                            eligible_reactors: vec![threatener_id],
                            context: serde_json::Value::Null,
                        },
                    ));
                    events.push(EventEnvelope::next(
                        state,
                        Some(mover_id.clone()),
                        EventPayload::MovementStopped { mover_id: mover_id.clone(), reason: "reaction_window".to_string() },
                    ));
                    return Ok(events);
                }
            }
        }

        let cost_ft = current.chebyshev_squares(&next_pos) * 5;
        state.combatants.get_mut(&mover_id).expect("combatant must exist").position = next_pos;
        {
            let mover = state.combatants.get_mut(&mover_id).expect("combatant must exist");
            mover.movement_remaining_ft = (mover.movement_remaining_ft - cost_ft).max(0);
        }
        events.push(EventEnvelope::next(
            state,
            Some(mover_id.clone()),
            EventPayload::MovedStep {
                mover_id: mover_id.clone(),
                from_pos: (current.0, current.1),
                to_pos: (next_pos.0, next_pos.1),
                cost_ft,
            },
        ));
        current = next_pos;
    }

    events.push(EventEnvelope::next(
        state,
        Some(mover_id.clone()),
        EventPayload::MovementStopped { mover_id, reason: "command_end".to_string() },
    ));
    Ok(events)
}

fn dispatch_cast_spell(
    state: &mut EncounterState,
    middlewares: &[Box<dyn RollMiddleware>],
    spells: &SpellRegistry,
    caster_id: CombatantId,
    spell_name: String,
    target_ids: Vec<CombatantId>,
    slot_level: Option<u8>,
) -> Result<Vec<EventEnvelope>, EngineError> {
    let spell = spells
        .get(&spell_name)
        .ok_or_else(|| EngineError::UnknownSpell(spell_name.clone()))?
        .clone();
    let base = spell.base().clone();

    {
        let caster = state.combatants.get_mut(&caster_id).expect("combatant must exist");
        match base.economy {
            SpellEconomy::Action => caster.action_available = false,
            SpellEconomy::BonusAction => caster.bonus_available = false,
        }
    }

    let mut events = vec![EventEnvelope::next(
        state,
        Some(caster_id.clone()),
        EventPayload::SpellCastDeclared {
            caster_id: caster_id.clone(),
            spell_name: spell_name.clone(),
            slot_level: base.slot_level,
            target_ids: target_ids.clone(),
        },
    )];

    if base.slot_level > 0 {
        let level = slot_level.unwrap_or(base.slot_level).max(base.slot_level);
        let caster = state.combatants.get_mut(&caster_id).expect("combatant must exist");
        let before = *caster.spell_slots_current.get(&level).unwrap_or(&0);
        let after = before.saturating_sub(1);
        caster.spell_slots_current.insert(level, after);
        events.push(EventEnvelope::next(
            state,
            Some(caster_id.clone()),
            EventPayload::SpellSlotSpent { caster_id: caster_id.clone(), slot_level: level, before, after },
        ));
    }

    if base.concentration {
        let existing = state.combatants[caster_id.as_str()].concentration.clone();
        if let Some(existing) = existing {
            events.extend(end_concentration(state, &caster_id, &existing.effect_name, "replaced"));
        }
        let started_round = state.round;
        state.combatants.get_mut(&caster_id).expect("combatant must exist").concentration = Some(EffectRef {
            effect_name: spell_name.clone(),
            source_id: caster_id.clone(),
            started_round,
        });
        events.push(EventEnvelope::next(
            state,
            Some(caster_id.clone()),
            EventPayload::ConcentrationStarted { combatant_id: caster_id.clone(), effect_name: spell_name.clone(), source_id: caster_id.clone() },
        ));
    }

    match &spell {
        SpellDefinition::Save(save_spell) => {
            let dc = state.combatants[caster_id.as_str()].spell_save_dc.unwrap_or(10);
            let concentration_owner = if base.concentration { Some(caster_id.clone()) } else { None };
            let spec = SaveEffectSpec {
                effect_name: &spell_name,
                save_ability: save_spell.save_ability,
                dc,
                adv_state: AdvState::Normal,
                on_success_half: matches!(save_spell.on_success, crate::spells::SaveOnSuccess::Half),
                damage_formula: save_spell.damage_formula.as_deref(),
                damage_type: save_spell.damage_type.as_deref(),
                on_fail_conditions: &save_spell.on_fail_conditions,
                concentration_owner,
            };
            events.extend(resolve_save_effect(state, middlewares, &caster_id, &target_ids, &spec)?);
        }
        SpellDefinition::Attack(attack_spell) => {
            let to_hit_bonus = state.combatants[caster_id.as_str()].spell_attack_bonus.unwrap_or(0) as i64;
            let target_id = target_ids.first().cloned().expect("cast spell must have a target");
            events.extend(resolve_attack_spell(state, middlewares, &caster_id, attack_spell, to_hit_bonus, &target_id)?);
        }
    }

    Ok(events)
}

fn dispatch_death_save(state: &mut EncounterState, combatant_id: CombatantId) -> Result<Vec<EventEnvelope>, EngineError> {
    let roll_seq = state.seq;
    let roll = roll_d20(&mut state.rng, "death_save", AdvState::Normal, Vec::new(), roll_seq);
    let mut events = vec![EventEnvelope::next(
        state,
        Some(combatant_id.clone()),
        EventPayload::DeathSaveRolled { combatant_id: combatant_id.clone(), roll: roll.clone() },
    )];

    let nat = roll.nat;
    if nat == 20 {
        let target = state.combatants.get_mut(&combatant_id).expect("combatant must exist");
        target.hp_current = 1;
        target.death_save_successes = 0;
        target.death_save_failures = 0;
        target.is_stable = false;
        target.conditions.remove(crate::model::types::UNCONSCIOUS);
        events.push(EventEnvelope::next(
            state,
            Some(combatant_id.clone()),
            EventPayload::DeathSaveResult { combatant_id, successes: 0, failures: 0, outcome: "revived".to_string() },
        ));
        return Ok(events);
    }

    let (successes, failures, outcome) = {
        let target = state.combatants.get_mut(&combatant_id).expect("combatant must exist");
        if nat == 1 {
            target.death_save_failures = (target.death_save_failures + 2).min(3);
            (target.death_save_successes, target.death_save_failures, "crit_fail")
        } else if nat >= 10 {
            target.death_save_successes = (target.death_save_successes + 1).min(3);
            (target.death_save_successes, target.death_save_failures, "success")
        } else {
            target.death_save_failures = (target.death_save_failures + 1).min(3);
            (target.death_save_successes, target.death_save_failures, "fail")
        }
    };
    events.push(EventEnvelope::next(
        state,
        Some(combatant_id.clone()),
        EventPayload::DeathSaveResult { combatant_id: combatant_id.clone(), successes, failures, outcome: outcome.to_string() },
    ));

    if failures >= 3 {
        state.combatants.get_mut(&combatant_id).expect("combatant must exist").is_dead = true;
        events.push(EventEnvelope::next(
            state,
            Some(combatant_id.clone()),
            EventPayload::Died { target_id: combatant_id, reason: "death_saves".to_string() },
        ));
    } else if successes >= 3 {
        {
            let target = state.combatants.get_mut(&combatant_id).expect("combatant must exist");
            target.is_stable = true;
            target.death_save_successes = 0;
            target.death_save_failures = 0;
        }
        events.push(EventEnvelope::next(
            state,
            Some(combatant_id.clone()),
            EventPayload::Stabilized { healer_id: None, target_id: combatant_id, reason: "death_saves".to_string() },
        ));
    }

    Ok(events)
}
