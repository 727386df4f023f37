mod common;

use encounter_engine::model::types::{Ability, Position};
use encounter_engine::model::{Combatant, EncounterState};
use encounter_engine::{apply_command, default_roll_middlewares, Command, EventPayload, SpellRegistry};

fn spells_mw() -> (SpellRegistry, Vec<Box<dyn encounter_engine::RollMiddleware>>) {
    (SpellRegistry::core(), default_roll_middlewares())
}

#[test]
fn moving_out_of_a_threatened_square_triggers_exactly_one_opportunity_attack() {
    let (spells, mw) = spells_mw();
    let mut mover = Combatant::new("mover", "Rogue", 14, 20);
    mover.position = Position(0, 0);
    mover.speed_ft = 30;
    let mut threatener = common::fighter("guard", 14, 20, 5, "1d6+2");
    threatener.position = Position(1, 0);
    threatener.reaction_available = true;
    threatener.side = Some("monsters".to_string());
    mover.side = Some("players".to_string());

    let state = EncounterState::new(5).with_combatant(mover).with_combatant(threatener);
    let (state, _) = apply_command(state, Command::StartCombat, &spells, &mw).unwrap();
    let (state, _) = apply_command(
        state,
        Command::SetInitiative { combatant_id: "mover".into(), initiative: 20 },
        &spells,
        &mw,
    )
    .unwrap();
    let (state, _) = apply_command(
        state,
        Command::SetInitiative { combatant_id: "guard".into(), initiative: 10 },
        &spells,
        &mw,
    )
    .unwrap();
    let (state, _) = apply_command(state, Command::FinalizeInitiativeOrder, &spells, &mw).unwrap();
    let (state, _) = apply_command(state, Command::BeginTurn { combatant_id: "mover".into() }, &spells, &mw).unwrap();

    let (state, events) = apply_command(
        state,
        Command::Move { mover_id: "mover".into(), path: vec![(0, 1), (0, 2)] },
        &spells,
        &mw,
    )
    .unwrap();

    let oa_count = events
        .iter()
        .filter(|e| matches!(e.payload, EventPayload::OpportunityAttackTriggered { .. }))
        .count();
    assert_eq!(oa_count, 1);
    assert!(events.iter().any(|e| matches!(e.payload, EventPayload::MovementStopped { .. })));
    assert_eq!(state.combatants["mover"].position, Position(0, 1));
}

#[test]
fn extra_attack_rejects_the_attack_beyond_attacks_per_action() {
    let (spells, mw) = spells_mw();
    let mut attacker = common::fighter("a", 16, 30, 5, "1d8+3");
    attacker.attacks_per_action = 2;
    let state = EncounterState::new(1).with_combatant(attacker).with_combatant(common::fighter("b", 13, 40, 5, "1d8+3"));

    let (state, _) = apply_command(state, Command::StartCombat, &spells, &mw).unwrap();
    let (state, _) = apply_command(
        state,
        Command::SetInitiative { combatant_id: "a".into(), initiative: 20 },
        &spells,
        &mw,
    )
    .unwrap();
    let (state, _) = apply_command(
        state,
        Command::SetInitiative { combatant_id: "b".into(), initiative: 10 },
        &spells,
        &mw,
    )
    .unwrap();
    let (state, _) = apply_command(state, Command::FinalizeInitiativeOrder, &spells, &mw).unwrap();
    let (mut state, _) = apply_command(state, Command::BeginTurn { combatant_id: "a".into() }, &spells, &mw).unwrap();

    for _ in 0..2 {
        let (next, _) = apply_command(
            state,
            Command::Attack { attacker_id: "a".into(), target_id: "b".into(), attack_name: "sword".into(), adv_state: encounter_engine::model::types::AdvState::Normal, economy: "action".into() },
            &spells,
            &mw,
        )
        .unwrap();
        state = next;
    }

    let (_, events) = apply_command(
        state,
        Command::Attack { attacker_id: "a".into(), target_id: "b".into(), attack_name: "sword".into(), adv_state: encounter_engine::model::types::AdvState::Normal, economy: "action".into() },
        &spells,
        &mw,
    )
    .unwrap();
    assert_eq!(events.len(), 1);
    match &events[0].payload {
        EventPayload::CommandRejected { code, .. } => assert_eq!(code, "NO_ATTACKS_REMAINING"),
        other => panic!("expected CommandRejected, got {other:?}"),
    }
}

#[test]
fn fireball_halves_damage_on_a_successful_save_and_shares_the_damage_roll() {
    let (spells, mw) = spells_mw();
    let mut caster = Combatant::new("wizard", "Wizard", 12, 20);
    caster.spell_save_dc = Some(15);
    caster.spell_slots_current.insert(3, 1);

    let mut lucky = Combatant::new("lucky", "Lucky", 12, 50);
    lucky.save_bonuses.insert(Ability::Dex, 100);
    let mut unlucky = Combatant::new("unlucky", "Unlucky", 12, 50);
    unlucky.save_bonuses.insert(Ability::Dex, -100);

    let state = EncounterState::new(9)
        .with_combatant(caster)
        .with_combatant(lucky)
        .with_combatant(unlucky);

    let (state, _) = apply_command(state, Command::StartCombat, &spells, &mw).unwrap();
    let (state, _) = apply_command(
        state,
        Command::SetInitiative { combatant_id: "wizard".into(), initiative: 20 },
        &spells,
        &mw,
    )
    .unwrap();
    let (state, _) = apply_command(
        state,
        Command::SetInitiative { combatant_id: "lucky".into(), initiative: 10 },
        &spells,
        &mw,
    )
    .unwrap();
    let (state, _) = apply_command(
        state,
        Command::SetInitiative { combatant_id: "unlucky".into(), initiative: 9 },
        &spells,
        &mw,
    )
    .unwrap();
    let (state, _) = apply_command(state, Command::FinalizeInitiativeOrder, &spells, &mw).unwrap();
    let (state, _) = apply_command(state, Command::BeginTurn { combatant_id: "wizard".into() }, &spells, &mw).unwrap();

    let (_, events) = apply_command(
        state,
        Command::CastSpell {
            caster_id: "wizard".into(),
            spell_name: "fireball".into(),
            target_ids: vec!["lucky".into(), "unlucky".into()],
            slot_level: None,
        },
        &spells,
        &mw,
    )
    .unwrap();

    let applied: Vec<_> = events
        .iter()
        .filter_map(|e| match &e.payload {
            EventPayload::EffectDamageApplied { target_id, raw, adjusted, .. } => {
                Some((target_id.clone(), *raw, *adjusted))
            }
            _ => None,
        })
        .collect();
    assert_eq!(applied.len(), 2);
    let (lucky_raw, lucky_adjusted) = {
        let (_, raw, adjusted) = applied.iter().find(|(id, ..)| id == "lucky").unwrap();
        (*raw, *adjusted)
    };
    let (unlucky_raw, unlucky_adjusted) = {
        let (_, raw, adjusted) = applied.iter().find(|(id, ..)| id == "unlucky").unwrap();
        (*raw, *adjusted)
    };
    assert_eq!(lucky_raw, unlucky_raw, "raw must be the shared roll total for every target");
    let shared_total = lucky_raw;
    assert_eq!(lucky_adjusted, shared_total / 2, "a successful save halves the shared roll");
    assert_eq!(unlucky_adjusted, shared_total, "a failed save takes the full shared roll");
}

#[test]
fn heal_clamps_to_hp_max_and_emits_one_healed_event() {
    let (spells, mw) = spells_mw();
    let mut target = Combatant::new("a", "Fighter", 16, 20);
    target.hp_current = 15;
    let state = EncounterState::new(1).with_combatant(target);

    let (state, events) = apply_command(
        state,
        Command::Heal { target_id: "a".into(), amount: 999, healer_id: None },
        &spells,
        &mw,
    )
    .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(state.combatants["a"].hp_current, 20);
    match &events[0].payload {
        EventPayload::Healed { hp_after, .. } => assert_eq!(*hp_after, 20),
        other => panic!("expected Healed, got {other:?}"),
    }
}

#[test]
fn concentration_breaks_on_a_failed_save_and_strips_the_anchored_condition() {
    let (spells, mw) = spells_mw();
    let mut caster = Combatant::new("wizard", "Wizard", 12, 1);
    caster.save_bonuses.insert(Ability::Con, -100);
    caster.spell_save_dc = Some(13);

    let mut target = Combatant::new("target", "Target", 12, 20);
    target.side = Some("monsters".into());
    caster.side = Some("players".into());

    let state = EncounterState::new(2).with_combatant(caster).with_combatant(target);

    let (state, _) = apply_command(state, Command::StartCombat, &spells, &mw).unwrap();
    let (state, _) = apply_command(
        state,
        Command::SetInitiative { combatant_id: "wizard".into(), initiative: 20 },
        &spells,
        &mw,
    )
    .unwrap();
    let (state, _) = apply_command(
        state,
        Command::SetInitiative { combatant_id: "target".into(), initiative: 10 },
        &spells,
        &mw,
    )
    .unwrap();
    let (state, _) = apply_command(state, Command::FinalizeInitiativeOrder, &spells, &mw).unwrap();
    let (state, _) = apply_command(state, Command::BeginTurn { combatant_id: "wizard".into() }, &spells, &mw).unwrap();

    let (state, _) = apply_command(
        state,
        Command::CastSpell {
            caster_id: "wizard".into(),
            spell_name: "hold_person".into(),
            target_ids: vec!["target".into()],
            slot_level: None,
        },
        &spells,
        &mw,
    )
    .unwrap();
    assert!(state.combatants["wizard"].concentration.is_some());

    let (state, events) = apply_command(
        state,
        Command::DealDamage { source_id: "target".into(), target_id: "wizard".into(), amount: 50, damage_type: "bludgeoning".into() },
        &spells,
        &mw,
    )
    .unwrap();

    assert!(events.iter().any(|e| matches!(e.payload, EventPayload::ConcentrationBroken { .. })));
    assert!(state.combatants["wizard"].concentration.is_none());
}
