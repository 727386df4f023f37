mod common;

use common::two_fighter_encounter;
use encounter_engine::{apply_command, default_roll_middlewares, Command, SpellRegistry};

fn start_and_begin_turn(seed: u64) -> encounter_engine::model::EncounterState {
    let spells = SpellRegistry::core();
    let mw = default_roll_middlewares();
    let state = two_fighter_encounter(seed);
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
    apply_command(state, Command::BeginTurn { combatant_id: "a".into() }, &spells, &mw).unwrap().0
}

#[test]
fn finalize_initiative_orders_descending_and_sets_turn_owner() {
    let spells = SpellRegistry::core();
    let mw = default_roll_middlewares();
    let state = two_fighter_encounter(1);
    let (state, _) = apply_command(state, Command::StartCombat, &spells, &mw).unwrap();
    let (state, _) = apply_command(
        state,
        Command::SetInitiative { combatant_id: "a".into(), initiative: 10 },
        &spells,
        &mw,
    )
    .unwrap();
    let (state, _) = apply_command(
        state,
        Command::SetInitiative { combatant_id: "b".into(), initiative: 20 },
        &spells,
        &mw,
    )
    .unwrap();
    let (state, _) = apply_command(state, Command::FinalizeInitiativeOrder, &spells, &mw).unwrap();
    assert_eq!(state.initiative_order, vec!["b".to_string(), "a".to_string()]);
    assert_eq!(state.turn_owner_id, Some("b".to_string()));
}

#[test]
fn seq_and_t_are_strictly_increasing_across_calls() {
    let spells = SpellRegistry::core();
    let mw = default_roll_middlewares();
    let mut state = start_and_begin_turn(7);
    let mut last_seq = state.seq;
    for _ in 0..5 {
        let (next_state, events) = apply_command(
            state,
            Command::Attack { attacker_id: "a".into(), target_id: "b".into(), attack_name: "sword".into(), adv_state: encounter_engine::model::types::AdvState::Normal, economy: "action".into() },
            &spells,
            &mw,
        )
        .unwrap();
        for event in &events {
            assert!(event.seq > last_seq);
            last_seq = event.seq;
        }
        state = next_state;
        state.combatants.get_mut("a").unwrap().attack_action_started = false;
        state.combatants.get_mut("a").unwrap().action_available = true;
    }
}

#[test]
fn hp_never_leaves_the_valid_range() {
    let spells = SpellRegistry::core();
    let mw = default_roll_middlewares();
    let mut state = start_and_begin_turn(99);
    for _ in 0..10 {
        let (next_state, _) = apply_command(
            state,
            Command::Attack { attacker_id: "a".into(), target_id: "b".into(), attack_name: "sword".into(), adv_state: encounter_engine::model::types::AdvState::Normal, economy: "action".into() },
            &spells,
            &mw,
        )
        .unwrap();
        state = next_state;
        let b = &state.combatants["b"];
        assert!(b.hp_current >= 0);
        assert!(b.hp_current <= b.hp_max);
        if state.combatants["a"].attack_action_remaining == 0 {
            state.combatants.get_mut("a").unwrap().attack_action_started = false;
            state.combatants.get_mut("a").unwrap().action_available = true;
        }
    }
}

#[test]
fn rejected_command_produces_exactly_one_command_rejected_event_and_no_state_change() {
    let spells = SpellRegistry::core();
    let mw = default_roll_middlewares();
    let state = two_fighter_encounter(3);
    let before = state.clone();
    let (after, events) = apply_command(state, Command::FinalizeInitiativeOrder, &spells, &mw).unwrap();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0].payload, encounter_engine::EventPayload::CommandRejected { .. }));
    assert_eq!(before.combat_started, after.combat_started);
    assert_eq!(before.combatants.len(), after.combatants.len());
}

#[test]
fn determinism_same_seed_same_commands_same_event_stream() {
    let spells = SpellRegistry::core();
    let mw = default_roll_middlewares();

    let run_once = |seed: u64| {
        let mut state = start_and_begin_turn(seed);
        let mut all_events = Vec::new();
        for _ in 0..3 {
            let (next_state, events) = apply_command(
                state,
                Command::Attack { attacker_id: "a".into(), target_id: "b".into(), attack_name: "sword".into(), adv_state: encounter_engine::model::types::AdvState::Normal, economy: "action".into() },
                &spells,
                &mw,
            )
            .unwrap();
            state = next_state;
            all_events.extend(events.iter().map(|e| serde_json::to_string(e).unwrap()));
            state.combatants.get_mut("a").unwrap().attack_action_started = false;
            state.combatants.get_mut("a").unwrap().action_available = true;
        }
        all_events
    };

    assert_eq!(run_once(12345), run_once(12345));
}
