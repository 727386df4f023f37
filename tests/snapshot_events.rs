//! Snapshot coverage for the dice-free portion of a combat round (initiative
//! setup through turn start): pins the exact shape of the emitted event
//! stream so a change to field names or payload structure shows up as a
//! diff in review rather than slipping through because some assertion
//! happened to still pass.

mod common;

use encounter_engine::{apply_command, default_roll_middlewares, Command, SpellRegistry};

#[test]
fn initiative_setup_and_turn_start_produce_the_expected_event_shape() {
    let spells = SpellRegistry::core();
    let mw = default_roll_middlewares();
    let state = common::two_fighter_encounter(7);

    let mut all_events = Vec::new();
    let (state, events) = apply_command(state, Command::StartCombat, &spells, &mw).unwrap();
    all_events.extend(events);
    let (state, events) = apply_command(
        state,
        Command::SetInitiative { combatant_id: "a".into(), initiative: 20 },
        &spells,
        &mw,
    )
    .unwrap();
    all_events.extend(events);
    let (state, events) = apply_command(
        state,
        Command::SetInitiative { combatant_id: "b".into(), initiative: 10 },
        &spells,
        &mw,
    )
    .unwrap();
    all_events.extend(events);
    let (state, events) = apply_command(state, Command::FinalizeInitiativeOrder, &spells, &mw).unwrap();
    all_events.extend(events);
    let (_, events) = apply_command(state, Command::BeginTurn { combatant_id: "a".into() }, &spells, &mw).unwrap();
    all_events.extend(events);

    let types: Vec<&str> = all_events.iter().map(|e| e.payload.type_name()).collect();
    insta::assert_yaml_snapshot!("initiative_and_turn_start_event_types", types);

    insta::assert_yaml_snapshot!("initiative_and_turn_start_events", &all_events, {
        "[].seq" => "[seq]",
        "[].t" => "[t]",
    });
}
