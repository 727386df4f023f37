//! Property: whatever the validator rejects, `apply_command` turns into
//! exactly one `CommandRejected` event and leaves state untouched; whatever
//! it accepts, `apply_command` never returns `CommandRejected`.

mod common;

use encounter_engine::model::EncounterState;
use encounter_engine::{apply_command, default_roll_middlewares, Command, EventPayload, SpellRegistry};
use proptest::prelude::*;

fn arb_combatant_id() -> impl Strategy<Value = String> {
    prop_oneof![Just("a".to_string()), Just("b".to_string()), Just("ghost".to_string())]
}

fn arb_command() -> impl Strategy<Value = Command> {
    prop_oneof![
        Just(Command::StartCombat),
        Just(Command::FinalizeInitiativeOrder),
        arb_combatant_id().prop_map(|combatant_id| Command::BeginTurn { combatant_id }),
        arb_combatant_id().prop_map(|combatant_id| Command::EndTurn { combatant_id }),
        (arb_combatant_id(), any::<i32>()).prop_map(|(combatant_id, initiative)| Command::SetInitiative {
            combatant_id,
            initiative,
        }),
        (arb_combatant_id(), arb_combatant_id(), "sword|dagger").prop_map(
            |(attacker_id, target_id, attack_name)| Command::Attack {
                attacker_id,
                target_id,
                attack_name,
                adv_state: encounter_engine::model::types::AdvState::Normal,
                economy: "action".to_string(),
            }
        ),
        (arb_combatant_id(), any::<i32>()).prop_map(|(target_id, amount)| Command::Heal {
            target_id,
            amount,
            healer_id: None,
        }),
    ]
}

proptest! {
    /// Every command that reaches `apply_command` from a two-fighter state
    /// either (a) is rejected, producing exactly one `CommandRejected` event
    /// and an unchanged combatant roster, or (b) applies cleanly and never
    /// emits `CommandRejected`.
    #[test]
    fn validate_reject_is_the_only_source_of_command_rejected(cmd in arb_command()) {
        let spells = SpellRegistry::core();
        let mw = default_roll_middlewares();
        let state: EncounterState = common::two_fighter_encounter(1);
        let before_ids: Vec<_> = state.combatants.keys().cloned().collect();

        let result = apply_command(state, cmd, &spells, &mw);
        let Ok((after, events)) = result else {
            return Ok(());
        };

        let rejections = events
            .iter()
            .filter(|e| matches!(e.payload, EventPayload::CommandRejected { .. }))
            .count();
        prop_assert!(rejections == 0 || (rejections == 1 && events.len() == 1));
        if rejections == 1 {
            let after_ids: Vec<_> = after.combatants.keys().cloned().collect();
            prop_assert_eq!(before_ids, after_ids);
        }
    }
}
