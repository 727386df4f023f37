use encounter_engine::model::{AttackProfile, Combatant, EncounterState};

pub fn fighter(id: &str, ac: i32, hp: i32, to_hit_bonus: i64, damage_formula: &str) -> Combatant {
    let mut c = Combatant::new(id, id, ac, hp);
    c.attacks.insert(
        "sword".to_string(),
        AttackProfile {
            to_hit_bonus,
            damage_formula: damage_formula.to_string(),
            damage_type: "slashing".to_string(),
            reach_ft: 5,
            uses_action: true,
            uses_bonus_action: false,
        },
    );
    c
}

pub fn two_fighter_encounter(seed: u64) -> EncounterState {
    EncounterState::new(seed)
        .with_combatant(fighter("a", 16, 20, 5, "1d8+3"))
        .with_combatant(fighter("b", 13, 20, 5, "1d8+3"))
}
