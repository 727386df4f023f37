//! Shared roll construction: turns a raw die result plus middleware mods
//! into the [`Roll`] record every roll-driven event carries.

use crate::dice::{roll_dice, roll_formula};
use crate::events::{Roll, RollMod};
use crate::model::types::AdvState;
use crate::rng::EncounterRng;

/// Roll a d20 under `adv_state`, applying `mods`, and build the `Roll` record.
/// `kind` distinguishes e.g. `"attack"`, `"save"`, `"death_save"`,
/// `"concentration"`, `"initiative"` in the emitted payload.
pub fn roll_d20(
    rng: &mut EncounterRng,
    kind: &str,
    adv_state: AdvState,
    mods: Vec<RollMod>,
    roll_seq: u64,
) -> Roll {
    let dice = match adv_state {
        AdvState::Normal => vec![roll_dice(rng, 20, 1)[0] as i64],
        AdvState::Advantage | AdvState::Disadvantage => {
            let a = roll_dice(rng, 20, 1)[0] as i64;
            let b = roll_dice(rng, 20, 1)[0] as i64;
            vec![a, b]
        }
    };
    let kept = match adv_state {
        AdvState::Normal => vec![dice[0]],
        AdvState::Advantage => vec![*dice.iter().max().unwrap()],
        AdvState::Disadvantage => vec![*dice.iter().min().unwrap()],
    };
    let mod_total: i64 = mods.iter().map(|m| m.value).sum();
    let nat = kept[0];
    let total = nat + mod_total;
    Roll {
        roll_id: format!("r{roll_seq}"),
        kind: kind.to_string(),
        formula: "1d20".to_string(),
        dice,
        kept,
        mods,
        total,
        adv_state,
        nat,
        is_critical: nat == 20,
    }
}

/// Roll a damage formula, applying `mods` additively, and build the `Roll` record.
pub fn roll_damage(
    rng: &mut EncounterRng,
    formula: &str,
    critical: bool,
    mods: Vec<RollMod>,
    roll_seq: u64,
) -> Result<Roll, crate::error::EngineError> {
    let (dice, base_modifier) = roll_formula(rng, formula, critical)?;
    let dice: Vec<i64> = dice.into_iter().map(|d| d as i64).collect();
    let mod_total: i64 = mods.iter().map(|m| m.value).sum();
    let total: i64 = dice.iter().sum::<i64>() + base_modifier + mod_total;
    Ok(Roll {
        roll_id: format!("r{roll_seq}"),
        kind: "damage".to_string(),
        formula: formula.to_string(),
        kept: dice.clone(),
        dice,
        mods,
        total,
        adv_state: AdvState::Normal,
        nat: 0,
        is_critical: critical,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advantage_keeps_the_higher_die() {
        let mut rng = EncounterRng::seed_from_u64(7);
        let roll = roll_d20(&mut rng, "attack", AdvState::Advantage, Vec::new(), 1);
        assert_eq!(roll.kept.len(), 1);
        assert!(roll.kept[0] >= roll.dice[0].min(roll.dice[1]));
        assert_eq!(roll.kept[0], *roll.dice.iter().max().unwrap());
    }

    #[test]
    fn disadvantage_keeps_the_lower_die() {
        let mut rng = EncounterRng::seed_from_u64(7);
        let roll = roll_d20(&mut rng, "save", AdvState::Disadvantage, Vec::new(), 1);
        assert_eq!(roll.kept[0], *roll.dice.iter().min().unwrap());
    }

    #[test]
    fn normal_rolls_a_single_die() {
        let mut rng = EncounterRng::seed_from_u64(7);
        let roll = roll_d20(&mut rng, "attack", AdvState::Normal, Vec::new(), 1);
        assert_eq!(roll.dice.len(), 1);
    }
}
