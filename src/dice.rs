//! Dice formula parsing and rolling.
//!
//! The grammar accepted here is deliberately narrow — a single `NdM` term
//! with an optional flat modifier — unlike a general expression evaluator.
//! Anything else is a fatal [`EngineError::UnparseableFormula`], not a
//! rejected command: a formula only ever reaches this parser after the
//! validator has already accepted the command, so a parse failure here means
//! the data itself (a creature's attack profile, a spell's damage formula) is
//! broken.

use crate::error::EngineError;
use crate::rng::EncounterRng;
use rand::Rng;

/// A parsed `NdM+K` / `NdM-K` formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiceFormula {
    pub count: u32,
    pub sides: u32,
    pub modifier: i64,
}

impl DiceFormula {
    /// Parse a formula matching `^\s*\d+d\d+\s*([+-]\s*\d+)?\s*$`.
    pub fn parse(formula: &str) -> Result<Self, EngineError> {
        let trimmed = formula.trim();
        let d_pos = trimmed
            .find(['d', 'D'])
            .ok_or_else(|| EngineError::UnparseableFormula(formula.to_string()))?;

        let (count_str, rest) = trimmed.split_at(d_pos);
        let rest = &rest[1..]; // skip the 'd'

        let count: u32 = count_str
            .trim()
            .parse()
            .map_err(|_| EngineError::UnparseableFormula(formula.to_string()))?;

        let (sides_str, modifier_str) = match rest.find(['+', '-']) {
            Some(sign_pos) => (&rest[..sign_pos], Some(&rest[sign_pos..])),
            None => (rest, None),
        };

        let sides: u32 = sides_str
            .trim()
            .parse()
            .map_err(|_| EngineError::UnparseableFormula(formula.to_string()))?;

        if count == 0 || sides == 0 {
            return Err(EngineError::UnparseableFormula(formula.to_string()));
        }

        let modifier: i64 = match modifier_str {
            None => 0,
            Some(m) => {
                let m = m.trim();
                let (sign, digits) = m.split_at(1);
                let digits = digits.trim();
                if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                    return Err(EngineError::UnparseableFormula(formula.to_string()));
                }
                let magnitude: i64 = digits
                    .parse()
                    .map_err(|_| EngineError::UnparseableFormula(formula.to_string()))?;
                if sign == "-" {
                    -magnitude
                } else {
                    magnitude
                }
            }
        };

        Ok(DiceFormula {
            count,
            sides,
            modifier,
        })
    }
}

/// The individual dice rolled for one damage roll, before the flat modifier.
pub fn roll_dice(rng: &mut EncounterRng, sides: u32, count: u32) -> Vec<u32> {
    (0..count).map(|_| rng.gen_range(1..=sides)).collect()
}

/// Roll `formula`, doubling the dice count (not the modifier) on a critical hit.
pub fn roll_formula(
    rng: &mut EncounterRng,
    formula: &str,
    critical: bool,
) -> Result<(Vec<u32>, i64), EngineError> {
    let parsed = DiceFormula::parse(formula)?;
    let count = if critical {
        parsed.count * 2
    } else {
        parsed.count
    };
    let dice = roll_dice(rng, parsed.sides, count);
    Ok((dice, parsed.modifier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_formula() {
        let f = DiceFormula::parse("1d8+3").unwrap();
        assert_eq!(f, DiceFormula { count: 1, sides: 8, modifier: 3 });
    }

    #[test]
    fn parses_formula_without_modifier() {
        let f = DiceFormula::parse("8d6").unwrap();
        assert_eq!(f, DiceFormula { count: 8, sides: 6, modifier: 0 });
    }

    #[test]
    fn parses_negative_modifier_and_whitespace() {
        let f = DiceFormula::parse(" 2d4 - 1 ").unwrap();
        assert_eq!(f, DiceFormula { count: 2, sides: 4, modifier: -1 });
    }

    #[test]
    fn rejects_bracket_notation() {
        assert!(DiceFormula::parse("3[PB]+5[STR]").is_err());
    }

    #[test]
    fn rejects_multi_term_formula() {
        assert!(DiceFormula::parse("1d6+1d4").is_err());
    }

    #[test]
    fn rejects_zero_count_or_sides() {
        assert!(DiceFormula::parse("0d6").is_err());
        assert!(DiceFormula::parse("1d0").is_err());
    }

    #[test]
    fn critical_doubles_dice_not_modifier() {
        let mut rng = EncounterRng::seed_from_u64(1);
        let (dice, modifier) = roll_formula(&mut rng, "1d8+3", true).unwrap();
        assert_eq!(dice.len(), 2);
        assert_eq!(modifier, 3);
    }

    #[test]
    fn non_critical_rolls_base_count() {
        let mut rng = EncounterRng::seed_from_u64(1);
        let (dice, _) = roll_formula(&mut rng, "2d6+1", false).unwrap();
        assert_eq!(dice.len(), 2);
    }
}
