//! The core spell library: a small, explicit set of spells, seeded
//! up front rather than loaded from an external data file — there is no
//! content-authoring surface in scope here, only the rules engine.

use super::definitions::{
    AttackSpell, SaveOnSuccess, SaveSpell, SpellBase, SpellDefinition, SpellEconomy,
};
use crate::model::types::Ability;
use std::collections::HashMap;

/// A lookup of spells by name, explicit and non-global: callers construct
/// one (typically via [`SpellRegistry::core`]) and thread it through.
#[derive(Debug, Clone, Default)]
pub struct SpellRegistry {
    spells: HashMap<String, SpellDefinition>,
}

impl SpellRegistry {
    pub fn new() -> Self {
        Self {
            spells: HashMap::new(),
        }
    }

    pub fn insert(&mut self, spell: SpellDefinition) {
        self.spells.insert(spell.name().to_string(), spell);
    }

    pub fn get(&self, name: &str) -> Option<&SpellDefinition> {
        self.spells.get(name)
    }

    /// The six spells this engine ships with: one cantrip and one leveled
    /// spell for each of the save and attack resolution paths, plus
    /// `hold_person` to exercise the condition-on-fail path.
    pub fn core() -> Self {
        let mut reg = Self::new();

        reg.insert(SpellDefinition::Save(SaveSpell {
            base: SpellBase {
                name: "fireball".into(),
                slot_level: 3,
                concentration: false,
                economy: SpellEconomy::Action,
                range_ft: 150,
                is_aoe: true,
            },
            save_ability: Ability::Dex,
            on_success: SaveOnSuccess::Half,
            damage_formula: Some("8d6".into()),
            damage_type: Some("fire".into()),
            on_fail_conditions: Vec::new(),
        }));

        reg.insert(SpellDefinition::Save(SaveSpell {
            base: SpellBase {
                name: "burning_hands".into(),
                slot_level: 1,
                concentration: false,
                economy: SpellEconomy::Action,
                range_ft: 15,
                is_aoe: true,
            },
            save_ability: Ability::Dex,
            on_success: SaveOnSuccess::Half,
            damage_formula: Some("3d6".into()),
            damage_type: Some("fire".into()),
            on_fail_conditions: Vec::new(),
        }));

        reg.insert(SpellDefinition::Save(SaveSpell {
            base: SpellBase {
                name: "sacred_flame".into(),
                slot_level: 0,
                concentration: false,
                economy: SpellEconomy::Action,
                range_ft: 60,
                is_aoe: false,
            },
            save_ability: Ability::Dex,
            on_success: SaveOnSuccess::None,
            damage_formula: Some("1d8".into()),
            damage_type: Some("radiant".into()),
            on_fail_conditions: Vec::new(),
        }));

        reg.insert(SpellDefinition::Save(SaveSpell {
            base: SpellBase {
                name: "hold_person".into(),
                slot_level: 2,
                concentration: true,
                economy: SpellEconomy::Action,
                range_ft: 60,
                is_aoe: false,
            },
            save_ability: Ability::Wis,
            on_success: SaveOnSuccess::None,
            damage_formula: None,
            damage_type: None,
            on_fail_conditions: vec!["paralyzed".into()],
        }));

        reg.insert(SpellDefinition::Attack(AttackSpell {
            base: SpellBase {
                name: "guiding_bolt".into(),
                slot_level: 1,
                concentration: false,
                economy: SpellEconomy::Action,
                range_ft: 120,
                is_aoe: false,
            },
            damage_formula: "4d6".into(),
            damage_type: "radiant".into(),
            ranged: true,
        }));

        reg.insert(SpellDefinition::Attack(AttackSpell {
            base: SpellBase {
                name: "ray_of_frost".into(),
                slot_level: 0,
                concentration: false,
                economy: SpellEconomy::Action,
                range_ft: 60,
                is_aoe: false,
            },
            damage_formula: "1d8".into(),
            damage_type: "cold".into(),
            ranged: true,
        }));

        reg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_registry_has_all_six_spells() {
        let reg = SpellRegistry::core();
        for name in [
            "fireball",
            "burning_hands",
            "sacred_flame",
            "hold_person",
            "guiding_bolt",
            "ray_of_frost",
        ] {
            assert!(reg.get(name).is_some(), "missing spell {name}");
        }
    }

    #[test]
    fn unknown_spell_returns_none() {
        let reg = SpellRegistry::core();
        assert!(reg.get("wish").is_none());
    }
}
