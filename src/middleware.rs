//! Roll middleware: pluggable hooks that contribute additive modifiers to a
//! roll before it is finalized, driven entirely off [`ActiveEffect`]s already
//! present in state (no separate "buff" bookkeeping).

use crate::events::RollMod;
use crate::model::{ActiveEffect, CombatantId, EncounterState};
use crate::rng::EncounterRng;

/// Context available to a `before_attack_roll` / `before_save_roll` hook.
pub struct D20RollContext<'a> {
    pub roller_id: &'a CombatantId,
    pub effects: &'a [ActiveEffect],
}

/// Context available to a `before_damage_roll` hook.
pub struct DamageRollContext<'a> {
    pub roller_id: &'a CombatantId,
    pub target_id: Option<&'a CombatantId>,
    pub effects: &'a [ActiveEffect],
}

/// One pluggable source of roll modifiers. Each hook may consult `state` and
/// roll its own dice against `rng`, but must not mutate state directly.
pub trait RollMiddleware {
    fn before_attack_roll(
        &self,
        _ctx: &D20RollContext<'_>,
        _rng: &mut EncounterRng,
    ) -> Vec<RollMod> {
        Vec::new()
    }

    fn before_save_roll(&self, _ctx: &D20RollContext<'_>, _rng: &mut EncounterRng) -> Vec<RollMod> {
        Vec::new()
    }

    fn before_damage_roll(
        &self,
        _ctx: &DamageRollContext<'_>,
        _rng: &mut EncounterRng,
    ) -> Vec<RollMod> {
        Vec::new()
    }
}

/// The `bless` spell: +1d4 to attack rolls and saving throws of any
/// combatant carrying an active effect named `"bless"`; no damage-roll bonus.
pub struct BlessMiddleware;

fn has_bless(effects: &[ActiveEffect], combatant_id: &CombatantId) -> bool {
    effects
        .iter()
        .any(|e| e.name == "bless" && &e.target_id == combatant_id)
}

impl RollMiddleware for BlessMiddleware {
    fn before_attack_roll(
        &self,
        ctx: &D20RollContext<'_>,
        rng: &mut EncounterRng,
    ) -> Vec<RollMod> {
        bless_mod(ctx.effects, ctx.roller_id, rng)
    }

    fn before_save_roll(&self, ctx: &D20RollContext<'_>, rng: &mut EncounterRng) -> Vec<RollMod> {
        bless_mod(ctx.effects, ctx.roller_id, rng)
    }
}

fn bless_mod(effects: &[ActiveEffect], roller_id: &CombatantId, rng: &mut EncounterRng) -> Vec<RollMod> {
    if !has_bless(effects, roller_id) {
        return Vec::new();
    }
    let die = crate::dice::roll_dice(rng, 4, 1)[0];
    vec![RollMod {
        name: "bless".to_string(),
        value: die as i64,
    }]
}

/// The middleware chain run on every roll, in order, by default. An
/// `EngineConfig` may substitute a different chain for testing.
pub fn default_roll_middlewares() -> Vec<Box<dyn RollMiddleware>> {
    vec![Box::new(BlessMiddleware)]
}

/// Collect every active effect as a snapshot the reducer can hand to a hook
/// alongside a live `&mut EncounterRng` borrowed from the same state.
pub fn effect_snapshot(state: &EncounterState) -> Vec<ActiveEffect> {
    state.effects.values().cloned().collect()
}

/// Sum every hook's contribution into a flat modifier list, applied in the
/// order the chain ran. Callers borrow `effects` (a snapshot) and
/// `state.rng` separately to avoid aliasing an immutable and a mutable
/// borrow of `state` at once.
pub fn run_attack_hooks(
    chain: &[Box<dyn RollMiddleware>],
    effects: &[ActiveEffect],
    roller_id: &CombatantId,
    rng: &mut EncounterRng,
) -> Vec<RollMod> {
    let ctx = D20RollContext { roller_id, effects };
    let mut mods = Vec::new();
    for mw in chain {
        mods.extend(mw.before_attack_roll(&ctx, rng));
    }
    mods
}

pub fn run_save_hooks(
    chain: &[Box<dyn RollMiddleware>],
    effects: &[ActiveEffect],
    roller_id: &CombatantId,
    rng: &mut EncounterRng,
) -> Vec<RollMod> {
    let ctx = D20RollContext { roller_id, effects };
    let mut mods = Vec::new();
    for mw in chain {
        mods.extend(mw.before_save_roll(&ctx, rng));
    }
    mods
}

pub fn run_damage_hooks(
    chain: &[Box<dyn RollMiddleware>],
    effects: &[ActiveEffect],
    roller_id: &CombatantId,
    target_id: Option<&CombatantId>,
    rng: &mut EncounterRng,
) -> Vec<RollMod> {
    let ctx = DamageRollContext {
        roller_id,
        target_id,
        effects,
    };
    let mut mods = Vec::new();
    for mw in chain {
        mods.extend(mw.before_damage_roll(&ctx, rng));
    }
    mods
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::EncounterRng;

    #[test]
    fn bless_grants_no_bonus_without_the_effect() {
        let mut rng = EncounterRng::seed_from_u64(1);
        let mods = bless_mod(&[], &"a".to_string(), &mut rng);
        assert!(mods.is_empty());
    }

    #[test]
    fn bless_grants_a_d4_bonus_when_active() {
        let effect = ActiveEffect {
            id: 1,
            name: "bless".to_string(),
            source_id: "caster".to_string(),
            target_id: "a".to_string(),
            started_round: 1,
            duration_rounds: None,
            concentration_owner_id: Some("caster".to_string()),
            concentration_effect_name: Some("bless".to_string()),
            applies_conditions: Default::default(),
        };
        let mut rng = EncounterRng::seed_from_u64(1);
        let mods = bless_mod(&[effect], &"a".to_string(), &mut rng);
        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].name, "bless");
        assert!((1..=4).contains(&mods[0].value));
    }
}
