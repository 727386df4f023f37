//! The encounter state: the single owned value a reducer call mutates.

use super::combatant::{ActiveEffect, Combatant, ReactionWindow};
use super::types::{CombatantId, EffectId, OrderedMap, Phase};
use crate::rng::EncounterRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterState {
    pub round: u32,
    pub turn_owner_id: Option<CombatantId>,
    pub initiative_order: Vec<CombatantId>,
    pub phase: Phase,

    pub seq: u64,
    pub t: u64,

    pub combatants: OrderedMap<Combatant>,

    pub rng_seed: u64,
    pub rng: EncounterRng,

    pub reaction_window: Option<ReactionWindow>,
    pub combat_started: bool,
    pub initiative_finalized: bool,

    pub initiatives: HashMap<CombatantId, i32>,

    pub effects: HashMap<EffectId, ActiveEffect>,
    effect_seq: EffectId,

    window_seq: u64,
}

impl EncounterState {
    pub fn new(rng_seed: u64) -> Self {
        Self {
            round: 1,
            turn_owner_id: None,
            initiative_order: Vec::new(),
            phase: Phase::Idle,
            seq: 0,
            t: 0,
            combatants: OrderedMap::new(),
            rng_seed,
            rng: EncounterRng::seed_from_u64(rng_seed),
            reaction_window: None,
            combat_started: false,
            initiative_finalized: false,
            initiatives: HashMap::new(),
            effects: HashMap::new(),
            effect_seq: 0,
            window_seq: 0,
        }
    }

    pub fn with_combatant(mut self, combatant: Combatant) -> Self {
        self.combatants.insert(combatant.id.clone(), combatant);
        self
    }

    /// Advance `seq` and `t` in lockstep; called exactly once before every
    /// emitted event.
    pub fn bump(&mut self) -> (u64, u64) {
        self.seq += 1;
        self.t += 1;
        (self.seq, self.t)
    }

    pub fn new_effect_id(&mut self) -> EffectId {
        self.effect_seq += 1;
        self.effect_seq
    }

    /// A fresh, process-local reaction-window id. Unlike every other piece of
    /// state, this does not need to be reproduced bit-for-bit across runs —
    /// it is an opaque correlation handle, not a value the rules consult —
    /// so it is drawn from a plain counter rather than the deterministic
    /// PRNG stream.
    pub fn new_window_id(&mut self) -> String {
        self.window_seq += 1;
        format!("rw-{}-{}", self.round, self.window_seq)
    }
}
