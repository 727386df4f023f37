//! The event envelope and the full tagged union of event payloads.
//!
//! Events are the reducer's sole observable output (§3.5): every state
//! change the reducer makes is also recorded here, and downstream code must
//! never peek at state diffs directly. `EventPayload` mirrors §6.2's event
//! surface one variant per type, each carrying exactly the fields its
//! matching factory function built in the distilled-from source.

use crate::model::types::{AdvState, CombatantId, DamageModifier, EffectId};
use crate::model::EncounterState;
use serde::{Deserialize, Serialize};

/// One additive modifier contributed by a roll-middleware hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollMod {
    pub name: String,
    pub value: i64,
}

/// A single d20 or damage roll, after all middleware has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roll {
    pub roll_id: String,
    pub kind: String,
    pub formula: String,
    pub dice: Vec<i64>,
    pub kept: Vec<i64>,
    pub mods: Vec<RollMod>,
    pub total: i64,
    pub adv_state: AdvState,
    pub nat: i64,
    pub is_critical: bool,
}

/// The envelope every event is wrapped in. `payload` carries the
/// type-specific fields; `type` is the serialized tag of [`EventPayload`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: String,
    pub seq: u64,
    pub t: u64,
    pub round: u32,
    #[serde(default)]
    pub turn_owner_id: Option<CombatantId>,
    #[serde(default)]
    pub actor_id: Option<CombatantId>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventPayload {
    CommandRejected {
        command: serde_json::Value,
        code: String,
        message: String,
        meta: serde_json::Map<String, serde_json::Value>,
    },
    CombatStarted,
    InitiativeSet {
        combatant_id: CombatantId,
        initiative: i32,
    },
    InitiativeRolled {
        combatant_id: CombatantId,
        roll: Roll,
        bonus: i32,
    },
    InitiativeOrderFinalized {
        initiative_order: Vec<CombatantId>,
    },
    RoundStarted,
    TurnStarted,
    TurnResourcesReset {
        action: bool,
        bonus: bool,
        reaction: bool,
        movement_ft: i32,
    },
    DisengageApplied {
        combatant_id: CombatantId,
    },
    MovementStarted {
        mover_id: CombatantId,
        from_pos: (i32, i32),
        path: Vec<(i32, i32)>,
    },
    MovedStep {
        mover_id: CombatantId,
        from_pos: (i32, i32),
        to_pos: (i32, i32),
        cost_ft: i32,
    },
    MovementStopped {
        mover_id: CombatantId,
        reason: String,
    },
    OpportunityAttackTriggered {
        mover_id: CombatantId,
        threatened_by_id: CombatantId,
        reach_ft: i32,
    },
    ReactionWindowOpened {
        window_id: String,
        trigger: String,
        eligible_reactors: Vec<CombatantId>,
        context: serde_json::Value,
    },
    ReactionWindowClosed {
        window_id: String,
        closed_by: String,
    },
    AttackDeclared {
        attacker_id: CombatantId,
        target_id: CombatantId,
        attack_name: String,
        attack_kind: String,
        context: String,
        economy: String,
    },
    MultiattackDeclared {
        attacker_id: CombatantId,
        target_id: CombatantId,
        multiattack_name: String,
        attacks: Vec<String>,
    },
    AttackRolled {
        attacker_id: CombatantId,
        target_id: CombatantId,
        roll: Roll,
        to_hit_bonus: i64,
        target_ac: i32,
    },
    HitConfirmed {
        attacker_id: CombatantId,
        target_id: CombatantId,
        is_critical: bool,
        margin: i64,
    },
    MissConfirmed {
        attacker_id: CombatantId,
        target_id: CombatantId,
        margin: i64,
    },
    DamageRolled {
        attacker_id: CombatantId,
        target_id: CombatantId,
        roll: Roll,
        damage_type: String,
    },
    DamageApplied {
        attacker_id: CombatantId,
        target_id: CombatantId,
        raw: i64,
        adjusted: i64,
        damage_type: String,
        hp_before: i32,
        hp_after: i32,
        modifier: Option<DamageModifier>,
        is_critical: bool,
    },
    TurnEnded,
    ConditionApplied {
        target_id: CombatantId,
        condition: String,
        reason: String,
    },
    ConditionRemoved {
        target_id: CombatantId,
        condition: String,
        reason: String,
    },
    UnconsciousStateChanged {
        target_id: CombatantId,
        became_unconscious: bool,
        reason: String,
    },
    SaveEffectDeclared {
        source_id: CombatantId,
        target_ids: Vec<CombatantId>,
        effect_name: String,
        save_ability: String,
        dc: i32,
        adv_state: AdvState,
        on_success: String,
        damage_type: String,
        damage_formula: String,
        economy: String,
    },
    SavingThrowRolled {
        source_id: CombatantId,
        target_id: CombatantId,
        effect_name: String,
        roll: Roll,
        save_ability: String,
        dc: i32,
        bonus: i64,
    },
    SavingThrowSucceeded {
        source_id: CombatantId,
        target_id: CombatantId,
        effect_name: String,
        margin: i64,
    },
    SavingThrowFailed {
        source_id: CombatantId,
        target_id: CombatantId,
        effect_name: String,
        margin: i64,
    },
    EffectDamageRolled {
        source_id: CombatantId,
        target_id: CombatantId,
        effect_name: String,
        roll: Roll,
        damage_type: String,
    },
    EffectDamageApplied {
        source_id: CombatantId,
        target_id: CombatantId,
        effect_name: String,
        raw: i64,
        adjusted: i64,
        adjusted_final: i64,
        damage_type: String,
        hp_before: i32,
        hp_after: i32,
        modifier: Option<DamageModifier>,
    },
    SaveEffectNegated {
        source_id: CombatantId,
        target_id: CombatantId,
        effect_name: String,
    },
    DeathSaveRequired {
        combatant_id: CombatantId,
    },
    DeathSaveRolled {
        combatant_id: CombatantId,
        roll: Roll,
    },
    DeathSaveResult {
        combatant_id: CombatantId,
        successes: u8,
        failures: u8,
        outcome: String,
    },
    Stabilized {
        healer_id: Option<CombatantId>,
        target_id: CombatantId,
        reason: String,
    },
    Died {
        target_id: CombatantId,
        reason: String,
    },
    Healed {
        healer_id: Option<CombatantId>,
        target_id: CombatantId,
        amount: i32,
        hp_before: i32,
        hp_after: i32,
    },
    ConcentrationStarted {
        combatant_id: CombatantId,
        effect_name: String,
        source_id: CombatantId,
    },
    ConcentrationEnded {
        combatant_id: CombatantId,
        effect_name: String,
        reason: String,
    },
    ConcentrationCheckTriggered {
        combatant_id: CombatantId,
        dc: i32,
        damage_taken: i64,
        cause: String,
    },
    ConcentrationCheckRolled {
        combatant_id: CombatantId,
        roll: Roll,
    },
    ConcentrationMaintained {
        combatant_id: CombatantId,
        total: i64,
        dc: i32,
    },
    ConcentrationBroken {
        combatant_id: CombatantId,
        reason: String,
    },
    SpellCastDeclared {
        caster_id: CombatantId,
        spell_name: String,
        slot_level: u8,
        target_ids: Vec<CombatantId>,
    },
    SpellSlotSpent {
        caster_id: CombatantId,
        slot_level: u8,
        before: u32,
        after: u32,
    },
    EffectApplied {
        effect_id: EffectId,
        effect_name: String,
        source_id: CombatantId,
        target_id: CombatantId,
        concentration_owner_id: Option<CombatantId>,
        concentration_effect_name: Option<String>,
        conditions: Vec<String>,
    },
    EffectEnded {
        effect_id: EffectId,
        effect_name: String,
        removed_conditions: Vec<String>,
    },
}

impl EventEnvelope {
    /// Stamp `payload` with the next `(seq, t)` pair from `state` and the
    /// current round / turn owner. Every event the reducer emits goes
    /// through here so `seq`/`t` never drift out of lockstep.
    pub fn next(state: &mut EncounterState, actor_id: Option<CombatantId>, payload: EventPayload) -> Self {
        let (seq, t) = state.bump();
        Self {
            event_id: format!("ev-{seq}"),
            seq,
            t,
            round: state.round,
            turn_owner_id: state.turn_owner_id.clone(),
            actor_id,
            payload,
        }
    }
}

impl EventPayload {
    /// The serialized `type` tag, matching §6.2's naming exactly.
    pub fn type_name(&self) -> &'static str {
        match self {
            EventPayload::CommandRejected { .. } => "CommandRejected",
            EventPayload::CombatStarted => "CombatStarted",
            EventPayload::InitiativeSet { .. } => "InitiativeSet",
            EventPayload::InitiativeRolled { .. } => "InitiativeRolled",
            EventPayload::InitiativeOrderFinalized { .. } => "InitiativeOrderFinalized",
            EventPayload::RoundStarted => "RoundStarted",
            EventPayload::TurnStarted => "TurnStarted",
            EventPayload::TurnResourcesReset { .. } => "TurnResourcesReset",
            EventPayload::DisengageApplied { .. } => "DisengageApplied",
            EventPayload::MovementStarted { .. } => "MovementStarted",
            EventPayload::MovedStep { .. } => "MovedStep",
            EventPayload::MovementStopped { .. } => "MovementStopped",
            EventPayload::OpportunityAttackTriggered { .. } => "OpportunityAttackTriggered",
            EventPayload::ReactionWindowOpened { .. } => "ReactionWindowOpened",
            EventPayload::ReactionWindowClosed { .. } => "ReactionWindowClosed",
            EventPayload::AttackDeclared { .. } => "AttackDeclared",
            EventPayload::MultiattackDeclared { .. } => "MultiattackDeclared",
            EventPayload::AttackRolled { .. } => "AttackRolled",
            EventPayload::HitConfirmed { .. } => "HitConfirmed",
            EventPayload::MissConfirmed { .. } => "MissConfirmed",
            EventPayload::DamageRolled { .. } => "DamageRolled",
            EventPayload::DamageApplied { .. } => "DamageApplied",
            EventPayload::TurnEnded => "TurnEnded",
            EventPayload::ConditionApplied { .. } => "ConditionApplied",
            EventPayload::ConditionRemoved { .. } => "ConditionRemoved",
            EventPayload::UnconsciousStateChanged { .. } => "UnconsciousStateChanged",
            EventPayload::SaveEffectDeclared { .. } => "SaveEffectDeclared",
            EventPayload::SavingThrowRolled { .. } => "SavingThrowRolled",
            EventPayload::SavingThrowSucceeded { .. } => "SavingThrowSucceeded",
            EventPayload::SavingThrowFailed { .. } => "SavingThrowFailed",
            EventPayload::EffectDamageRolled { .. } => "EffectDamageRolled",
            EventPayload::EffectDamageApplied { .. } => "EffectDamageApplied",
            EventPayload::SaveEffectNegated { .. } => "SaveEffectNegated",
            EventPayload::DeathSaveRequired { .. } => "DeathSaveRequired",
            EventPayload::DeathSaveRolled { .. } => "DeathSaveRolled",
            EventPayload::DeathSaveResult { .. } => "DeathSaveResult",
            EventPayload::Stabilized { .. } => "Stabilized",
            EventPayload::Died { .. } => "Died",
            EventPayload::Healed { .. } => "Healed",
            EventPayload::ConcentrationStarted { .. } => "ConcentrationStarted",
            EventPayload::ConcentrationEnded { .. } => "ConcentrationEnded",
            EventPayload::ConcentrationCheckTriggered { .. } => "ConcentrationCheckTriggered",
            EventPayload::ConcentrationCheckRolled { .. } => "ConcentrationCheckRolled",
            EventPayload::ConcentrationMaintained { .. } => "ConcentrationMaintained",
            EventPayload::ConcentrationBroken { .. } => "ConcentrationBroken",
            EventPayload::SpellCastDeclared { .. } => "SpellCastDeclared",
            EventPayload::SpellSlotSpent { .. } => "SpellSlotSpent",
            EventPayload::EffectApplied { .. } => "EffectApplied",
            EventPayload::EffectEnded { .. } => "EffectEnded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_payload_serializes_with_type_tag() {
        let payload = EventPayload::CombatStarted;
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], "CombatStarted");
    }

    #[test]
    fn envelope_flattens_payload_fields_alongside_envelope_fields() {
        let envelope = EventEnvelope {
            event_id: "e1".into(),
            seq: 1,
            t: 1,
            round: 1,
            turn_owner_id: None,
            actor_id: Some("a".into()),
            payload: EventPayload::Healed {
                healer_id: None,
                target_id: "b".into(),
                amount: 5,
                hp_before: 10,
                hp_after: 15,
            },
        };
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["type"], "Healed");
        assert_eq!(value["seq"], 1);
        assert_eq!(value["hp_after"], 15);
    }
}
