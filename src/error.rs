//! The two-tier error model: expected, user-caused command rejections versus
//! fatal invariant failures.
//!
//! Rejections never propagate as Rust errors — they are folded into a single
//! `CommandRejected` event and returned as a normal `Ok` from the reducer.
//! [`EngineError`] is reserved for the second tier: a formula that doesn't
//! parse, a spell name that isn't registered, or a snapshot that doesn't
//! decode. There is no `thiserror`/`anyhow` dependency here, matching the
//! donor crate's own hand-rolled `Display` + `std::error::Error` style.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One rejection code per entry in the validator's external contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionCode {
    ReactionWindowOpen,
    CombatAlreadyStarted,
    NoCombatants,
    BadPhase,
    CombatNotStarted,
    InitiativeFinalized,
    UnknownCombatant,
    MissingInitiative,
    NotYourTurn,
    AlreadyInTurn,
    NotInTurn,
    SurprisedBlock,
    NoAction,
    UnknownTargets,
    NoBonusAction,
    NotAPc,
    NotDying,
    AlreadyDead,
    AlreadyStable,
    TargetNotPc,
    TargetNotDying,
    TargetDead,
    TargetAlreadyStable,
    BadAmount,
    ConditionBlocksAction,
    ConditionBlocksMove,
    ConditionBlocksReaction,
    EmptyPath,
    InvalidPath,
    NoMovement,
    UnknownAttack,
    AttackNotAction,
    AttackNotBonus,
    NoAttacksRemaining,
    UnknownMultiattack,
    MultiattackMissingAttacks,
    NoReactionWindow,
    NotEligibleReactor,
    NoReaction,
    Incapacitated,
    NoConcentration,
    UnknownSpell,
    MissingSpellSaveDc,
    MissingSpellAttackBonus,
    NoTargets,
    BadTargetCount,
    UnknownTarget,
    SlotTooLow,
    NoSpellSlot,
    OutOfRange,
    SurprisedBlockReaction,
    Dead,
    UnknownCommand,
}

impl RejectionCode {
    /// The wire name used in `CommandRejected.payload.code`, matching §6.3.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionCode::ReactionWindowOpen => "REACTION_WINDOW_OPEN",
            RejectionCode::CombatAlreadyStarted => "COMBAT_ALREADY_STARTED",
            RejectionCode::NoCombatants => "NO_COMBATANTS",
            RejectionCode::BadPhase => "BAD_PHASE",
            RejectionCode::CombatNotStarted => "COMBAT_NOT_STARTED",
            RejectionCode::InitiativeFinalized => "INITIATIVE_FINALIZED",
            RejectionCode::UnknownCombatant => "UNKNOWN_COMBATANT",
            RejectionCode::MissingInitiative => "MISSING_INITIATIVE",
            RejectionCode::NotYourTurn => "NOT_YOUR_TURN",
            RejectionCode::AlreadyInTurn => "ALREADY_IN_TURN",
            RejectionCode::NotInTurn => "NOT_IN_TURN",
            RejectionCode::SurprisedBlock => "SURPRISED_BLOCK",
            RejectionCode::NoAction => "NO_ACTION",
            RejectionCode::UnknownTargets => "UNKNOWN_TARGETS",
            RejectionCode::NoBonusAction => "NO_BONUS_ACTION",
            RejectionCode::NotAPc => "NOT_A_PC",
            RejectionCode::NotDying => "NOT_DYING",
            RejectionCode::AlreadyDead => "ALREADY_DEAD",
            RejectionCode::AlreadyStable => "ALREADY_STABLE",
            RejectionCode::TargetNotPc => "TARGET_NOT_PC",
            RejectionCode::TargetNotDying => "TARGET_NOT_DYING",
            RejectionCode::TargetDead => "TARGET_DEAD",
            RejectionCode::TargetAlreadyStable => "TARGET_ALREADY_STABLE",
            RejectionCode::BadAmount => "BAD_AMOUNT",
            RejectionCode::ConditionBlocksAction => "CONDITION_BLOCKS_ACTION",
            RejectionCode::ConditionBlocksMove => "CONDITION_BLOCKS_MOVE",
            RejectionCode::ConditionBlocksReaction => "CONDITION_BLOCKS_REACTION",
            RejectionCode::EmptyPath => "EMPTY_PATH",
            RejectionCode::InvalidPath => "INVALID_PATH",
            RejectionCode::NoMovement => "NO_MOVEMENT",
            RejectionCode::UnknownAttack => "UNKNOWN_ATTACK",
            RejectionCode::AttackNotAction => "ATTACK_NOT_ACTION",
            RejectionCode::AttackNotBonus => "ATTACK_NOT_BONUS",
            RejectionCode::NoAttacksRemaining => "NO_ATTACKS_REMAINING",
            RejectionCode::UnknownMultiattack => "UNKNOWN_MULTIATTACK",
            RejectionCode::MultiattackMissingAttacks => "MULTIATTACK_MISSING_ATTACKS",
            RejectionCode::NoReactionWindow => "NO_REACTION_WINDOW",
            RejectionCode::NotEligibleReactor => "NOT_ELIGIBLE_REACTOR",
            RejectionCode::NoReaction => "NO_REACTION",
            RejectionCode::Incapacitated => "INCAPACITATED",
            RejectionCode::NoConcentration => "NO_CONCENTRATION",
            RejectionCode::UnknownSpell => "UNKNOWN_SPELL",
            RejectionCode::MissingSpellSaveDc => "MISSING_SPELL_SAVE_DC",
            RejectionCode::MissingSpellAttackBonus => "MISSING_SPELL_ATTACK_BONUS",
            RejectionCode::NoTargets => "NO_TARGETS",
            RejectionCode::BadTargetCount => "BAD_TARGET_COUNT",
            RejectionCode::UnknownTarget => "UNKNOWN_TARGET",
            RejectionCode::SlotTooLow => "SLOT_TOO_LOW",
            RejectionCode::NoSpellSlot => "NO_SPELL_SLOT",
            RejectionCode::OutOfRange => "OUT_OF_RANGE",
            RejectionCode::SurprisedBlockReaction => "SURPRISED_BLOCK_REACTION",
            RejectionCode::Dead => "DEAD",
            RejectionCode::UnknownCommand => "UNKNOWN_COMMAND",
        }
    }
}

impl fmt::Display for RejectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected command: the validator's only possible error value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    pub code: RejectionCode,
    pub message: String,
    #[serde(default)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl ValidationError {
    pub fn new(code: RejectionCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            meta: serde_json::Map::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }
}

/// Fatal, programmer-tier failures. Never produced by a well-formed command
/// that passed the validator against well-formed state; surfaced to the
/// caller as a hard error rather than folded into an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineError {
    UnparseableFormula(String),
    UnknownSpell(String),
    UnknownCombatant(String),
    MalformedState(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::UnparseableFormula(formula) => {
                write!(f, "unparseable dice formula: {formula:?}")
            }
            EngineError::UnknownSpell(name) => write!(f, "unknown spell: {name:?}"),
            EngineError::UnknownCombatant(id) => write!(f, "unknown combatant: {id:?}"),
            EngineError::MalformedState(msg) => write!(f, "malformed state: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
