#![deny(warnings)]

//! Core domain model for Compute Cartel.
//!
//! This crate defines the serializable game state, the static data tables
//! (goods, markets, upgrades, milestones, text templates), the tunable balance
//! constants, and the small text renderer used for event descriptions.

pub mod data;
pub mod state;
pub mod text;
pub mod tunables;

pub use data::{
    choice_template, event_templates, good_def, market_def, milestone_def, upgrade_def,
    ChoiceCategory, EffectKind, EventCategory, GoodCategory, GoodDef, MarketDef,
    MilestoneCondition, MilestoneDef, MilestoneReward, UpgradeDef, UpgradeEffect, GOODS, MARKETS,
    MILESTONES, UPGRADES,
};
pub use state::{
    ChoiceEvent, ChoiceOption, ChoiceParams, GameOverReason, GameState, GoodId, MarketId,
    MarketState, MilestoneId, MilestoneProgress, PendingChoice, PendingEvent, Player, Stats,
    SupplyLevel, UpgradeId,
};
pub use tunables::{validate_tunables, ChoiceOdds, EventOdds, InterestTiers, Tunables};

use thiserror::Error;

/// Validation errors for configuration and data invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Configuration text could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
    /// Probability outside [0, 1].
    #[error("{field} must be within [0,1], got {value}")]
    ProbabilityOutOfRange { field: &'static str, value: f64 },
    /// Numeric field must be finite.
    #[error("{0} is not finite")]
    NonFinite(&'static str),
    /// Field must be strictly positive.
    #[error("{0} must be > 0")]
    NonPositive(&'static str),
    /// Starting money must be non-negative.
    #[error("negative monetary value is invalid")]
    NegativeMoney,
    /// Reputation outside [0, 100].
    #[error("reputation {0} is out of range [0, 100]")]
    ReputationOutOfRange(i32),
    /// Lower bound exceeds upper bound.
    #[error("invalid range: {0}")]
    InvalidRange(&'static str),
    /// Market id not present in the data tables.
    #[error("unknown market: {0}")]
    UnknownMarket(String),
}
