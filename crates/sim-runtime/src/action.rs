//! Player commands and the validation errors they can produce.

use serde::{Deserialize, Serialize};
use sim_core::{GoodId, MarketId, UpgradeId};
use thiserror::Error;

/// One player command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Action {
    Buy {
        good: GoodId,
        quantity: u32,
    },
    Sell {
        good: GoodId,
        quantity: u32,
    },
    Travel {
        destination: MarketId,
        /// Accept the risk of carrying goods restricted at the destination.
        #[serde(default)]
        confirmed: bool,
    },
    Wait,
    Borrow {
        amount: i64,
    },
    PayDebt {
        amount: i64,
    },
    Upgrade {
        upgrade: UpgradeId,
    },
    ResolveChoice {
        #[serde(rename = "choiceId")]
        choice_id: String,
    },
}

/// Why an action was rejected. Rendered into the response's `error` field.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ActionError {
    #[error("The game is over")]
    GameOver,
    #[error("A choice is pending; resolve it first")]
    ChoicePending,
    #[error("No choice is pending")]
    NoPendingChoice,
    #[error("Invalid choice: {0}")]
    InvalidChoice(String),
    #[error("Unknown good: {0}")]
    UnknownGood(String),
    #[error("Unknown market: {0}")]
    UnknownMarket(String),
    #[error("Unknown upgrade: {0}")]
    UnknownUpgrade(String),
    #[error("Quantity must be positive")]
    NonPositiveQuantity,
    #[error("Amount must be positive")]
    NonPositiveAmount,
    #[error("{good} is restricted in {market}")]
    Restricted { good: String, market: String },
    #[error("Not enough cargo space: need {needed}, have {available} free")]
    InsufficientCargo { needed: u32, available: u32 },
    #[error("Insufficient funds: need ${needed}, have ${available}")]
    InsufficientFunds { needed: i64, available: i64 },
    #[error("Not enough {good} to sell: holding {held}")]
    InsufficientInventory { good: String, held: u32 },
    #[error("Already at {0}")]
    AlreadyAt(String),
    #[error("CONFIRM_RISK: carrying goods restricted in {market}: {}", join_ids(.goods))]
    ConfirmRisk {
        market: String,
        goods: Vec<GoodId>,
    },
    #[error("Borrow limit exceeded: at most ${max} available")]
    BorrowLimit { max: i64 },
    #[error("No outstanding debt")]
    NoDebt,
    #[error("Cannot pay more than the outstanding debt of ${debt}")]
    Overpayment { debt: i64 },
    #[error("{0} already purchased")]
    AlreadyPurchased(String),
    #[error("{upgrade} requires {prerequisite}")]
    MissingPrerequisite {
        upgrade: String,
        prerequisite: String,
    },
    #[error("{0} is locked; reach its milestone first")]
    Locked(String),
}

fn join_ids(goods: &[GoodId]) -> String {
    goods
        .iter()
        .map(GoodId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
