//! What the engine hands back after each action.

use serde::{Deserialize, Serialize};
use sim_core::{ChoiceEvent, GameState, GoodId, MilestoneId};
use sim_econ::{net_worth, PriceChanges};

use crate::action::ActionError;
use crate::events::GameEvent;

/// Result of one `submit_action` call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub success: bool,
    pub error: Option<String>,
    /// State after the action; on failure, an unchanged copy of the input.
    pub state: GameState,
    pub events: Vec<GameEvent>,
    /// Populated only when the turn advanced.
    pub price_changes: PriceChanges,
    pub milestones_achieved: Vec<MilestoneId>,
    pub net_worth: i64,
    /// Human-readable log of everything that happened, one line per entry.
    pub turn_summary: String,
    pub turn_advanced: bool,
    /// Set when travel was interrupted by a decision.
    pub choice_event: Option<ChoiceEvent>,
    /// Goods that would be at risk; set alongside a `CONFIRM_RISK` error.
    pub at_risk_goods: Vec<GoodId>,
}

impl ActionResponse {
    pub(crate) fn rejected(state: &GameState, err: ActionError) -> Self {
        let at_risk_goods = match &err {
            ActionError::ConfirmRisk { goods, .. } => goods.clone(),
            _ => Vec::new(),
        };
        Self {
            success: false,
            error: Some(err.to_string()),
            state: state.clone(),
            events: Vec::new(),
            price_changes: PriceChanges::new(),
            milestones_achieved: Vec::new(),
            net_worth: net_worth(state),
            turn_summary: String::new(),
            turn_advanced: false,
            choice_event: None,
            at_risk_goods,
        }
    }
}

/// Accumulates the observable effects of one resolution pass.
#[derive(Debug, Default)]
pub(crate) struct TurnContext {
    pub events: Vec<GameEvent>,
    pub lines: Vec<String>,
    pub price_changes: PriceChanges,
    pub milestones: Vec<MilestoneId>,
    pub choice_event: Option<ChoiceEvent>,
    pub turn_advanced: bool,
}

impl TurnContext {
    pub fn line(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.lines.push(event.description.clone());
        self.events.push(event);
    }

    pub fn finish(self, state: GameState, net_worth: i64) -> ActionResponse {
        ActionResponse {
            success: true,
            error: None,
            state,
            events: self.events,
            price_changes: self.price_changes,
            milestones_achieved: self.milestones,
            net_worth,
            turn_summary: self.lines.join("\n"),
            turn_advanced: self.turn_advanced,
            choice_event: self.choice_event,
            at_risk_goods: Vec::new(),
        }
    }
}
