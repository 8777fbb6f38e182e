//! Unattended play: drive an [`Engine`] with an [`Autopilot`].

use rand::Rng;
use serde::{Deserialize, Serialize};
use sim_core::{GameOverReason, GameState, MilestoneId};
use sim_econ::net_worth;
use sim_runtime::{Action, Engine};
use tracing::{info, warn};

use crate::Autopilot;

/// Upper bound on non-advancing moves per turn before the session gives up.
const MAX_ACTIONS_PER_TURN: u32 = 32;

/// Outcome of [`run_session`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub turns_played: u32,
    pub actions_taken: u32,
    pub rejected_actions: u32,
    pub final_net_worth: i64,
    pub peak_net_worth: i64,
    pub total_trades: u32,
    pub milestones: Vec<MilestoneId>,
    pub game_over: Option<GameOverReason>,
    /// Every non-empty turn summary, in order.
    pub log: Vec<String>,
    pub state: GameState,
}

/// Play up to `turns` turns from `state`, stopping early on game over.
pub fn run_session<R: Rng + ?Sized>(
    engine: &Engine,
    pilot: &Autopilot,
    state: GameState,
    turns: u32,
    rng: &mut R,
) -> SessionSummary {
    let start_turn = state.turn;
    let target = start_turn.saturating_add(turns);
    let budget = turns.saturating_mul(MAX_ACTIONS_PER_TURN);
    let mut state = state;
    let mut actions_taken = 0u32;
    let mut rejected_actions = 0u32;
    let mut milestones = Vec::new();
    let mut log = Vec::new();

    while state.turn < target && !state.game_over && actions_taken < budget {
        let action = pilot.choose(&state, engine.tunables(), rng);
        let mut res = engine.submit_action(&state, &action, rng);
        actions_taken += 1;
        if !res.success {
            rejected_actions += 1;
            warn!(?action, error = ?res.error, "autopilot move rejected");
            if matches!(action, Action::Wait) {
                break;
            }
            res = engine.submit_action(&state, &Action::Wait, rng);
            actions_taken += 1;
            if !res.success {
                break;
            }
        }
        if !res.turn_summary.is_empty() {
            log.push(res.turn_summary.clone());
        }
        milestones.extend(res.milestones_achieved.iter().cloned());
        state = res.state;
    }

    let summary = SessionSummary {
        turns_played: state.turn - start_turn,
        actions_taken,
        rejected_actions,
        final_net_worth: net_worth(&state),
        peak_net_worth: state.stats.peak_net_worth,
        total_trades: state.stats.total_trades,
        milestones,
        game_over: state.game_over_reason,
        log,
        state,
    };
    info!(
        turns = summary.turns_played,
        actions = summary.actions_taken,
        net_worth = summary.final_net_worth,
        trades = summary.total_trades,
        "session finished"
    );
    summary
}
