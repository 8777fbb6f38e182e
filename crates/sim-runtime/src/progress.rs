//! Milestones and end-of-game conditions.

use sim_core::{
    GameOverReason, GameState, MilestoneCondition, MilestoneId, MilestoneProgress,
    MilestoneReward, Tunables, UpgradeId, MILESTONES,
};
use sim_econ::{max_borrowable, net_worth};
use tracing::info;

fn condition_met(state: &GameState, condition: MilestoneCondition, nw: i64) -> bool {
    let stats = &state.stats;
    match condition {
        MilestoneCondition::NetWorth(min) => nw >= min,
        MilestoneCondition::Trades(min) => stats.total_trades >= min,
        MilestoneCondition::MarketsVisited(min) => stats.markets_visited.len() >= min,
        MilestoneCondition::GoodsTraded(min) => stats.goods_traded >= min,
        MilestoneCondition::Turns(min) => state.turn >= min,
        MilestoneCondition::PaidOffDebt => stats.had_debt && state.player.debt == 0,
    }
}

fn apply_reward(state: &mut GameState, reward: MilestoneReward) {
    match reward {
        MilestoneReward::UnlockUpgrade(id) => {
            if !state.is_unlocked(id) {
                state.unlocked_upgrades.push(UpgradeId::from(id));
            }
        }
        MilestoneReward::Reputation(delta) => state.player.adjust_reputation(delta),
        MilestoneReward::Achievement | MilestoneReward::Tutorial => {}
    }
}

/// Mark every newly satisfied milestone achieved and grant its reward.
///
/// Returns the ids achieved by this call, in table order.
pub fn evaluate_milestones(state: &mut GameState) -> Vec<MilestoneId> {
    let nw = net_worth(state);
    let turn = state.turn;
    let mut achieved = Vec::new();
    for def in MILESTONES {
        let id = MilestoneId::from(def.id);
        if state.milestones.get(&id).is_some_and(|m| m.achieved) {
            continue;
        }
        if !condition_met(state, def.condition, nw) {
            continue;
        }
        let progress = state
            .milestones
            .entry(id.clone())
            .or_insert_with(|| MilestoneProgress {
                name: def.name.to_string(),
                achieved: false,
                achieved_on_turn: None,
            });
        progress.achieved = true;
        progress.achieved_on_turn = Some(turn);
        apply_reward(state, def.reward);
        info!(milestone = def.id, turn, "milestone achieved");
        achieved.push(id);
    }
    achieved
}

/// Terminal condition for the current state, if any.
pub fn game_over_reason(state: &GameState, t: &Tunables) -> Option<GameOverReason> {
    let player = &state.player;
    let nw = net_worth(state);
    if player.debt > 0 && (nw <= 0 || player.debt as f64 > nw as f64 * t.bankruptcy_multiplier) {
        return Some(GameOverReason::Bankruptcy);
    }
    if player.balance <= 0 && player.inventory.is_empty() && max_borrowable(state, t) <= 0 {
        return Some(GameOverReason::Destitution);
    }
    None
}

/// Set the terminal flag if a game-over condition holds. Never clears it.
pub fn check_game_over(state: &mut GameState, t: &Tunables) -> Option<GameOverReason> {
    if state.game_over {
        return state.game_over_reason;
    }
    let reason = game_over_reason(state, t)?;
    state.game_over = true;
    state.game_over_reason = Some(reason);
    info!(%reason, turn = state.turn, "game over");
    Some(reason)
}
