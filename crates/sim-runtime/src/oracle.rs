//! Oracle predictions and resolution of scheduled price tips.

use rand::seq::SliceRandom;
use rand::Rng;
use sim_core::data::{ANALYST_NETWORK, ORACLE_PREDICTIONS};
use sim_core::text::{format_money, render, TemplateParams};
use sim_core::{good_def, GameState, GoodId, PendingEvent, Tunables, GOODS};
use sim_econ::{apply_rate, shock_price};
use tracing::debug;

use crate::chance;

/// Share of predictions that are sold rather than given away.
const PREMIUM_SHARE: f64 = 0.3;
const PREMIUM_ACCURACY_BONUS: f64 = 0.15;

pub fn oracle_accuracy(reputation: i32) -> f64 {
    (0.5 + f64::from(reputation - 50) * 0.005).clamp(0.3, 0.9)
}

/// Fee for a premium prediction: 2% of balance, at least 100.
pub fn premium_fee(balance: i64) -> i64 {
    apply_rate(balance.max(0), 0.02).max(100)
}

/// Maybe deliver a prediction; returns the line to show the player.
///
/// An accurate prediction schedules a genuine tip for the next turn. An
/// inaccurate one reads the same and schedules nothing.
pub fn roll_oracle<R: Rng + ?Sized>(
    state: &mut GameState,
    t: &Tunables,
    rng: &mut R,
) -> Option<String> {
    let mut p = t.oracle_chance;
    if state.has_upgrade(ANALYST_NETWORK) {
        p = (p * 2.0).min(1.0);
    }
    if !chance(rng, p) {
        return None;
    }

    let def = GOODS.choose(rng)?;
    let rising = chance(rng, 0.5);
    let mut accuracy = oracle_accuracy(state.player.reputation);
    let mut prefix = String::new();
    if chance(rng, PREMIUM_SHARE) {
        let fee = premium_fee(state.player.balance);
        if fee <= state.player.balance {
            state.player.balance -= fee;
            accuracy = (accuracy + PREMIUM_ACCURACY_BONUS).min(1.0);
            prefix = format!("[Premium, ${}] ", format_money(fee));
        }
    }
    if chance(rng, accuracy) {
        state.pending_events.push(PendingEvent::IntelTip {
            good: GoodId::from(def.id),
            rising,
            percent: rng.gen_range(10..=25),
            resolve_turn: state.turn + 1,
        });
    }

    let template = ORACLE_PREDICTIONS.choose(rng)?;
    let params = TemplateParams {
        good: Some(def.name.to_string()),
        direction: Some(if rising { "up" } else { "down" }.to_string()),
        ..TemplateParams::default()
    };
    Some(format!("{prefix}{}", render(template, &params)))
}

/// Apply every tip due on or before the current turn and drop it.
pub fn resolve_intel_tips(state: &mut GameState) -> Vec<String> {
    let turn = state.turn;
    let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pending_events)
        .into_iter()
        .partition(|e| matches!(e, PendingEvent::IntelTip { resolve_turn, .. } if *resolve_turn <= turn));
    state.pending_events = waiting;

    let mut lines = Vec::new();
    for tip in due {
        let PendingEvent::IntelTip {
            good,
            rising,
            percent,
            ..
        } = tip
        else {
            continue;
        };
        let signed = if rising {
            i64::from(percent)
        } else {
            -i64::from(percent)
        };
        shock_price(state, &good, signed);
        debug!(good = %good, percent = signed, "intel tip resolved");
        let name = good_def(good.as_str()).map_or(good.as_str(), |g| g.name);
        let direction = if rising { "up" } else { "down" };
        lines.push(format!("{name} prices moved {direction} {percent}%."));
    }
    lines
}
