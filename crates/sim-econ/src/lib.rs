#![deny(warnings)]

//! Economic calculations for Compute Cartel.
//!
//! This crate provides pure helpers over [`GameState`]:
//! - Net worth, inventory usage and average cost basis
//! - Tiered debt interest and borrowing headroom
//! - Effective trade prices including pending discount/premium offers
//!
//! The [`market`] module advances prices and supply levels one turn.

pub mod market;

pub use market::{
    diff_prices, price_bounds, shock_price, simulate_market, snapshot_prices, step_price,
    target_price, PriceChange, PriceChanges, PriceTable,
};

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use sim_core::{GameState, GoodId, PendingEvent, Player, Tunables};

/// Total units held.
pub fn inventory_used(player: &Player) -> u32 {
    player.inventory.values().sum()
}

/// Cargo slots still available.
pub fn free_capacity(player: &Player) -> u32 {
    player
        .inventory_capacity
        .saturating_sub(inventory_used(player))
}

/// Value of the inventory at the player's current market prices.
pub fn inventory_value(state: &GameState) -> i64 {
    let Some(market) = state.current_market() else {
        return 0;
    };
    state
        .player
        .inventory
        .iter()
        .map(|(good, &qty)| market.price(good).unwrap_or(0) * i64::from(qty))
        .sum()
}

/// Balance plus inventory value at current prices, minus debt.
pub fn net_worth(state: &GameState) -> i64 {
    state.player.balance + inventory_value(state) - state.player.debt
}

/// Average price paid per held unit, rounded; 0 when none are held.
pub fn average_cost(good: &GoodId, player: &Player) -> i64 {
    let qty = player.held(good);
    if qty == 0 {
        return 0;
    }
    let basis = player.cost_basis.get(good).copied().unwrap_or(0);
    (basis as f64 / f64::from(qty)).round() as i64
}

/// `amount` scaled by `(100 + percent) / 100`, rounded half away from zero.
pub fn apply_percent(amount: i64, percent: i64) -> i64 {
    let scaled = Decimal::from(amount) * Decimal::from(100 + percent) / Decimal::from(100);
    scaled
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(amount)
}

/// `amount × rate`, rounded half away from zero.
pub fn apply_rate(amount: i64, rate: f64) -> i64 {
    let rate = Decimal::from_f64(rate).unwrap_or(Decimal::ZERO);
    (Decimal::from(amount) * rate)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

/// Per-turn interest rate for the current debt / net worth ratio.
pub fn debt_interest_tier(state: &GameState, t: &Tunables) -> f64 {
    let debt = state.player.debt;
    if debt <= 0 {
        return t.interest.base;
    }
    let nw = net_worth(state);
    if nw <= 0 {
        return t.interest.high;
    }
    let ratio = debt as f64 / nw as f64;
    if ratio < t.interest.medium_threshold {
        t.interest.base
    } else if ratio < t.interest.high_threshold {
        t.interest.medium
    } else {
        t.interest.high
    }
}

/// Add one turn of interest to the debt and return the amount charged.
pub fn accrue_interest(state: &mut GameState, t: &Tunables) -> i64 {
    let rate = debt_interest_tier(state, t);
    state.player.debt_interest_rate = rate;
    if state.player.debt <= 0 {
        return 0;
    }
    let interest = apply_rate(state.player.debt, rate);
    state.player.debt += interest;
    interest
}

/// Remaining borrowing headroom; net worth is floored at zero first.
pub fn max_borrowable(state: &GameState, t: &Tunables) -> i64 {
    let nw = net_worth(state).max(0);
    let limit = Decimal::from(nw) * Decimal::from_f64(t.borrow_multiplier).unwrap_or(Decimal::ZERO);
    let limit = limit.floor().to_i64().unwrap_or(0);
    (limit - state.player.debt).max(0)
}

/// Which side of a trade a pending price modifier applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

fn find_modifier(state: &GameState, good: &GoodId, side: TradeSide) -> Option<(usize, u32)> {
    state
        .pending_events
        .iter()
        .enumerate()
        .find_map(|(i, e)| match (e, side) {
            (PendingEvent::DiscountBuy { good: g, percent, .. }, TradeSide::Buy)
            | (PendingEvent::PremiumSell { good: g, percent, .. }, TradeSide::Sell)
                if g == good =>
            {
                Some((i, *percent))
            }
            _ => None,
        })
}

/// Unit price to buy `good` here, after any pending discount.
pub fn effective_buy_price(state: &GameState, good: &GoodId) -> Option<i64> {
    let base = state.current_market()?.price(good)?;
    Some(match find_modifier(state, good, TradeSide::Buy) {
        Some((_, pct)) => apply_percent(base, -i64::from(pct)).max(1),
        None => base,
    })
}

/// Unit price to sell `good` here, after any pending premium.
pub fn effective_sell_price(state: &GameState, good: &GoodId) -> Option<i64> {
    let base = state.current_market()?.price(good)?;
    Some(match find_modifier(state, good, TradeSide::Sell) {
        Some((_, pct)) => apply_percent(base, i64::from(pct)),
        None => base,
    })
}

/// Remove and return the percentage of the first matching modifier, if any.
pub fn take_modifier(state: &mut GameState, good: &GoodId, side: TradeSide) -> Option<u32> {
    let (idx, pct) = find_modifier(state, good, side)?;
    state.pending_events.remove(idx);
    Some(pct)
}
