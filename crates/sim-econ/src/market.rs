//! Price random walk with mean reversion, and supply tier drift.

use rand::Rng;
use serde::{Deserialize, Serialize};
use sim_core::{
    market_def, GameState, GoodDef, GoodId, MarketDef, MarketId, SupplyLevel, Tunables, GOODS,
};
use std::collections::BTreeMap;
use tracing::trace;

use crate::apply_percent;

/// Price of one good in one market before and after a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceChange {
    pub old: i64,
    pub new: i64,
}

pub type PriceTable = BTreeMap<MarketId, BTreeMap<GoodId, i64>>;
pub type PriceChanges = BTreeMap<MarketId, BTreeMap<GoodId, PriceChange>>;

/// Anchor the walk reverts toward.
pub fn target_price(good: &GoodDef, market: &MarketDef, supply: SupplyLevel) -> f64 {
    good.midpoint() * market.price_modifier * supply.price_multiplier()
}

/// Inclusive price clamp for a good in a market.
pub fn price_bounds(good: &GoodDef, market: &MarketDef, t: &Tunables) -> (i64, i64) {
    let lo = (good.base_min as f64 * market.price_modifier * t.price_floor_factor).round() as i64;
    let hi = (good.base_max as f64 * market.price_modifier * t.price_ceiling_factor).round() as i64;
    let lo = lo.max(1);
    (lo, hi.max(lo))
}

/// Advance one price by a bounded random step blended toward the target.
pub fn step_price<R: Rng + ?Sized>(
    old: i64,
    good: &GoodDef,
    market: &MarketDef,
    supply: SupplyLevel,
    t: &Tunables,
    rng: &mut R,
) -> i64 {
    let vol = supply.volatility();
    let delta: f64 = rng.gen_range(-vol..=vol);
    let walked = old as f64 * (1.0 + delta);
    let target = target_price(good, market, supply);
    let blended = walked * (1.0 - t.mean_reversion) + target * t.mean_reversion;
    let (lo, hi) = price_bounds(good, market, t);
    blended.clamp(lo as f64, hi as f64).round() as i64
}

/// Advance every market price one step, then roll supply shifts.
pub fn simulate_market<R: Rng + ?Sized>(state: &mut GameState, t: &Tunables, rng: &mut R) {
    for (market_id, market) in state.markets.iter_mut() {
        let Some(def) = market_def(market_id.as_str()) else {
            continue;
        };
        for good in GOODS {
            let id = GoodId::from(good.id);
            let Some(old) = market.price(&id) else {
                continue;
            };
            let new = step_price(old, good, def, market.supply_of(&id), t, rng);
            market.prices.insert(id.clone(), new);
            market.record_price(&id, new, t.price_history_len);
        }
    }

    for (market_id, market) in state.markets.iter_mut() {
        for level in market.supply.values_mut() {
            if rng.gen::<f64>() < t.supply_shift_chance {
                let from = *level;
                let shifted = from.shifted(rng.gen_bool(0.5));
                if shifted != from {
                    trace!(market = %market_id, ?from, to = ?shifted, "supply shift");
                }
                *level = shifted;
            }
        }
    }
}

/// Move one good's price by `percent` in every market, never below 1.
pub fn shock_price(state: &mut GameState, good: &GoodId, percent: i64) {
    for market in state.markets.values_mut() {
        if let Some(price) = market.prices.get_mut(good) {
            *price = apply_percent(*price, percent).max(1);
        }
    }
}

pub fn snapshot_prices(state: &GameState) -> PriceTable {
    state
        .markets
        .iter()
        .map(|(id, m)| (id.clone(), m.prices.clone()))
        .collect()
}

/// Old/new pairs for every price present in both `before` and `state`.
pub fn diff_prices(before: &PriceTable, state: &GameState) -> PriceChanges {
    let mut changes = PriceChanges::new();
    for (market_id, old_prices) in before {
        let Some(market) = state.markets.get(market_id) else {
            continue;
        };
        let per_good = old_prices
            .iter()
            .filter_map(|(good, &old)| {
                market
                    .price(good)
                    .map(|new| (good.clone(), PriceChange { old, new }))
            })
            .collect();
        changes.insert(market_id.clone(), per_good);
    }
    changes
}
