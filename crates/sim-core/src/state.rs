//! The game state snapshot passed between the caller and the engine.

use crate::data::{ChoiceCategory, GOODS, MARKETS, MILESTONES};
use crate::tunables::Tunables;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of a good, e.g. "h100".
    GoodId
);
string_id!(
    /// Identifier of a market, e.g. "shenzhen".
    MarketId
);
string_id!(
    /// Identifier of an upgrade, e.g. "insurance".
    UpgradeId
);
string_id!(
    /// Identifier of a milestone, e.g. "first_trade".
    MilestoneId
);

/// Discrete supply tier of one good in one market.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyLevel {
    Surplus,
    #[default]
    Normal,
    Shortage,
}

impl SupplyLevel {
    /// Maximum fractional price move per turn.
    pub fn volatility(self) -> f64 {
        match self {
            SupplyLevel::Surplus => 0.05,
            SupplyLevel::Normal => 0.10,
            SupplyLevel::Shortage => 0.20,
        }
    }

    /// Bias applied to the mean-reversion target.
    pub fn price_multiplier(self) -> f64 {
        match self {
            SupplyLevel::Surplus => 0.85,
            SupplyLevel::Normal => 1.0,
            SupplyLevel::Shortage => 1.25,
        }
    }

    /// One step toward shortage (`tighter`) or surplus, clamped at the ends.
    pub fn shifted(self, tighter: bool) -> Self {
        match (self, tighter) {
            (SupplyLevel::Surplus, true) => SupplyLevel::Normal,
            (SupplyLevel::Normal, true) => SupplyLevel::Shortage,
            (SupplyLevel::Shortage, true) => SupplyLevel::Shortage,
            (SupplyLevel::Surplus, false) => SupplyLevel::Surplus,
            (SupplyLevel::Normal, false) => SupplyLevel::Surplus,
            (SupplyLevel::Shortage, false) => SupplyLevel::Normal,
        }
    }
}

/// The trader.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub balance: i64,
    /// Outstanding debt (>= 0).
    pub debt: i64,
    /// Rate charged at the most recent accrual.
    pub debt_interest_rate: f64,
    pub location: MarketId,
    /// Held quantities; goods at zero are absent.
    pub inventory: BTreeMap<GoodId, u32>,
    /// Total paid for the held units of each good; keys mirror `inventory`.
    pub cost_basis: BTreeMap<GoodId, i64>,
    pub inventory_capacity: u32,
    pub reputation: i32,
}

impl Player {
    pub fn held(&self, good: &GoodId) -> u32 {
        self.inventory.get(good).copied().unwrap_or(0)
    }

    /// Add units bought for `cost` in total.
    pub fn add_goods(&mut self, good: &GoodId, quantity: u32, cost: i64) {
        if quantity == 0 {
            return;
        }
        *self.inventory.entry(good.clone()).or_insert(0) += quantity;
        *self.cost_basis.entry(good.clone()).or_insert(0) += cost;
    }

    /// Remove up to `quantity` units, shrinking the cost basis by the same fraction.
    ///
    /// Returns the units actually removed and the cost basis that left with them.
    pub fn remove_goods(&mut self, good: &GoodId, quantity: u32) -> (u32, i64) {
        let held = self.held(good);
        let removed = quantity.min(held);
        if removed == 0 {
            return (0, 0);
        }
        let basis = self.cost_basis.get(good).copied().unwrap_or(0);
        if removed == held {
            self.inventory.remove(good);
            self.cost_basis.remove(good);
            return (removed, basis);
        }
        let share = (i128::from(basis) * i128::from(removed) + i128::from(held) / 2)
            / i128::from(held);
        let share = share as i64;
        self.inventory.insert(good.clone(), held - removed);
        self.cost_basis.insert(good.clone(), basis - share);
        (removed, share)
    }

    /// Apply a reputation delta, clamped to 0..=100.
    pub fn adjust_reputation(&mut self, delta: i32) {
        self.reputation = (self.reputation + delta).clamp(0, 100);
    }
}

/// Per-market prices, supply tiers and restrictions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    pub prices: BTreeMap<GoodId, i64>,
    pub supply: BTreeMap<GoodId, SupplyLevel>,
    /// Most recent prices, oldest first.
    pub price_history: BTreeMap<GoodId, VecDeque<i64>>,
    pub restricted: BTreeSet<GoodId>,
}

impl MarketState {
    pub fn price(&self, good: &GoodId) -> Option<i64> {
        self.prices.get(good).copied()
    }

    pub fn supply_of(&self, good: &GoodId) -> SupplyLevel {
        self.supply.get(good).copied().unwrap_or_default()
    }

    pub fn is_restricted(&self, good: &GoodId) -> bool {
        self.restricted.contains(good)
    }

    /// Append a price to the history window, evicting the oldest beyond `cap`.
    pub fn record_price(&mut self, good: &GoodId, price: i64, cap: usize) {
        let history = self.price_history.entry(good.clone()).or_default();
        history.push_back(price);
        while history.len() > cap {
            history.pop_front();
        }
    }
}

/// Achievement state of one milestone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MilestoneProgress {
    pub name: String,
    pub achieved: bool,
    pub achieved_on_turn: Option<u32>,
}

/// Effects waiting to be consumed or resolved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PendingEvent {
    /// Next buy of `good` costs `percent` less.
    DiscountBuy {
        good: GoodId,
        percent: u32,
        created_turn: u32,
    },
    /// Next sale of `good` pays `percent` more.
    PremiumSell {
        good: GoodId,
        percent: u32,
        created_turn: u32,
    },
    /// A genuine price movement that lands on `resolve_turn`.
    IntelTip {
        good: GoodId,
        rising: bool,
        percent: u32,
        resolve_turn: u32,
    },
}

/// Rolled parameters of a travel encounter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ChoiceParams {
    ShadyDeal {
        good: GoodId,
        quantity: u32,
        discount_percent: u32,
        risk_percent: u32,
        cost: i64,
    },
    Gambling {
        stake: i64,
        entry_fee: i64,
    },
    Intel {
        good: GoodId,
        rising: bool,
        percent: u32,
        cost: i64,
        accuracy: f64,
        ttl: u32,
    },
    Smuggler {
        cost: i64,
        success_rate: f64,
    },
}

impl ChoiceParams {
    pub fn category(&self) -> ChoiceCategory {
        match self {
            ChoiceParams::ShadyDeal { .. } => ChoiceCategory::ShadyDeal,
            ChoiceParams::Gambling { .. } => ChoiceCategory::Gambling,
            ChoiceParams::Intel { .. } => ChoiceCategory::Intel,
            ChoiceParams::Smuggler { .. } => ChoiceCategory::Smuggler,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    pub label: String,
}

/// A prompt the player must answer before the turn can complete.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChoiceEvent {
    pub title: String,
    pub description: String,
    pub options: Vec<ChoiceOption>,
    pub params: ChoiceParams,
}

/// Outstanding choice and the travel it interrupted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingChoice {
    pub choice: ChoiceEvent,
    pub destination: Option<MarketId>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_trades: u32,
    pub goods_traded: u64,
    pub markets_visited: BTreeSet<MarketId>,
    /// Set on the first borrow and never cleared.
    pub had_debt: bool,
    pub peak_net_worth: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOverReason {
    Bankruptcy,
    Destitution,
}

impl fmt::Display for GameOverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOverReason::Bankruptcy => f.write_str("bankruptcy"),
            GameOverReason::Destitution => f.write_str("destitution"),
        }
    }
}

/// Complete, serializable game snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub player: Player,
    pub markets: BTreeMap<MarketId, MarketState>,
    pub turn: u32,
    pub milestones: BTreeMap<MilestoneId, MilestoneProgress>,
    pub unlocked_upgrades: Vec<UpgradeId>,
    pub purchased_upgrades: Vec<UpgradeId>,
    pub pending_events: Vec<PendingEvent>,
    pub pending_choice: Option<PendingChoice>,
    pub stats: Stats,
    pub game_over: bool,
    pub game_over_reason: Option<GameOverReason>,
}

impl GameState {
    /// Fresh game: starting funds and location, midpoint prices, nothing achieved.
    pub fn new(t: &Tunables) -> Self {
        let mut markets = BTreeMap::new();
        for m in MARKETS {
            let mut market = MarketState {
                prices: BTreeMap::new(),
                supply: BTreeMap::new(),
                price_history: BTreeMap::new(),
                restricted: m.restricted.iter().map(|g| GoodId::from(*g)).collect(),
            };
            for g in GOODS {
                let id = GoodId::from(g.id);
                let price = (g.midpoint() * m.price_modifier).round() as i64;
                market.prices.insert(id.clone(), price);
                market.supply.insert(id.clone(), SupplyLevel::Normal);
                market.record_price(&id, price, t.price_history_len);
            }
            markets.insert(MarketId::from(m.id), market);
        }

        let milestones = MILESTONES
            .iter()
            .map(|m| {
                (
                    MilestoneId::from(m.id),
                    MilestoneProgress {
                        name: m.name.to_string(),
                        achieved: false,
                        achieved_on_turn: None,
                    },
                )
            })
            .collect();

        let location = MarketId(t.starting_location.clone());
        let mut stats = Stats {
            peak_net_worth: t.starting_balance,
            ..Stats::default()
        };
        stats.markets_visited.insert(location.clone());

        GameState {
            player: Player {
                balance: t.starting_balance,
                debt: 0,
                debt_interest_rate: t.interest.base,
                location,
                inventory: BTreeMap::new(),
                cost_basis: BTreeMap::new(),
                inventory_capacity: t.starting_capacity,
                reputation: t.starting_reputation,
            },
            markets,
            turn: 1,
            milestones,
            unlocked_upgrades: Vec::new(),
            purchased_upgrades: Vec::new(),
            pending_events: Vec::new(),
            pending_choice: None,
            stats,
            game_over: false,
            game_over_reason: None,
        }
    }

    pub fn has_upgrade(&self, id: &str) -> bool {
        self.purchased_upgrades.iter().any(|u| u.as_str() == id)
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked_upgrades.iter().any(|u| u.as_str() == id)
    }

    /// Market the player is currently in.
    pub fn current_market(&self) -> Option<&MarketState> {
        self.markets.get(&self.player.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn player() -> Player {
        GameState::new(&Tunables::default()).player
    }

    #[test]
    fn initial_prices_use_midpoint_and_modifier() {
        let state = GameState::new(&Tunables::default());
        let sv = &state.markets[&MarketId::from("silicon_valley")];
        assert_eq!(sv.price(&GoodId::from("compute")), Some(1250));
        let sz = &state.markets[&MarketId::from("shenzhen")];
        assert_eq!(sz.price(&GoodId::from("compute")), Some(1000));
        assert!(sz.is_restricted(&GoodId::from("h100")));
        assert_eq!(sz.price_history[&GoodId::from("compute")].len(), 1);
        assert_eq!(state.turn, 1);
        assert!(state.milestones.values().all(|m| !m.achieved));
        assert!(state
            .stats
            .markets_visited
            .contains(&MarketId::from("silicon_valley")));
    }

    #[test]
    fn full_removal_drops_both_entries() {
        let mut p = player();
        let g = GoodId::from("a100");
        p.add_goods(&g, 4, 28_000);
        assert_eq!(p.remove_goods(&g, 10), (4, 28_000));
        assert!(!p.inventory.contains_key(&g));
        assert!(!p.cost_basis.contains_key(&g));
    }

    #[test]
    fn history_window_evicts_oldest() {
        let mut m = GameState::new(&Tunables::default()).markets[&MarketId::from("dubai")].clone();
        let g = GoodId::from("talent");
        for p in 0..20 {
            m.record_price(&g, p, 8);
        }
        let history: Vec<_> = m.price_history[&g].iter().copied().collect();
        assert_eq!(history, (12..20).collect::<Vec<_>>());
    }

    #[test]
    fn supply_shift_clamps() {
        assert_eq!(SupplyLevel::Shortage.shifted(true), SupplyLevel::Shortage);
        assert_eq!(SupplyLevel::Surplus.shifted(false), SupplyLevel::Surplus);
        assert_eq!(SupplyLevel::Normal.shifted(true), SupplyLevel::Shortage);
    }

    #[test]
    fn reputation_is_clamped() {
        let mut p = player();
        p.adjust_reputation(500);
        assert_eq!(p.reputation, 100);
        p.adjust_reputation(-500);
        assert_eq!(p.reputation, 0);
    }

    #[test]
    fn state_json_roundtrip() {
        let state = GameState::new(&Tunables::default());
        let s = serde_json::to_string(&state).unwrap();
        let back: GameState = serde_json::from_str(&s).unwrap();
        assert_eq!(back, state);
    }

    proptest! {
        #[test]
        fn partial_removal_keeps_average_cost(qty in 2u32..500, unit in 1i64..20_000, take in 1u32..500) {
            let mut p = player();
            let g = GoodId::from("h100");
            p.add_goods(&g, qty, unit * i64::from(qty));
            let take = take.min(qty - 1);
            let (removed, share) = p.remove_goods(&g, take);
            prop_assert_eq!(removed, take);
            prop_assert_eq!(share, unit * i64::from(take));
            prop_assert_eq!(p.cost_basis[&g], unit * i64::from(qty - take));
        }

        #[test]
        fn removal_is_proportional(qty in 2u32..500, basis in 1i64..5_000_000, take in 1u32..500) {
            let mut p = player();
            let g = GoodId::from("datasets");
            p.add_goods(&g, qty, basis);
            let take = take.min(qty - 1);
            let (_, share) = p.remove_goods(&g, take);
            let exact = basis as f64 * f64::from(take) / f64::from(qty);
            prop_assert!((share as f64 - exact).abs() <= 0.5);
        }
    }
}
