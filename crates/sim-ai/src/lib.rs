#![deny(warnings)]

//! Autopilot for Compute Cartel.
//!
//! [`Autopilot`] picks one legal [`Action`] per call from the moves reported by
//! [`available_actions`]; [`run_session`] drives an engine with it for a fixed
//! number of turns. Used by the CLI for unattended runs and by the benches.

pub mod session;

pub use session::{run_session, SessionSummary};

use std::path::Path;

use anyhow::{bail, Context};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sim_core::{good_def, market_def, GameState, SupplyLevel, Tunables};
use sim_econ::{average_cost, target_price};
use sim_runtime::{available_actions, Action, AvailableAction};
use tracing::debug;

/// Thresholds steering the greedy strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    /// Sell once the price beats the average cost by this fraction.
    pub sell_margin: f64,
    /// Buy once the price sits this fraction below the market's reference.
    pub buy_discount: f64,
    /// Share of the affordable quantity bought per purchase.
    pub spend_fraction: f64,
    /// Odds of travelling instead of waiting when nothing else is worth doing.
    pub travel_chance: f64,
    /// Repay outstanding debt before buying.
    pub repay_debt: bool,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            sell_margin: 0.10,
            buy_discount: 0.05,
            spend_fraction: 0.5,
            travel_chance: 0.6,
            repay_debt: true,
        }
    }
}

impl AutopilotConfig {
    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        let cfg: AutopilotConfig = serde_yaml::from_str(text).context("parse autopilot config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (field, value) in [
            ("sell_margin", self.sell_margin),
            ("buy_discount", self.buy_discount),
            ("spend_fraction", self.spend_fraction),
            ("travel_chance", self.travel_chance),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                bail!("{field} must be within [0,1], got {value}");
            }
        }
        Ok(())
    }
}

/// Greedy trader: take profits, buy bargains, otherwise move on.
#[derive(Clone, Debug, Default)]
pub struct Autopilot {
    config: AutopilotConfig,
}

impl Autopilot {
    pub fn new(config: AutopilotConfig) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AutopilotConfig {
        &self.config
    }

    /// Next move for `state`; falls back to waiting when nothing is legal.
    pub fn choose<R: Rng + ?Sized>(&self, state: &GameState, t: &Tunables, rng: &mut R) -> Action {
        let options = available_actions(state, t);

        if state.pending_choice.is_some() {
            let pick = options
                .iter()
                .filter_map(|a| match a {
                    AvailableAction::ResolveChoice { choice_id, .. } => Some(choice_id),
                    _ => None,
                })
                .min_by_key(|id| id.as_str() != "decline");
            if let Some(choice_id) = pick {
                return Action::ResolveChoice {
                    choice_id: choice_id.clone(),
                };
            }
        }

        if let Some(action) = self.take_profit(state, &options) {
            return action;
        }
        if self.config.repay_debt {
            let repay = options.iter().find_map(|a| match a {
                AvailableAction::PayDebt { max } => Some(*max),
                _ => None,
            });
            if let Some(amount) = repay {
                return Action::PayDebt { amount };
            }
        }
        if let Some(action) = self.buy_bargain(state, &options) {
            return action;
        }

        // Safe destinations first; risky ones only when nothing else is left.
        let (safe, risky): (Vec<_>, Vec<_>) = options
            .iter()
            .filter_map(|a| match a {
                AvailableAction::Travel {
                    destination,
                    at_risk,
                } => Some((destination, at_risk.is_empty())),
                _ => None,
            })
            .partition(|(_, safe)| *safe);
        let destinations: Vec<_> = (if safe.is_empty() { risky } else { safe })
            .into_iter()
            .map(|(d, _)| d)
            .collect();
        let restless = !state.player.inventory.is_empty() || rng.gen_bool(self.config.travel_chance);
        if restless {
            if let Some(destination) = destinations.choose(rng) {
                return Action::Travel {
                    destination: (*destination).clone(),
                    confirmed: true,
                };
            }
        }
        Action::Wait
    }

    fn take_profit(&self, state: &GameState, options: &[AvailableAction]) -> Option<Action> {
        options.iter().find_map(|a| match a {
            AvailableAction::Sell {
                good,
                price,
                max_quantity,
            } => {
                let avg = average_cost(good, &state.player) as f64;
                (*price as f64 >= avg * (1.0 + self.config.sell_margin)).then(|| Action::Sell {
                    good: good.clone(),
                    quantity: *max_quantity,
                })
            }
            _ => None,
        })
    }

    fn buy_bargain(&self, state: &GameState, options: &[AvailableAction]) -> Option<Action> {
        let market = market_def(state.player.location.as_str())?;
        let (ratio, good, max_quantity) = options
            .iter()
            .filter_map(|a| match a {
                AvailableAction::Buy {
                    good,
                    price,
                    max_quantity,
                } => {
                    let def = good_def(good.as_str())?;
                    let reference = target_price(def, market, SupplyLevel::Normal);
                    Some((*price as f64 / reference, good, *max_quantity))
                }
                _ => None,
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))?;
        if ratio > 1.0 - self.config.buy_discount {
            return None;
        }
        let quantity = ((f64::from(max_quantity) * self.config.spend_fraction).floor() as u32).max(1);
        debug!(good = %good.as_str(), ratio, quantity, "autopilot bargain");
        Some(Action::Buy {
            good: good.clone(),
            quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::{ChoiceEvent, ChoiceOption, ChoiceParams, GoodId, MarketId, PendingChoice};

    fn fresh() -> GameState {
        GameState::new(&Tunables::quiet())
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn yaml_overrides_keep_defaults() {
        let cfg = AutopilotConfig::from_yaml_str("sell_margin: 0.25\nrepay_debt: false\n").unwrap();
        assert_eq!(cfg.sell_margin, 0.25);
        assert!(!cfg.repay_debt);
        assert_eq!(cfg.buy_discount, AutopilotConfig::default().buy_discount);
        assert!(AutopilotConfig::from_yaml_str("travel_chance: 1.5").is_err());
        assert!(AutopilotConfig::from_yaml_str("sell_margin: [").is_err());
    }

    #[test]
    fn declines_pending_choice() {
        let mut s = fresh();
        s.pending_choice = Some(PendingChoice {
            choice: ChoiceEvent {
                title: "Back-Room Tournament".into(),
                description: String::new(),
                options: vec![
                    ChoiceOption {
                        id: "gamble".into(),
                        label: "Bet".into(),
                    },
                    ChoiceOption {
                        id: "decline".into(),
                        label: "Keep your money".into(),
                    },
                ],
                params: ChoiceParams::Gambling {
                    stake: 1_000,
                    entry_fee: 100,
                },
            },
            destination: Some(MarketId::from("dubai")),
        });
        let action = Autopilot::default().choose(&s, &Tunables::quiet(), &mut rng());
        assert_eq!(
            action,
            Action::ResolveChoice {
                choice_id: "decline".into()
            }
        );
    }

    #[test]
    fn sells_goods_bought_cheaply() {
        let mut s = fresh();
        let g = GoodId::from("datasets");
        s.player.add_goods(&g, 5, 5);
        let action = Autopilot::default().choose(&s, &Tunables::quiet(), &mut rng());
        assert_eq!(action, Action::Sell { good: g, quantity: 5 });
    }

    #[test]
    fn buys_the_deepest_bargain() {
        let mut s = fresh();
        let g = GoodId::from("datasets");
        let loc = s.player.location.clone();
        s.markets.get_mut(&loc).unwrap().prices.insert(g.clone(), 1);
        let action = Autopilot::default().choose(&s, &Tunables::quiet(), &mut rng());
        assert!(matches!(action, Action::Buy { good, quantity } if good == g && quantity > 0));
    }

    #[test]
    fn idles_at_fair_prices_without_wanderlust() {
        let pilot = Autopilot::new(AutopilotConfig {
            travel_chance: 0.0,
            ..AutopilotConfig::default()
        })
        .unwrap();
        let action = pilot.choose(&fresh(), &Tunables::quiet(), &mut rng());
        assert_eq!(action, Action::Wait);
    }

    #[test]
    fn repays_debt_before_buying() {
        let mut s = fresh();
        s.player.debt = 2_000;
        let action = Autopilot::default().choose(&s, &Tunables::quiet(), &mut rng());
        assert_eq!(action, Action::PayDebt { amount: 2_000 });
    }
}
