//! Read-only helpers for callers building a UI or an autopilot.

use serde::{Deserialize, Serialize};
use sim_core::{GameState, GoodId, MarketId, Tunables, UpgradeId, GOODS, UPGRADES};
use sim_econ::{effective_buy_price, effective_sell_price, free_capacity, max_borrowable};

use crate::dispatch::validate_upgrade;

/// Held goods that are restricted at `destination`, in id order.
pub fn at_risk_goods(state: &GameState, destination: &MarketId) -> Vec<GoodId> {
    let Some(market) = state.markets.get(destination) else {
        return Vec::new();
    };
    state
        .player
        .inventory
        .iter()
        .filter(|(good, &qty)| qty > 0 && market.is_restricted(good))
        .map(|(good, _)| good.clone())
        .collect()
}

/// A legal next move with its bounds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AvailableAction {
    Buy {
        good: GoodId,
        price: i64,
        #[serde(rename = "maxQuantity")]
        max_quantity: u32,
    },
    Sell {
        good: GoodId,
        price: i64,
        #[serde(rename = "maxQuantity")]
        max_quantity: u32,
    },
    Travel {
        destination: MarketId,
        #[serde(rename = "atRisk")]
        at_risk: Vec<GoodId>,
    },
    Wait,
    Borrow {
        max: i64,
    },
    PayDebt {
        max: i64,
    },
    Upgrade {
        upgrade: UpgradeId,
        cost: i64,
    },
    ResolveChoice {
        #[serde(rename = "choiceId")]
        choice_id: String,
        label: String,
    },
}

/// Everything the player could successfully submit from `state`.
pub fn available_actions(state: &GameState, t: &Tunables) -> Vec<AvailableAction> {
    if state.game_over {
        return Vec::new();
    }
    if let Some(pending) = &state.pending_choice {
        return pending
            .choice
            .options
            .iter()
            .map(|o| AvailableAction::ResolveChoice {
                choice_id: o.id.clone(),
                label: o.label.clone(),
            })
            .collect();
    }
    let Some(market) = state.current_market() else {
        return vec![AvailableAction::Wait];
    };

    let mut actions = Vec::new();
    let player = &state.player;
    let free = free_capacity(player);
    for def in GOODS {
        let good = GoodId::from(def.id);
        if market.is_restricted(&good) {
            continue;
        }
        if let Some(price) = effective_buy_price(state, &good) {
            let affordable = u32::try_from(player.balance.max(0) / price.max(1)).unwrap_or(u32::MAX);
            let max_quantity = affordable.min(free);
            if max_quantity > 0 {
                actions.push(AvailableAction::Buy {
                    good: good.clone(),
                    price,
                    max_quantity,
                });
            }
        }
        let held = player.held(&good);
        if held > 0 {
            if let Some(price) = effective_sell_price(state, &good) {
                actions.push(AvailableAction::Sell {
                    good,
                    price,
                    max_quantity: held,
                });
            }
        }
    }

    for destination in state.markets.keys() {
        if *destination == player.location {
            continue;
        }
        actions.push(AvailableAction::Travel {
            destination: destination.clone(),
            at_risk: at_risk_goods(state, destination),
        });
    }
    actions.push(AvailableAction::Wait);

    let headroom = max_borrowable(state, t);
    if headroom > 0 {
        actions.push(AvailableAction::Borrow { max: headroom });
    }
    if player.debt > 0 && player.balance > 0 {
        actions.push(AvailableAction::PayDebt {
            max: player.debt.min(player.balance),
        });
    }
    for def in UPGRADES {
        if validate_upgrade(state, def.id).is_ok() {
            actions.push(AvailableAction::Upgrade {
                upgrade: UpgradeId::from(def.id),
                cost: def.cost,
            });
        }
    }
    actions
}
