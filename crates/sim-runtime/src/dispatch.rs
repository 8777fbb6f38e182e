//! Validation and execution of player actions.

use rand::Rng;
use sim_core::text::format_money;
use sim_core::{
    good_def, market_def, upgrade_def, GameState, GoodDef, GoodId, MarketId, PendingChoice,
    PendingEvent, Tunables, UpgradeDef, UpgradeEffect,
};
use sim_econ::{
    accrue_interest, average_cost, diff_prices, effective_buy_price, effective_sell_price,
    free_capacity, max_borrowable, net_worth, simulate_market, snapshot_prices, take_modifier,
    TradeSide,
};
use tracing::{debug, info};

use crate::action::{Action, ActionError};
use crate::choices::{resolve_choice, roll_choice, SeizureCheck};
use crate::events::{apply_event, roll_events};
use crate::oracle::{resolve_intel_tips, roll_oracle};
use crate::progress::{check_game_over, evaluate_milestones};
use crate::queries::at_risk_goods;
use crate::response::{ActionResponse, TurnContext};
use crate::seizure::resolve_seizures;
use crate::Engine;

/// Check that `id` can be bought right now.
pub(crate) fn validate_upgrade(
    state: &GameState,
    id: &str,
) -> Result<&'static UpgradeDef, ActionError> {
    let def = upgrade_def(id).ok_or_else(|| ActionError::UnknownUpgrade(id.to_string()))?;
    if state.has_upgrade(def.id) {
        return Err(ActionError::AlreadyPurchased(def.name.to_string()));
    }
    if let Some(req) = def.requires {
        if !state.has_upgrade(req) {
            return Err(ActionError::MissingPrerequisite {
                upgrade: def.name.to_string(),
                prerequisite: upgrade_def(req).map_or(req, |u| u.name).to_string(),
            });
        }
    }
    if def.gated && !state.is_unlocked(def.id) {
        return Err(ActionError::Locked(def.name.to_string()));
    }
    if def.cost > state.player.balance {
        return Err(ActionError::InsufficientFunds {
            needed: def.cost,
            available: state.player.balance,
        });
    }
    Ok(def)
}

fn tradeable(state: &GameState, good: &GoodId) -> Result<&'static GoodDef, ActionError> {
    let def = good_def(good.as_str()).ok_or_else(|| ActionError::UnknownGood(good.to_string()))?;
    let location = &state.player.location;
    let market = state
        .current_market()
        .ok_or_else(|| ActionError::UnknownMarket(location.to_string()))?;
    if market.is_restricted(good) {
        let name = market_def(location.as_str()).map_or(location.as_str(), |m| m.name);
        return Err(ActionError::Restricted {
            good: def.name.to_string(),
            market: name.to_string(),
        });
    }
    Ok(def)
}

impl Engine {
    /// Resolve one action against `state` and describe the outcome.
    ///
    /// `state` is never modified; the response carries the successor state, or
    /// an unchanged copy when the action is rejected.
    pub fn submit_action<R: Rng + ?Sized>(
        &self,
        state: &GameState,
        action: &Action,
        rng: &mut R,
    ) -> ActionResponse {
        let mut next = state.clone();
        let mut ctx = TurnContext::default();
        if let Err(err) = self.execute(&mut next, action, &mut ctx, rng) {
            debug!(%err, ?action, "action rejected");
            return ActionResponse::rejected(state, err);
        }

        // advancing actions already checked before the turn counter moved
        if !ctx.turn_advanced {
            record_milestones(&mut next, &mut ctx);
        }
        let nw = net_worth(&next);
        next.stats.peak_net_worth = next.stats.peak_net_worth.max(nw);
        ctx.finish(next, nw)
    }

    fn execute<R: Rng + ?Sized>(
        &self,
        state: &mut GameState,
        action: &Action,
        ctx: &mut TurnContext,
        rng: &mut R,
    ) -> Result<(), ActionError> {
        if state.game_over {
            return Err(ActionError::GameOver);
        }
        if state.pending_choice.is_some() && !matches!(action, Action::ResolveChoice { .. }) {
            return Err(ActionError::ChoicePending);
        }
        match action {
            Action::Buy { good, quantity } => buy(state, good, *quantity, ctx),
            Action::Sell { good, quantity } => sell(state, good, *quantity, ctx),
            Action::Travel {
                destination,
                confirmed,
            } => self.travel(state, destination, *confirmed, ctx, rng),
            Action::Wait => {
                ctx.line("You wait for the market to move.");
                self.advance_turn(state, None, ctx, rng);
                Ok(())
            }
            Action::Borrow { amount } => borrow(state, &self.tunables, *amount, ctx),
            Action::PayDebt { amount } => pay_debt(state, *amount, ctx),
            Action::Upgrade { upgrade } => {
                let def = validate_upgrade(state, upgrade.as_str())?;
                state.player.balance -= def.cost;
                state.purchased_upgrades.push(upgrade.clone());
                if let UpgradeEffect::Capacity(extra) = def.effect {
                    state.player.inventory_capacity += extra;
                }
                ctx.line(format!(
                    "Purchased {} for ${}.",
                    def.name,
                    format_money(def.cost)
                ));
                Ok(())
            }
            Action::ResolveChoice { choice_id } => {
                let resolution = resolve_choice(state, choice_id, ctx, rng)?;
                if let Some(destination) = resolution.destination {
                    self.complete_travel(state, &destination, resolution.seizure, ctx, rng);
                }
                Ok(())
            }
        }
    }

    fn travel<R: Rng + ?Sized>(
        &self,
        state: &mut GameState,
        destination: &MarketId,
        confirmed: bool,
        ctx: &mut TurnContext,
        rng: &mut R,
    ) -> Result<(), ActionError> {
        let def = market_def(destination.as_str())
            .filter(|_| state.markets.contains_key(destination))
            .ok_or_else(|| ActionError::UnknownMarket(destination.to_string()))?;
        if *destination == state.player.location {
            return Err(ActionError::AlreadyAt(def.name.to_string()));
        }
        let at_risk = at_risk_goods(state, destination);
        if !at_risk.is_empty() && !confirmed {
            return Err(ActionError::ConfirmRisk {
                market: def.name.to_string(),
                goods: at_risk,
            });
        }

        if let Some(choice) = roll_choice(state, &self.tunables, destination, rng) {
            debug!(title = %choice.title, "travel interrupted by a choice");
            ctx.line(format!("{}: {}", choice.title, choice.description));
            ctx.choice_event = Some(choice.clone());
            state.pending_choice = Some(PendingChoice {
                choice,
                destination: Some(destination.clone()),
            });
            return Ok(());
        }
        self.complete_travel(state, destination, SeizureCheck::Normal, ctx, rng);
        Ok(())
    }

    fn complete_travel<R: Rng + ?Sized>(
        &self,
        state: &mut GameState,
        destination: &MarketId,
        seizure: SeizureCheck,
        ctx: &mut TurnContext,
        rng: &mut R,
    ) {
        if seizure == SeizureCheck::Normal {
            for event in resolve_seizures(state, &self.tunables, destination, rng) {
                ctx.push_event(event);
            }
        }
        state.player.location = destination.clone();
        state.stats.markets_visited.insert(destination.clone());
        let name = market_def(destination.as_str()).map_or(destination.as_str(), |m| m.name);
        ctx.line(format!("Arrived in {name}."));
        self.advance_turn(state, Some(destination), ctx, rng);
    }

    /// Interest, events, prices, tips, oracle, milestones, game over, then the turn counter.
    fn advance_turn<R: Rng + ?Sized>(
        &self,
        state: &mut GameState,
        destination: Option<&MarketId>,
        ctx: &mut TurnContext,
        rng: &mut R,
    ) {
        let t = &self.tunables;
        let interest = accrue_interest(state, t);
        if interest > 0 {
            ctx.line(format!("Interest charged: ${}.", format_money(interest)));
        }

        let before = snapshot_prices(state);
        let events = roll_events(state, t, destination, rng);
        for event in events {
            apply_event(state, &event);
            ctx.push_event(event);
        }
        simulate_market(state, t, rng);
        for line in resolve_intel_tips(state) {
            ctx.line(line);
        }
        ctx.price_changes = diff_prices(&before, state);

        if let Some(line) = roll_oracle(state, t, rng) {
            ctx.line(line);
        }
        record_milestones(state, ctx);
        if let Some(reason) = check_game_over(state, t) {
            ctx.line(format!("GAME OVER: {reason}."));
        }

        state.turn += 1;
        let (turn, ttl) = (state.turn, t.modifier_ttl_turns);
        state.pending_events.retain(|e| match e {
            PendingEvent::DiscountBuy { created_turn, .. }
            | PendingEvent::PremiumSell { created_turn, .. } => {
                turn.saturating_sub(*created_turn) < ttl
            }
            PendingEvent::IntelTip { .. } => true,
        });
        ctx.turn_advanced = true;
        info!(turn = state.turn, balance = state.player.balance, "turn advanced");
    }
}

fn record_milestones(state: &mut GameState, ctx: &mut TurnContext) {
    for id in evaluate_milestones(state) {
        let name = state.milestones.get(&id).map_or(id.as_str(), |m| m.name.as_str());
        ctx.line(format!("Milestone achieved: {name}"));
        ctx.milestones.push(id);
    }
}

fn buy(
    state: &mut GameState,
    good: &GoodId,
    quantity: u32,
    ctx: &mut TurnContext,
) -> Result<(), ActionError> {
    let def = tradeable(state, good)?;
    if quantity == 0 {
        return Err(ActionError::NonPositiveQuantity);
    }
    let free = free_capacity(&state.player);
    if quantity > free {
        return Err(ActionError::InsufficientCargo {
            needed: quantity,
            available: free,
        });
    }
    let unit = effective_buy_price(state, good)
        .ok_or_else(|| ActionError::UnknownGood(good.to_string()))?;
    let total = unit * i64::from(quantity);
    if total > state.player.balance {
        return Err(ActionError::InsufficientFunds {
            needed: total,
            available: state.player.balance,
        });
    }

    if let Some(pct) = take_modifier(state, good, TradeSide::Buy) {
        ctx.line(format!("Discount of {pct}% applied to {}.", def.name));
    }
    state.player.balance -= total;
    state.player.add_goods(good, quantity, total);
    state.stats.total_trades += 1;
    state.stats.goods_traded += u64::from(quantity);
    ctx.line(format!(
        "Bought {quantity} {} at ${} each.",
        def.name,
        format_money(unit)
    ));
    Ok(())
}

fn sell(
    state: &mut GameState,
    good: &GoodId,
    quantity: u32,
    ctx: &mut TurnContext,
) -> Result<(), ActionError> {
    let def = tradeable(state, good)?;
    if quantity == 0 {
        return Err(ActionError::NonPositiveQuantity);
    }
    let held = state.player.held(good);
    if quantity > held {
        return Err(ActionError::InsufficientInventory {
            good: def.name.to_string(),
            held,
        });
    }
    let unit = effective_sell_price(state, good)
        .ok_or_else(|| ActionError::UnknownGood(good.to_string()))?;
    let avg = average_cost(good, &state.player);

    if let Some(pct) = take_modifier(state, good, TradeSide::Sell) {
        ctx.line(format!("Premium of {pct}% paid for {}.", def.name));
    }
    let proceeds = unit * i64::from(quantity);
    let (_, basis) = state.player.remove_goods(good, quantity);
    state.player.balance += proceeds;
    state.stats.total_trades += 1;
    state.stats.goods_traded += u64::from(quantity);
    let profit = proceeds - basis;
    ctx.line(format!(
        "Sold {quantity} {} at ${} each (avg cost ${}, P&L ${}).",
        def.name,
        format_money(unit),
        format_money(avg),
        format_money(profit)
    ));
    Ok(())
}

fn borrow(
    state: &mut GameState,
    t: &Tunables,
    amount: i64,
    ctx: &mut TurnContext,
) -> Result<(), ActionError> {
    if amount <= 0 {
        return Err(ActionError::NonPositiveAmount);
    }
    let max = max_borrowable(state, t);
    if amount > max {
        return Err(ActionError::BorrowLimit { max });
    }
    state.player.balance += amount;
    state.player.debt += amount;
    state.stats.had_debt = true;
    ctx.line(format!("Borrowed ${}.", format_money(amount)));
    Ok(())
}

fn pay_debt(state: &mut GameState, amount: i64, ctx: &mut TurnContext) -> Result<(), ActionError> {
    if amount <= 0 {
        return Err(ActionError::NonPositiveAmount);
    }
    let debt = state.player.debt;
    if debt <= 0 {
        return Err(ActionError::NoDebt);
    }
    if amount > debt {
        return Err(ActionError::Overpayment { debt });
    }
    if amount > state.player.balance {
        return Err(ActionError::InsufficientFunds {
            needed: amount,
            available: state.player.balance,
        });
    }
    state.player.balance -= amount;
    state.player.debt -= amount;
    ctx.line(format!(
        "Paid ${} of debt; ${} outstanding.",
        format_money(amount),
        format_money(state.player.debt)
    ));
    Ok(())
}
