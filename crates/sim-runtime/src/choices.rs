//! Travel encounters that pause the turn until the player decides.

use rand::seq::SliceRandom;
use rand::Rng;
use sim_core::text::{format_money, render, TemplateParams};
use sim_core::{
    choice_template, good_def, market_def, ChoiceCategory, ChoiceEvent, ChoiceOption,
    ChoiceParams, GameState, GoodId, MarketId, PendingEvent, Tunables, GOODS,
};
use sim_econ::{apply_percent, apply_rate, free_capacity};
use tracing::debug;

use crate::action::ActionError;
use crate::queries::at_risk_goods;
use crate::response::TurnContext;
use crate::{adjusted_probability, chance, reputation_shift};

/// Whether the arrival seizure check still runs after a choice resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SeizureCheck {
    Normal,
    Bypassed,
}

/// What the dispatcher must do after a choice is resolved.
#[derive(Debug)]
pub(crate) struct Resolution {
    pub destination: Option<MarketId>,
    pub seizure: SeizureCheck,
}

fn choice_probability(category: ChoiceCategory, state: &GameState, t: &Tunables) -> f64 {
    let shift = reputation_shift(state, t);
    let odds = &t.choice_odds;
    match category {
        ChoiceCategory::ShadyDeal => adjusted_probability(odds.shady_deal, -shift),
        ChoiceCategory::Gambling => odds.gambling,
        ChoiceCategory::Intel => adjusted_probability(odds.intel, shift),
        ChoiceCategory::Smuggler => adjusted_probability(odds.smuggler, -shift),
    }
}

/// Roll for an encounter on the way to `destination`. The first category that
/// triggers and can be afforded wins.
pub fn roll_choice<R: Rng + ?Sized>(
    state: &GameState,
    t: &Tunables,
    destination: &MarketId,
    rng: &mut R,
) -> Option<ChoiceEvent> {
    let at_risk = at_risk_goods(state, destination);
    for category in ChoiceCategory::ALL {
        if category == ChoiceCategory::Smuggler && at_risk.is_empty() {
            continue;
        }
        if !chance(rng, choice_probability(category, state, t)) {
            continue;
        }
        let params = match category {
            ChoiceCategory::ShadyDeal => roll_shady_deal(state, rng),
            ChoiceCategory::Gambling => roll_gambling(state, rng),
            ChoiceCategory::Intel => roll_intel(state, rng),
            ChoiceCategory::Smuggler => roll_smuggler(state, destination, &at_risk, rng),
        };
        if let Some(params) = params {
            return Some(build_choice(params, destination));
        }
    }
    None
}

fn roll_shady_deal<R: Rng + ?Sized>(state: &GameState, rng: &mut R) -> Option<ChoiceParams> {
    let def = GOODS.choose(rng)?;
    let good = GoodId::from(def.id);
    let price = state.current_market()?.price(&good)?;
    let discount_percent: u32 = rng.gen_range(30..=60);
    let unit = apply_percent(price, -i64::from(discount_percent)).max(1);
    let affordable = u32::try_from(state.player.balance.max(0) / unit).unwrap_or(u32::MAX);
    let quantity = rng
        .gen_range(2..=5)
        .min(free_capacity(&state.player))
        .min(affordable);
    if quantity == 0 {
        return None;
    }
    Some(ChoiceParams::ShadyDeal {
        good,
        quantity,
        discount_percent,
        risk_percent: rng.gen_range(20..=50),
        cost: unit * i64::from(quantity),
    })
}

fn roll_gambling<R: Rng + ?Sized>(state: &GameState, rng: &mut R) -> Option<ChoiceParams> {
    let balance = state.player.balance;
    if balance < 100 {
        return None;
    }
    let stake = apply_rate(balance, rng.gen_range(0.10..=0.30)).clamp(100, balance);
    let entry_fee = apply_rate(balance, rng.gen_range(0.02..=0.05)).clamp(50, balance);
    Some(ChoiceParams::Gambling { stake, entry_fee })
}

fn roll_intel<R: Rng + ?Sized>(state: &GameState, rng: &mut R) -> Option<ChoiceParams> {
    let cost = rng.gen_range(300..=1_000);
    if cost > state.player.balance {
        return None;
    }
    let def = GOODS.choose(rng)?;
    let rep = f64::from(state.player.reputation - 50);
    Some(ChoiceParams::Intel {
        good: GoodId::from(def.id),
        rising: chance(rng, 0.5),
        percent: rng.gen_range(15..=35),
        cost,
        accuracy: (0.5 + rep * 0.01).clamp(0.2, 0.95),
        ttl: rng.gen_range(1..=2),
    })
}

fn roll_smuggler<R: Rng + ?Sized>(
    state: &GameState,
    destination: &MarketId,
    at_risk: &[GoodId],
    rng: &mut R,
) -> Option<ChoiceParams> {
    let market = state.markets.get(destination)?;
    let value: i64 = at_risk
        .iter()
        .map(|g| market.price(g).unwrap_or(0) * i64::from(state.player.held(g)))
        .sum();
    let cost = apply_rate(value, rng.gen_range(0.10..=0.20)).max(200);
    if cost > state.player.balance {
        return None;
    }
    let rep = f64::from(state.player.reputation - 50);
    Some(ChoiceParams::Smuggler {
        cost,
        success_rate: (0.6 + rep * 0.005).clamp(0.3, 0.9),
    })
}

fn good_name(id: &GoodId) -> String {
    good_def(id.as_str()).map_or_else(|| id.to_string(), |g| g.name.to_string())
}

fn build_choice(params: ChoiceParams, destination: &MarketId) -> ChoiceEvent {
    let mut values = TemplateParams::default();
    match &params {
        ChoiceParams::ShadyDeal {
            good,
            quantity,
            discount_percent,
            cost,
            ..
        } => {
            values.good = Some(good_name(good));
            values.quantity = Some(i64::from(*quantity));
            values.percent = Some(i64::from(*discount_percent));
            values.amount = Some(*cost);
        }
        ChoiceParams::Gambling { stake, entry_fee } => {
            values.amount = Some(*stake);
            values.cost = Some(*entry_fee);
        }
        ChoiceParams::Intel { good, cost, .. } => {
            values.good = Some(good_name(good));
            values.amount = Some(*cost);
        }
        ChoiceParams::Smuggler { cost, .. } => {
            values.market = Some(
                market_def(destination.as_str())
                    .map_or_else(|| destination.to_string(), |m| m.name.to_string()),
            );
            values.amount = Some(*cost);
        }
    }

    let (title, description, options) = match choice_template(params.category()) {
        Some(tpl) => (
            tpl.title.to_string(),
            render(tpl.text, &values),
            tpl.options
                .iter()
                .map(|(id, label)| ChoiceOption {
                    id: (*id).to_string(),
                    label: render(label, &values),
                })
                .collect(),
        ),
        None => (
            format!("{:?}", params.category()),
            String::new(),
            vec![ChoiceOption {
                id: "decline".to_string(),
                label: "Decline".to_string(),
            }],
        ),
    };

    ChoiceEvent {
        title,
        description,
        options,
        params,
    }
}

fn require_funds(state: &GameState, needed: i64) -> Result<(), ActionError> {
    if needed > state.player.balance {
        return Err(ActionError::InsufficientFunds {
            needed,
            available: state.player.balance,
        });
    }
    Ok(())
}

/// Apply the player's answer to the pending choice and clear it.
pub(crate) fn resolve_choice<R: Rng + ?Sized>(
    state: &mut GameState,
    choice_id: &str,
    ctx: &mut TurnContext,
    rng: &mut R,
) -> Result<Resolution, ActionError> {
    let pending = state
        .pending_choice
        .clone()
        .ok_or(ActionError::NoPendingChoice)?;
    if !pending.choice.options.iter().any(|o| o.id == choice_id) {
        return Err(ActionError::InvalidChoice(choice_id.to_string()));
    }
    state.pending_choice = None;
    debug!(choice = ?pending.choice.params.category(), choice_id, "resolving choice");

    let mut seizure = SeizureCheck::Normal;
    match (&pending.choice.params, choice_id) {
        (
            ChoiceParams::ShadyDeal {
                good,
                quantity,
                risk_percent,
                cost,
                ..
            },
            "accept",
        ) => {
            require_funds(state, *cost)?;
            let free = free_capacity(&state.player);
            if *quantity > free {
                return Err(ActionError::InsufficientCargo {
                    needed: *quantity,
                    available: free,
                });
            }
            state.player.balance -= cost;
            if chance(rng, f64::from(*risk_percent) / 100.0) {
                ctx.line(format!(
                    "The deal was a setup. You lost ${}.",
                    format_money(*cost)
                ));
            } else {
                state.player.add_goods(good, *quantity, *cost);
                ctx.line(format!(
                    "You bought {quantity} {} for ${}.",
                    good_name(good),
                    format_money(*cost)
                ));
            }
        }
        (ChoiceParams::Gambling { stake, .. }, "gamble") => {
            let stake = (*stake).min(state.player.balance.max(0));
            if chance(rng, 0.5) {
                state.player.balance += stake;
                ctx.line(format!("You won ${}!", format_money(stake)));
            } else {
                state.player.balance -= stake;
                ctx.line(format!("You lost ${}.", format_money(stake)));
            }
        }
        (ChoiceParams::Gambling { entry_fee, .. }, "enter") => {
            require_funds(state, *entry_fee)?;
            state.player.balance -= entry_fee;
            let multiplier = if chance(rng, 0.3) {
                rng.gen_range(2.0..=5.0)
            } else {
                rng.gen_range(0.0..=0.5)
            };
            let prize = apply_rate(*entry_fee, multiplier);
            state.player.balance += prize;
            ctx.line(format!(
                "Tournament entry ${}, prize ${}.",
                format_money(*entry_fee),
                format_money(prize)
            ));
        }
        (
            ChoiceParams::Intel {
                good,
                rising,
                percent,
                cost,
                accuracy,
                ttl,
            },
            "buy",
        ) => {
            require_funds(state, *cost)?;
            state.player.balance -= cost;
            if chance(rng, *accuracy) {
                state.pending_events.push(PendingEvent::IntelTip {
                    good: good.clone(),
                    rising: *rising,
                    percent: *percent,
                    resolve_turn: state.turn + ttl,
                });
            }
            let direction = if *rising { "rise" } else { "fall" };
            ctx.line(format!(
                "Your contact says {} prices will {direction} about {percent}% soon.",
                good_name(good)
            ));
        }
        (ChoiceParams::Smuggler { cost, success_rate }, "use_smuggler") => {
            require_funds(state, *cost)?;
            state.player.balance -= cost;
            seizure = SeizureCheck::Bypassed;
            if chance(rng, *success_rate) {
                ctx.line("The smuggler gets your cargo through untouched.");
            } else if let Some(dest) = &pending.destination {
                for good in at_risk_goods(state, dest) {
                    let held = state.player.held(&good);
                    state.player.remove_goods(&good, held);
                    ctx.line(format!(
                        "The smuggler was caught. Customs seized {held} {}.",
                        good_name(&good)
                    ));
                }
            }
        }
        _ => ctx.line("You walk away."),
    }

    Ok(Resolution {
        destination: pending.destination,
        seizure,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::{ChoiceOdds, PendingChoice};

    fn only(category: ChoiceCategory) -> Tunables {
        let mut odds = ChoiceOdds::none();
        match category {
            ChoiceCategory::ShadyDeal => odds.shady_deal = 1.0,
            ChoiceCategory::Gambling => odds.gambling = 1.0,
            ChoiceCategory::Intel => odds.intel = 1.0,
            ChoiceCategory::Smuggler => odds.smuggler = 1.0,
        }
        Tunables {
            choice_odds: odds,
            ..Tunables::quiet()
        }
    }

    fn pend(state: &mut GameState, choice: ChoiceEvent, dest: &str) {
        state.pending_choice = Some(PendingChoice {
            choice,
            destination: Some(MarketId::from(dest)),
        });
    }

    #[test]
    fn nothing_rolls_when_disabled() {
        let t = Tunables::quiet();
        let s = GameState::new(&t);
        let mut rng = StepRng::new(0, 0);
        assert!(roll_choice(&s, &t, &MarketId::from("dubai"), &mut rng).is_none());
    }

    #[test]
    fn smuggler_requires_restricted_cargo() {
        let t = only(ChoiceCategory::Smuggler);
        let mut s = GameState::new(&t);
        let sz = MarketId::from("shenzhen");
        let mut rng = StepRng::new(0, 0);
        assert!(roll_choice(&s, &t, &sz, &mut rng).is_none());
        s.player.add_goods(&GoodId::from("h100"), 2, 25_000);
        let choice = roll_choice(&s, &t, &sz, &mut rng).unwrap();
        assert_eq!(choice.params.category(), ChoiceCategory::Smuggler);
        assert!(choice.description.contains("Shenzhen"));
        assert_eq!(choice.options[0].id, "use_smuggler");
    }

    #[test]
    fn gambling_scales_with_balance() {
        let t = only(ChoiceCategory::Gambling);
        let s = GameState::new(&t);
        let mut rng = StepRng::new(0, 0);
        let choice = roll_choice(&s, &t, &MarketId::from("dubai"), &mut rng).unwrap();
        assert_eq!(
            choice.params,
            ChoiceParams::Gambling {
                stake: 1_000,
                entry_fee: 200
            }
        );
        assert!(choice.description.contains("$1,000"));
        assert!(choice.description.contains("$200"));
        assert_eq!(choice.options[0].label, "Bet $1,000");
    }

    #[test]
    fn broke_players_are_not_invited_to_gamble() {
        let t = only(ChoiceCategory::Gambling);
        let mut s = GameState::new(&t);
        s.player.balance = 99;
        let mut rng = StepRng::new(0, 0);
        assert!(roll_choice(&s, &t, &MarketId::from("dubai"), &mut rng).is_none());
    }

    #[test]
    fn shady_deal_fits_cargo_and_funds() {
        let t = only(ChoiceCategory::ShadyDeal);
        let mut s = GameState::new(&t);
        s.player.inventory_capacity = 1;
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let choice = roll_choice(&s, &t, &MarketId::from("dubai"), &mut rng).unwrap();
        match choice.params {
            ChoiceParams::ShadyDeal { quantity, cost, .. } => {
                assert_eq!(quantity, 1);
                assert!(cost <= s.player.balance);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_option_is_rejected() {
        let t = only(ChoiceCategory::Gambling);
        let mut s = GameState::new(&t);
        let mut rng = StepRng::new(0, 0);
        let choice = roll_choice(&s, &t, &MarketId::from("dubai"), &mut rng).unwrap();
        pend(&mut s, choice, "dubai");
        let mut ctx = TurnContext::default();
        let err = resolve_choice(&mut s, "accept", &mut ctx, &mut rng).unwrap_err();
        assert_eq!(err, ActionError::InvalidChoice("accept".into()));
    }

    #[test]
    fn decline_only_clears_the_choice() {
        let t = only(ChoiceCategory::Gambling);
        let mut s = GameState::new(&t);
        let mut rng = StepRng::new(0, 0);
        let choice = roll_choice(&s, &t, &MarketId::from("dubai"), &mut rng).unwrap();
        pend(&mut s, choice, "dubai");
        let before = s.player.clone();
        let mut ctx = TurnContext::default();
        let res = resolve_choice(&mut s, "decline", &mut ctx, &mut rng).unwrap();
        assert_eq!(res.destination, Some(MarketId::from("dubai")));
        assert_eq!(res.seizure, SeizureCheck::Normal);
        assert!(s.pending_choice.is_none());
        assert_eq!(s.player, before);
    }

    #[test]
    fn tournament_pays_a_prize() {
        let t = only(ChoiceCategory::Gambling);
        let mut s = GameState::new(&t);
        let mut rng = StepRng::new(0, 0);
        let choice = roll_choice(&s, &t, &MarketId::from("dubai"), &mut rng).unwrap();
        pend(&mut s, choice, "dubai");
        let mut ctx = TurnContext::default();
        resolve_choice(&mut s, "enter", &mut ctx, &mut rng).unwrap();
        // fee 200, lowest draw of the winning branch is 2x
        assert_eq!(s.player.balance, 10_000 - 200 + 400);
    }

    fn shady(risk_percent: u32) -> ChoiceEvent {
        build_choice(
            ChoiceParams::ShadyDeal {
                good: GoodId::from("compute"),
                quantity: 3,
                discount_percent: 40,
                risk_percent,
                cost: 2_250,
            },
            &MarketId::from("dubai"),
        )
    }

    #[test]
    fn shady_deal_delivers_goods_at_the_agreed_cost() {
        let mut s = GameState::new(&Tunables::quiet());
        pend(&mut s, shady(0), "dubai");
        let mut ctx = TurnContext::default();
        resolve_choice(&mut s, "accept", &mut ctx, &mut StepRng::new(0, 0)).unwrap();
        let compute = GoodId::from("compute");
        assert_eq!(s.player.balance, 10_000 - 2_250);
        assert_eq!(s.player.held(&compute), 3);
        assert_eq!(s.player.cost_basis[&compute], 2_250);
        assert!(ctx.lines[0].contains("You bought 3"));
    }

    #[test]
    fn shady_setup_charges_for_nothing() {
        let mut s = GameState::new(&Tunables::quiet());
        pend(&mut s, shady(30), "dubai");
        let mut ctx = TurnContext::default();
        resolve_choice(&mut s, "accept", &mut ctx, &mut StepRng::new(0, 0)).unwrap();
        assert_eq!(s.player.balance, 10_000 - 2_250);
        assert!(s.player.inventory.is_empty());
        assert!(s.player.cost_basis.is_empty());
        assert!(ctx.lines[0].contains("setup"));
    }

    fn bet(state: &mut GameState, stake: i64) {
        let choice = build_choice(
            ChoiceParams::Gambling {
                stake,
                entry_fee: 100,
            },
            &MarketId::from("dubai"),
        );
        pend(state, choice, "dubai");
    }

    #[test]
    fn gamble_doubles_or_loses_the_stake() {
        let mut s = GameState::new(&Tunables::quiet());
        bet(&mut s, 1_000);
        let mut ctx = TurnContext::default();
        // a zero draw lands under the 50% line
        resolve_choice(&mut s, "gamble", &mut ctx, &mut StepRng::new(0, 0)).unwrap();
        assert_eq!(s.player.balance, 11_000);

        bet(&mut s, 1_000);
        // an all-ones draw lands above it
        resolve_choice(&mut s, "gamble", &mut ctx, &mut StepRng::new(u64::MAX, 0)).unwrap();
        assert_eq!(s.player.balance, 10_000);
    }

    #[test]
    fn gamble_stake_is_capped_at_the_balance() {
        let mut s = GameState::new(&Tunables::quiet());
        s.player.balance = 300;
        bet(&mut s, 1_000);
        let mut ctx = TurnContext::default();
        resolve_choice(&mut s, "gamble", &mut ctx, &mut StepRng::new(0, 0)).unwrap();
        assert_eq!(s.player.balance, 600);

        s.player.balance = 300;
        bet(&mut s, 1_000);
        resolve_choice(&mut s, "gamble", &mut ctx, &mut StepRng::new(u64::MAX, 0)).unwrap();
        assert_eq!(s.player.balance, 0);
    }

    #[test]
    fn failed_smuggler_takes_everything_restricted() {
        let t = Tunables::quiet();
        let mut s = GameState::new(&t);
        let h100 = GoodId::from("h100");
        let compute = GoodId::from("compute");
        s.player.add_goods(&h100, 3, 36_000);
        s.player.add_goods(&compute, 2, 2_500);
        let choice = build_choice(
            ChoiceParams::Smuggler {
                cost: 500,
                success_rate: 0.0,
            },
            &MarketId::from("shenzhen"),
        );
        pend(&mut s, choice, "shenzhen");
        let mut rng = StepRng::new(0, 0);
        let mut ctx = TurnContext::default();
        let res = resolve_choice(&mut s, "use_smuggler", &mut ctx, &mut rng).unwrap();
        assert_eq!(res.seizure, SeizureCheck::Bypassed);
        assert_eq!(s.player.held(&h100), 0);
        assert!(!s.player.cost_basis.contains_key(&h100));
        assert_eq!(s.player.held(&compute), 2);
        assert_eq!(s.player.balance, 9_500);
    }

    #[test]
    fn accurate_intel_schedules_a_tip() {
        let t = Tunables::quiet();
        let mut s = GameState::new(&t);
        s.turn = 4;
        let choice = build_choice(
            ChoiceParams::Intel {
                good: GoodId::from("a100"),
                rising: true,
                percent: 20,
                cost: 400,
                accuracy: 1.0,
                ttl: 2,
            },
            &MarketId::from("singapore"),
        );
        pend(&mut s, choice, "singapore");
        let mut rng = StepRng::new(0, 0);
        let mut ctx = TurnContext::default();
        resolve_choice(&mut s, "buy", &mut ctx, &mut rng).unwrap();
        assert_eq!(
            s.pending_events,
            vec![PendingEvent::IntelTip {
                good: GoodId::from("a100"),
                rising: true,
                percent: 20,
                resolve_turn: 6
            }]
        );
        assert_eq!(s.player.balance, 9_600);
    }

    #[test]
    fn bluffed_intel_reads_the_same() {
        let t = Tunables::quiet();
        let params = |accuracy| ChoiceParams::Intel {
            good: GoodId::from("talent"),
            rising: false,
            percent: 25,
            cost: 300,
            accuracy,
            ttl: 1,
        };
        let mut lines = Vec::new();
        for accuracy in [1.0, 0.0] {
            let mut s = GameState::new(&t);
            pend(&mut s, build_choice(params(accuracy), &MarketId::from("dubai")), "dubai");
            let mut rng = StepRng::new(0, 0);
            let mut ctx = TurnContext::default();
            resolve_choice(&mut s, "buy", &mut ctx, &mut rng).unwrap();
            assert_eq!(s.pending_events.len(), usize::from(accuracy > 0.5));
            lines.push(ctx.lines);
        }
        assert_eq!(lines[0], lines[1]);
    }
}
