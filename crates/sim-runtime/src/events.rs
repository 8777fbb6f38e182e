//! Random world events: probability, materialization and application.
//!
//! A turn first rolls every category and materializes the hits into
//! [`GameEvent`]s with concrete parameters; only then are they applied, in
//! roll order.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sim_core::data::{EventTemplate, INSURANCE, SECURITY};
use sim_core::text::{render, TemplateParams};
use sim_core::{
    event_templates, good_def, market_def, EffectKind, EventCategory, GameState, GoodCategory,
    GoodId, MarketId, PendingEvent, Tunables, GOODS, MARKETS,
};
use sim_econ::{apply_rate, net_worth, shock_price};
use tracing::debug;

use crate::{adjusted_probability, chance, reputation_shift};

/// Concrete effect of a materialized event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// One good, every market.
    PriceShock { good: GoodId, percent: i64 },
    /// Every good of a category, every market.
    CategoryShock { category: GoodCategory, percent: i64 },
    Restrict { market: MarketId, good: GoodId },
    Unrestrict { market: MarketId, good: GoodId },
    Seize { good: GoodId, quantity: u32 },
    MoneyLoss { amount: i64 },
    Fine { amount: i64 },
    MoneyGain { amount: i64 },
    PremiumSell { good: GoodId, percent: u32 },
    DiscountBuy { good: GoodId, percent: u32 },
}

/// An event as reported to the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub category: EventCategory,
    pub kind: EffectKind,
    pub description: String,
    pub effect: Effect,
}

/// Probability that `category` fires this turn.
///
/// `destination` is the market being arrived at, if the turn is a travel;
/// customs never fires otherwise. The insurance block is itself a roll, so
/// this consumes randomness.
pub fn event_probability<R: Rng + ?Sized>(
    category: EventCategory,
    state: &GameState,
    t: &Tunables,
    destination: Option<&MarketId>,
    rng: &mut R,
) -> f64 {
    let shift = reputation_shift(state, t);
    let odds = &t.event_odds;
    match category {
        EventCategory::MarketShift => odds.market_shift,
        EventCategory::Regulation => adjusted_probability(odds.regulation, -shift),
        EventCategory::Customs => {
            let Some(def) = destination.and_then(|d| market_def(d.as_str())) else {
                return 0.0;
            };
            if state.has_upgrade(INSURANCE) && chance(rng, t.insurance_block_chance) {
                debug!(market = def.id, "insurance suppressed customs roll");
                return 0.0;
            }
            adjusted_probability(def.customs_risk * odds.customs_scale, -shift)
        }
        EventCategory::Hack => {
            let p = adjusted_probability(odds.hack, -shift);
            if state.has_upgrade(SECURITY) {
                p * t.security_hack_dampening
            } else {
                p
            }
        }
        EventCategory::Audit => {
            let wealth = net_worth(state).max(0) as f64;
            let scaled = odds.audit * (1.0 + wealth / t.audit_wealth_scale);
            adjusted_probability(scaled, -shift).min(t.audit_max_probability)
        }
        EventCategory::Opportunity => adjusted_probability(odds.opportunity, shift),
        EventCategory::Windfall => adjusted_probability(odds.windfall, shift),
    }
}

/// Roll every category once and materialize the hits.
pub fn roll_events<R: Rng + ?Sized>(
    state: &GameState,
    t: &Tunables,
    destination: Option<&MarketId>,
    rng: &mut R,
) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for category in EventCategory::ALL {
        let p = event_probability(category, state, t, destination, rng);
        if !chance(rng, p) {
            continue;
        }
        let templates = event_templates(category);
        let Some(template) = templates.choose(rng) else {
            continue;
        };
        if let Some(event) = materialize(template, state, destination, rng) {
            events.push(event);
        }
    }
    events
}

fn good_name(id: &GoodId) -> String {
    good_def(id.as_str()).map_or_else(|| id.to_string(), |g| g.name.to_string())
}

fn market_name(id: &MarketId) -> String {
    market_def(id.as_str()).map_or_else(|| id.to_string(), |m| m.name.to_string())
}

fn random_good<R: Rng + ?Sized>(rng: &mut R) -> Option<GoodId> {
    GOODS.choose(rng).map(|g| GoodId::from(g.id))
}

/// Fill a template with freshly rolled parameters.
///
/// Returns `None` when the effect has nothing to act on (no cargo to seize,
/// nothing left to restrict or lift).
pub fn materialize<R: Rng + ?Sized>(
    template: &EventTemplate,
    state: &GameState,
    destination: Option<&MarketId>,
    rng: &mut R,
) -> Option<GameEvent> {
    let mut params = TemplateParams::default();
    let effect = match template.effect {
        EffectKind::Drop | EffectKind::Rise => {
            let good = random_good(rng)?;
            let magnitude: i64 = rng.gen_range(10..=30);
            params.good = Some(good_name(&good));
            params.percent = Some(magnitude);
            let percent = if template.effect == EffectKind::Drop {
                -magnitude
            } else {
                magnitude
            };
            Effect::PriceShock { good, percent }
        }
        EffectKind::RiseAll => {
            let percent: i64 = rng.gen_range(10..=25);
            params.percent = Some(percent);
            Effect::CategoryShock {
                category: GoodCategory::Gpu,
                percent,
            }
        }
        kind @ (EffectKind::ComputeRise
        | EffectKind::ComputeSpike
        | EffectKind::ComputeDrop
        | EffectKind::TalentRise
        | EffectKind::DatasetsDrop) => {
            let percent = i64::from(kind.fixed_percent()?);
            let category = match kind {
                EffectKind::TalentRise => GoodCategory::Talent,
                EffectKind::DatasetsDrop => GoodCategory::Datasets,
                _ => GoodCategory::Compute,
            };
            params.percent = Some(percent.abs());
            Effect::CategoryShock { category, percent }
        }
        EffectKind::Restrict => {
            let def = MARKETS.choose(rng)?;
            let market = MarketId::from(def.id);
            let current = state.markets.get(&market)?;
            let open: Vec<GoodId> = GOODS
                .iter()
                .map(|g| GoodId::from(g.id))
                .filter(|g| !current.is_restricted(g))
                .collect();
            let good = open.choose(rng)?.clone();
            params.market = Some(def.name.to_string());
            params.good = Some(good_name(&good));
            Effect::Restrict { market, good }
        }
        EffectKind::Unrestrict => {
            let restricted: Vec<&MarketId> = state
                .markets
                .iter()
                .filter(|(_, m)| !m.restricted.is_empty())
                .map(|(id, _)| id)
                .collect();
            let market = (*restricted.choose(rng)?).clone();
            let goods: Vec<&GoodId> = state.markets.get(&market)?.restricted.iter().collect();
            let good = (*goods.choose(rng)?).clone();
            params.market = Some(market_name(&market));
            params.good = Some(good_name(&good));
            Effect::Unrestrict { market, good }
        }
        EffectKind::Seize => {
            let good = seize_target(state, template.category, destination, rng)?;
            let held = state.player.held(&good);
            let quantity = rng.gen_range(1..=3).min(held);
            params.good = Some(good_name(&good));
            params.quantity = Some(i64::from(quantity));
            if let Some(dest) = destination {
                params.market = Some(market_name(dest));
            }
            Effect::Seize { good, quantity }
        }
        EffectKind::MoneyLoss => {
            let rate = rng.gen_range(0.05..=0.15);
            let amount = apply_rate(state.player.balance.max(0), rate).max(100);
            params.amount = Some(amount);
            Effect::MoneyLoss { amount }
        }
        EffectKind::Fine => {
            let amount = if template.category == EventCategory::Audit {
                let rate = rng.gen_range(0.03..=0.08);
                apply_rate(net_worth(state).max(0), rate).max(200)
            } else {
                rng.gen_range(200..=1_000)
            };
            params.amount = Some(amount);
            if let Some(dest) = destination {
                params.market = Some(market_name(dest));
            }
            Effect::Fine { amount }
        }
        EffectKind::MoneyGain => {
            let amount = rng.gen_range(500..=3_000);
            params.amount = Some(amount);
            Effect::MoneyGain { amount }
        }
        EffectKind::PremiumSell => {
            let good = random_good(rng)?;
            let percent = rng.gen_range(15..=35);
            params.good = Some(good_name(&good));
            params.percent = Some(i64::from(percent));
            Effect::PremiumSell { good, percent }
        }
        EffectKind::DiscountBuy => {
            let good = random_good(rng)?;
            let percent = rng.gen_range(15..=40);
            params.good = Some(good_name(&good));
            params.percent = Some(i64::from(percent));
            Effect::DiscountBuy { good, percent }
        }
    };

    Some(GameEvent {
        category: template.category,
        kind: template.effect,
        description: render(template.text, &params),
        effect,
    })
}

/// Customs prefers cargo restricted at the destination; anything held will do otherwise.
fn seize_target<R: Rng + ?Sized>(
    state: &GameState,
    category: EventCategory,
    destination: Option<&MarketId>,
    rng: &mut R,
) -> Option<GoodId> {
    let held: Vec<&GoodId> = state.player.inventory.keys().collect();
    if category == EventCategory::Customs {
        if let Some(market) = destination.and_then(|d| state.markets.get(d)) {
            let restricted: Vec<&GoodId> = held
                .iter()
                .copied()
                .filter(|g| market.is_restricted(g))
                .collect();
            if let Some(good) = restricted.choose(rng) {
                return Some((*good).clone());
            }
        }
    }
    held.choose(rng).map(|g| (*g).clone())
}

/// Apply one materialized event to the state.
pub fn apply_event(state: &mut GameState, event: &GameEvent) {
    debug!(category = ?event.category, kind = ?event.kind, "applying event");
    match &event.effect {
        Effect::PriceShock { good, percent } => shock_price(state, good, *percent),
        Effect::CategoryShock { category, percent } => {
            for def in GOODS.iter().filter(|g| g.category == *category) {
                shock_price(state, &GoodId::from(def.id), *percent);
            }
        }
        Effect::Restrict { market, good } => {
            if let Some(m) = state.markets.get_mut(market) {
                m.restricted.insert(good.clone());
            }
        }
        Effect::Unrestrict { market, good } => {
            if let Some(m) = state.markets.get_mut(market) {
                m.restricted.remove(good);
            }
        }
        Effect::Seize { good, quantity } => {
            state.player.remove_goods(good, *quantity);
        }
        Effect::MoneyLoss { amount } | Effect::Fine { amount } => {
            state.player.balance = (state.player.balance - amount).max(0);
        }
        Effect::MoneyGain { amount } => state.player.balance += amount,
        Effect::PremiumSell { good, percent } => {
            state.pending_events.push(PendingEvent::PremiumSell {
                good: good.clone(),
                percent: *percent,
                created_turn: state.turn,
            });
        }
        Effect::DiscountBuy { good, percent } => {
            state.pending_events.push(PendingEvent::DiscountBuy {
                good: good.clone(),
                percent: *percent,
                created_turn: state.turn,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::UpgradeId;

    fn fresh() -> GameState {
        GameState::new(&Tunables::default())
    }

    fn template(category: EventCategory, kind: EffectKind) -> &'static EventTemplate {
        event_templates(category)
            .into_iter()
            .find(|t| t.effect == kind)
            .unwrap()
    }

    #[test]
    fn customs_needs_a_destination() {
        let t = Tunables::default();
        let s = fresh();
        let mut rng = StepRng::new(0, 0);
        assert_eq!(
            event_probability(EventCategory::Customs, &s, &t, None, &mut rng),
            0.0
        );
        let sz = MarketId::from("shenzhen");
        let p = event_probability(EventCategory::Customs, &s, &t, Some(&sz), &mut rng);
        assert!((p - 0.15).abs() < 1e-9);
    }

    #[test]
    fn insurance_can_block_customs() {
        let t = Tunables {
            insurance_block_chance: 1.0,
            ..Tunables::default()
        };
        let mut s = fresh();
        s.purchased_upgrades.push(UpgradeId::from(INSURANCE));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let sz = MarketId::from("shenzhen");
        assert_eq!(
            event_probability(EventCategory::Customs, &s, &t, Some(&sz), &mut rng),
            0.0
        );
    }

    #[test]
    fn reputation_moves_odds_in_opposite_directions() {
        let t = Tunables::default();
        let mut s = fresh();
        s.player.reputation = 100;
        let mut rng = StepRng::new(0, 0);
        let hack = event_probability(EventCategory::Hack, &s, &t, None, &mut rng);
        let windfall = event_probability(EventCategory::Windfall, &s, &t, None, &mut rng);
        assert!(hack < t.event_odds.hack);
        assert!(windfall > t.event_odds.windfall);
        s.purchased_upgrades.push(UpgradeId::from(SECURITY));
        let dampened = event_probability(EventCategory::Hack, &s, &t, None, &mut rng);
        assert!((dampened - hack * t.security_hack_dampening).abs() < 1e-12);
    }

    #[test]
    fn audit_is_capped() {
        let t = Tunables::default();
        let mut s = fresh();
        s.player.balance = 50_000_000;
        let mut rng = StepRng::new(0, 0);
        let p = event_probability(EventCategory::Audit, &s, &t, None, &mut rng);
        assert_eq!(p, t.audit_max_probability);
    }

    #[test]
    fn disabled_categories_stay_disabled() {
        let t = Tunables::quiet();
        let mut s = fresh();
        s.player.reputation = 0;
        let mut rng = StepRng::new(0, 0);
        assert!(roll_events(&s, &t, None, &mut rng).is_empty());
    }

    #[test]
    fn seize_without_cargo_is_skipped() {
        let s = fresh();
        let mut rng = StepRng::new(0, 0);
        let tpl = template(EventCategory::Hack, EffectKind::Seize);
        assert!(materialize(tpl, &s, None, &mut rng).is_none());
    }

    #[test]
    fn customs_seize_prefers_restricted_cargo() {
        let mut s = fresh();
        s.player.add_goods(&GoodId::from("compute"), 5, 5_000);
        s.player.add_goods(&GoodId::from("h100"), 2, 24_000);
        let sz = MarketId::from("shenzhen");
        let tpl = template(EventCategory::Customs, EffectKind::Seize);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..20 {
            let e = materialize(tpl, &s, Some(&sz), &mut rng).unwrap();
            match e.effect {
                Effect::Seize { good, quantity } => {
                    assert_eq!(good, GoodId::from("h100"));
                    assert!((1..=2).contains(&quantity));
                }
                other => panic!("unexpected {other:?}"),
            }
            assert!(e.description.contains("Shenzhen"));
        }
    }

    #[test]
    fn seize_shrinks_basis_proportionally() {
        let mut s = fresh();
        let g = GoodId::from("talent");
        s.player.add_goods(&g, 4, 16_000);
        let e = GameEvent {
            category: EventCategory::Hack,
            kind: EffectKind::Seize,
            description: String::new(),
            effect: Effect::Seize {
                good: g.clone(),
                quantity: 1,
            },
        };
        apply_event(&mut s, &e);
        assert_eq!(s.player.held(&g), 3);
        assert_eq!(s.player.cost_basis[&g], 12_000);
    }

    #[test]
    fn fines_floor_balance_at_zero() {
        let mut s = fresh();
        s.player.balance = 150;
        let e = GameEvent {
            category: EventCategory::Customs,
            kind: EffectKind::Fine,
            description: String::new(),
            effect: Effect::Fine { amount: 900 },
        };
        apply_event(&mut s, &e);
        assert_eq!(s.player.balance, 0);
    }

    #[test]
    fn fixed_shock_hits_whole_category() {
        let mut s = fresh();
        let mut rng = StepRng::new(0, 0);
        let tpl = template(EventCategory::MarketShift, EffectKind::ComputeDrop);
        let e = materialize(tpl, &s, None, &mut rng).unwrap();
        assert_eq!(
            e.effect,
            Effect::CategoryShock {
                category: GoodCategory::Compute,
                percent: -25
            }
        );
        assert!(e.description.contains("25%"));
        apply_event(&mut s, &e);
        let sv = &s.markets[&MarketId::from("silicon_valley")];
        assert_eq!(sv.price(&GoodId::from("compute")), Some(938));
        assert_eq!(sv.price(&GoodId::from("talent")), Some(4_250));
    }

    #[test]
    fn offers_are_stamped_with_the_turn() {
        let mut s = fresh();
        s.turn = 7;
        let mut rng = StepRng::new(0, 0);
        let tpl = template(EventCategory::Opportunity, EffectKind::DiscountBuy);
        let e = materialize(tpl, &s, None, &mut rng).unwrap();
        apply_event(&mut s, &e);
        assert_eq!(
            s.pending_events,
            vec![PendingEvent::DiscountBuy {
                good: GoodId::from("rtx4090"),
                percent: 15,
                created_turn: 7
            }]
        );
    }

    #[test]
    fn restrict_and_lift() {
        let mut s = fresh();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let tpl = template(EventCategory::Regulation, EffectKind::Restrict);
        let e = materialize(tpl, &s, None, &mut rng).unwrap();
        let Effect::Restrict { market, good } = e.effect.clone() else {
            panic!("expected restrict");
        };
        assert!(!s.markets[&market].is_restricted(&good));
        apply_event(&mut s, &e);
        assert!(s.markets[&market].is_restricted(&good));

        for m in s.markets.values_mut() {
            m.restricted.clear();
        }
        let lift = template(EventCategory::Regulation, EffectKind::Unrestrict);
        assert!(materialize(lift, &s, None, &mut rng).is_none());
    }
}
