//! Customs inspection of restricted cargo on arrival.

use rand::Rng;
use sim_core::data::INSURANCE;
use sim_core::text::{render, TemplateParams};
use sim_core::{good_def, market_def, EffectKind, EventCategory, GameState, MarketId, Tunables};
use tracing::debug;

use crate::chance;
use crate::events::{Effect, GameEvent};
use crate::queries::at_risk_goods;

const SEIZURE_TEXT: &str = "Customs in {market} seize {quantity} {good} of restricted cargo.";

/// Chance that customs at `destination` seizes one restricted good.
pub fn seizure_chance(state: &GameState, t: &Tunables, destination: &MarketId) -> f64 {
    let base = market_def(destination.as_str()).map_or(0.0, |m| m.seizure_risk);
    let bonus = f64::from(state.player.reputation - 50) * t.reputation_seizure_factor;
    (base - bonus).max(t.min_seizure_chance)
}

/// Roll seizure independently for each held good restricted at `destination`
/// and remove what is taken. The returned events are already applied.
pub fn resolve_seizures<R: Rng + ?Sized>(
    state: &mut GameState,
    t: &Tunables,
    destination: &MarketId,
    rng: &mut R,
) -> Vec<GameEvent> {
    let p = seizure_chance(state, t, destination);
    let market = market_def(destination.as_str()).map_or_else(|| destination.to_string(), |m| m.name.to_string());
    let mut events = Vec::new();
    for good in at_risk_goods(state, destination) {
        if state.has_upgrade(INSURANCE) && chance(rng, t.insurance_block_chance) {
            debug!(good = %good, "insurance covered restricted cargo");
            continue;
        }
        if !chance(rng, p) {
            continue;
        }
        let held = state.player.held(&good);
        let fraction = rng.gen_range(t.seizure_fraction_min..=t.seizure_fraction_max);
        let quantity = ((f64::from(held) * fraction).round() as u32).clamp(1, held);
        let (removed, _) = state.player.remove_goods(&good, quantity);
        let params = TemplateParams {
            good: Some(good_def(good.as_str()).map_or_else(|| good.to_string(), |g| g.name.to_string())),
            market: Some(market.clone()),
            quantity: Some(i64::from(removed)),
            ..TemplateParams::default()
        };
        events.push(GameEvent {
            category: EventCategory::Customs,
            kind: EffectKind::Seize,
            description: render(SEIZURE_TEXT, &params),
            effect: Effect::Seize {
                good,
                quantity: removed,
            },
        });
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::{GoodId, UpgradeId};

    #[test]
    fn chance_has_a_floor() {
        let t = Tunables::default();
        let mut s = GameState::new(&t);
        let sz = MarketId::from("shenzhen");
        assert!((seizure_chance(&s, &t, &sz) - 0.35).abs() < 1e-9);
        s.player.reputation = 100;
        assert!((seizure_chance(&s, &t, &sz) - 0.15).abs() < 1e-9);
        let harsh = Tunables {
            reputation_seizure_factor: 0.02,
            ..Tunables::default()
        };
        assert_eq!(seizure_chance(&s, &harsh, &sz), harsh.min_seizure_chance);
    }

    #[test]
    fn seizes_a_fraction_but_at_least_one() {
        let t = Tunables::default();
        let mut s = GameState::new(&t);
        let h100 = GoodId::from("h100");
        let a100 = GoodId::from("a100");
        s.player.add_goods(&h100, 10, 120_000);
        s.player.add_goods(&a100, 1, 7_000);
        s.player.add_goods(&GoodId::from("compute"), 4, 5_000);
        let mut rng = StepRng::new(0, 0);
        let events = resolve_seizures(&mut s, &t, &MarketId::from("shenzhen"), &mut rng);
        assert_eq!(events.len(), 2);
        // lowest fraction 0.3 of 10
        assert_eq!(s.player.held(&h100), 7);
        assert_eq!(s.player.cost_basis[&h100], 84_000);
        assert_eq!(s.player.held(&a100), 0);
        assert_eq!(s.player.held(&GoodId::from("compute")), 4);
        assert!(events[0].description.starts_with("Customs in Shenzhen"));
    }

    #[test]
    fn insurance_can_shield_cargo() {
        let t = Tunables {
            insurance_block_chance: 1.0,
            ..Tunables::default()
        };
        let mut s = GameState::new(&t);
        s.purchased_upgrades.push(UpgradeId::from(INSURANCE));
        s.player.add_goods(&GoodId::from("datasets"), 5, 1_000);
        let mut rng = StepRng::new(0, 0);
        assert!(resolve_seizures(&mut s, &t, &MarketId::from("dubai"), &mut rng).is_empty());
        assert_eq!(s.player.held(&GoodId::from("datasets")), 5);
    }

    proptest! {
        #[test]
        fn never_takes_more_than_held(seed in any::<u64>(), held in 1u32..200) {
            let t = Tunables {
                min_seizure_chance: 1.0,
                ..Tunables::default()
            };
            let mut s = GameState::new(&t);
            let g = GoodId::from("datasets");
            s.player.add_goods(&g, held, i64::from(held) * 250);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let events = resolve_seizures(&mut s, &t, &MarketId::from("dubai"), &mut rng);
            prop_assert_eq!(events.len(), 1);
            let left = s.player.held(&g);
            prop_assert!(left < held);
            if left > 0 {
                prop_assert_eq!(s.player.cost_basis[&g], i64::from(left) * 250);
            }
        }
    }
}
