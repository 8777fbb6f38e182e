//! Balance constants. Every field has a default and may be overridden from YAML.

use crate::data::market_def;
use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Base per-turn probabilities for each random event category.
///
/// Customs rolls against the destination market's customs risk, scaled by
/// `customs_scale`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventOdds {
    pub market_shift: f64,
    pub customs_scale: f64,
    pub regulation: f64,
    pub hack: f64,
    pub audit: f64,
    pub opportunity: f64,
    pub windfall: f64,
}

impl Default for EventOdds {
    fn default() -> Self {
        Self {
            market_shift: 0.20,
            customs_scale: 1.0,
            regulation: 0.05,
            hack: 0.04,
            audit: 0.03,
            opportunity: 0.10,
            windfall: 0.05,
        }
    }
}

impl EventOdds {
    /// All odds zeroed; useful for quiet simulations.
    pub fn none() -> Self {
        Self {
            market_shift: 0.0,
            customs_scale: 0.0,
            regulation: 0.0,
            hack: 0.0,
            audit: 0.0,
            opportunity: 0.0,
            windfall: 0.0,
        }
    }
}

/// Base probabilities for travel choice encounters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoiceOdds {
    pub shady_deal: f64,
    pub gambling: f64,
    pub intel: f64,
    /// Only rolled when carrying goods restricted at the destination.
    pub smuggler: f64,
}

impl Default for ChoiceOdds {
    fn default() -> Self {
        Self {
            shady_deal: 0.06,
            gambling: 0.05,
            intel: 0.06,
            smuggler: 0.30,
        }
    }
}

impl ChoiceOdds {
    pub fn none() -> Self {
        Self {
            shady_deal: 0.0,
            gambling: 0.0,
            intel: 0.0,
            smuggler: 0.0,
        }
    }
}

/// Per-turn interest rates keyed by the debt / net worth ratio.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterestTiers {
    pub base: f64,
    pub medium: f64,
    pub high: f64,
    /// Ratio at which the medium rate starts.
    pub medium_threshold: f64,
    /// Ratio at which the high rate starts.
    pub high_threshold: f64,
}

impl Default for InterestTiers {
    fn default() -> Self {
        Self {
            base: 0.01,
            medium: 0.02,
            high: 0.035,
            medium_threshold: 0.5,
            high_threshold: 1.0,
        }
    }
}

/// Simulation tuning parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunables {
    pub starting_balance: i64,
    pub starting_capacity: u32,
    pub starting_reputation: i32,
    pub starting_location: String,
    /// Length of each good's price history window.
    pub price_history_len: usize,
    /// Weight of the pull toward the target price on each step.
    pub mean_reversion: f64,
    /// Lower clamp as a fraction of `base_min × modifier`.
    pub price_floor_factor: f64,
    /// Upper clamp as a fraction of `base_max × modifier`.
    pub price_ceiling_factor: f64,
    /// Per market × good chance of a one-step supply shift each turn.
    pub supply_shift_chance: f64,
    /// Probability shift per reputation point away from 50.
    pub reputation_event_modifier: f64,
    pub event_odds: EventOdds,
    /// Net worth at which the audit probability doubles.
    pub audit_wealth_scale: f64,
    pub audit_max_probability: f64,
    /// Chance that insurance suppresses a customs roll or a seizure.
    pub insurance_block_chance: f64,
    /// Multiplier applied to hack probability with the security upgrade.
    pub security_hack_dampening: f64,
    /// Turns a discount or premium offer stays available.
    pub modifier_ttl_turns: u32,
    pub interest: InterestTiers,
    pub borrow_multiplier: f64,
    pub bankruptcy_multiplier: f64,
    pub min_seizure_chance: f64,
    /// Seizure chance reduction per reputation point above 50.
    pub reputation_seizure_factor: f64,
    pub seizure_fraction_min: f64,
    pub seizure_fraction_max: f64,
    pub choice_odds: ChoiceOdds,
    pub oracle_chance: f64,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            starting_balance: 10_000,
            starting_capacity: 50,
            starting_reputation: 50,
            starting_location: "silicon_valley".to_string(),
            price_history_len: 8,
            mean_reversion: 0.10,
            price_floor_factor: 0.7,
            price_ceiling_factor: 1.3,
            supply_shift_chance: 0.10,
            reputation_event_modifier: 0.004,
            event_odds: EventOdds::default(),
            audit_wealth_scale: 100_000.0,
            audit_max_probability: 0.15,
            insurance_block_chance: 0.5,
            security_hack_dampening: 0.5,
            modifier_ttl_turns: 3,
            interest: InterestTiers::default(),
            borrow_multiplier: 2.0,
            bankruptcy_multiplier: 3.0,
            min_seizure_chance: 0.05,
            reputation_seizure_factor: 0.004,
            seizure_fraction_min: 0.3,
            seizure_fraction_max: 0.7,
            choice_odds: ChoiceOdds::default(),
            oracle_chance: 0.10,
        }
    }
}

impl Tunables {
    /// Defaults with every random event, choice and oracle roll disabled.
    ///
    /// Prices still drift; only the scripted randomness is silenced.
    pub fn quiet() -> Self {
        Self {
            event_odds: EventOdds::none(),
            choice_odds: ChoiceOdds::none(),
            oracle_chance: 0.0,
            ..Self::default()
        }
    }

    /// Parse YAML overrides on top of the defaults and validate the result.
    pub fn from_yaml_str(text: &str) -> Result<Self, ValidationError> {
        let tunables: Tunables =
            serde_yaml::from_str(text).map_err(|e| ValidationError::Parse(e.to_string()))?;
        validate_tunables(&tunables)?;
        Ok(tunables)
    }

    /// Load tunables from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let tunables = Self::from_yaml_str(&text)?;
        debug!(path = %path.display(), "loaded tunables");
        Ok(tunables)
    }
}

fn check_probability(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite(field));
    }
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::ProbabilityOutOfRange { field, value });
    }
    Ok(())
}

fn check_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite(field));
    }
    if value <= 0.0 {
        return Err(ValidationError::NonPositive(field));
    }
    Ok(())
}

/// Validate ranges and cross-references of a tunables set.
pub fn validate_tunables(t: &Tunables) -> Result<(), ValidationError> {
    if t.starting_balance < 0 {
        return Err(ValidationError::NegativeMoney);
    }
    if t.starting_capacity == 0 {
        return Err(ValidationError::NonPositive("starting_capacity"));
    }
    if !(0..=100).contains(&t.starting_reputation) {
        return Err(ValidationError::ReputationOutOfRange(t.starting_reputation));
    }
    if market_def(&t.starting_location).is_none() {
        return Err(ValidationError::UnknownMarket(t.starting_location.clone()));
    }
    if t.price_history_len == 0 {
        return Err(ValidationError::NonPositive("price_history_len"));
    }
    if t.modifier_ttl_turns == 0 {
        return Err(ValidationError::NonPositive("modifier_ttl_turns"));
    }

    for (field, value) in [
        ("mean_reversion", t.mean_reversion),
        ("supply_shift_chance", t.supply_shift_chance),
        ("reputation_event_modifier", t.reputation_event_modifier),
        ("event_odds.market_shift", t.event_odds.market_shift),
        ("event_odds.customs_scale", t.event_odds.customs_scale),
        ("event_odds.regulation", t.event_odds.regulation),
        ("event_odds.hack", t.event_odds.hack),
        ("event_odds.audit", t.event_odds.audit),
        ("event_odds.opportunity", t.event_odds.opportunity),
        ("event_odds.windfall", t.event_odds.windfall),
        ("audit_max_probability", t.audit_max_probability),
        ("insurance_block_chance", t.insurance_block_chance),
        ("security_hack_dampening", t.security_hack_dampening),
        ("min_seizure_chance", t.min_seizure_chance),
        ("reputation_seizure_factor", t.reputation_seizure_factor),
        ("seizure_fraction_min", t.seizure_fraction_min),
        ("seizure_fraction_max", t.seizure_fraction_max),
        ("choice_odds.shady_deal", t.choice_odds.shady_deal),
        ("choice_odds.gambling", t.choice_odds.gambling),
        ("choice_odds.intel", t.choice_odds.intel),
        ("choice_odds.smuggler", t.choice_odds.smuggler),
        ("oracle_chance", t.oracle_chance),
        ("interest.base", t.interest.base),
        ("interest.medium", t.interest.medium),
        ("interest.high", t.interest.high),
    ] {
        check_probability(field, value)?;
    }

    for (field, value) in [
        ("price_floor_factor", t.price_floor_factor),
        ("price_ceiling_factor", t.price_ceiling_factor),
        ("audit_wealth_scale", t.audit_wealth_scale),
        ("borrow_multiplier", t.borrow_multiplier),
        ("bankruptcy_multiplier", t.bankruptcy_multiplier),
        ("interest.medium_threshold", t.interest.medium_threshold),
        ("interest.high_threshold", t.interest.high_threshold),
    ] {
        check_positive(field, value)?;
    }

    if t.seizure_fraction_min > t.seizure_fraction_max {
        return Err(ValidationError::InvalidRange("seizure_fraction"));
    }
    if t.price_floor_factor > t.price_ceiling_factor {
        return Err(ValidationError::InvalidRange("price_floor_factor"));
    }
    if t.interest.medium_threshold > t.interest.high_threshold {
        return Err(ValidationError::InvalidRange("interest thresholds"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn defaults_are_valid() {
        validate_tunables(&Tunables::default()).unwrap();
        validate_tunables(&Tunables::quiet()).unwrap();
    }

    #[test]
    fn yaml_overrides_subset() {
        let t = Tunables::from_yaml_str(
            "starting_balance: 2500\nevent_odds:\n  hack: 0.5\ninterest:\n  high: 0.1\n",
        )
        .unwrap();
        assert_eq!(t.starting_balance, 2_500);
        assert_eq!(t.event_odds.hack, 0.5);
        assert_eq!(t.event_odds.market_shift, EventOdds::default().market_shift);
        assert_eq!(t.interest.high, 0.1);
        assert_eq!(t.interest.base, InterestTiers::default().base);
        assert_eq!(t.starting_capacity, 50);
    }

    #[test]
    fn yaml_rejects_bad_values() {
        assert_eq!(
            Tunables::from_yaml_str("starting_location: atlantis\n"),
            Err(ValidationError::UnknownMarket("atlantis".into()))
        );
        assert!(matches!(
            Tunables::from_yaml_str("oracle_chance: 1.5\n"),
            Err(ValidationError::ProbabilityOutOfRange { field: "oracle_chance", .. })
        ));
        assert!(matches!(
            Tunables::from_yaml_str("starting_balance: [1, 2]\n"),
            Err(ValidationError::Parse(_))
        ));
    }

    #[test]
    fn inverted_ranges_rejected() {
        let t = Tunables {
            seizure_fraction_min: 0.8,
            seizure_fraction_max: 0.2,
            ..Tunables::default()
        };
        assert_eq!(
            validate_tunables(&t),
            Err(ValidationError::InvalidRange("seizure_fraction"))
        );
    }

    proptest! {
        #[test]
        fn probabilities_in_unit_interval_accepted(p in 0.0f64..=1.0) {
            let t = Tunables { oracle_chance: p, supply_shift_chance: p, ..Tunables::default() };
            prop_assert!(validate_tunables(&t).is_ok());
        }

        #[test]
        fn negative_multipliers_rejected(m in -100.0f64..=0.0) {
            let t = Tunables { borrow_multiplier: m, ..Tunables::default() };
            prop_assert_eq!(validate_tunables(&t), Err(ValidationError::NonPositive("borrow_multiplier")));
        }
    }
}
