//! Static definitions: goods, markets, upgrades, milestones, and the text
//! templates used by random events, travel choices and the oracle.
//!
//! These tables never change at runtime. Game state refers to their entries by
//! string identifier and looks definitions up with the `*_def` helpers.

use serde::{Deserialize, Serialize};

/// Broad commodity family; category-wide shocks target every good in a family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoodCategory {
    /// Datacenter and consumer graphics cards.
    Gpu,
    /// Rented compute capacity.
    Compute,
    /// Training data.
    Datasets,
    /// Contracts for ML engineers.
    Talent,
}

/// A tradeable commodity.
#[derive(Debug, PartialEq)]
pub struct GoodDef {
    /// Stable identifier used as a map key in state.
    pub id: &'static str,
    /// Display name used in event text.
    pub name: &'static str,
    /// Commodity family.
    pub category: GoodCategory,
    /// Lower bound of the base price band.
    pub base_min: i64,
    /// Upper bound of the base price band.
    pub base_max: i64,
}

impl GoodDef {
    /// Midpoint of the base price band.
    pub fn midpoint(&self) -> f64 {
        (self.base_min + self.base_max) as f64 / 2.0
    }
}

/// A trading location.
#[derive(Debug, PartialEq)]
pub struct MarketDef {
    pub id: &'static str,
    pub name: &'static str,
    /// Multiplier applied to every good's base band in this market.
    pub price_modifier: f64,
    /// Base probability of a customs event when arriving here.
    pub customs_risk: f64,
    /// Base probability that customs seizes a restricted good on arrival.
    pub seizure_risk: f64,
    /// Goods restricted here in a fresh game.
    pub restricted: &'static [&'static str],
}

/// What owning an upgrade does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpgradeEffect {
    /// Adds cargo capacity.
    Capacity(u32),
    /// Dampens hack events.
    Security,
    /// Can shield cargo from seizure and suppress customs events.
    Insurance,
    /// Makes oracle predictions more frequent.
    AnalystNetwork,
}

#[derive(Debug, PartialEq)]
pub struct UpgradeDef {
    pub id: &'static str,
    pub name: &'static str,
    pub cost: i64,
    pub effect: UpgradeEffect,
    /// Upgrade that must already be purchased.
    pub requires: Option<&'static str>,
    /// Whether a milestone must unlock this upgrade before it can be bought.
    pub gated: bool,
}

/// Condition checked by the milestone evaluator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MilestoneCondition {
    NetWorth(i64),
    Trades(u32),
    MarketsVisited(usize),
    GoodsTraded(u64),
    Turns(u32),
    /// Borrowed at least once and currently owes nothing.
    PaidOffDebt,
}

/// Reward granted once, when a milestone is first achieved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MilestoneReward {
    UnlockUpgrade(&'static str),
    Reputation(i32),
    Achievement,
    Tutorial,
}

#[derive(Debug, PartialEq)]
pub struct MilestoneDef {
    pub id: &'static str,
    pub name: &'static str,
    pub condition: MilestoneCondition,
    pub reward: MilestoneReward,
}

/// Category of random world event rolled on every turn-advancing action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    MarketShift,
    Regulation,
    Customs,
    Hack,
    Audit,
    Opportunity,
    Windfall,
}

impl EventCategory {
    /// Roll order.
    pub const ALL: [EventCategory; 7] = [
        EventCategory::MarketShift,
        EventCategory::Regulation,
        EventCategory::Customs,
        EventCategory::Hack,
        EventCategory::Audit,
        EventCategory::Opportunity,
        EventCategory::Windfall,
    ];
}

/// Effect a template produces once its parameters are rolled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Drop,
    Rise,
    RiseAll,
    ComputeRise,
    ComputeSpike,
    ComputeDrop,
    TalentRise,
    DatasetsDrop,
    Restrict,
    Unrestrict,
    Seize,
    MoneyLoss,
    Fine,
    MoneyGain,
    PremiumSell,
    DiscountBuy,
}

impl EffectKind {
    /// Signed percentage for the fixed category shocks.
    pub fn fixed_percent(self) -> Option<i32> {
        match self {
            EffectKind::ComputeRise => Some(20),
            EffectKind::ComputeSpike => Some(50),
            EffectKind::ComputeDrop => Some(-25),
            EffectKind::TalentRise => Some(30),
            EffectKind::DatasetsDrop => Some(-30),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct EventTemplate {
    pub category: EventCategory,
    /// Text with `{good}`, `{market}`, `{percent}`, `{quantity}`, `{amount}` tokens.
    pub text: &'static str,
    pub effect: EffectKind,
}

/// Interactive encounter offered while travelling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceCategory {
    ShadyDeal,
    Gambling,
    Intel,
    Smuggler,
}

impl ChoiceCategory {
    /// Roll order; the first category that triggers wins.
    pub const ALL: [ChoiceCategory; 4] = [
        ChoiceCategory::ShadyDeal,
        ChoiceCategory::Gambling,
        ChoiceCategory::Intel,
        ChoiceCategory::Smuggler,
    ];
}

#[derive(Debug, PartialEq)]
pub struct ChoiceTemplate {
    pub category: ChoiceCategory,
    pub title: &'static str,
    pub text: &'static str,
    /// `(choice id, label)` pairs; labels may contain tokens.
    pub options: &'static [(&'static str, &'static str)],
}

pub const GOODS: &[GoodDef] = &[
    GoodDef {
        id: "rtx4090",
        name: "RTX 4090",
        category: GoodCategory::Gpu,
        base_min: 1_200,
        base_max: 2_400,
    },
    GoodDef {
        id: "a100",
        name: "A100",
        category: GoodCategory::Gpu,
        base_min: 5_000,
        base_max: 9_000,
    },
    GoodDef {
        id: "h100",
        name: "H100",
        category: GoodCategory::Gpu,
        base_min: 9_000,
        base_max: 16_000,
    },
    GoodDef {
        id: "compute",
        name: "Compute Hours",
        category: GoodCategory::Compute,
        base_min: 500,
        base_max: 2_000,
    },
    GoodDef {
        id: "datasets",
        name: "Datasets",
        category: GoodCategory::Datasets,
        base_min: 100,
        base_max: 400,
    },
    GoodDef {
        id: "talent",
        name: "Talent Contracts",
        category: GoodCategory::Talent,
        base_min: 2_500,
        base_max: 6_000,
    },
];

pub const MARKETS: &[MarketDef] = &[
    MarketDef {
        id: "silicon_valley",
        name: "Silicon Valley",
        price_modifier: 1.0,
        customs_risk: 0.05,
        seizure_risk: 0.30,
        restricted: &[],
    },
    MarketDef {
        id: "shenzhen",
        name: "Shenzhen",
        price_modifier: 0.8,
        customs_risk: 0.15,
        seizure_risk: 0.35,
        restricted: &["h100", "a100"],
    },
    MarketDef {
        id: "singapore",
        name: "Singapore",
        price_modifier: 0.95,
        customs_risk: 0.08,
        seizure_risk: 0.25,
        restricted: &[],
    },
    MarketDef {
        id: "dubai",
        name: "Dubai",
        price_modifier: 1.1,
        customs_risk: 0.10,
        seizure_risk: 0.30,
        restricted: &["datasets"],
    },
];

pub const INSURANCE: &str = "insurance";
pub const SECURITY: &str = "security";
pub const ANALYST_NETWORK: &str = "analyst_network";

pub const UPGRADES: &[UpgradeDef] = &[
    UpgradeDef {
        id: "cargo_bay_1",
        name: "Cargo Bay I",
        cost: 5_000,
        effect: UpgradeEffect::Capacity(25),
        requires: None,
        gated: false,
    },
    UpgradeDef {
        id: "cargo_bay_2",
        name: "Cargo Bay II",
        cost: 15_000,
        effect: UpgradeEffect::Capacity(50),
        requires: Some("cargo_bay_1"),
        gated: true,
    },
    UpgradeDef {
        id: SECURITY,
        name: "Security Suite",
        cost: 6_000,
        effect: UpgradeEffect::Security,
        requires: None,
        gated: true,
    },
    UpgradeDef {
        id: INSURANCE,
        name: "Cargo Insurance",
        cost: 8_000,
        effect: UpgradeEffect::Insurance,
        requires: None,
        gated: true,
    },
    UpgradeDef {
        id: ANALYST_NETWORK,
        name: "Analyst Network",
        cost: 10_000,
        effect: UpgradeEffect::AnalystNetwork,
        requires: Some(SECURITY),
        gated: true,
    },
];

pub const MILESTONES: &[MilestoneDef] = &[
    MilestoneDef {
        id: "first_trade",
        name: "First Trade",
        condition: MilestoneCondition::Trades(1),
        reward: MilestoneReward::Tutorial,
    },
    MilestoneDef {
        id: "frequent_trader",
        name: "Frequent Trader",
        condition: MilestoneCondition::Trades(10),
        reward: MilestoneReward::UnlockUpgrade(SECURITY),
    },
    MilestoneDef {
        id: "world_traveler",
        name: "World Traveler",
        condition: MilestoneCondition::MarketsVisited(4),
        reward: MilestoneReward::UnlockUpgrade(INSURANCE),
    },
    MilestoneDef {
        id: "bulk_dealer",
        name: "Bulk Dealer",
        condition: MilestoneCondition::GoodsTraded(100),
        reward: MilestoneReward::UnlockUpgrade("cargo_bay_2"),
    },
    MilestoneDef {
        id: "net_worth_25k",
        name: "Seed Round",
        condition: MilestoneCondition::NetWorth(25_000),
        reward: MilestoneReward::Reputation(5),
    },
    MilestoneDef {
        id: "net_worth_100k",
        name: "Series A",
        condition: MilestoneCondition::NetWorth(100_000),
        reward: MilestoneReward::UnlockUpgrade(ANALYST_NETWORK),
    },
    MilestoneDef {
        id: "net_worth_1m",
        name: "Unicorn",
        condition: MilestoneCondition::NetWorth(1_000_000),
        reward: MilestoneReward::Achievement,
    },
    MilestoneDef {
        id: "veteran",
        name: "Veteran",
        condition: MilestoneCondition::Turns(50),
        reward: MilestoneReward::Reputation(5),
    },
    MilestoneDef {
        id: "debt_free",
        name: "Debt Free",
        condition: MilestoneCondition::PaidOffDebt,
        reward: MilestoneReward::Reputation(10),
    },
];

pub const EVENT_TEMPLATES: &[EventTemplate] = &[
    // market_shift
    EventTemplate {
        category: EventCategory::MarketShift,
        text: "A warehouse glut sends {good} prices down {percent}% everywhere.",
        effect: EffectKind::Drop,
    },
    EventTemplate {
        category: EventCategory::MarketShift,
        text: "A viral benchmark drives {good} prices up {percent}%.",
        effect: EffectKind::Rise,
    },
    EventTemplate {
        category: EventCategory::MarketShift,
        text: "A frontier model launch lifts every GPU price {percent}%.",
        effect: EffectKind::RiseAll,
    },
    EventTemplate {
        category: EventCategory::MarketShift,
        text: "Training runs are booked solid: compute prices rise {percent}%.",
        effect: EffectKind::ComputeRise,
    },
    EventTemplate {
        category: EventCategory::MarketShift,
        text: "A datacenter fire causes a compute spike of {percent}%.",
        effect: EffectKind::ComputeSpike,
    },
    EventTemplate {
        category: EventCategory::MarketShift,
        text: "New capacity comes online; compute prices fall {percent}%.",
        effect: EffectKind::ComputeDrop,
    },
    EventTemplate {
        category: EventCategory::MarketShift,
        text: "A poaching war pushes talent contracts up {percent}%.",
        effect: EffectKind::TalentRise,
    },
    EventTemplate {
        category: EventCategory::MarketShift,
        text: "An open dataset release undercuts dataset prices by {percent}%.",
        effect: EffectKind::DatasetsDrop,
    },
    // regulation
    EventTemplate {
        category: EventCategory::Regulation,
        text: "{market} adds {good} to its export control list.",
        effect: EffectKind::Restrict,
    },
    EventTemplate {
        category: EventCategory::Regulation,
        text: "{market} lifts its restrictions on {good}.",
        effect: EffectKind::Unrestrict,
    },
    // customs
    EventTemplate {
        category: EventCategory::Customs,
        text: "Customs in {market} impound {quantity} {good} during inspection.",
        effect: EffectKind::Seize,
    },
    EventTemplate {
        category: EventCategory::Customs,
        text: "Customs in {market} fine you ${amount} for paperwork errors.",
        effect: EffectKind::Fine,
    },
    // hack
    EventTemplate {
        category: EventCategory::Hack,
        text: "Hackers drain ${amount} from your trading account.",
        effect: EffectKind::MoneyLoss,
    },
    EventTemplate {
        category: EventCategory::Hack,
        text: "A compromised courier loses {quantity} {good}.",
        effect: EffectKind::Seize,
    },
    // audit
    EventTemplate {
        category: EventCategory::Audit,
        text: "Tax auditors assess a ${amount} penalty.",
        effect: EffectKind::Fine,
    },
    // opportunity
    EventTemplate {
        category: EventCategory::Opportunity,
        text: "A liquidator offers {good} at {percent}% off your next purchase.",
        effect: EffectKind::DiscountBuy,
    },
    EventTemplate {
        category: EventCategory::Opportunity,
        text: "A desperate lab will pay a {percent}% premium for {good}.",
        effect: EffectKind::PremiumSell,
    },
    // windfall
    EventTemplate {
        category: EventCategory::Windfall,
        text: "An old consulting invoice finally pays out ${amount}.",
        effect: EffectKind::MoneyGain,
    },
    EventTemplate {
        category: EventCategory::Windfall,
        text: "You win a ${amount} research grant.",
        effect: EffectKind::MoneyGain,
    },
];

pub const CHOICE_TEMPLATES: &[ChoiceTemplate] = &[
    ChoiceTemplate {
        category: ChoiceCategory::ShadyDeal,
        title: "Shady Deal",
        text: "A stranger offers {quantity} {good} for ${amount}, {percent}% below market. No receipts.",
        options: &[("accept", "Take the deal"), ("decline", "Walk away")],
    },
    ChoiceTemplate {
        category: ChoiceCategory::Gambling,
        title: "Back-Room Tournament",
        text: "A high-stakes game is running. Bet ${amount} double-or-nothing, or enter the tournament for ${cost}.",
        options: &[
            ("gamble", "Bet ${amount}"),
            ("enter", "Enter the tournament"),
            ("decline", "Keep your money"),
        ],
    },
    ChoiceTemplate {
        category: ChoiceCategory::Intel,
        title: "Insider Intel",
        text: "A contact claims to know where {good} prices are heading. The tip costs ${amount}.",
        options: &[("buy", "Pay for the tip"), ("decline", "Ignore it")],
    },
    ChoiceTemplate {
        category: ChoiceCategory::Smuggler,
        title: "Smuggler",
        text: "A smuggler offers to move your restricted cargo past {market} customs for ${amount}.",
        options: &[("use_smuggler", "Hire the smuggler"), ("decline", "Take your chances")],
    },
];

/// Oracle prediction texts; `{good}` and `{direction}` are filled in.
pub const ORACLE_PREDICTIONS: &[&str] = &[
    "The oracle sees {good} prices moving {direction}.",
    "A whisper from the servers: {good} will go {direction}.",
    "Charts align. {good} trends {direction} next turn.",
];

pub fn good_def(id: &str) -> Option<&'static GoodDef> {
    GOODS.iter().find(|g| g.id == id)
}

pub fn market_def(id: &str) -> Option<&'static MarketDef> {
    MARKETS.iter().find(|m| m.id == id)
}

pub fn upgrade_def(id: &str) -> Option<&'static UpgradeDef> {
    UPGRADES.iter().find(|u| u.id == id)
}

pub fn milestone_def(id: &str) -> Option<&'static MilestoneDef> {
    MILESTONES.iter().find(|m| m.id == id)
}

/// Templates belonging to one event category, in table order.
pub fn event_templates(category: EventCategory) -> Vec<&'static EventTemplate> {
    EVENT_TEMPLATES
        .iter()
        .filter(|t| t.category == category)
        .collect()
}

pub fn choice_template(category: ChoiceCategory) -> Option<&'static ChoiceTemplate> {
    CHOICE_TEMPLATES.iter().find(|t| t.category == category)
}
