use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[serde(alias = "guided")]
    Preset,
    Custom,
    Rebalance,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Us,
    International,
    Bonds,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionFrequency {
    Daily,
    Weekly,
    #[default]
    Monthly,
    Quarterly,
    Annually,
}

impl ContributionFrequency {
    /// Compounding periods per year; contributions land once per period.
    pub fn periods_per_year(self) -> u32 {
        match self {
            ContributionFrequency::Daily => 252,
            ContributionFrequency::Weekly => 52,
            ContributionFrequency::Monthly => 12,
            ContributionFrequency::Quarterly => 4,
            ContributionFrequency::Annually => 1,
        }
    }

    /// Lenient parse: anything unrecognised compounds monthly.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" => ContributionFrequency::Daily,
            "weekly" => ContributionFrequency::Weekly,
            "quarterly" => ContributionFrequency::Quarterly,
            "annually" | "yearly" => ContributionFrequency::Annually,
            _ => ContributionFrequency::Monthly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoldingType {
    Etf,
    Stock,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundReference {
    pub ticker: String,
    pub name: String,
    pub expense_ratio: f64,
    pub asset_class: String,
    pub provider: String,
    pub dividend_yield: f64,
    pub tax_efficiency: String,
    pub turnover: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateFund {
    pub ticker: &'static str,
    pub bucket: Bucket,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl TemplateFund {
    pub fn effective_weight(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioTemplate {
    pub name: &'static str,
    pub funds: &'static [TemplateFund],
    pub description: &'static str,
    pub complexity: &'static str,
    pub has_bonds: bool,
    pub persona: &'static str,
    pub best_for: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFund {
    pub ticker: String,
    #[serde(alias = "allocation")]
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub ticker: String,
    pub shares: f64,
    pub price: f64,
    #[serde(rename = "type")]
    pub kind: HoldingType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<String>,
}

impl Holding {
    pub fn amount(&self) -> f64 {
        self.shares * self.price
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundAllocation {
    pub ticker: String,
    pub name: String,
    pub provider: String,
    pub asset_class: String,
    pub expense_ratio: f64,
    pub dividend_yield: f64,
    pub tax_efficiency: String,
    pub turnover: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holding_type: Option<HoldingType>,
    pub amount: f64,
    pub cost: f64,
    pub percentage: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenarios {
    pub conservative: f64,
    pub expected: f64,
    pub optimistic: f64,
    pub crisis: f64,
}

/// Recurring contribution added at the start of every compounding period.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContributionSchedule {
    pub amount: f64,
    pub frequency: ContributionFrequency,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProjectionPlan {
    pub horizon_years: u32,
    pub contribution: ContributionSchedule,
}

impl ProjectionPlan {
    pub fn periods_per_year(&self) -> u32 {
        self.contribution.frequency.periods_per_year()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthTrajectory {
    pub years: Vec<u32>,
    pub values: Vec<f64>,
    pub cost_impact: Vec<f64>,
    pub total_contributions: Vec<f64>,
    pub dividend_income: Vec<f64>,
    pub weighted_dividend_yield: f64,
}

impl GrowthTrajectory {
    pub fn final_value(&self) -> f64 {
        self.values.last().copied().unwrap_or(0.0)
    }

    pub fn final_contributions(&self) -> f64 {
        self.total_contributions.last().copied().unwrap_or(0.0)
    }

    pub fn final_cost_impact(&self) -> f64 {
        self.cost_impact.last().copied().unwrap_or(0.0)
    }

    pub fn total_dividends(&self) -> f64 {
        self.dividend_income.iter().sum()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrisisResult {
    pub final_value: f64,
    pub total_invested: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatIfResult {
    pub final_value: f64,
    pub total_invested: f64,
    pub immediate_impact: f64,
    pub impact_percent: f64,
}

/// Signed one-off percentage moves per bucket, e.g. `-60.0` for a 60% drop.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShockTriple {
    pub us: f64,
    pub intl: f64,
    pub bonds: f64,
}

/// Bucket weights in percent of the investment.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSplit {
    pub us_pct: f64,
    pub intl_pct: f64,
    pub bond_pct: f64,
}

impl BucketSplit {
    /// Derives the international share from the stock remainder, as the sliders do.
    pub fn from_us_and_bonds(us_pct: f64, bond_pct: f64) -> Self {
        let stock_pct = 100.0 - bond_pct;
        Self {
            us_pct,
            intl_pct: stock_pct - us_pct,
            bond_pct,
        }
    }

    pub fn stock_pct(&self) -> f64 {
        100.0 - self.bond_pct
    }

    pub fn for_bucket(&self, bucket: Bucket) -> f64 {
        match bucket {
            Bucket::Us => self.us_pct,
            Bucket::International => self.intl_pct,
            Bucket::Bonds => self.bond_pct,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowestFee {
    pub fee: f64,
    pub template_index: usize,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocationState {
    Complete,
    Under,
    Over,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomAllocationStatus {
    pub total_percent: f64,
    pub remaining_percent: f64,
    pub state: AllocationState,
}

/// Everything one analysis pass needs, already validated.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub mode: Mode,
    pub investment_amount: f64,
    pub age: f64,
    pub us_pct: f64,
    pub bond_pct: f64,
    pub plan: ProjectionPlan,
    pub template_index: usize,
    pub custom_funds: Vec<CustomFund>,
    pub holdings: Vec<Holding>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioTrajectories {
    pub conservative: GrowthTrajectory,
    pub expected: GrowthTrajectory,
    pub optimistic: GrowthTrajectory,
    pub crisis: GrowthTrajectory,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthSummary {
    pub final_value: f64,
    pub total_contributed: f64,
    pub total_return: f64,
    pub total_fees_lost: f64,
    pub total_dividends: f64,
    pub capital_gains: f64,
    pub total_annual_cost: f64,
    pub advisor_fees_lost: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedCrisis {
    pub name: &'static str,
    pub result: CrisisResult,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedWhatIf {
    pub name: &'static str,
    pub shock: ShockTriple,
    pub result: WhatIfResult,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashComparison {
    pub cash_final_value: f64,
    pub inflation_adjusted_final_value: f64,
    pub purchasing_power_lost: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeComparison {
    pub lowest_fee: LowestFee,
    pub is_lowest_fee: bool,
    pub current_fee_pct: f64,
    pub fee_difference_pct: f64,
    pub vs_target_date_pct: f64,
    pub vs_actively_managed_pct: f64,
    pub vs_advisor_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub mode: Mode,
    pub total_portfolio_value: f64,
    pub split: BucketSplit,
    pub recommended_bond_pct: f64,
    pub allocations: Vec<FundAllocation>,
    pub weighted_expense_ratio: f64,
    pub scenarios: Scenarios,
    pub growth: ScenarioTrajectories,
    pub summary: GrowthSummary,
    pub historical_crises: Vec<NamedCrisis>,
    pub what_ifs: Vec<NamedWhatIf>,
    pub cash: CashComparison,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_comparison: Option<FeeComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_allocation: Option<CustomAllocationStatus>,
}
