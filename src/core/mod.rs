mod allocation;
mod engine;
pub mod reference;
mod types;

pub use allocation::{
    AllocationRequest, custom_allocation_status, lowest_fee_template, normalize_custom_allocations,
    recommended_bond_allocation, resolve_allocations, total_annual_cost, total_holdings_value,
    weighted_dividend_yield, weighted_expense_ratio,
};
pub use engine::{
    PricingContext, advisor_cost, apply_shock, derive_scenarios, project_growth,
    replay_historical, run_analysis,
};
pub use reference::{fund_catalog, lookup_fund, preset_templates};
pub use types::{
    AllocationState, AnalysisResult, Bucket, BucketSplit, CashComparison, ContributionFrequency,
    ContributionSchedule, CrisisResult, CustomAllocationStatus, CustomFund, FeeComparison,
    FundAllocation, FundReference, GrowthSummary, GrowthTrajectory, Holding, HoldingType, Inputs,
    LowestFee, Mode, NamedCrisis, NamedWhatIf, PortfolioTemplate, ProjectionPlan,
    ScenarioTrajectories, Scenarios, ShockTriple, TemplateFund, WhatIfResult,
};
