use super::allocation::{
    AllocationRequest, custom_allocation_status, lowest_fee_template, recommended_bond_allocation,
    resolve_allocations, total_annual_cost, total_holdings_value, weighted_dividend_yield,
    weighted_expense_ratio,
};
use super::reference::{
    ACTIVELY_MANAGED_FEE, ADVISOR_FEE_RATE, BOND_RETURN, CASH_RETURN, CONSERVATIVE_FLOOR,
    CRISIS_RETURN, HISTORICAL_CRISES, INFLATION_DRAG_RETURN, OPTIMISTIC_CAP, SCENARIO_SPREAD,
    STOCK_RETURN, TARGET_DATE_FUND_FEE, WHAT_IF_SHOCKS, preset_templates,
};
use super::types::{
    AnalysisResult, BucketSplit, CashComparison, CrisisResult, FeeComparison, FundAllocation,
    GrowthSummary, GrowthTrajectory, Inputs, Mode, NamedCrisis, NamedWhatIf, ProjectionPlan,
    ScenarioTrajectories, Scenarios, ShockTriple, WhatIfResult,
};

/// Shared derived values every scenario family prices against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingContext {
    pub scenarios: Scenarios,
    pub weighted_expense_ratio: f64,
    pub weighted_dividend_yield: f64,
    pub total_value: f64,
    pub split: BucketSplit,
}

impl PricingContext {
    pub fn new(allocations: &[FundAllocation], total_value: f64, split: BucketSplit) -> Self {
        Self {
            scenarios: derive_scenarios(split.stock_pct(), split.bond_pct),
            weighted_expense_ratio: weighted_expense_ratio(allocations, total_value),
            weighted_dividend_yield: weighted_dividend_yield(allocations, total_value),
            total_value,
            split,
        }
    }

    /// Growth trajectory from the total portfolio value at `annual_return_pct`.
    pub fn project(&self, annual_return_pct: f64, plan: &ProjectionPlan) -> GrowthTrajectory {
        project_with_yield(
            annual_return_pct,
            self.total_value,
            plan,
            self.weighted_expense_ratio,
            self.weighted_dividend_yield,
        )
    }

    pub fn project_scenarios(&self, plan: &ProjectionPlan) -> ScenarioTrajectories {
        ScenarioTrajectories {
            conservative: self.project(self.scenarios.conservative, plan),
            expected: self.project(self.scenarios.expected, plan),
            optimistic: self.project(self.scenarios.optimistic, plan),
            crisis: self.project(self.scenarios.crisis, plan),
        }
    }

    pub fn replay(
        &self,
        annual_returns: &[f64],
        investment: f64,
        plan: &ProjectionPlan,
    ) -> CrisisResult {
        replay_historical(
            annual_returns,
            investment,
            plan,
            self.weighted_expense_ratio,
            self.scenarios.expected,
        )
    }

    pub fn shock(
        &self,
        shock: ShockTriple,
        investment: f64,
        plan: &ProjectionPlan,
    ) -> WhatIfResult {
        apply_shock(
            shock,
            investment,
            self.split,
            plan,
            self.weighted_expense_ratio,
            self.scenarios.expected,
        )
    }

    pub fn advisor_cost(
        &self,
        mode: Mode,
        investment: f64,
        no_advisor_final_value: f64,
        plan: &ProjectionPlan,
    ) -> f64 {
        advisor_cost(
            mode,
            investment,
            self.total_value,
            no_advisor_final_value,
            plan,
            self.weighted_expense_ratio,
            self.scenarios.expected,
        )
    }

    /// Holding cash at 0% against the same cash eroded by inflation.
    pub fn cash_comparison(&self, plan: &ProjectionPlan) -> CashComparison {
        let cash = self.project(CASH_RETURN, plan).final_value();
        let inflation_adjusted = self.project(INFLATION_DRAG_RETURN, plan).final_value();
        CashComparison {
            cash_final_value: cash,
            inflation_adjusted_final_value: inflation_adjusted,
            purchasing_power_lost: cash - inflation_adjusted,
        }
    }
}

pub fn derive_scenarios(stock_pct: f64, bond_pct: f64) -> Scenarios {
    let base = ((stock_pct / 100.0) * STOCK_RETURN) + ((bond_pct / 100.0) * BOND_RETURN);
    Scenarios {
        conservative: CONSERVATIVE_FLOOR.max(base - SCENARIO_SPREAD),
        expected: base,
        optimistic: OPTIMISTIC_CAP.min(base + SCENARIO_SPREAD),
        crisis: CRISIS_RETURN,
    }
}

/// Year-by-year value, fee drag, contributions and dividends.
///
/// Each year is replayed from the starting value through `year * periods`
/// periods; nothing carries over from the previous year's figures except the
/// dividend average.
pub fn project_growth(
    annual_return_pct: f64,
    starting_value: f64,
    plan: &ProjectionPlan,
    expense_ratio_pct: f64,
    allocations: &[FundAllocation],
) -> GrowthTrajectory {
    let dividend_yield = weighted_dividend_yield(allocations, starting_value);
    project_with_yield(
        annual_return_pct,
        starting_value,
        plan,
        expense_ratio_pct,
        dividend_yield,
    )
}

fn project_with_yield(
    annual_return_pct: f64,
    starting_value: f64,
    plan: &ProjectionPlan,
    expense_ratio_pct: f64,
    dividend_yield: f64,
) -> GrowthTrajectory {
    let year_count = plan.horizon_years as usize + 1;
    let mut years = Vec::with_capacity(year_count);
    let mut values: Vec<f64> = Vec::with_capacity(year_count);
    let mut cost_impact = Vec::with_capacity(year_count);
    let mut total_contributions = Vec::with_capacity(year_count);
    let mut dividend_income = Vec::with_capacity(year_count);

    let periods_per_year = plan.periods_per_year();
    let net_growth = period_growth(annual_return_pct - expense_ratio_pct, periods_per_year);
    let gross_growth = period_growth(annual_return_pct, periods_per_year);
    let contribution = plan.contribution.amount;

    for year in 0..=plan.horizon_years {
        years.push(year);

        if year == 0 {
            values.push(starting_value);
            cost_impact.push(0.0);
            total_contributions.push(starting_value);
            dividend_income.push(starting_value * (dividend_yield / 100.0));
            continue;
        }

        let mut fee_bearing = starting_value;
        let mut fee_free = starting_value;
        let mut invested = starting_value;
        for _ in 0..year * periods_per_year {
            fee_bearing += contribution;
            fee_free += contribution;
            invested += contribution;

            fee_bearing *= net_growth;
            fee_free *= gross_growth;
        }

        let previous = values[year as usize - 1];
        let average_value = (previous + fee_bearing) / 2.0;

        values.push(fee_bearing);
        cost_impact.push(fee_free - fee_bearing);
        total_contributions.push(invested);
        dividend_income.push(average_value * (dividend_yield / 100.0));
    }

    GrowthTrajectory {
        years,
        values,
        cost_impact,
        total_contributions,
        dividend_income,
        weighted_dividend_yield: dividend_yield,
    }
}

#[derive(Debug, Clone, Copy)]
struct RunningBalance {
    value: f64,
    invested: f64,
}

impl RunningBalance {
    fn compound_year(&mut self, growth_factor: f64, periods: u32, contribution: f64) {
        for _ in 0..periods {
            self.value += contribution;
            self.invested += contribution;
            self.value *= growth_factor;
        }
    }
}

fn period_growth(net_return_pct: f64, periods_per_year: u32) -> f64 {
    1.0 + (net_return_pct / 100.0) / periods_per_year as f64
}

/// Replays a historical return path, then continues at `fallback_return_pct`
/// for any years the path does not cover. State carries across years.
pub fn replay_historical(
    annual_returns: &[f64],
    starting_value: f64,
    plan: &ProjectionPlan,
    expense_ratio_pct: f64,
    fallback_return_pct: f64,
) -> CrisisResult {
    let periods_per_year = plan.periods_per_year();
    let contribution = plan.contribution.amount;
    let horizon = plan.horizon_years as usize;
    let mut balance = RunningBalance {
        value: starting_value,
        invested: starting_value,
    };

    for annual_return in annual_returns.iter().take(horizon) {
        let growth = period_growth(annual_return - expense_ratio_pct, periods_per_year);
        balance.compound_year(growth, periods_per_year, contribution);
    }

    let fallback_growth = period_growth(fallback_return_pct - expense_ratio_pct, periods_per_year);
    for _ in annual_returns.len()..horizon {
        balance.compound_year(fallback_growth, periods_per_year, contribution);
    }

    CrisisResult {
        final_value: balance.value,
        total_invested: balance.invested,
    }
}

/// Applies an instantaneous per-bucket shock and projects forward at the
/// expected return. A shock larger than the portfolio is not floored.
pub fn apply_shock(
    shock: ShockTriple,
    investment: f64,
    split: BucketSplit,
    plan: &ProjectionPlan,
    expense_ratio_pct: f64,
    expected_return_pct: f64,
) -> WhatIfResult {
    let us_loss = (split.us_pct / 100.0) * (shock.us / 100.0) * investment;
    let intl_loss = (split.intl_pct / 100.0) * (shock.intl / 100.0) * investment;
    let bond_loss = (split.bond_pct / 100.0) * (shock.bonds / 100.0) * investment;
    let immediate_impact = us_loss + intl_loss + bond_loss;

    let periods_per_year = plan.periods_per_year();
    let growth = period_growth(expected_return_pct - expense_ratio_pct, periods_per_year);
    let mut balance = RunningBalance {
        value: investment + immediate_impact,
        invested: investment,
    };
    for _ in 0..plan.horizon_years {
        balance.compound_year(growth, periods_per_year, plan.contribution.amount);
    }

    let impact_percent = if investment == 0.0 {
        0.0
    } else {
        (immediate_impact / investment) * 100.0
    };

    WhatIfResult {
        final_value: balance.value,
        total_invested: balance.invested,
        immediate_impact,
        impact_percent,
    }
}

/// Dollars lost to a 1% annual advisor fee taken at each year end, measured
/// against `no_advisor_final_value`. Never negative.
pub fn advisor_cost(
    mode: Mode,
    investment: f64,
    total_value: f64,
    no_advisor_final_value: f64,
    plan: &ProjectionPlan,
    expense_ratio_pct: f64,
    expected_return_pct: f64,
) -> f64 {
    let mut value = if mode == Mode::Rebalance {
        total_value
    } else {
        investment
    };
    if value <= 0.0 {
        return 0.0;
    }

    let gross_return = expected_return_pct / 100.0;
    let fund_expense = expense_ratio_pct / 100.0;
    let periods_per_year = plan.periods_per_year();
    let growth = 1.0 + (gross_return - fund_expense) / periods_per_year as f64;
    let advisor_keep = 1.0 - (ADVISOR_FEE_RATE / 100.0);

    for _ in 0..plan.horizon_years {
        for _ in 0..periods_per_year {
            value += plan.contribution.amount;
            value *= growth;
        }
        value *= advisor_keep;
    }

    (no_advisor_final_value - value).max(0.0)
}

pub fn run_analysis(inputs: &Inputs) -> AnalysisResult {
    let templates = preset_templates();
    let template = templates.get(inputs.template_index).unwrap_or(&templates[0]);
    let split = BucketSplit::from_us_and_bonds(inputs.us_pct, inputs.bond_pct);

    let total_value = match inputs.mode {
        Mode::Rebalance => total_holdings_value(&inputs.holdings),
        Mode::Preset | Mode::Custom => inputs.investment_amount,
    };

    let request = match inputs.mode {
        Mode::Preset => AllocationRequest::Preset {
            template,
            investment: inputs.investment_amount,
            split,
        },
        Mode::Custom => AllocationRequest::Custom {
            funds: &inputs.custom_funds,
            investment: inputs.investment_amount,
        },
        Mode::Rebalance => AllocationRequest::Rebalance {
            holdings: &inputs.holdings,
        },
    };
    let allocations = resolve_allocations(&request);
    let context = PricingContext::new(&allocations, total_value, split);
    let plan = &inputs.plan;

    let growth = context.project_scenarios(plan);
    let expected = &growth.expected;
    let final_value = expected.final_value();
    let total_contributed = expected.final_contributions();
    let total_return = final_value - total_contributed;
    let total_dividends = expected.total_dividends();
    let summary = GrowthSummary {
        final_value,
        total_contributed,
        total_return,
        total_fees_lost: expected.final_cost_impact(),
        total_dividends,
        capital_gains: total_return - total_dividends,
        total_annual_cost: total_annual_cost(&allocations),
        advisor_fees_lost: context.advisor_cost(
            inputs.mode,
            inputs.investment_amount,
            final_value,
            plan,
        ),
    };

    let historical_crises = HISTORICAL_CRISES
        .iter()
        .map(|&(name, returns)| NamedCrisis {
            name,
            result: context.replay(returns, inputs.investment_amount, plan),
        })
        .collect();

    let what_ifs = WHAT_IF_SHOCKS
        .iter()
        .map(|&(name, shock)| NamedWhatIf {
            name,
            shock,
            result: context.shock(shock, inputs.investment_amount, plan),
        })
        .collect();

    let fee_comparison = match inputs.mode {
        Mode::Preset | Mode::Custom => Some(compare_fees(inputs, &context)),
        Mode::Rebalance => None,
    };
    let custom_allocation = match inputs.mode {
        Mode::Custom => Some(custom_allocation_status(&inputs.custom_funds)),
        Mode::Preset | Mode::Rebalance => None,
    };

    AnalysisResult {
        mode: inputs.mode,
        total_portfolio_value: total_value,
        split,
        recommended_bond_pct: recommended_bond_allocation(inputs.age),
        weighted_expense_ratio: context.weighted_expense_ratio,
        scenarios: context.scenarios,
        cash: context.cash_comparison(plan),
        allocations,
        growth,
        summary,
        historical_crises,
        what_ifs,
        fee_comparison,
        custom_allocation,
    }
}

/// Custom portfolios are also measured against the cheapest preset instead of reporting a zero fee.
fn compare_fees(inputs: &Inputs, context: &PricingContext) -> FeeComparison {
    let lowest_fee = lowest_fee_template(
        inputs.investment_amount,
        context.split.us_pct,
        context.split.intl_pct,
    );
    let current = context.weighted_expense_ratio;
    FeeComparison {
        lowest_fee,
        is_lowest_fee: inputs.mode == Mode::Preset
            && inputs.template_index == lowest_fee.template_index,
        current_fee_pct: current,
        fee_difference_pct: current - lowest_fee.fee,
        vs_target_date_pct: current - TARGET_DATE_FUND_FEE,
        vs_actively_managed_pct: current - ACTIVELY_MANAGED_FEE,
        vs_advisor_pct: current - ADVISOR_FEE_RATE,
    }
}
