use super::reference::{lookup_fund, preset_templates};
use super::types::{
    AllocationState, Bucket, BucketSplit, CustomAllocationStatus, CustomFund, FundAllocation,
    FundReference, Holding, HoldingType, LowestFee, PortfolioTemplate,
};

/// Raw inputs for one resolution pass, one variant per mode.
#[derive(Debug, Clone, Copy)]
pub enum AllocationRequest<'a> {
    Preset {
        template: &'a PortfolioTemplate,
        investment: f64,
        split: BucketSplit,
    },
    Custom {
        funds: &'a [CustomFund],
        investment: f64,
    },
    Rebalance {
        holdings: &'a [Holding],
    },
}

pub fn resolve_allocations(request: &AllocationRequest<'_>) -> Vec<FundAllocation> {
    match *request {
        AllocationRequest::Preset {
            template,
            investment,
            split,
        } => resolve_preset(template, investment, split),
        AllocationRequest::Custom { funds, investment } => resolve_custom(funds, investment),
        AllocationRequest::Rebalance { holdings } => resolve_rebalance(holdings),
    }
}

fn allocation_from_reference(
    fund: FundReference,
    ticker: &str,
    amount: f64,
    percentage: f64,
    holding_type: Option<HoldingType>,
) -> FundAllocation {
    let cost = amount * (fund.expense_ratio / 100.0);
    FundAllocation {
        ticker: ticker.to_string(),
        name: fund.name,
        provider: fund.provider,
        asset_class: fund.asset_class,
        expense_ratio: fund.expense_ratio,
        dividend_yield: fund.dividend_yield,
        tax_efficiency: fund.tax_efficiency,
        turnover: fund.turnover,
        holding_type,
        amount,
        cost,
        percentage,
    }
}

fn resolve_preset(
    template: &PortfolioTemplate,
    investment: f64,
    split: BucketSplit,
) -> Vec<FundAllocation> {
    template
        .funds
        .iter()
        .map(|slot| {
            let base_amount = (investment * split.for_bucket(slot.bucket)) / 100.0;
            let amount = base_amount * slot.effective_weight();
            let percentage = if investment > 0.0 {
                (amount / investment) * 100.0
            } else {
                0.0
            };
            allocation_from_reference(
                lookup_fund(slot.ticker),
                slot.ticker,
                amount,
                percentage,
                None,
            )
        })
        .collect()
}

fn resolve_custom(funds: &[CustomFund], investment: f64) -> Vec<FundAllocation> {
    funds
        .iter()
        .map(|fund| {
            let amount = (investment * fund.percent) / 100.0;
            allocation_from_reference(
                lookup_fund(&fund.ticker),
                &fund.ticker,
                amount,
                fund.percent,
                None,
            )
        })
        .collect()
}

fn resolve_rebalance(holdings: &[Holding]) -> Vec<FundAllocation> {
    let total_value = total_holdings_value(holdings);
    holdings
        .iter()
        .filter(|holding| holding.amount() > 0.0)
        .map(|holding| {
            let amount = holding.amount();
            let percentage = (amount / total_value) * 100.0;
            match holding.kind {
                HoldingType::Etf => allocation_from_reference(
                    lookup_fund(&holding.ticker),
                    &holding.ticker,
                    amount,
                    percentage,
                    Some(HoldingType::Etf),
                ),
                HoldingType::Stock => FundAllocation {
                    ticker: holding.ticker.clone(),
                    name: format!("{} (Individual Stock)", holding.ticker),
                    provider: "Stock".to_string(),
                    asset_class: "Individual Stock".to_string(),
                    expense_ratio: 0.0,
                    dividend_yield: 0.0,
                    tax_efficiency: "Variable".to_string(),
                    turnover: 0.0,
                    holding_type: Some(HoldingType::Stock),
                    amount,
                    cost: 0.0,
                    percentage,
                },
            }
        })
        .collect()
}

pub fn total_holdings_value(holdings: &[Holding]) -> f64 {
    holdings.iter().map(Holding::amount).sum()
}

/// Dollar-weighted expense ratio; equal-weighted when there is no positive total.
pub fn weighted_expense_ratio(allocations: &[FundAllocation], total: f64) -> f64 {
    if total <= 0.0 {
        return simple_mean(allocations.iter().map(|fund| fund.expense_ratio));
    }
    allocations
        .iter()
        .map(|fund| fund.amount * fund.expense_ratio)
        .sum::<f64>()
        / total
}

/// Dollar-weighted dividend yield; equal-weighted when there is no positive total.
pub fn weighted_dividend_yield(allocations: &[FundAllocation], total: f64) -> f64 {
    if total > 0.0 {
        allocations
            .iter()
            .map(|fund| (fund.amount / total) * fund.dividend_yield)
            .sum()
    } else {
        simple_mean(allocations.iter().map(|fund| fund.dividend_yield))
    }
}

fn simple_mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let count = values.len();
    if count == 0 {
        return 0.0;
    }
    values.sum::<f64>() / count as f64
}

pub fn total_annual_cost(allocations: &[FundAllocation]) -> f64 {
    allocations.iter().map(|fund| fund.cost).sum()
}

/// Finds the preset with the cheapest blend for the given US/international
/// weights. Any non-US slot is priced off the international amount.
pub fn lowest_fee_template(investment: f64, us_pct: f64, intl_pct: f64) -> LowestFee {
    lowest_fee_among(preset_templates(), investment, us_pct, intl_pct)
}

fn lowest_fee_among(
    templates: &[PortfolioTemplate],
    investment: f64,
    us_pct: f64,
    intl_pct: f64,
) -> LowestFee {
    if investment <= 0.0 {
        return LowestFee {
            fee: 0.0,
            template_index: 0,
        };
    }

    let us_amount = (investment * us_pct) / 100.0;
    let intl_amount = (investment * intl_pct) / 100.0;

    let mut lowest = LowestFee {
        fee: f64::INFINITY,
        template_index: 0,
    };
    for (index, template) in templates.iter().enumerate() {
        let fee = template
            .funds
            .iter()
            .map(|slot| {
                let base_amount = if slot.bucket == Bucket::Us {
                    us_amount
                } else {
                    intl_amount
                };
                base_amount * slot.effective_weight() * lookup_fund(slot.ticker).expense_ratio
            })
            .sum::<f64>()
            / investment;

        if fee < lowest.fee {
            lowest = LowestFee {
                fee,
                template_index: index,
            };
        }
    }
    lowest
}

pub fn custom_allocation_status(funds: &[CustomFund]) -> CustomAllocationStatus {
    let total_percent: f64 = funds.iter().map(|fund| fund.percent).sum();
    let state = if (total_percent - 100.0).abs() < 1e-9 {
        AllocationState::Complete
    } else if total_percent > 100.0 {
        AllocationState::Over
    } else {
        AllocationState::Under
    };
    CustomAllocationStatus {
        total_percent,
        remaining_percent: 100.0 - total_percent,
        state,
    }
}

/// Evenly re-spreads 100% in whole points; leftover points go to the first funds.
pub fn normalize_custom_allocations(funds: &[CustomFund]) -> Vec<CustomFund> {
    if funds.is_empty() {
        return Vec::new();
    }
    let count = funds.len() as u32;
    let base = 100 / count;
    let remainder = (100 - base * count) as usize;
    funds
        .iter()
        .enumerate()
        .map(|(index, fund)| CustomFund {
            ticker: fund.ticker.clone(),
            percent: f64::from(base + u32::from(index < remainder)),
        })
        .collect()
}

/// Age-based bond share: rule of 120 under 50, rule of 110 from 50, capped at 60%.
pub fn recommended_bond_allocation(age: f64) -> f64 {
    if !age.is_finite() || !(18.0..=100.0).contains(&age) {
        return 20.0;
    }
    let raw = if age < 50.0 { age - 20.0 } else { age - 10.0 };
    raw.clamp(0.0, 60.0)
}
