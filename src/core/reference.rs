//! Static fund metadata, preset templates and the fixed return assumptions
//! every projection shares.

use super::types::{Bucket, FundReference, PortfolioTemplate, ShockTriple, TemplateFund};

pub const STOCK_RETURN: f64 = 10.0;
pub const BOND_RETURN: f64 = 4.0;
pub const CRISIS_RETURN: f64 = 2.5;
pub const CONSERVATIVE_FLOOR: f64 = 3.0;
pub const OPTIMISTIC_CAP: f64 = 12.0;
pub const SCENARIO_SPREAD: f64 = 2.0;
pub const ADVISOR_FEE_RATE: f64 = 1.0;
pub const CASH_RETURN: f64 = 0.0;
pub const INFLATION_DRAG_RETURN: f64 = -3.0;

pub const UNKNOWN_FUND_EXPENSE_RATIO: f64 = 0.1;

/// Benchmark expense ratios in percent.
pub const TARGET_DATE_FUND_FEE: f64 = 0.12;
pub const ACTIVELY_MANAGED_FEE: f64 = 0.75;

/// S&P 500 annual returns 2008-2017.
pub const CRISIS_2008_RETURNS: [f64; 10] =
    [-37.0, 26.0, 15.0, 2.0, 16.0, 32.0, 14.0, 12.0, 21.0, 29.0];
/// Annual returns 2000-2009.
pub const CRISIS_DOTCOM_RETURNS: [f64; 10] =
    [-9.0, -12.0, -22.0, 29.0, 11.0, 5.0, 16.0, 16.0, -37.0, 26.0];
/// Modeled on 1929-1938.
pub const CRISIS_DEPRESSION_RETURNS: [f64; 10] =
    [-43.0, -25.0, -9.0, -43.0, 50.0, 47.0, 32.0, -35.0, 31.0, 0.0];

pub const HISTORICAL_CRISES: [(&str, &[f64]); 3] = [
    ("2008-financial-crisis", &CRISIS_2008_RETURNS),
    ("dot-com-crash", &CRISIS_DOTCOM_RETURNS),
    ("great-depression", &CRISIS_DEPRESSION_RETURNS),
];

pub const WHAT_IF_SMALL_CAP: ShockTriple = ShockTriple {
    us: -60.0,
    intl: 0.0,
    bonds: 0.0,
};
pub const WHAT_IF_BOND_CRISIS: ShockTriple = ShockTriple {
    us: 0.0,
    intl: 0.0,
    bonds: -20.0,
};
pub const WHAT_IF_INTL_COLLAPSE: ShockTriple = ShockTriple {
    us: 0.0,
    intl: -100.0,
    bonds: 0.0,
};
pub const WHAT_IF_ARMAGEDDON: ShockTriple = ShockTriple {
    us: -60.0,
    intl: -100.0,
    bonds: -20.0,
};

pub const WHAT_IF_SHOCKS: [(&str, ShockTriple); 4] = [
    ("small-cap-crash", WHAT_IF_SMALL_CAP),
    ("bond-crisis", WHAT_IF_BOND_CRISIS),
    ("international-collapse", WHAT_IF_INTL_COLLAPSE),
    ("armageddon", WHAT_IF_ARMAGEDDON),
];

struct FundRow {
    ticker: &'static str,
    name: &'static str,
    expense_ratio: f64,
    asset_class: &'static str,
    provider: &'static str,
    dividend_yield: f64,
    tax_efficiency: &'static str,
    turnover: f64,
}

impl FundRow {
    fn to_reference(&self) -> FundReference {
        FundReference {
            ticker: self.ticker.to_string(),
            name: self.name.to_string(),
            expense_ratio: self.expense_ratio,
            asset_class: self.asset_class.to_string(),
            provider: self.provider.to_string(),
            dividend_yield: self.dividend_yield,
            tax_efficiency: self.tax_efficiency.to_string(),
            turnover: self.turnover,
        }
    }
}

const fn fund(
    ticker: &'static str,
    name: &'static str,
    expense_ratio: f64,
    asset_class: &'static str,
    provider: &'static str,
    dividend_yield: f64,
    tax_efficiency: &'static str,
    turnover: f64,
) -> FundRow {
    FundRow {
        ticker,
        name,
        expense_ratio,
        asset_class,
        provider,
        dividend_yield,
        tax_efficiency,
        turnover,
    }
}

const FUNDS: [FundRow; 22] = [
    fund("VOO", "Vanguard S&P 500 ETF", 0.03, "US Large Cap", "Vanguard", 1.5, "Excellent", 3.0),
    fund(
        "VTI",
        "Vanguard Total Stock Market ETF",
        0.03,
        "US Total Market",
        "Vanguard",
        1.5,
        "Excellent",
        4.0,
    ),
    fund(
        "VXUS",
        "Vanguard Total International Stock ETF",
        0.08,
        "International",
        "Vanguard",
        3.2,
        "Very Good",
        5.0,
    ),
    fund("VB", "Vanguard Small-Cap ETF", 0.05, "US Small Cap", "Vanguard", 1.3, "Very Good", 15.0),
    fund(
        "VWO",
        "Vanguard Emerging Markets ETF",
        0.08,
        "Emerging Markets",
        "Vanguard",
        3.5,
        "Good",
        8.0,
    ),
    fund(
        "VEA",
        "Vanguard Developed Markets ETF",
        0.05,
        "Developed International",
        "Vanguard",
        3.0,
        "Very Good",
        4.0,
    ),
    fund(
        "SCHB",
        "Schwab U.S. Broad Market ETF",
        0.03,
        "US Total Market",
        "Schwab",
        1.4,
        "Excellent",
        4.0,
    ),
    fund(
        "SCHX",
        "Schwab U.S. Large-Cap ETF",
        0.03,
        "US Large Cap",
        "Schwab",
        1.5,
        "Excellent",
        3.0,
    ),
    fund(
        "SCHF",
        "Schwab International Equity ETF",
        0.06,
        "International",
        "Schwab",
        3.1,
        "Very Good",
        5.0,
    ),
    fund(
        "SCHA",
        "Schwab U.S. Small-Cap ETF",
        0.04,
        "US Small Cap",
        "Schwab",
        1.2,
        "Very Good",
        12.0,
    ),
    fund(
        "SCHE",
        "Schwab Emerging Markets Equity ETF",
        0.11,
        "Emerging Markets",
        "Schwab",
        3.4,
        "Good",
        9.0,
    ),
    fund(
        "ITOT",
        "iShares Core S&P Total U.S. Stock Market ETF",
        0.03,
        "US Total Market",
        "iShares",
        1.4,
        "Excellent",
        3.0,
    ),
    fund("IVV", "iShares Core S&P 500 ETF", 0.03, "US Large Cap", "iShares", 1.5, "Excellent", 3.0),
    fund(
        "IXUS",
        "iShares Core MSCI Total International Stock ETF",
        0.07,
        "International",
        "iShares",
        3.3,
        "Very Good",
        5.0,
    ),
    fund(
        "IJR",
        "iShares Core S&P Small-Cap ETF",
        0.06,
        "US Small Cap",
        "iShares",
        1.3,
        "Very Good",
        14.0,
    ),
    fund(
        "IEMG",
        "iShares Core MSCI Emerging Markets ETF",
        0.09,
        "Emerging Markets",
        "iShares",
        3.6,
        "Good",
        10.0,
    ),
    fund("SPY", "SPDR S&P 500 ETF Trust", 0.09, "US Large Cap", "SPDR", 1.5, "Excellent", 3.0),
    fund(
        "SPTM",
        "SPDR Portfolio S&P 1500 Composite Stock Market ETF",
        0.03,
        "US Total Market",
        "SPDR",
        1.4,
        "Excellent",
        4.0,
    ),
    fund(
        "SPEM",
        "SPDR Portfolio Emerging Markets ETF",
        0.07,
        "Emerging Markets",
        "SPDR",
        3.7,
        "Good",
        11.0,
    ),
    fund(
        "BND",
        "Vanguard Total Bond Market ETF",
        0.03,
        "US Bonds",
        "Vanguard",
        4.2,
        "Excellent",
        10.0,
    ),
    fund(
        "AGG",
        "iShares Core US Aggregate Bond ETF",
        0.03,
        "US Bonds",
        "iShares",
        4.1,
        "Excellent",
        9.0,
    ),
    fund(
        "BNDW",
        "Vanguard Total World Bond ETF",
        0.05,
        "Global Bonds",
        "Vanguard",
        4.0,
        "Very Good",
        11.0,
    ),
];

const fn slot(ticker: &'static str, bucket: Bucket) -> TemplateFund {
    TemplateFund {
        ticker,
        bucket,
        weight: None,
    }
}

const fn weighted(ticker: &'static str, bucket: Bucket, weight: f64) -> TemplateFund {
    TemplateFund {
        ticker,
        bucket,
        weight: Some(weight),
    }
}

const TEMPLATES: [PortfolioTemplate; 6] = [
    PortfolioTemplate {
        name: "3-Fund Balanced",
        funds: &[
            slot("VTI", Bucket::Us),
            slot("VXUS", Bucket::International),
            slot("BND", Bucket::Bonds),
        ],
        description: "Classic 3-fund with bonds (age-based)",
        complexity: "3 funds",
        has_bonds: true,
        persona: "The Steady Builder",
        best_for: "Set-it-and-forget-it investors who want balance between growth and stability",
    },
    PortfolioTemplate {
        name: "3-Fund Conservative",
        funds: &[
            slot("VOO", Bucket::Us),
            slot("VXUS", Bucket::International),
            slot("BND", Bucket::Bonds),
        ],
        description: "S&P 500 with bonds for stability",
        complexity: "3 funds",
        has_bonds: true,
        persona: "The Cautious Planner",
        best_for: "Those closer to retirement or who prefer less volatility in their portfolio",
    },
    PortfolioTemplate {
        name: "Simple Two-Fund",
        funds: &[slot("VTI", Bucket::Us), slot("VXUS", Bucket::International)],
        description: "Classic & clean - total market coverage",
        complexity: "Simplest",
        has_bonds: false,
        persona: "The Minimalist",
        best_for: "First-time investors or anyone who values simplicity over complexity",
    },
    PortfolioTemplate {
        name: "S&P 500 Focus",
        funds: &[slot("VOO", Bucket::Us), slot("VXUS", Bucket::International)],
        description: "Large-cap US companies",
        complexity: "Simplest",
        has_bonds: false,
        persona: "The Blue-Chip Believer",
        best_for: "Those who want exposure to America's largest, most established companies",
    },
    PortfolioTemplate {
        name: "Small-Cap Tilt",
        funds: &[
            weighted("VOO", Bucket::Us, 0.8),
            weighted("VB", Bucket::Us, 0.2),
            slot("VXUS", Bucket::International),
        ],
        description: "80/20 large/small cap US split",
        complexity: "3 funds",
        has_bonds: false,
        persona: "The Growth Seeker",
        best_for: "Long-term investors willing to accept more volatility \
                   for potentially higher returns",
    },
    PortfolioTemplate {
        name: "Emerging Markets Split",
        funds: &[
            slot("VTI", Bucket::Us),
            weighted("VEA", Bucket::International, 0.6),
            weighted("VWO", Bucket::International, 0.4),
        ],
        description: "Separate developed & emerging intl",
        complexity: "3 funds",
        has_bonds: false,
        persona: "The Global Diversifier",
        best_for: "Those who believe in global growth and want exposure to developing economies",
    },
];

pub fn preset_templates() -> &'static [PortfolioTemplate] {
    &TEMPLATES
}

pub fn fund_catalog() -> Vec<FundReference> {
    FUNDS.iter().map(FundRow::to_reference).collect()
}

/// Case-insensitive lookup that never fails: unknown tickers get a
/// placeholder priced at a conservative expense ratio with no yield.
pub fn lookup_fund(ticker: &str) -> FundReference {
    if let Some(row) = FUNDS
        .iter()
        .find(|row| row.ticker.eq_ignore_ascii_case(ticker))
    {
        return row.to_reference();
    }

    let upper = ticker.to_ascii_uppercase();
    FundReference {
        name: format!("{upper} (Unknown ETF)"),
        ticker: upper,
        expense_ratio: UNKNOWN_FUND_EXPENSE_RATIO,
        asset_class: "Unknown".to_string(),
        provider: "Unknown".to_string(),
        dividend_yield: 0.0,
        tax_efficiency: "Unknown".to_string(),
        turnover: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let lower = lookup_fund("vxus");
        let upper = lookup_fund("VXUS");
        assert_eq!(lower, upper);
        assert_eq!(lower.provider, "Vanguard");
        assert_eq!(lower.expense_ratio, 0.08);
    }

    #[test]
    fn unknown_ticker_gets_placeholder() {
        let fund = lookup_fund("zzzz");
        assert_eq!(fund.ticker, "ZZZZ");
        assert_eq!(fund.name, "ZZZZ (Unknown ETF)");
        assert_eq!(fund.expense_ratio, 0.1);
        assert_eq!(fund.dividend_yield, 0.0);
        assert_eq!(fund.asset_class, "Unknown");
    }

    #[test]
    fn every_template_fund_is_in_the_catalog() {
        let catalog = fund_catalog();
        for template in preset_templates() {
            for slot in template.funds {
                assert!(
                    catalog.iter().any(|f| f.ticker == slot.ticker),
                    "{} missing from catalog",
                    slot.ticker
                );
            }
        }
    }

    #[test]
    fn weighted_buckets_sum_to_one() {
        for template in preset_templates() {
            for bucket in [Bucket::Us, Bucket::International, Bucket::Bonds] {
                let slots = template.funds.iter().filter(|f| f.bucket == bucket);
                let total: f64 = slots.clone().map(TemplateFund::effective_weight).sum();
                if slots.count() > 0 {
                    assert!((total - 1.0).abs() < 1e-12, "{} {:?}", template.name, bucket);
                }
            }
        }
    }

    #[test]
    fn only_bond_templates_hold_bond_funds() {
        for template in preset_templates() {
            let holds_bonds = template.funds.iter().any(|f| f.bucket == Bucket::Bonds);
            assert_eq!(holds_bonds, template.has_bonds, "{}", template.name);
        }
    }
}
