//! Holdings import and trajectory export.

use std::io;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Writer};

use crate::core::{GrowthTrajectory, Holding, HoldingType};
use crate::error::InputError;

const TICKER_COLUMNS: [&str; 4] = ["Ticker", "Symbol", "ticker", "symbol"];
const SHARES_COLUMNS: [&str; 4] = ["Shares", "Quantity", "shares", "quantity"];
const PRICE_COLUMNS: [&str; 4] = ["Price", "Current Price", "price", "current price"];
const TYPE_COLUMNS: [&str; 2] = ["Type", "type"];
const DATE_COLUMNS: [&str; 4] = ["Purchase Date", "PurchaseDate", "Date", "date"];

/// Column positions for each alias list, in alias order.
struct HeaderMap {
    ticker: Vec<usize>,
    shares: Vec<usize>,
    price: Vec<usize>,
    kind: Vec<usize>,
    purchase_date: Vec<usize>,
}

impl HeaderMap {
    fn new(headers: &StringRecord) -> Self {
        let positions = |aliases: &[&str]| -> Vec<usize> {
            aliases
                .iter()
                .filter_map(|alias| headers.iter().position(|h| h.trim() == *alias))
                .collect()
        };
        Self {
            ticker: positions(&TICKER_COLUMNS),
            shares: positions(&SHARES_COLUMNS),
            price: positions(&PRICE_COLUMNS),
            kind: positions(&TYPE_COLUMNS),
            purchase_date: positions(&DATE_COLUMNS),
        }
    }
}

/// First non-blank cell among the alias columns.
fn first_present<'r>(record: &'r StringRecord, columns: &[usize]) -> Option<&'r str> {
    columns
        .iter()
        .filter_map(|&idx| record.get(idx))
        .map(str::trim)
        .find(|value| !value.is_empty())
}

fn lenient_number(raw: Option<&str>) -> f64 {
    raw.and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

fn holding_from_record(record: &StringRecord, map: &HeaderMap) -> Option<Holding> {
    let ticker = first_present(record, &map.ticker)?.to_uppercase();
    let shares = lenient_number(first_present(record, &map.shares));
    if shares <= 0.0 {
        return None;
    }
    let price = lenient_number(first_present(record, &map.price));
    let kind = match first_present(record, &map.kind) {
        Some(raw) if raw.eq_ignore_ascii_case("etf") => HoldingType::Etf,
        _ => HoldingType::Stock,
    };
    let purchase_date = first_present(record, &map.purchase_date).map(str::to_string);

    Some(Holding {
        ticker,
        shares,
        price,
        kind,
        purchase_date,
    })
}

/// Reads holdings from a header-first CSV. Rows without a ticker or with no
/// positive share count are skipped.
pub fn read_holdings<R: io::Read>(reader: R) -> Result<Vec<Holding>, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let map = HeaderMap::new(rdr.headers()?);

    let mut holdings = Vec::new();
    for record in rdr.records() {
        if let Some(holding) = holding_from_record(&record?, &map) {
            holdings.push(holding);
        }
    }
    Ok(holdings)
}

pub fn read_holdings_file(path: &Path) -> Result<Vec<Holding>, InputError> {
    let file = std::fs::File::open(path)
        .map_err(|e| InputError::HoldingsCsv(format!("{}: {e}", path.display())))?;
    let holdings = read_holdings(file)
        .map_err(|e| InputError::HoldingsCsv(format!("{}: {e}", path.display())))?;
    tracing::debug!(path = %path.display(), rows = holdings.len(), "loaded holdings");
    Ok(holdings)
}

pub fn write_trajectory<W: io::Write>(
    writer: W,
    trajectory: &GrowthTrajectory,
) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record([
        "year",
        "value",
        "total_contributions",
        "cost_impact",
        "dividend_income",
    ])?;
    for (idx, year) in trajectory.years.iter().enumerate() {
        wtr.write_record([
            year.to_string(),
            format!("{:.2}", trajectory.values[idx]),
            format!("{:.2}", trajectory.total_contributions[idx]),
            format!("{:.2}", trajectory.cost_impact[idx]),
            format!("{:.2}", trajectory.dividend_income[idx]),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_trajectory_file(path: &Path, trajectory: &GrowthTrajectory) -> Result<(), csv::Error> {
    let file = std::fs::File::create(path)?;
    write_trajectory(file, trajectory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_aliased_headers_and_normalizes_tickers() {
        let data = "Symbol,Quantity,Current Price,Type,Date\n\
                    \x20voo ,10,412.5,ETF,2023-01-05\n\
                    aapl,2,190,stock,\n";
        let holdings = read_holdings(data.as_bytes()).expect("csv parses");

        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings[0].ticker, "VOO");
        assert_eq!(holdings[0].shares, 10.0);
        assert_eq!(holdings[0].price, 412.5);
        assert_eq!(holdings[0].kind, HoldingType::Etf);
        assert_eq!(holdings[0].purchase_date.as_deref(), Some("2023-01-05"));
        assert_eq!(holdings[1].kind, HoldingType::Stock);
        assert_eq!(holdings[1].purchase_date, None);
    }

    #[test]
    fn drops_rows_without_ticker_or_shares() {
        let data = "Ticker,Shares,Price\n,5,10\nVTI,0,200\nVXUS,abc,50\nBND,3,oops\n";
        let holdings = read_holdings(data.as_bytes()).expect("csv parses");

        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].ticker, "BND");
        assert_eq!(holdings[0].price, 0.0);
        assert_eq!(holdings[0].kind, HoldingType::Stock);
    }

    #[test]
    fn falls_back_across_alias_columns_per_row() {
        let data = "Ticker,symbol,Shares\n,msft,1\nVOO,,2\n";
        let holdings = read_holdings(data.as_bytes()).expect("csv parses");
        let tickers: Vec<&str> = holdings.iter().map(|h| h.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["MSFT", "VOO"]);
    }

    #[test]
    fn reads_holdings_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "ticker,shares,price,type").expect("write header");
        writeln!(file, "schb,4,21.5,etf").expect("write row");

        let holdings = read_holdings_file(file.path()).expect("file parses");
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].ticker, "SCHB");
        assert_eq!(holdings[0].kind, HoldingType::Etf);
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = read_holdings_file(&dir.path().join("absent.csv")).expect_err("no file");
        assert!(matches!(err, InputError::HoldingsCsv(_)));
    }

    #[test]
    fn exports_one_row_per_year() {
        let trajectory = GrowthTrajectory {
            years: vec![0, 1],
            values: vec![1_000.0, 1_105.126],
            cost_impact: vec![0.0, 1.5],
            total_contributions: vec![1_000.0, 1_000.0],
            dividend_income: vec![15.0, 15.789],
            weighted_dividend_yield: 1.5,
        };
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("growth.csv");
        write_trajectory_file(&path, &trajectory).expect("export succeeds");

        let written = std::fs::read_to_string(&path).expect("read back");
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "year,value,total_contributions,cost_impact,dividend_income");
        assert_eq!(lines[1], "0,1000.00,1000.00,0.00,15.00");
        assert_eq!(lines[2], "1,1105.13,1000.00,1.50,15.79");
        assert_eq!(lines.len(), 3);
    }
}
