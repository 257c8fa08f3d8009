//! Trade list export as CSV.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::FxlabError;
use crate::ports::report_port::ReportPort;

#[derive(Serialize)]
struct TradeRow<'a> {
    trade: usize,
    date: String,
    #[serde(rename = "type")]
    trade_type: &'a str,
    entry_price: String,
    exit_price: String,
    profit: String,
    balance: String,
}

pub struct CsvReportAdapter;

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), FxlabError> {
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(output_path).map_err(csv_error)?;
        let curve = result.equity_curve();

        for (i, (trade, balance)) in result.trades.iter().zip(curve).enumerate() {
            writer
                .serialize(TradeRow {
                    trade: i + 1,
                    date: trade.date.format("%Y-%m-%d").to_string(),
                    trade_type: trade.trade_type.as_str(),
                    entry_price: format!("{:.5}", trade.entry_price),
                    exit_price: format!("{:.5}", trade.exit_price),
                    profit: format!("{:.2}", trade.profit),
                    balance: format!("{:.2}", balance),
                })
                .map_err(csv_error)?;
        }

        writer.flush()?;
        Ok(())
    }
}

fn csv_error(e: csv::Error) -> FxlabError {
    FxlabError::Io(std::io::Error::other(e))
}
