//! Full backtest result as JSON.

use std::fs;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::FxlabError;
use crate::ports::report_port::ReportPort;

pub struct JsonReportAdapter;

impl ReportPort for JsonReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), FxlabError> {
        let json = serde_json::to_string_pretty(result)
            .map_err(|e| FxlabError::Io(std::io::Error::other(e)))?;
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(output_path, json)?;
        Ok(())
    }
}
