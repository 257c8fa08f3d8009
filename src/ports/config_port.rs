//! Configuration access port trait.

use chrono::NaiveDate;

use crate::domain::error::FxlabError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;

    /// A number that may be absent but must parse when present.
    fn get_optional_double(&self, section: &str, key: &str) -> Result<Option<f64>, FxlabError> {
        match self.get_string(section, key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| FxlabError::ConfigInvalid {
                    section: section.to_string(),
                    key: key.to_string(),
                    reason: format!("'{}' is not a number", raw.trim()),
                }),
        }
    }

    /// A required `YYYY-MM-DD` date.
    fn get_date(&self, section: &str, key: &str) -> Result<NaiveDate, FxlabError> {
        let raw = self
            .get_string(section, key)
            .ok_or_else(|| FxlabError::ConfigMissing {
                section: section.to_string(),
                key: key.to_string(),
            })?;
        NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
            FxlabError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("invalid {key} format, expected YYYY-MM-DD"),
            }
        })
    }
}
