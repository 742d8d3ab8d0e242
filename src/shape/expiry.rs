use crate::errors::{ApiError, ApiResult};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryType {
    Weekly,
    Monthly,
    Quarterly,
    Leaps,
}

impl std::fmt::Display for ExpiryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
            Self::Quarterly => write!(f, "quarterly"),
            Self::Leaps => write!(f, "leaps"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryEntry {
    pub date: String,
    #[serde(rename = "type")]
    pub expiry_type: ExpiryType,
    pub days_until_expiry: i64,
    pub is_standard: bool,
}

/// Classify provider expiry dates, preserving provider order. Standard
/// monthly expiries land on the third Friday, day-of-month 15..=21; a date
/// more than a year out is LEAPS regardless of which week it falls in.
/// The quarterly category exists as a filter target but no date series in
/// the source feed maps to it, so the classifier never assigns it.
pub fn classify_expiries(symbol: &str, dates: &[String], now: NaiveDate) -> ApiResult<Vec<ExpiryEntry>> {
    if dates.is_empty() {
        return Err(ApiError::NoOptionsAvailable(symbol.to_string()));
    }

    let mut entries = Vec::with_capacity(dates.len());
    for date_str in dates {
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|e| ApiError::Provider(format!("invalid expiry date {date_str}: {e}")))?;

        let days_until = (date - now).num_days();
        let day = chrono::Datelike::day(&date);
        let is_monthly = (15..=21).contains(&day);

        let expiry_type = if days_until > 365 {
            ExpiryType::Leaps
        } else if is_monthly {
            ExpiryType::Monthly
        } else {
            ExpiryType::Weekly
        };

        entries.push(ExpiryEntry {
            date: date_str.clone(),
            expiry_type,
            days_until_expiry: days_until,
            is_standard: expiry_type == ExpiryType::Monthly,
        });
    }
    Ok(entries)
}
