use crate::errors::ApiResult;
use crate::provider::StaticInfo;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub optionable: bool,
    pub name: String,
}

impl ValidationResult {
    pub fn invalid() -> Self {
        Self { valid: false, optionable: false, name: String::new() }
    }
}

/// Fold the two provider lookups into a validation verdict. Validation
/// never fails: a failed lookup IS the answer, so every error collapses
/// into the negative result.
pub fn validate_symbol(
    symbol: &str,
    info: ApiResult<StaticInfo>,
    expiries: ApiResult<Vec<String>>,
) -> ValidationResult {
    let Ok(info) = info else {
        return ValidationResult::invalid();
    };

    let valid = info.symbol.is_some();
    if !valid {
        return ValidationResult::invalid();
    }

    ValidationResult {
        valid: true,
        optionable: expiries.map(|e| !e.is_empty()).unwrap_or(false),
        name: info.long_name.unwrap_or_else(|| symbol.to_uppercase()),
    }
}
