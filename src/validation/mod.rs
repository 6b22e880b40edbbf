use std::fmt;

use uuid::Uuid;

use crate::domain::{MoneyInfo, MoneyPatch, Party};
use crate::error::AppError;

pub const IDEMPOTENCY_TOKEN_MAX_LEN: usize = 255;
pub const ALLOWED_CURRENCIES: &[&str] = &["USD", "EUR", "GBP"];
pub const ALLOWED_METHODS: &[&str] = &["bank_account", "card", "crypto_wallet"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

pub type ValidationResult = Result<(), ValidationError>;

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_enum(field: &'static str, value: &str, allowed: &[&str]) -> ValidationResult {
    if allowed.iter().all(|candidate| value != *candidate) {
        return Err(ValidationError::new(
            field,
            format!("must be one of: {}", allowed.join(", ")),
        ));
    }

    Ok(())
}

pub fn validate_positive_amount(amount: i64) -> ValidationResult {
    if amount <= 0 {
        return Err(ValidationError::new("amount", "must be greater than zero"));
    }

    Ok(())
}

pub fn validate_party(field: &'static str, party: &Party) -> ValidationResult {
    if party.user_id == Uuid::nil() || party.wallet_id == Uuid::nil() {
        return Err(ValidationError::new(field, "user_id and wallet_id required"));
    }

    Ok(())
}

pub fn validate_idempotency_token(token: &str) -> ValidationResult {
    validate_required("idempotency_token", token)?;
    validate_max_len("idempotency_token", token, IDEMPOTENCY_TOKEN_MAX_LEN)
}

pub fn validate_money_info(money_info: &MoneyInfo) -> ValidationResult {
    validate_enum("method", &money_info.method, ALLOWED_METHODS)?;
    validate_enum("currency", &money_info.currency, ALLOWED_CURRENCIES)?;
    validate_positive_amount(money_info.amount)
}

pub fn validate_money_patch(patch: &MoneyPatch) -> ValidationResult {
    if let Some(method) = &patch.method {
        validate_enum("method", method, ALLOWED_METHODS)?;
    }
    if let Some(currency) = &patch.currency {
        validate_enum("currency", currency, ALLOWED_CURRENCIES)?;
    }
    if let Some(amount) = patch.amount {
        validate_positive_amount(amount)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn party() -> Party {
        Party {
            user_id: Uuid::new_v4(),
            wallet_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn validates_required_field() {
        assert!(validate_required("field", "value").is_ok());
        assert!(validate_required("field", "   ").is_err());
    }

    #[test]
    fn validates_max_len() {
        assert!(validate_max_len("field", "abc", 3).is_ok());
        assert!(validate_max_len("field", "abcd", 3).is_err());
    }

    #[test]
    fn validates_enum_values() {
        assert!(validate_enum("currency", "USD", ALLOWED_CURRENCIES).is_ok());
        assert!(validate_enum("currency", "usd", ALLOWED_CURRENCIES).is_err());
    }

    #[test]
    fn validates_positive_amount() {
        assert!(validate_positive_amount(1).is_ok());
        assert!(validate_positive_amount(0).is_err());
        assert!(validate_positive_amount(-5).is_err());
    }

    #[test]
    fn validates_party_ids() {
        assert!(validate_party("sender", &party()).is_ok());

        let nil = Party {
            user_id: Uuid::nil(),
            wallet_id: Uuid::new_v4(),
        };
        assert!(validate_party("sender", &nil).is_err());
    }

    #[test]
    fn validates_money_info() {
        let valid = MoneyInfo {
            method: "bank_account".to_string(),
            currency: "USD".to_string(),
            amount: 100,
        };
        assert!(validate_money_info(&valid).is_ok());

        let bad_method = MoneyInfo {
            method: "cash_under_table".to_string(),
            ..valid.clone()
        };
        assert!(validate_money_info(&bad_method).is_err());

        let zero = MoneyInfo {
            amount: 0,
            ..valid.clone()
        };
        assert!(validate_money_info(&zero).is_err());
    }

    #[test]
    fn validates_partial_patch() {
        assert!(validate_money_patch(&MoneyPatch::default()).is_ok());
        assert!(validate_money_patch(&MoneyPatch {
            amount: Some(2),
            ..MoneyPatch::default()
        })
        .is_ok());
        assert!(validate_money_patch(&MoneyPatch {
            amount: Some(0),
            ..MoneyPatch::default()
        })
        .is_err());
        assert!(validate_money_patch(&MoneyPatch {
            currency: Some("BTC".to_string()),
            ..MoneyPatch::default()
        })
        .is_err());
    }
}
