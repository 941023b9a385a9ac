//! Local validation of expense input
//!
//! Runs before any ledger call. Invalid input never reaches the wallet.

use tally_core::{Amount, ValidationError};

/// A validated expense, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseInput {
    amount: Amount,
    description: String,
}

impl ExpenseInput {
    /// Validate raw form input.
    ///
    /// The amount must be a base-10 integer greater than zero in the ledger's
    /// native unit. The description must contain a non-whitespace character.
    /// Surrounding whitespace is stripped from both.
    pub fn parse(amount: &str, description: &str) -> Result<Self, ValidationError> {
        let amount_str = amount.trim();
        if amount_str.is_empty() {
            return Err(ValidationError::EmptyAmount);
        }
        let parsed = Amount::parse_decimal(amount_str).map_err(|_| {
            ValidationError::NotPositiveInteger {
                input: amount.to_string(),
            }
        })?;
        if parsed.is_zero() {
            return Err(ValidationError::NotPositiveInteger {
                input: amount.to_string(),
            });
        }

        let description = description.trim();
        if description.is_empty() {
            return Err(ValidationError::EmptyDescription);
        }

        Ok(Self {
            amount: parsed,
            description: description.to_string(),
        })
    }

    /// Validated amount
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// Validated description
    pub fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_input() {
        let input = ExpenseInput::parse(" 42 ", "  lunch ").unwrap();
        assert_eq!(input.amount(), Amount::from(42));
        assert_eq!(input.description(), "lunch");
    }

    #[test]
    fn test_empty_amount() {
        assert_eq!(
            ExpenseInput::parse("", "food"),
            Err(ValidationError::EmptyAmount)
        );
        assert_eq!(
            ExpenseInput::parse("   ", "food"),
            Err(ValidationError::EmptyAmount)
        );
    }

    #[test]
    fn test_not_positive_integer() {
        for bad in ["0", "-5", "1.5", "abc", "1e3", "000"] {
            assert!(
                matches!(
                    ExpenseInput::parse(bad, "food"),
                    Err(ValidationError::NotPositiveInteger { .. })
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_empty_description() {
        assert_eq!(
            ExpenseInput::parse("10", ""),
            Err(ValidationError::EmptyDescription)
        );
        assert_eq!(
            ExpenseInput::parse("10", " \t"),
            Err(ValidationError::EmptyDescription)
        );
    }
}
