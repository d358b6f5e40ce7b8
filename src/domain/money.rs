use std::fmt;

use rust_decimal::Decimal;

/// Parse a user-supplied amount into an exact decimal.
/// Example: "50.00" -> 50.00, "12.5" -> 12.5, "-3" -> -3
///
/// Inputs that cannot be represented without rounding are rejected rather
/// than truncated.
pub fn parse_amount(input: &str) -> Result<Decimal, ParseAmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseAmountError::Empty);
    }
    Decimal::from_str_exact(input).map_err(|_| ParseAmountError::InvalidFormat(input.to_string()))
}

/// Format an amount for display with at least two fractional digits.
/// Example: 50 -> "50.00", 12.5 -> "12.50", 0.125 -> "0.125"
pub fn format_amount(amount: Decimal) -> String {
    let mut shown = amount;
    if shown.scale() < 2 {
        shown.rescale(2);
    }
    shown.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    Empty,
    InvalidFormat(String),
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::Empty => write!(f, "amount is empty"),
            ParseAmountError::InvalidFormat(input) => {
                write!(f, "invalid amount '{}'", input)
            }
        }
    }
}

impl std::error::Error for ParseAmountError {}
