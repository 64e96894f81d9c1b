//! Amount parsing for heterogeneous report tokens
//!
//! Settlement reports mix plain decimals with currency glyphs, thousands
//! separators, parenthesized negatives, and both `1,234.56` and `1.234,56`
//! locale forms. Everything normalizes to an exact [`BigDecimal`].

use bigdecimal::BigDecimal;

use crate::types::{EngineError, EngineResult};

const CURRENCY_GLYPHS: [char; 4] = ['$', '€', '£', '¥'];

/// Parse one amount token into an exact decimal.
///
/// Empty and `nan`/`null` tokens are zero. Returns
/// [`EngineError::MalformedAmount`] for anything that survives cleanup but
/// still fails to parse; callers recover to zero and log.
pub fn parse_amount(token: &str) -> EngineResult<BigDecimal> {
    let trimmed = token.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("null")
        || trimmed.eq_ignore_ascii_case("n/a")
    {
        return Ok(BigDecimal::from(0));
    }

    // Accounting-style negatives: (123.45) means -123.45
    let (negated, inner) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };

    let cleaned: String = inner
        .chars()
        .filter(|c| !CURRENCY_GLYPHS.contains(c) && !c.is_whitespace())
        .collect();

    let normalized = normalize_separators(&cleaned);
    let value: BigDecimal = normalized
        .parse()
        .map_err(|_| EngineError::MalformedAmount(token.to_string()))?;

    Ok(if negated { -value } else { value })
}

/// Resolve `.`/`,` into a plain decimal string.
///
/// When both separators appear, the one occurring last is the decimal
/// separator and the other marks thousands. A lone comma is a thousands
/// separator only when it groups digits in threes; otherwise it is a
/// decimal point.
fn normalize_separators(text: &str) -> String {
    let has_dot = text.contains('.');
    let has_comma = text.contains(',');
    match (has_dot, has_comma) {
        (_, false) => text.to_string(),
        (true, true) => {
            if text.rfind(',') > text.rfind('.') {
                text.replace('.', "").replace(',', ".")
            } else {
                text.replace(',', "")
            }
        }
        (false, true) => {
            if groups_in_threes(text) {
                text.replace(',', "")
            } else if text.matches(',').count() == 1 {
                text.replace(',', ".")
            } else {
                text.replace(',', "")
            }
        }
    }
}

fn groups_in_threes(text: &str) -> bool {
    let mut parts = text.split(',');
    // first group may be any width; every following group must be 3 digits
    parts.next();
    let mut saw_group = false;
    for part in parts {
        saw_group = true;
        if part.len() != 3 || !part.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
    }
    saw_group
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn plain_decimals_parse() {
        assert_eq!(parse_amount("29.99").unwrap(), dec("29.99"));
        assert_eq!(parse_amount("-5.00").unwrap(), dec("-5.00"));
        assert_eq!(parse_amount("0").unwrap(), dec("0"));
    }

    #[test]
    fn empty_and_nan_tokens_are_zero() {
        assert_eq!(parse_amount("").unwrap(), BigDecimal::from(0));
        assert_eq!(parse_amount("   ").unwrap(), BigDecimal::from(0));
        assert_eq!(parse_amount("NaN").unwrap(), BigDecimal::from(0));
        assert_eq!(parse_amount("null").unwrap(), BigDecimal::from(0));
    }

    #[test]
    fn parenthesized_amounts_are_negative() {
        assert_eq!(parse_amount("(123.45)").unwrap(), dec("-123.45"));
        assert_eq!(parse_amount("($1,234.56)").unwrap(), dec("-1234.56"));
    }

    #[test]
    fn currency_glyphs_are_stripped() {
        assert_eq!(parse_amount("$1,234.56").unwrap(), dec("1234.56"));
        assert_eq!(parse_amount("€ 99.90").unwrap(), dec("99.90"));
        assert_eq!(parse_amount("£12").unwrap(), dec("12"));
    }

    #[test]
    fn alternate_locale_forms_parse() {
        assert_eq!(parse_amount("1.234,56").unwrap(), dec("1234.56"));
        assert_eq!(parse_amount("123,45").unwrap(), dec("123.45"));
        assert_eq!(parse_amount("1,234").unwrap(), dec("1234"));
        assert_eq!(parse_amount("1,234,567.89").unwrap(), dec("1234567.89"));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            parse_amount("12x.4"),
            Err(EngineError::MalformedAmount(_))
        ));
        assert!(matches!(
            parse_amount("$"),
            Err(EngineError::MalformedAmount(_))
        ));
    }
}
