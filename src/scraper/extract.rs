//! Text-level parsing of what bookmaker pages show.

use rust_decimal::Decimal;

use crate::error::MalformedElement;

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥'];

/// Parses displayed prices such as `1.85`, `$1.85` or `A$ 2.10`.
pub fn parse_price(text: &str) -> Result<Decimal, MalformedElement> {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && !CURRENCY_SYMBOLS.contains(c))
        .collect();
    // leading currency code, e.g. "A" in A$ or "AUD"
    let cleaned = cleaned.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    cleaned
        .parse::<Decimal>()
        .map_err(|_| MalformedElement::UnparseablePrice(text.to_string()))
}

/// Splits `"<market> - <name> - <price>"` from the right into `(name, price)`.
pub fn split_labelled<'a>(value: &'a str, separator: &str) -> Result<(&'a str, &'a str), MalformedElement> {
    let mut parts = value.rsplitn(3, separator);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(price), Some(name), Some(_market)) => Ok((name.trim(), price.trim())),
        _ => Err(MalformedElement::UnexpectedFormat(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_plain_and_decorated_prices() {
        assert_eq!(parse_price("1.85").unwrap(), dec!(1.85));
        assert_eq!(parse_price(" $2.10 ").unwrap(), dec!(2.10));
        assert_eq!(parse_price("A$ 26.00").unwrap(), dec!(26));
        assert_eq!(parse_price("AUD 3.5\n").unwrap(), dec!(3.5));
    }

    #[test]
    fn rejects_non_numeric_prices() {
        assert_eq!(
            parse_price("SUS"),
            Err(MalformedElement::UnparseablePrice("SUS".to_string()))
        );
        assert!(parse_price("").is_err());
        assert!(parse_price("$").is_err());
    }

    #[test]
    fn splits_labelled_values_from_the_right() {
        let (name, price) =
            split_labelled("Next Federal Government - Labor - 1.3", " - ").unwrap();
        assert_eq!(name, "Labor");
        assert_eq!(price, "1.3");

        // market titles may contain the separator themselves
        let (name, price) = split_labelled("Election - 49th - Coalition - 3.25", " - ").unwrap();
        assert_eq!((name, price), ("Coalition", "3.25"));
    }

    #[test]
    fn short_labelled_values_are_malformed() {
        assert_eq!(
            split_labelled("Labor - 1.3", " - "),
            Err(MalformedElement::UnexpectedFormat("Labor - 1.3".to_string()))
        );
    }
}
