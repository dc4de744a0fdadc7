use std::str::FromStr;

use stripe::{Client, Currency};

use crate::error::{AppError, Res};

pub fn create_client(secret_key: &str) -> Client {
    Client::new(secret_key)
}

/// Parses an ISO 4217 code ("xaf", "USD") into a Stripe currency.
pub fn parse_currency(code: &str) -> Res<Currency> {
    Currency::from_str(&code.to_lowercase())
        .map_err(|_| AppError::BadRequest(format!("Unsupported currency: {}", code)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_currency_case_insensitively() {
        assert_eq!(parse_currency("XAF").unwrap(), Currency::XAF);
        assert_eq!(parse_currency("usd").unwrap(), Currency::USD);
        assert!(parse_currency("not-a-currency").is_err());
    }
}
