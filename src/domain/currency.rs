use serde::{Deserialize, Serialize};

/// Currencies an account can be opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Cad,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Eur, Currency::Cad];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Cad => "CAD",
        }
    }

    /// Parse an ISO 4217 code. Codes are matched exactly, so "usd" is rejected.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "USD" => Some(Currency::Usd),
            "EUR" => Some(Currency::Eur),
            "CAD" => Some(Currency::Cad),
            _ => None,
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returns true if accounts can be opened in the given currency code.
pub fn is_supported_currency(code: &str) -> bool {
    Currency::from_code(code).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_currencies() {
        assert!(is_supported_currency("USD"));
        assert!(is_supported_currency("EUR"));
        assert!(is_supported_currency("CAD"));
        assert!(!is_supported_currency("GBP"));
        assert!(!is_supported_currency("usd"));
        assert!(!is_supported_currency(""));
    }

    #[test]
    fn test_code_matches_display() {
        for currency in Currency::ALL {
            assert_eq!(Currency::from_code(&currency.to_string()), Some(currency));
        }
    }

    #[test]
    fn test_serializes_as_code() {
        let json = serde_json::to_string(&Currency::Cad).unwrap();
        assert_eq!(json, "\"CAD\"");
    }
}
