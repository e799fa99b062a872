//! Amount input type for API boundary enforcement

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::parse_amount;

/// Positive amount accepted only as a JSON string in plain decimal form.
///
/// Rejects JSON numbers, `.5`, `5.`, signs, exponents and zero. Currency
/// precision is checked later against the payment currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrictAmount(Decimal);

impl StrictAmount {
    pub fn inner(self) -> Decimal {
        self.0
    }
}

impl std::ops::Deref for StrictAmount {
    type Target = Decimal;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de> Deserialize<'de> for StrictAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        // JSON numbers would bypass format validation
        let s = String::deserialize(deserializer)?;
        parse_amount(&s)
            .map(StrictAmount)
            .map_err(|e| D::Error::custom(format!("amount: {}", e)))
    }
}

impl Serialize for StrictAmount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_valid_string() {
        let a: StrictAmount = serde_json::from_str(r#""100000""#).unwrap();
        assert_eq!(*a, Decimal::from(100_000));
        let a: StrictAmount = serde_json::from_str(r#""12.50""#).unwrap();
        assert_eq!(a.inner(), Decimal::from_str("12.50").unwrap());
    }

    #[test]
    fn test_rejects_json_number() {
        let result: Result<StrictAmount, _> = serde_json::from_str("1.5");
        assert!(result.unwrap_err().to_string().contains("expected a string"));
    }

    #[test]
    fn test_rejects_bad_formats() {
        for bad in [r#"".5""#, r#""5.""#, r#""-1""#, r#""1e5""#, r#""""#, r#""0""#] {
            let result: Result<StrictAmount, _> = serde_json::from_str(bad);
            assert!(result.is_err(), "{}", bad);
        }
    }
}
