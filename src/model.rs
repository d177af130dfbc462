//! Catalog domain types.

use crate::error::{Error, Result};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Non-negative money amount with two fractional digits.
///
/// Held as integer cents so equality and ordering are exact. Serialized as a
/// JSON number (`19.99`); deserialized from a number or a decimal string, which
/// is how query-string values arrive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(u64);

/// Largest cent count a float converts to exactly (2^53).
const MAX_CENTS_F64: f64 = 9_007_199_254_740_992.0;

impl Price {
    pub const ZERO: Price = Price(0);

    pub fn from_cents(cents: u64) -> Self {
        Price(cents)
    }

    /// Whole units, no cents. `u32::MAX` units still fit in cents.
    pub fn from_units(units: u32) -> Self {
        Price(u64::from(units) * 100)
    }

    pub fn cents(&self) -> u64 {
        self.0
    }

    fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::ValidationError(format!(
                "price must be a non-negative number, got {}",
                value
            )));
        }
        let cents = (value * 100.0).round();
        if cents > MAX_CENTS_F64 {
            return Err(Error::ValidationError(format!(
                "price out of range: {}",
                value
            )));
        }
        Ok(Price(cents as u64))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Price {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::ValidationError(format!("invalid price: {:?}", s));
        let s = s.trim();
        let (units, fraction) = match s.split_once('.') {
            Some((units, fraction)) => (units, fraction),
            None => (s, ""),
        };
        if units.is_empty() || fraction.len() > 2 {
            return Err(invalid());
        }
        if !units.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let units: u64 = units.parse().map_err(|_| invalid())?;
        let cents = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse::<u64>().map_err(|_| invalid())?,
        };
        units
            .checked_mul(100)
            .and_then(|c| c.checked_add(cents))
            .map(Price)
            .ok_or_else(invalid)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0 as f64 / 100.0)
    }
}

struct PriceVisitor;

impl<'de> Visitor<'de> for PriceVisitor {
    type Value = Price;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative decimal price")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Price, E> {
        v.checked_mul(100)
            .map(Price)
            .ok_or_else(|| E::custom("price out of range"))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Price, E> {
        let v = u64::try_from(v).map_err(|_| E::custom("price must be non-negative"))?;
        self.visit_u64(v)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Price, E> {
        Price::from_f64(v).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Price, E> {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Price, D::Error> {
        deserializer.deserialize_any(PriceVisitor)
    }
}

/// A catalog product as owned by the relational store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Price,
}

impl Product {
    pub fn from_draft(id: i64, draft: ProductDraft) -> Self {
        Product {
            id,
            name: draft.name,
            description: draft.description,
            category: draft.category,
            price: draft.price,
        }
    }
}

/// Writable fields of a product: body of create and update requests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub price: Price,
}

impl ProductDraft {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        price: Price,
    ) -> Self {
        ProductDraft {
            name: name.into(),
            description: description.into(),
            category: category.into(),
            price,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::ValidationError(
                "product name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// One page of a filtered product listing, as cached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedPage {
    /// Rows matching the filter, before pagination.
    pub total_count: u64,
    pub page_number: u32,
    pub page_size: u32,
    pub data: Vec<Product>,
}
