use alloy_primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Largest scale a `Decimal` can carry
const MAX_DECIMAL_SCALE: u32 = 28;

/// Largest integer a `Decimal` mantissa can hold exactly (2^96 - 1)
const MAX_DECIMAL_MANTISSA: u128 = (1u128 << 96) - 1;

/// Human-readable amount of an asset.
///
/// `Fixed` while the smallest-unit integer fits a `Decimal` mantissa. Wider
/// uint256 values become the nearest `f64`. Both serialize as a JSON number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Amount {
    Fixed(Decimal),
    Float(f64),
}

impl Amount {
    pub fn to_f64(&self) -> f64 {
        match self {
            Amount::Fixed(value) => value.to_f64().unwrap_or_default(),
            Amount::Float(value) => *value,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Amount::Fixed(value) => Some(*value),
            Amount::Float(_) => None,
        }
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::Fixed(value)
    }
}

impl PartialEq<Decimal> for Amount {
    fn eq(&self, other: &Decimal) -> bool {
        self.as_decimal().as_ref() == Some(other)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Fixed(value) => write!(f, "{}", value),
            Amount::Float(value) => write!(f, "{:e}", value),
        }
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Amount::Fixed(value) => rust_decimal::serde::float::serialize(value, serializer),
            Amount::Float(value) => serializer.serialize_f64(*value),
        }
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        // shortest round-trip spelling, so 0.25 stays 0.25
        Ok(match Decimal::from_str(&value.to_string()) {
            Ok(decimal) => Amount::Fixed(decimal.normalize()),
            Err(_) => Amount::Float(value),
        })
    }
}

/// Scale an integer amount in smallest units down by `10^decimals`
pub fn scale_u128(raw: u128, decimals: u32) -> Amount {
    if raw <= MAX_DECIMAL_MANTISSA {
        if let Ok(mut value) = Decimal::try_from_i128_with_scale(raw as i128, decimals.min(MAX_DECIMAL_SCALE)) {
            for _ in MAX_DECIMAL_SCALE..decimals {
                value /= Decimal::TEN;
            }
            return Amount::Fixed(value.normalize());
        }
    }

    Amount::Float(raw as f64 / 10f64.powi(decimals as i32))
}

/// Same as [`scale_u128`] for a full uint256
pub fn scale_u256(raw: U256, decimals: u32) -> Amount {
    match u128::try_from(raw) {
        Ok(raw) => scale_u128(raw, decimals),
        Err(_) => Amount::Float(u256_to_f64(raw) / 10f64.powi(decimals as i32)),
    }
}

/// Scale a big-endian unsigned integer of any width.
///
/// Every uint256 has a finite amount. `None` only for values so much wider
/// than 256 bits that they overflow `f64`.
pub fn scale_be_bytes(bytes: &[u8], decimals: u32) -> Option<Amount> {
    let significant = match bytes.iter().position(|b| *b != 0) {
        Some(start) => &bytes[start..],
        None => return Some(Amount::Fixed(Decimal::ZERO)),
    };

    if significant.len() <= 32 {
        return Some(scale_u256(U256::from_be_slice(significant), decimals));
    }

    // top word, shifted by the bytes below it
    let (word, rest) = significant.split_at(32);
    let approx = u256_to_f64(U256::from_be_slice(word)) * 256f64.powi(rest.len() as i32);
    let scaled = approx / 10f64.powi(decimals as i32);
    scaled.is_finite().then_some(Amount::Float(scaled))
}

fn u256_to_f64(value: U256) -> f64 {
    // the decimal spelling parses to the nearest f64
    value.to_string().parse().unwrap_or(f64::INFINITY)
}
