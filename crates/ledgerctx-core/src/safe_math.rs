//! Bounded arithmetic for value-transfer logic
//!
//! Contract values are exact integers confined to the symmetric range
//! `[-2^256, 2^256]`. Every operation computes the exact result first and
//! then range-checks it, so overflow is always an error and never a wrap or
//! a silent loss of precision.
//!
//! Division truncates toward zero. A zero divisor fails with
//! [`Error::DivisionByZero`] rather than producing a range error.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive, Zero};

use crate::value::Value;
use crate::{Error, Result};

/// Bit width of the permitted magnitude
pub const MAGNITUDE_BITS: u32 = 256;

/// Largest magnitude a float carries without rounding, `2^53`
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

fn max_bound() -> &'static BigInt {
    static MAX: OnceLock<BigInt> = OnceLock::new();
    MAX.get_or_init(|| BigInt::from(1u8) << MAGNITUDE_BITS)
}

fn min_bound() -> &'static BigInt {
    static MIN: OnceLock<BigInt> = OnceLock::new();
    MIN.get_or_init(|| -max_bound())
}

/// An exact integer within the permitted contract range
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigInt);

impl Amount {
    /// Largest permitted value, `2^256`
    pub fn max() -> Amount {
        Amount(max_bound().clone())
    }

    /// Smallest permitted value, `-2^256`
    pub fn min() -> Amount {
        Amount(min_bound().clone())
    }

    pub fn zero() -> Amount {
        Amount(BigInt::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_bigint(&self) -> &BigInt {
        &self.0
    }

    /// Wrap `n` after checking it against the permitted range
    pub fn checked(n: BigInt) -> Result<Amount> {
        if &n > max_bound() {
            return Err(Error::NumberTooBig(n.to_string()));
        }
        if &n < min_bound() {
            return Err(Error::NumberTooSmall(n.to_string()));
        }
        Ok(Amount(n))
    }

    /// Convert to a storage value: `Integer` when it fits in i64,
    /// otherwise its decimal string
    pub fn to_value(&self) -> Value {
        match self.0.to_i64() {
            Some(i) => Value::Integer(i),
            None => Value::String(self.0.to_string()),
        }
    }
}

pub fn add(a: &Amount, b: &Amount) -> Result<Amount> {
    Amount::checked(&a.0 + &b.0)
}

pub fn sub(a: &Amount, b: &Amount) -> Result<Amount> {
    Amount::checked(&a.0 - &b.0)
}

pub fn mul(a: &Amount, b: &Amount) -> Result<Amount> {
    Amount::checked(&a.0 * &b.0)
}

pub fn div(a: &Amount, b: &Amount) -> Result<Amount> {
    if b.0.is_zero() {
        return Err(Error::DivisionByZero(a.0.to_string()));
    }
    Amount::checked(&a.0 / &b.0)
}

impl From<i64> for Amount {
    fn from(n: i64) -> Self {
        Amount(BigInt::from(n))
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let n = s.trim().parse::<BigInt>().map_err(|_| Error::TypeError {
            expected: "decimal integer".into(),
            found: format!("\"{}\"", s),
        })?;
        Amount::checked(n)
    }
}

impl TryFrom<&Value> for Amount {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(Amount::from(*i)),
            Value::Float(f) if f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT => {
                let n = BigInt::from_f64(*f).ok_or_else(|| Error::TypeError {
                    expected: "integral number".into(),
                    found: f.to_string(),
                })?;
                Amount::checked(n)
            }
            Value::Float(f) => Err(Error::TypeError {
                expected: "integral number within ±2^53".into(),
                found: f.to_string(),
            }),
            Value::String(s) => s.parse(),
            other => Err(Error::TypeError {
                expected: "integer amount".into(),
                found: other.type_name().into(),
            }),
        }
    }
}

impl From<&Amount> for Value {
    fn from(amount: &Amount) -> Self {
        amount.to_value()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
