use anyhow::Result;
use anyhow::anyhow;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};
use std::str::FromStr;

/// Exact fraction of a whole note, always kept in lowest terms.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fraction {
    repr: BigRational,
}

impl Fraction {
    pub fn zero() -> Self {
        Self {
            repr: BigRational::zero(),
        }
    }

    pub fn one() -> Self {
        Self {
            repr: BigRational::one(),
        }
    }

    /// Panics when `denom` is zero.
    pub fn new(numer: i64, denom: i64) -> Self {
        Self {
            repr: BigRational::new(BigInt::from(numer), BigInt::from(denom)),
        }
    }

    pub fn from_integer(value: i64) -> Self {
        Self {
            repr: BigRational::from_integer(BigInt::from(value)),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.repr.is_zero()
    }

    pub fn numer(&self) -> &BigInt {
        self.repr.numer()
    }

    pub fn denom(&self) -> &BigInt {
        self.repr.denom()
    }

    /// True when both terms are at most `max`.
    pub fn terms_within(&self, max: u64) -> bool {
        let bound = BigInt::from(max);
        self.repr.numer().abs() <= bound && self.repr.denom() <= &bound
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.repr.denom().is_one() {
            f.pad(&self.repr.numer().to_string())
        } else {
            f.pad(&format!("{}/{}", self.repr.numer(), self.repr.denom()))
        }
    }
}

impl fmt::Debug for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fraction({})", self)
    }
}

impl Add for Fraction {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self {
            repr: self.repr + other.repr,
        }
    }
}

impl<'a> Add<&'a Fraction> for &'a Fraction {
    type Output = Fraction;

    fn add(self, other: &'a Fraction) -> Self::Output {
        Fraction {
            repr: &self.repr + &other.repr,
        }
    }
}

impl AddAssign<&Fraction> for Fraction {
    fn add_assign(&mut self, other: &Fraction) {
        self.repr += &other.repr;
    }
}

/// Saturates at zero, like a cursor that cannot move before the measure start.
impl Sub for Fraction {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        let repr = self.repr - other.repr;
        if repr.is_negative() {
            Self::zero()
        } else {
            Self { repr }
        }
    }
}

impl<'a> Sub<&'a Fraction> for &'a Fraction {
    type Output = Fraction;

    fn sub(self, other: &'a Fraction) -> Self::Output {
        self.clone() - other.clone()
    }
}

impl Mul for Fraction {
    type Output = Self;

    fn mul(self, other: Self) -> Self::Output {
        Self {
            repr: self.repr * other.repr,
        }
    }
}

impl<'a> Sum<&'a Fraction> for Fraction {
    fn sum<I: Iterator<Item = &'a Fraction>>(iter: I) -> Self {
        iter.fold(Fraction::zero(), |mut acc, item| {
            acc += item;
            acc
        })
    }
}

impl FromStr for Fraction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (numer, denom) = match s.split_once('/') {
            Some((n, d)) => (n, d),
            None => (s, "1"),
        };

        let digits = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
        if !digits(numer) || !digits(denom) {
            return Err(anyhow!("Invalid fraction: {}", s));
        }

        let numer: BigInt = numer
            .parse()
            .map_err(|_e| anyhow!("Invalid fraction: {}", s))?;
        let denom: BigInt = denom
            .parse()
            .map_err(|_e| anyhow!("Invalid fraction: {}", s))?;
        if denom.is_zero() {
            return Err(anyhow!("Zero denominator: {}", s));
        }

        Ok(Self {
            repr: BigRational::new(numer, denom),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsing() {
        let value: Fraction = "3/16".parse().unwrap();
        assert_eq!(value, Fraction::new(3, 16));
        assert_eq!(value.to_string(), "3/16");

        assert_eq!("6/8".parse::<Fraction>().unwrap().to_string(), "3/4");
        assert_eq!("4/4".parse::<Fraction>().unwrap().to_string(), "1");
        assert_eq!("0".parse::<Fraction>().unwrap().to_string(), "0");
        assert_eq!("0/5".parse::<Fraction>().unwrap(), Fraction::zero());
        assert_eq!(" 2 ".parse::<Fraction>().unwrap().to_string(), "2");
    }

    #[test]
    fn test_parse_error() {
        assert!("".parse::<Fraction>().is_err());
        assert!("-1/4".parse::<Fraction>().is_err());
        assert!("1/0".parse::<Fraction>().is_err());
        assert!("1/".parse::<Fraction>().is_err());
        assert!("/4".parse::<Fraction>().is_err());
        assert!("1.5".parse::<Fraction>().is_err());
        assert!("1/2/3".parse::<Fraction>().is_err());
        assert!("a/b".parse::<Fraction>().is_err());
    }

    #[test]
    fn test_op() {
        let quarter = Fraction::new(1, 4);
        let triplet_eighth = Fraction::new(1, 12);

        let sum = &quarter + &triplet_eighth;
        assert_eq!(sum.to_string(), "1/3");

        let three: Fraction = [triplet_eighth.clone(), triplet_eighth.clone(), triplet_eighth]
            .iter()
            .sum();
        assert_eq!(three, Fraction::new(1, 4));

        assert_eq!(Fraction::new(1, 8) - Fraction::new(1, 4), Fraction::zero());
        assert_eq!(
            Fraction::new(3, 2) * Fraction::new(2, 3),
            Fraction::one()
        );
        assert!(Fraction::new(1, 3) < Fraction::new(1, 2));
    }

    #[test]
    fn test_no_rounding_drift() {
        let mut total = Fraction::zero();
        for _ in 0..30 {
            total += &Fraction::new(1, 30);
        }
        assert_eq!(total, Fraction::one());
    }

    #[test]
    fn test_terms_within() {
        assert!(Fraction::new(3, 16).terms_within(16));
        assert!(!Fraction::new(3, 17).terms_within(16));
    }
}
