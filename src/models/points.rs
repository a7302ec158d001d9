//! Story-point estimates restricted to the Fibonacci scale.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Allowed story-point values.
pub const FIBONACCI_POINTS: [u8; 6] = [1, 2, 3, 5, 8, 13];

const INVALID_POINTS: &str = "Points must be fibonacci: [1, 2, 3, 5, 8, 13]";

/// A validated story-point estimate.
///
/// Construction and deserialization both reject values outside
/// [`FIBONACCI_POINTS`], so a `Points` in hand is always on the scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Points(u8);

impl Points {
    pub fn new(value: u8) -> Result<Self> {
        if FIBONACCI_POINTS.contains(&value) {
            Ok(Points(value))
        } else {
            Err(Error::InvalidInput(format!("{} (got {})", INVALID_POINTS, value)))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Widened value for summing.
    pub fn as_u32(self) -> u32 {
        self.0 as u32
    }
}

impl TryFrom<u8> for Points {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        if FIBONACCI_POINTS.contains(&value) {
            Ok(Points(value))
        } else {
            Err(INVALID_POINTS.to_string())
        }
    }
}

impl From<Points> for u8 {
    fn from(points: Points) -> u8 {
        points.0
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sum of optional estimates, treating missing ones as zero.
pub fn sum_points<I>(points: I) -> u32
where
    I: IntoIterator<Item = Option<Points>>,
{
    points.into_iter().flatten().map(Points::as_u32).sum()
}
