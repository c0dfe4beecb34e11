//! Virtual time.

use std::{fmt, ops::Add};

const PS_PER_NS: u64 = 1_000;
const PS_PER_US: u64 = 1_000_000;
const PS_PER_MS: u64 = 1_000_000_000;
const PS_PER_SEC: u64 = 1_000_000_000_000;

/// Point or span on the simulated clock, in picoseconds.
///
/// Independent of wall-clock time; only the kernel advances it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimTime(u64);

impl SimTime {
    /// Time zero.
    pub const ZERO: Self = Self(0);

    /// Latest representable time.
    pub const MAX: Self = Self(u64::MAX);

    /// Create from picoseconds.
    pub const fn from_ps(ps: u64) -> Self {
        Self(ps)
    }

    /// Create from nanoseconds, saturating at [`SimTime::MAX`].
    pub const fn from_ns(ns: u64) -> Self {
        Self(ns.saturating_mul(PS_PER_NS))
    }

    /// Create from microseconds, saturating at [`SimTime::MAX`].
    pub const fn from_us(us: u64) -> Self {
        Self(us.saturating_mul(PS_PER_US))
    }

    /// Create from milliseconds, saturating at [`SimTime::MAX`].
    pub const fn from_ms(ms: u64) -> Self {
        Self(ms.saturating_mul(PS_PER_MS))
    }

    /// Create from fractional seconds, rounded to the nearest picosecond.
    ///
    /// Returns `None` for negative, non-finite or unrepresentable values.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn from_secs_f64(secs: f64) -> Option<Self> {
        let ps = (secs * PS_PER_SEC as f64).round();
        if !ps.is_finite() || ps < 0.0 || ps >= u64::MAX as f64 {
            return None;
        }
        Some(Self(ps as u64))
    }

    /// Parse a decimal number of seconds, as sent by clients.
    pub fn parse_secs(text: &str) -> Option<Self> {
        text.trim().parse::<f64>().ok().and_then(Self::from_secs_f64)
    }

    /// Picoseconds.
    pub const fn as_ps(self) -> u64 {
        self.0
    }

    /// Whole nanoseconds, truncated.
    pub const fn as_nanos(self) -> u64 {
        self.0 / PS_PER_NS
    }

    /// Fractional seconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / PS_PER_SEC as f64
    }

    /// Whether this is time zero.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Addition saturating at [`SimTime::MAX`].
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Subtraction saturating at [`SimTime::ZERO`].
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Add for SimTime {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units = [(PS_PER_SEC, "s"), (PS_PER_MS, "ms"), (PS_PER_US, "us"), (PS_PER_NS, "ns")];
        if self.0 != 0 {
            for (scale, unit) in units {
                if self.0 % scale == 0 {
                    return write!(f, "{} {}", self.0 / scale, unit);
                }
            }
        }
        write!(f, "{} ps", self.0)
    }
}
