//! Book channel selection by requested depth and account tier

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FeedError, FeedResult};

/// Account tier with the venue. Higher tiers unlock tick-by-tick book channels.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct VenueTier(pub u8);

impl fmt::Display for VenueTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Venue order-book channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookChannel {
    /// Five-level snapshots
    Books5,
    /// Standard incremental book
    Books,
    /// Fifty levels, tick by tick
    Books50L2Tbt,
    /// Four hundred levels, tick by tick
    BooksL2Tbt,
}

/// Minimum tier for `books50-l2-tbt`
pub const TIER_BOOKS50_L2_TBT: u8 = 4;
/// Minimum tier for `books-l2-tbt`
pub const TIER_BOOKS_L2_TBT: u8 = 5;

impl BookChannel {
    /// Picks the channel for a depth subscription.
    ///
    /// Depth 5 maps to `books5`, 50 to `books50-l2-tbt`, and 0 (full) or 400 to
    /// `books-l2-tbt` when the tier allows it, else `books`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidDepth`] outside {0, 5, 50, 400} and
    /// [`FeedError::TierInsufficient`] for depth 50 below tier 4.
    pub fn select(depth: usize, tier: VenueTier) -> FeedResult<Self> {
        match depth {
            5 => Ok(Self::Books5),
            50 => {
                if tier.0 < TIER_BOOKS50_L2_TBT {
                    return Err(FeedError::TierInsufficient {
                        channel: Self::Books50L2Tbt.as_str(),
                        required: TIER_BOOKS50_L2_TBT,
                        tier: tier.0,
                    });
                }
                Ok(Self::Books50L2Tbt)
            }
            0 | 400 if tier.0 >= TIER_BOOKS_L2_TBT => Ok(Self::BooksL2Tbt),
            0 | 400 => Ok(Self::Books),
            _ => Err(FeedError::InvalidDepth { depth }),
        }
    }

    /// Venue channel name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Books5 => "books5",
            Self::Books => "books",
            Self::Books50L2Tbt => "books50-l2-tbt",
            Self::BooksL2Tbt => "books-l2-tbt",
        }
    }

    /// Parses a venue channel name
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::UnknownChannel`] for any other name.
    pub fn from_name(name: &str) -> FeedResult<Self> {
        match name {
            "books5" => Ok(Self::Books5),
            "books" => Ok(Self::Books),
            "books50-l2-tbt" => Ok(Self::Books50L2Tbt),
            "books-l2-tbt" => Ok(Self::BooksL2Tbt),
            other => Err(FeedError::UnknownChannel(other.to_string())),
        }
    }

    /// Whether each message replaces the whole visible book
    #[must_use]
    pub const fn is_snapshot(&self) -> bool {
        matches!(self, Self::Books5)
    }
}

impl fmt::Display for BookChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
