/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use uci_parser::UciScore;

/// A numerical evaluation of a position, as seen by the search.
///
/// Scores are totally ordered and bounded by [`Self::INF`] in both directions,
/// so [`Self::ALPHA`] and [`Self::BETA`] work as the initial alpha/beta sentinels.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Score(pub i32);

impl Score {
    /// Largest possible score ever achievable.
    ///
    /// No evaluation may reach this value; it is reserved for bounds and for nodes without any moves.
    pub const INF: Self = Self(i16::MAX as i32);

    /// Initial lower bound of a search.
    pub const ALPHA: Self = Self(-Self::INF.0);

    /// Initial upper bound of a search.
    pub const BETA: Self = Self::INF;

    /// A score of zero.
    pub const ZERO: Self = Self(0);

    /// Creates a new [`Score`] from the provided value.
    #[inline(always)]
    pub const fn new(score: i32) -> Self {
        Self(score)
    }

    /// Creates a [`Score`] from a count of something, such as legal moves.
    ///
    /// Counts are clamped so they never collide with the infinity sentinels.
    #[inline(always)]
    pub fn from_count(count: usize) -> Self {
        Self(count.min(Self::INF.0 as usize - 1) as i32)
    }

    /// Returns `true` if this score is one of the infinity sentinels.
    #[inline(always)]
    pub const fn is_infinite(&self) -> bool {
        self.0.abs() >= Self::INF.0
    }

    /// Converts this [`Score`] into a [`UciScore`].
    ///
    /// Used when sending the `info score` message.
    #[inline(always)]
    pub fn into_uci(self) -> UciScore {
        UciScore::cp(self.0)
    }
}

impl PartialEq<i32> for Score {
    fn eq(&self, other: &i32) -> bool {
        self.0.eq(other)
    }
}

impl fmt::Display for Score {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::INF => write!(f, "+inf"),
            Self::ALPHA => write!(f, "-inf"),
            _ => write!(f, "{}", self.0),
        }
    }
}
