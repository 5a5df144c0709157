//! Streak badges.
//!
//! Badges are permanent: once a streak reaches a threshold the badge stays
//! in the set even after the streak breaks. Only a habit reset clears them.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A badge from the fixed streak table.
///
/// Variant order is threshold order, so sets iterate ascending by threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Badge {
    #[serde(rename = "7-day")]
    Week,
    #[serde(rename = "30-day")]
    Month,
    #[serde(rename = "90-day")]
    Quarter,
    #[serde(rename = "180-day")]
    HalfYear,
}

impl Badge {
    /// Every badge, ascending by threshold.
    pub const ALL: [Badge; 4] = [Badge::Week, Badge::Month, Badge::Quarter, Badge::HalfYear];

    /// Stable identifier used in storage and output.
    pub fn id(&self) -> &'static str {
        match self {
            Badge::Week => "7-day",
            Badge::Month => "30-day",
            Badge::Quarter => "90-day",
            Badge::HalfYear => "180-day",
        }
    }

    /// Streak length (in days) that unlocks this badge.
    pub fn threshold(&self) -> u32 {
        match self {
            Badge::Week => 7,
            Badge::Month => 30,
            Badge::Quarter => 90,
            Badge::HalfYear => 180,
        }
    }

    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            Badge::Week => "7-day streak",
            Badge::Month => "30-day streak",
            Badge::Quarter => "90-day streak",
            Badge::HalfYear => "180-day streak",
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownBadge(pub String);

impl fmt::Display for UnknownBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown badge id: {}", self.0)
    }
}

impl std::error::Error for UnknownBadge {}

impl FromStr for Badge {
    type Err = UnknownBadge;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Badge::ALL
            .into_iter()
            .find(|b| b.id() == s)
            .ok_or_else(|| UnknownBadge(s.to_string()))
    }
}

/// Set of earned badges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BadgeSet(BTreeSet<Badge>);

impl BadgeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored identifiers, dropping ids that are not in the table.
    pub fn from_ids_lossy<S: AsRef<str>>(ids: &[S]) -> Self {
        ids.iter()
            .filter_map(|id| match id.as_ref().parse::<Badge>() {
                Ok(badge) => Some(badge),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping stored badge");
                    None
                }
            })
            .collect()
    }

    pub fn contains(&self, badge: Badge) -> bool {
        self.0.contains(&badge)
    }

    /// Returns `true` if the badge was newly added.
    pub fn insert(&mut self, badge: Badge) -> bool {
        self.0.insert(badge)
    }

    pub fn iter(&self) -> impl Iterator<Item = Badge> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.iter().map(|b| b.id()).collect()
    }

    pub fn is_superset(&self, other: &BadgeSet) -> bool {
        self.0.is_superset(&other.0)
    }
}

impl FromIterator<Badge> for BadgeSet {
    fn from_iter<T: IntoIterator<Item = Badge>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Union of `previous` with every badge whose threshold is at most `streak`.
///
/// Never removes a badge.
pub fn compute_badges(streak: u32, previous: &BadgeSet) -> BadgeSet {
    let mut earned = previous.clone();
    for badge in Badge::ALL {
        if streak >= badge.threshold() && earned.insert(badge) {
            tracing::debug!(badge = badge.id(), streak, "badge unlocked");
        }
    }
    earned
}

/// Next badge the streak has not reached yet, with days remaining.
pub fn next_badge(streak: u32) -> Option<(Badge, u32)> {
    Badge::ALL
        .into_iter()
        .find(|b| b.threshold() > streak)
        .map(|b| (b, b.threshold() - streak))
}
