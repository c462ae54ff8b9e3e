//! Full-screen ad kinds and the bitmask used to request several at once.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Sub};
use std::str::FromStr;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::HubError;

/// One full-screen ad kind. Each kind owns one inventory slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdKind {
    /// Interstitial shown between screens.
    Interstitial,
    /// Rewarded ad; the user earns a reward by watching it through.
    Rewarded,
    /// App-open ad shown on launch or foregrounding.
    AppOpen,
}

impl AdKind {
    /// Every kind, in slot order.
    pub const ALL: [Self; 3] = [Self::Interstitial, Self::Rewarded, Self::AppOpen];

    const fn bit(self) -> u8 {
        match self {
            Self::Interstitial => 1 << 0,
            Self::Rewarded => 1 << 1,
            Self::AppOpen => 1 << 2,
        }
    }

    /// Returns the kind as a static string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Interstitial => "interstitial",
            Self::Rewarded => "rewarded",
            Self::AppOpen => "app_open",
        }
    }

    /// How long a loaded unit stays presentable, if it expires at all.
    #[must_use]
    pub fn freshness_window(self) -> Option<TimeDelta> {
        match self {
            Self::AppOpen => Some(TimeDelta::hours(4)),
            Self::Interstitial | Self::Rewarded => None,
        }
    }

    /// Whether the slot refills itself after the ad has been shown.
    ///
    /// App-open units are reloaded by the host on its next foreground
    /// event instead.
    #[must_use]
    pub const fn reloads_after_presentation(self) -> bool {
        !matches!(self, Self::AppOpen)
    }
}

impl fmt::Display for AdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdKind {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interstitial" => Ok(Self::Interstitial),
            "rewarded" => Ok(Self::Rewarded),
            "app_open" | "appopen" | "app-open" => Ok(Self::AppOpen),
            other => Err(HubError::InvalidConfig(format!("unknown ad kind: {other}"))),
        }
    }
}

/// Set of [`AdKind`]s packed into a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdTypes(u8);

impl AdTypes {
    /// Empty set.
    pub const NONE: Self = Self(0);
    /// Interstitial only.
    pub const INTERSTITIAL: Self = Self(1 << 0);
    /// Rewarded only.
    pub const REWARDED: Self = Self(1 << 1);
    /// App-open only.
    pub const APP_OPEN: Self = Self(1 << 2);
    /// Every kind.
    pub const ALL: Self = Self(0b111);

    /// Returns `true` if no kind is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every kind in `other` is also in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if `kind` is in the set.
    #[must_use]
    pub const fn has(self, kind: AdKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Adds `kind`.
    pub fn insert(&mut self, kind: AdKind) {
        self.0 |= kind.bit();
    }

    /// Removes `kind`.
    pub fn remove(&mut self, kind: AdKind) {
        self.0 &= !kind.bit();
    }

    /// Iterates the kinds in the set, in slot order.
    pub fn iter(self) -> impl Iterator<Item = AdKind> {
        AdKind::ALL.into_iter().filter(move |kind| self.has(*kind))
    }
}

impl From<AdKind> for AdTypes {
    fn from(kind: AdKind) -> Self {
        Self(kind.bit())
    }
}

impl FromIterator<AdKind> for AdTypes {
    fn from_iter<T: IntoIterator<Item = AdKind>>(iter: T) -> Self {
        let mut set = Self::NONE;
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl BitOr for AdTypes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for AdTypes {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for AdTypes {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Sub for AdTypes {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 & !rhs.0)
    }
}

impl fmt::Display for AdTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(AdKind::as_str).collect();
        f.write_str(&names.join(","))
    }
}

impl FromStr for AdTypes {
    type Err = HubError;

    /// Parses a comma-separated list such as `"interstitial,rewarded"`.
    /// An empty string is [`AdTypes::NONE`]; `"all"` is [`AdTypes::ALL`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::ALL);
        }
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(AdKind::from_str)
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn set_operations() {
        let mut set = AdTypes::INTERSTITIAL | AdTypes::APP_OPEN;
        assert!(set.has(AdKind::Interstitial));
        assert!(!set.has(AdKind::Rewarded));
        assert!(AdTypes::ALL.contains(set));
        assert!(!set.contains(AdTypes::ALL));

        set.remove(AdKind::Interstitial);
        assert_eq!(set, AdTypes::APP_OPEN);
        set.insert(AdKind::Rewarded);
        assert_eq!(set & AdTypes::REWARDED, AdTypes::REWARDED);
        assert_eq!(AdTypes::ALL - set, AdTypes::INTERSTITIAL);
    }

    #[test]
    fn iter_follows_slot_order() {
        let kinds: Vec<AdKind> = AdTypes::ALL.iter().collect();
        assert_eq!(kinds, AdKind::ALL.to_vec());
        assert_eq!(AdTypes::NONE.iter().count(), 0);
    }

    #[test]
    fn parses_comma_lists() {
        let Ok(parsed) = "interstitial, app_open".parse::<AdTypes>() else {
            panic!("valid list");
        };
        assert_eq!(parsed, AdTypes::INTERSTITIAL | AdTypes::APP_OPEN);
        assert_eq!("".parse::<AdTypes>().ok(), Some(AdTypes::NONE));
        assert_eq!("ALL".parse::<AdTypes>().ok(), Some(AdTypes::ALL));
        assert!("banner".parse::<AdTypes>().is_err());
        assert_eq!(parsed.to_string(), "interstitial,app_open");
    }

    #[test]
    fn only_app_open_expires() {
        assert_eq!(AdKind::AppOpen.freshness_window(), Some(TimeDelta::hours(4)));
        assert!(AdKind::Rewarded.freshness_window().is_none());
        assert!(!AdKind::AppOpen.reloads_after_presentation());
        assert!(AdKind::Interstitial.reloads_after_presentation());
    }
}
