//! Change categories, change reasons and lock tables.
//!
//! Every mutation of the viewing state is reported as a [`ChangeReason`],
//! a set of [`StateChange`] categories. Several fields can share one
//! category (assembly, node and sub addresses all report
//! [`StateChange::Coordinates`]).
//!
//! A subset of the categories is lockable: a caller can pass a [`Locks`]
//! table to gate which of them an update may touch.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// A single change category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateChange {
    /// Full re-initialization.
    Init,
    /// The data model manager was replaced.
    DataModelMgr,
    /// Axial elevation and its mesh indices.
    AxialValue,
    /// Assembly, node and pin/channel selections.
    Coordinates,
    /// Currently displayed dataset.
    CurDataSet,
    /// Color scale range mode.
    ScaleMode,
    /// Dataset used as the time axis.
    TimeDataSet,
    /// Selected state point.
    TimeValue,
    /// Weight based pin suppression.
    WeightsMode,
}

impl StateChange {
    /// Every category in bit order.
    pub const ALL: [StateChange; 9] = [
        StateChange::Init,
        StateChange::DataModelMgr,
        StateChange::AxialValue,
        StateChange::Coordinates,
        StateChange::CurDataSet,
        StateChange::ScaleMode,
        StateChange::TimeDataSet,
        StateChange::TimeValue,
        StateChange::WeightsMode,
    ];

    /// Bit assigned to this category.
    #[must_use]
    pub const fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Human readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            StateChange::Init => "Init",
            StateChange::DataModelMgr => "Data Model Manager",
            StateChange::AxialValue => "Axial Value",
            StateChange::Coordinates => "Coordinates",
            StateChange::CurDataSet => "Current Dataset",
            StateChange::ScaleMode => "Scale Mode",
            StateChange::TimeDataSet => "Time Dataset",
            StateChange::TimeValue => "State Point/Time",
            StateChange::WeightsMode => "Weights Mode",
        }
    }

    /// Returns true if a [`Locks`] table can gate this category.
    #[must_use]
    pub fn is_lockable(self) -> bool {
        LOCKABLE_STATES.iter().any(|(change, _)| *change == self)
    }
}

impl fmt::Display for StateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered lockable categories with their labels.
pub const LOCKABLE_STATES: [(StateChange, &str); 5] = [
    (StateChange::AxialValue, "Axial Value"),
    (StateChange::Coordinates, "Coordinates"),
    (StateChange::CurDataSet, "Current Dataset"),
    (StateChange::ScaleMode, "Scale Mode"),
    (StateChange::TimeValue, "State Point/Time"),
];

/// Set of change categories describing what an update touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChangeReason(u16);

impl ChangeReason {
    /// The empty reason: nothing changed.
    pub const NOOP: ChangeReason = ChangeReason(0);

    /// Creates a reason holding a single category.
    #[must_use]
    pub const fn of(change: StateChange) -> Self {
        Self(change.bit())
    }

    /// Every category.
    #[must_use]
    pub fn all() -> Self {
        StateChange::ALL.into_iter().collect()
    }

    /// Returns true if nothing changed.
    #[must_use]
    pub const fn is_noop(self) -> bool {
        self.0 == 0
    }

    /// Returns true if the category is part of this reason.
    #[must_use]
    pub const fn contains(self, change: StateChange) -> bool {
        self.0 & change.bit() != 0
    }

    /// Returns true if any category of `other` is part of this reason.
    #[must_use]
    pub const fn intersects(self, other: ChangeReason) -> bool {
        self.0 & other.0 != 0
    }

    /// Adds a category.
    pub fn insert(&mut self, change: StateChange) {
        self.0 |= change.bit();
    }

    /// Removes a category.
    pub fn remove(&mut self, change: StateChange) {
        self.0 &= !change.bit();
    }

    /// Returns this reason without the category.
    #[must_use]
    pub const fn without(self, change: StateChange) -> Self {
        Self(self.0 & !change.bit())
    }

    /// Raw bit mask, matching the order of [`StateChange::ALL`].
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Iterates the categories in bit order.
    pub fn iter(self) -> impl Iterator<Item = StateChange> {
        StateChange::ALL
            .into_iter()
            .filter(move |change| self.contains(*change))
    }
}

impl From<StateChange> for ChangeReason {
    fn from(change: StateChange) -> Self {
        Self::of(change)
    }
}

impl FromIterator<StateChange> for ChangeReason {
    fn from_iter<I: IntoIterator<Item = StateChange>>(iter: I) -> Self {
        let mut reason = ChangeReason::NOOP;
        for change in iter {
            reason.insert(change);
        }
        reason
    }
}

impl BitOr for ChangeReason {
    type Output = ChangeReason;

    fn bitor(self, rhs: ChangeReason) -> ChangeReason {
        ChangeReason(self.0 | rhs.0)
    }
}

impl BitOr<StateChange> for ChangeReason {
    type Output = ChangeReason;

    fn bitor(self, rhs: StateChange) -> ChangeReason {
        ChangeReason(self.0 | rhs.bit())
    }
}

impl BitOr for StateChange {
    type Output = ChangeReason;

    fn bitor(self, rhs: StateChange) -> ChangeReason {
        ChangeReason(self.bit() | rhs.bit())
    }
}

impl BitOrAssign for ChangeReason {
    fn bitor_assign(&mut self, rhs: ChangeReason) {
        self.0 |= rhs.0;
    }
}

impl BitOrAssign<StateChange> for ChangeReason {
    fn bitor_assign(&mut self, rhs: StateChange) {
        self.0 |= rhs.bit();
    }
}

impl BitAnd for ChangeReason {
    type Output = ChangeReason;

    fn bitand(self, rhs: ChangeReason) -> ChangeReason {
        ChangeReason(self.0 & rhs.0)
    }
}

impl fmt::Display for ChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_noop() {
            return f.write_str("noop");
        }
        for (i, change) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            f.write_str(change.label())?;
        }
        Ok(())
    }
}

/// Per-caller gate over the lockable categories.
///
/// An entry set to `true` lets updates of that category through. Categories
/// outside [`LOCKABLE_STATES`] are never gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Locks {
    enabled: ChangeReason,
}

impl Locks {
    /// Every lockable category enabled.
    pub const ALL: Locks = Locks {
        enabled: ChangeReason(
            StateChange::AxialValue.bit()
                | StateChange::Coordinates.bit()
                | StateChange::CurDataSet.bit()
                | StateChange::ScaleMode.bit()
                | StateChange::TimeValue.bit(),
        ),
    };

    /// Every lockable category locked out.
    pub const NONE: Locks = Locks {
        enabled: ChangeReason::NOOP,
    };

    /// Creates a fresh table with every lockable category enabled.
    #[must_use]
    pub fn create() -> Self {
        LOCKABLE_STATES
            .iter()
            .map(|(change, _)| (*change, true))
            .collect()
    }

    /// Returns true if updates of the category may be applied.
    #[must_use]
    pub fn is_enabled(&self, change: StateChange) -> bool {
        !change.is_lockable() || self.enabled.contains(change)
    }

    /// Sets the entry for a lockable category; other categories are ignored.
    pub fn set(&mut self, change: StateChange, enabled: bool) {
        if change.is_lockable() {
            if enabled {
                self.enabled.insert(change);
            } else {
                self.enabled.remove(change);
            }
        }
    }

    /// Returns this table with the entry updated.
    #[must_use]
    pub fn with(mut self, change: StateChange, enabled: bool) -> Self {
        self.set(change, enabled);
        self
    }

    /// Iterates `(category, label, enabled)` in lockable order.
    pub fn entries(&self) -> impl Iterator<Item = (StateChange, &'static str, bool)> + '_ {
        LOCKABLE_STATES
            .iter()
            .map(|(change, label)| (*change, *label, self.enabled.contains(*change)))
    }
}

impl Default for Locks {
    fn default() -> Self {
        Self::ALL
    }
}

impl FromIterator<(StateChange, bool)> for Locks {
    fn from_iter<I: IntoIterator<Item = (StateChange, bool)>>(iter: I) -> Self {
        let mut locks = Locks::NONE;
        for (change, enabled) in iter {
            locks.set(change, enabled);
        }
        locks
    }
}

/// Removes every lockable category whose lock entry is disabled.
///
/// [`StateChange::TimeDataSet`] follows the [`StateChange::TimeValue`]
/// entry, the lock that gates time dataset switches.
#[must_use]
pub fn resolve_locks(reason: ChangeReason, locks: &Locks) -> ChangeReason {
    let resolved = LOCKABLE_STATES
        .iter()
        .filter(|(change, _)| !locks.is_enabled(*change))
        .fold(reason, |acc, (change, _)| acc.without(*change));
    if locks.is_enabled(StateChange::TimeValue) {
        resolved
    } else {
        resolved.without(StateChange::TimeDataSet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_union() {
        let mut reason = ChangeReason::NOOP;
        assert!(reason.is_noop());

        reason |= StateChange::Coordinates;
        reason |= StateChange::Coordinates;
        reason |= StateChange::AxialValue | StateChange::TimeValue;

        assert!(reason.contains(StateChange::Coordinates));
        assert!(reason.contains(StateChange::AxialValue));
        assert!(reason.contains(StateChange::TimeValue));
        assert!(!reason.contains(StateChange::CurDataSet));
        assert_eq!(reason.iter().count(), 3);
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(ChangeReason::NOOP.to_string(), "noop");
        let reason = StateChange::AxialValue | StateChange::ScaleMode;
        assert_eq!(reason.to_string(), "Axial Value|Scale Mode");
    }

    #[test]
    fn test_create_locks_matches_constant() {
        let locks = Locks::create();
        assert_eq!(locks, Locks::ALL);
        for (change, _, enabled) in locks.entries() {
            assert!(enabled, "{change} should be enabled");
        }
    }

    #[test]
    fn test_non_lockable_always_enabled() {
        let locks = Locks::NONE;
        assert!(locks.is_enabled(StateChange::WeightsMode));
        assert!(locks.is_enabled(StateChange::DataModelMgr));
        assert!(locks.is_enabled(StateChange::TimeDataSet));
        assert!(!locks.is_enabled(StateChange::Coordinates));
    }

    #[test]
    fn test_set_ignores_non_lockable() {
        let locks = Locks::ALL.with(StateChange::WeightsMode, false);
        assert_eq!(locks, Locks::ALL);
    }

    #[test]
    fn test_resolve_locks_masks_disabled() {
        let reason = StateChange::AxialValue
            | StateChange::Coordinates
            | StateChange::WeightsMode
            | StateChange::TimeDataSet;
        let locks = Locks::ALL
            .with(StateChange::AxialValue, false)
            .with(StateChange::Coordinates, false);

        let resolved = resolve_locks(reason, &locks);
        assert_eq!(
            resolved,
            StateChange::WeightsMode | StateChange::TimeDataSet
        );
        assert_eq!(resolve_locks(reason, &Locks::ALL), reason);
    }

    #[test]
    fn test_time_lock_masks_time_dataset() {
        let reason = StateChange::TimeDataSet | StateChange::TimeValue | StateChange::ScaleMode;
        let locks = Locks::ALL.with(StateChange::TimeValue, false);
        assert_eq!(
            resolve_locks(reason, &locks),
            ChangeReason::of(StateChange::ScaleMode)
        );
    }

    #[test]
    fn test_lockable_order() {
        let labels: Vec<_> = LOCKABLE_STATES.iter().map(|(_, label)| *label).collect();
        assert_eq!(
            labels,
            [
                "Axial Value",
                "Coordinates",
                "Current Dataset",
                "Scale Mode",
                "State Point/Time"
            ]
        );
    }
}
