//! Change sets and the pure observed-vs-desired diff

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::resource::{Attribute, DesiredState, Value};

/// Observed state of one resource, as produced by discovery
///
/// `current` starts as a clone of the desired resource with every attribute
/// unknown; discovery overwrites what it can determine through [`Observed::set`].
/// The dialect tag never takes part in a diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observed<R, D> {
    pub dialect: D,
    pub current: R,
    pub unknown: BTreeSet<Attribute>,
}

impl<R: DesiredState, D> Observed<R, D> {
    pub fn new(dialect: D, desired: &R) -> Self {
        Self {
            dialect,
            current: desired.clone(),
            unknown: desired.attributes().into_iter().map(|(a, _)| a).collect(),
        }
    }

    /// Record a discovered attribute value
    pub fn set(&mut self, attribute: Attribute, update: impl FnOnce(&mut R)) {
        update(&mut self.current);
        self.unknown.remove(&attribute);
    }
}

/// Observed and desired value of one differing attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Change {
    /// `None` when discovery could not determine the value
    pub observed: Option<Value>,
    pub desired: Value,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.observed {
            Some(observed) => write!(f, "{observed} -> {}", self.desired),
            None => write!(f, "unknown -> {}", self.desired),
        }
    }
}

/// Attributes whose observed value differs from the desired one
///
/// An absent attribute needs no action; it does not mean the attribute does
/// not exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet {
    changes: BTreeMap<Attribute, Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `attribute` unless the observed value already matches.
    /// Returns whether an entry was added.
    pub fn record(&mut self, attribute: Attribute, observed: Option<Value>, desired: Value) -> bool {
        if observed == Some(desired) {
            return false;
        }
        self.changes
            .insert(attribute, Change { observed, desired });
        true
    }

    pub fn get(&self, attribute: Attribute) -> Option<&Change> {
        self.changes.get(&attribute)
    }

    pub fn contains(&self, attribute: Attribute) -> bool {
        self.changes.contains_key(&attribute)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, &Change)> {
        self.changes.iter().map(|(a, c)| (*a, c))
    }

    pub fn attributes(&self) -> impl Iterator<Item = Attribute> + '_ {
        self.changes.keys().copied()
    }
}

/// Compare discovered state against desired state
///
/// Unknown observed attributes are always reported as differences.
pub fn diff<R: DesiredState, D>(observed: &Observed<R, D>, desired: &R) -> ChangeSet {
    let current: BTreeMap<Attribute, Value> = observed.current.attributes().into_iter().collect();

    let mut changes = ChangeSet::new();
    for (attribute, wanted) in desired.attributes() {
        let seen = if observed.unknown.contains(&attribute) {
            None
        } else {
            current.get(&attribute).copied()
        };
        changes.record(attribute, seen, wanted);
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Package, PackageState, Service, ServiceState};

    fn observed_service(state: ServiceState, onboot: bool) -> Observed<Service, ()> {
        let desired = Service::new("nginx", state, onboot);
        let mut observed = Observed::new((), &desired);
        observed.set(Attribute::State, |_| {});
        observed.set(Attribute::OnBoot, |_| {});
        observed
    }

    #[test]
    fn test_converged_diff_is_empty() {
        let observed = observed_service(ServiceState::Running, true);
        let desired = Service::new("nginx", ServiceState::Running, true);
        assert!(diff(&observed, &desired).is_empty());
    }

    #[test]
    fn test_onboot_only_difference() {
        for (seen, wanted) in [(false, true), (true, false)] {
            for state in [ServiceState::Running, ServiceState::Stopped] {
                let observed = observed_service(state, seen);
                let desired = Service::new("nginx", state, wanted);
                let changes = diff(&observed, &desired);

                assert_eq!(changes.len(), 1);
                assert_eq!(
                    changes.get(Attribute::OnBoot),
                    Some(&Change {
                        observed: Some(Value::Bool(seen)),
                        desired: Value::Bool(wanted),
                    })
                );
            }
        }
    }

    #[test]
    fn test_unknown_attribute_is_reported() {
        let desired = Service::new("nginx", ServiceState::Running, true);
        let mut observed = Observed::new((), &desired);
        observed.set(Attribute::State, |s| s.state = ServiceState::Running);

        let changes = diff(&observed, &desired);
        assert_eq!(changes.attributes().collect::<Vec<_>>(), vec![Attribute::OnBoot]);
        assert_eq!(changes.get(Attribute::OnBoot).unwrap().observed, None);
    }

    #[test]
    fn test_every_entry_differs() {
        let desired = Package::new("curl", PackageState::Installed);
        let mut observed = Observed::new((), &desired);
        observed.set(Attribute::State, |p| p.state = PackageState::Removed);

        let changes = diff(&observed, &desired);
        for (_, change) in changes.iter() {
            assert_ne!(change.observed, Some(change.desired));
        }
        assert_eq!(
            changes.get(Attribute::State).unwrap().to_string(),
            "removed -> installed"
        );
    }

    #[test]
    fn test_record_skips_equal_values() {
        let mut changes = ChangeSet::new();
        assert!(!changes.record(Attribute::OnBoot, Some(Value::Bool(true)), Value::Bool(true)));
        assert!(changes.is_empty());
        assert!(changes.record(Attribute::OnBoot, None, Value::Bool(true)));
        assert!(changes.contains(Attribute::OnBoot));
    }

    #[test]
    fn test_change_set_json() {
        let mut changes = ChangeSet::new();
        changes.record(
            Attribute::State,
            Some(Value::Service(ServiceState::Stopped)),
            Value::Service(ServiceState::Running),
        );
        let json = serde_json::to_value(&changes).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"state": {"observed": "stopped", "desired": "running"}})
        );
    }
}
