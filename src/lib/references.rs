//! Named references and bookmark destinations.
//!
//! Elements that can be referred to later get a [`ReferenceId`]. A reference
//! may also carry a human name, so `names` maps name to id and `links` maps
//! id to the element it points at. Destinations are the bookmark keys that
//! headings register and that inner links target.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::ReportError;

/// Identifier of a referenceable element (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceId(Uuid);

impl ReferenceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReferenceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ReferenceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for ReferenceId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// What a reference points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRecord {
    /// Position of the element in the report's buffer.
    pub element: usize,
    /// The bound name, or the id's text when none was given.
    pub display_name: String,
}

/// The name, reference and destination tables of one report.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    names: HashMap<String, ReferenceId>,
    links: HashMap<ReferenceId, ReferenceRecord>,
    destinations: HashSet<String>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that `id` and `name` are free without registering anything.
    pub fn check(&self, id: ReferenceId, name: Option<&str>) -> Result<(), ReportError> {
        if self.links.contains_key(&id) {
            return Err(ReportError::DuplicateReference { id: id.to_string() });
        }
        if let Some(name) = name {
            if self.names.contains_key(name) {
                return Err(ReportError::DuplicateName {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Records a reference to the element at `element`.
    ///
    /// Fails without changing either table when `id` is already registered
    /// or `name` is already bound.
    pub fn register(
        &mut self,
        id: ReferenceId,
        name: Option<&str>,
        element: usize,
    ) -> Result<(), ReportError> {
        self.check(id, name)?;
        self.insert(id, name, element);
        Ok(())
    }

    /// Records a reference whose id and name were already checked.
    pub(crate) fn insert(&mut self, id: ReferenceId, name: Option<&str>, element: usize) {
        let display_name = match name {
            Some(name) => {
                self.names.insert(name.to_string(), id);
                name.to_string()
            }
            None => id.to_string(),
        };
        self.links.insert(
            id,
            ReferenceRecord {
                element,
                display_name,
            },
        );
    }

    pub fn resolve(&self, name: &str) -> Option<ReferenceId> {
        self.names.get(name).copied()
    }

    pub fn record(&self, id: &ReferenceId) -> Option<&ReferenceRecord> {
        self.links.get(id)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = (&str, &ReferenceId)> {
        self.names.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn check_destination(&self, key: &str) -> Result<(), ReportError> {
        if self.destinations.contains(key) {
            return Err(ReportError::DuplicateDestination {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    pub fn add_destination(&mut self, key: &str) -> Result<(), ReportError> {
        self.check_destination(key)?;
        self.destinations.insert(key.to_string());
        Ok(())
    }

    pub fn has_destination(&self, key: &str) -> bool {
        self.destinations.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<ReferenceId> = (0..1000).map(|_| ReferenceId::new()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_id_text_round_trips() {
        let id = ReferenceId::new();
        assert_eq!(id.to_string().parse::<ReferenceId>().unwrap(), id);
        assert_eq!(id.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn test_named_registration() {
        let mut table = ReferenceTable::new();
        let id = ReferenceId::new();
        table.register(id, Some("intro"), 0).unwrap();
        assert_eq!(table.resolve("intro"), Some(id));
        assert_eq!(table.record(&id).unwrap().display_name, "intro");
        assert_eq!(table.record(&id).unwrap().element, 0);
    }

    #[test]
    fn test_unnamed_registration_uses_id_text() {
        let mut table = ReferenceTable::new();
        let id = ReferenceId::new();
        table.register(id, None, 3).unwrap();
        assert_eq!(table.record(&id).unwrap().display_name, id.to_string());
        assert_eq!(table.names().count(), 0);
    }

    #[test]
    fn test_duplicate_name_leaves_tables_unchanged() {
        let mut table = ReferenceTable::new();
        let first = ReferenceId::new();
        table.register(first, Some("intro"), 0).unwrap();

        let second = ReferenceId::new();
        let err = table.register(second, Some("intro"), 1).unwrap_err();
        assert!(matches!(err, ReportError::DuplicateName { .. }));
        assert_eq!(table.resolve("intro"), Some(first));
        assert!(table.record(&second).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut table = ReferenceTable::new();
        let id = ReferenceId::new();
        table.register(id, None, 0).unwrap();
        assert!(matches!(
            table.register(id, Some("other"), 1),
            Err(ReportError::DuplicateReference { .. })
        ));
        assert!(table.resolve("other").is_none());
    }

    #[test]
    fn test_destinations() {
        let mut table = ReferenceTable::new();
        assert!(!table.has_destination("results"));
        table.add_destination("results").unwrap();
        assert!(table.has_destination("results"));
        assert!(matches!(
            table.add_destination("results"),
            Err(ReportError::DuplicateDestination { .. })
        ));
    }
}
