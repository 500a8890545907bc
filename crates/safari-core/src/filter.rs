//! Local filtering of cached entity lists.
//!
//! A [`FilterProfile`] says which fields an entity list searches and which
//! exact-match selectors it offers. [`FilterSpec`] carries the values the user
//! picked. Empty values match everything; active predicates are ANDed and the
//! input order is kept.

use crate::cache::EntityCache;
use crate::types::{EntityType, Record};
use safari_config::{AppConfig, FilterProfileConfig};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Name of the free-text predicate
pub const SEARCH: &str = "search";

/// Exact-match predicate against one record field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub name: String,
    pub field: String,
    /// Value compared when the record lacks the field
    pub default: Option<String>,
}

impl Selector {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            field: name.clone(),
            name,
            default: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    fn matches(&self, record: &Record, wanted: &str) -> bool {
        let actual = record
            .text(&self.field)
            .map(|s| s.into_owned())
            .or_else(|| self.default.clone());
        match actual {
            Some(actual) => actual.trim().eq_ignore_ascii_case(wanted),
            None => false,
        }
    }
}

/// Filter layout for one entity list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterProfile {
    pub search_fields: Vec<String>,
    pub selectors: Vec<Selector>,
}

impl FilterProfile {
    pub fn new(search_fields: &[&str], selectors: Vec<Selector>) -> Self {
        Self {
            search_fields: search_fields.iter().map(|s| s.to_string()).collect(),
            selectors,
        }
    }

    /// Profiles used by the admin and staff dashboards
    pub fn builtin(entity: EntityType) -> Self {
        match entity {
            EntityType::Users => Self::new(
                &["firstName", "secondName", "email"],
                vec![
                    Selector::new("role"),
                    Selector::new("status").with_default("ACTIVE"),
                ],
            ),
            EntityType::Boats => Self::new(
                &["boatName", "model", "registrationNumber"],
                vec![Selector::new("status"), Selector::new("type")],
            ),
            EntityType::Trips => Self::new(
                &["name", "location", "route"],
                vec![Selector::new("location")],
            ),
            EntityType::Bookings => {
                Self::new(&["name", "email"], vec![Selector::new("status")])
            }
            EntityType::Staff => Self::new(
                &["firstName", "secondName", "email"],
                vec![Selector::new("role")],
            ),
            EntityType::Guides => Self::new(&["firstName", "secondName"], Vec::new()),
            EntityType::Assignments => {
                Self::new(&["tripName", "boatName", "guideName"], Vec::new())
            }
        }
    }

    /// Built-in profile with configured overrides applied. Non-empty
    /// configured lists replace the built-in ones.
    pub fn from_config(entity: EntityType, config: &FilterProfileConfig) -> Self {
        let mut profile = Self::builtin(entity);
        if !config.search_fields.is_empty() {
            profile.search_fields = config.search_fields.clone();
        }
        if !config.selectors.is_empty() {
            profile.selectors = config
                .selectors
                .iter()
                .map(|s| Selector {
                    name: s.name.clone(),
                    field: s.field.clone().unwrap_or_else(|| s.name.clone()),
                    default: s.default.clone(),
                })
                .collect();
        }
        profile
    }

    fn selector(&self, name: &str) -> Option<&Selector> {
        self.selectors.iter().find(|s| s.name == name)
    }

    fn matches_search(&self, record: &Record, term: &str) -> bool {
        self.search_fields.iter().any(|field| {
            record
                .text(field)
                .map(|value| value.to_lowercase().contains(term))
                .unwrap_or(false)
        })
    }
}

/// Predicate values chosen by the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    values: BTreeMap<String, String>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(term: impl Into<String>) -> Self {
        Self::new().with(SEARCH, term)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Reset every predicate
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Predicates with a non-blank value
    pub fn active(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(k, v)| (k.as_str(), v.trim()))
            .filter(|(_, v)| !v.is_empty())
    }

    pub fn is_active(&self) -> bool {
        self.active().next().is_some()
    }
}

/// Result of one filter pass
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredView {
    pub matched: Vec<Record>,
    pub total_count: usize,
    pub matched_count: usize,
    /// False when the source list has never been fetched
    pub loaded: bool,
}

impl FilteredView {
    pub fn is_loading(&self) -> bool {
        !self.loaded
    }

    /// "Showing N of M users", only when the filter hid something
    pub fn summary(&self, entity: EntityType) -> Option<String> {
        (self.matched_count != self.total_count).then(|| {
            format!(
                "Showing {} of {} {}",
                self.matched_count, self.total_count, entity
            )
        })
    }
}

/// Filter `records` with `spec` under `profile`.
///
/// Predicate names that are neither `search` nor a profile selector compare
/// the record field of the same name.
pub fn apply(records: &[Record], profile: &FilterProfile, spec: &FilterSpec) -> FilteredView {
    let search = spec
        .get(SEARCH)
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty());

    let exact: Vec<(Selector, &str)> = spec
        .active()
        .filter(|(name, _)| *name != SEARCH)
        .map(|(name, value)| {
            let selector = profile
                .selector(name)
                .cloned()
                .unwrap_or_else(|| Selector::new(name));
            (selector, value)
        })
        .collect();

    let matched: Vec<Record> = records
        .iter()
        .filter(|record| {
            search
                .as_deref()
                .map_or(true, |term| profile.matches_search(record, term))
                && exact
                    .iter()
                    .all(|(selector, value)| selector.matches(record, value))
        })
        .cloned()
        .collect();

    FilteredView {
        total_count: records.len(),
        matched_count: matched.len(),
        matched,
        loaded: true,
    }
}

/// Filter profiles per entity type
#[derive(Debug, Clone)]
pub struct FilterEngine {
    profiles: HashMap<EntityType, FilterProfile>,
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self {
            profiles: EntityType::ALL
                .iter()
                .map(|entity| (*entity, FilterProfile::builtin(*entity)))
                .collect(),
        }
    }
}

impl FilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in profiles with the `[filters.<entity>]` overrides applied
    pub fn from_config(config: &AppConfig) -> Self {
        let mut engine = Self::default();
        for entity in EntityType::ALL {
            if let Some(overrides) = config.filters.get(entity.as_str()) {
                engine
                    .profiles
                    .insert(entity, FilterProfile::from_config(entity, overrides));
            }
        }
        engine
    }

    pub fn with_profile(mut self, entity: EntityType, profile: FilterProfile) -> Self {
        self.profiles.insert(entity, profile);
        self
    }

    pub fn profile(&self, entity: EntityType) -> FilterProfile {
        self.profiles
            .get(&entity)
            .cloned()
            .unwrap_or_else(|| FilterProfile::builtin(entity))
    }

    pub fn apply(&self, entity: EntityType, records: &[Record], spec: &FilterSpec) -> FilteredView {
        let view = match self.profiles.get(&entity) {
            Some(profile) => apply(records, profile, spec),
            None => apply(records, &FilterProfile::builtin(entity), spec),
        };
        debug!(
            entity = %entity,
            matched = view.matched_count,
            total = view.total_count,
            "filter applied"
        );
        view
    }

    /// Filter the cached list, flagging lists that were never fetched
    pub fn apply_cached(
        &self,
        entity: EntityType,
        cache: &EntityCache,
        spec: &FilterSpec,
    ) -> FilteredView {
        let mut view = self.apply(entity, cache.get(entity), spec);
        view.loaded = cache.is_loaded(entity);
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users() -> Vec<Record> {
        [
            json!({"userId": 1, "role": "ADMIN", "status": "ACTIVE", "firstName": "Jo", "email": "jo@safari.io"}),
            json!({"userId": 2, "role": "CUSTOMER", "status": "ACTIVE", "firstName": "Al", "email": "al@safari.io"}),
            json!({"userId": 3, "role": "CUSTOMER", "firstName": "Joanna", "secondName": "Reed"}),
            json!({"userId": 4, "role": "STAFF", "status": "inactive", "firstName": "Sam", "email": "SAM@JOB.IO"}),
        ]
        .into_iter()
        .map(|v| Record::from_value(EntityType::Users, v).unwrap())
        .collect()
    }

    fn ids(view: &FilteredView) -> Vec<i64> {
        view.matched.iter().map(Record::id).collect()
    }

    fn engine() -> FilterEngine {
        FilterEngine::new()
    }

    #[test]
    fn search_matches_any_configured_field_case_insensitively() {
        let view = engine().apply(EntityType::Users, &users(), &FilterSpec::search("  JO "));
        assert_eq!(ids(&view), vec![1, 3, 4]);
        assert_eq!(view.total_count, 4);
        assert_eq!(view.matched_count, 3);
    }

    #[test]
    fn blank_values_match_everything() {
        let spec = FilterSpec::search("   ").with("role", "").with("status", "");
        let view = engine().apply(EntityType::Users, &users(), &spec);
        assert_eq!(ids(&view), vec![1, 2, 3, 4]);
        assert!(view.summary(EntityType::Users).is_none());
    }

    #[test]
    fn missing_status_defaults_to_active() {
        let spec = FilterSpec::new().with("status", "active");
        let view = engine().apply(EntityType::Users, &users(), &spec);
        assert_eq!(ids(&view), vec![1, 2, 3]);

        let spec = FilterSpec::new().with("status", "INACTIVE");
        let view = engine().apply(EntityType::Users, &users(), &spec);
        assert_eq!(ids(&view), vec![4]);
    }

    #[test]
    fn predicates_combine_with_and() {
        let spec = FilterSpec::search("jo").with("role", "customer");
        let view = engine().apply(EntityType::Users, &users(), &spec);
        assert_eq!(ids(&view), vec![3]);
        assert_eq!(
            view.summary(EntityType::Users).as_deref(),
            Some("Showing 1 of 4 users")
        );
    }

    #[test]
    fn selector_without_default_excludes_records_missing_the_field() {
        let spec = FilterSpec::new().with("role", "ADMIN");
        let records = vec![Record::from_value(EntityType::Users, json!({"userId": 9})).unwrap()];
        let view = engine().apply(EntityType::Users, &records, &spec);
        assert!(view.matched.is_empty());
    }

    #[test]
    fn unknown_predicate_compares_field_of_same_name() {
        let spec = FilterSpec::new().with("secondName", "reed");
        let view = engine().apply(EntityType::Users, &users(), &spec);
        assert_eq!(ids(&view), vec![3]);
    }

    #[test]
    fn empty_input_yields_zero_counts() {
        let view = engine().apply(EntityType::Users, &[], &FilterSpec::search("x"));
        assert!(view.matched.is_empty());
        assert_eq!(view.matched_count, 0);
        assert_eq!(view.total_count, 0);
    }

    #[test]
    fn apply_cached_distinguishes_unloaded_from_empty() {
        let mut cache = EntityCache::new();
        let view = engine().apply_cached(EntityType::Boats, &cache, &FilterSpec::new());
        assert!(view.is_loading());

        cache.replace_all(EntityType::Boats, Vec::new());
        let view = engine().apply_cached(EntityType::Boats, &cache, &FilterSpec::new());
        assert!(!view.is_loading());
        assert_eq!(view.total_count, 0);
    }

    #[test]
    fn clear_resets_all_predicates() {
        let mut spec = FilterSpec::search("jo").with("role", "ADMIN");
        assert!(spec.is_active());
        spec.clear();
        assert!(!spec.is_active());
        let view = engine().apply(EntityType::Users, &users(), &spec);
        assert_eq!(view.matched_count, 4);
    }

    #[test]
    fn config_overrides_replace_builtin_lists() {
        let mut config = AppConfig::default();
        config.filters.insert(
            "boats".into(),
            FilterProfileConfig {
                search_fields: vec!["model".into()],
                selectors: vec![safari_config::SelectorConfig {
                    name: "kind".into(),
                    field: Some("type".into()),
                    default: Some("SPEEDBOAT".into()),
                }],
            },
        );
        let engine = FilterEngine::from_config(&config);
        let profile = engine.profile(EntityType::Boats);
        assert_eq!(profile.search_fields, vec!["model"]);

        let boats: Vec<Record> = [
            json!({"boatId": 1, "boatName": "Orca", "model": "X1", "type": "PONTOON"}),
            json!({"boatId": 2, "boatName": "Marlin", "model": "orca-2"}),
        ]
        .into_iter()
        .map(|v| Record::from_value(EntityType::Boats, v).unwrap())
        .collect();

        let view = engine.apply(EntityType::Boats, &boats, &FilterSpec::search("orca"));
        assert_eq!(ids(&view), vec![2]);

        let view = engine.apply(
            EntityType::Boats,
            &boats,
            &FilterSpec::new().with("kind", "speedboat"),
        );
        assert_eq!(ids(&view), vec![2]);
    }

    #[test]
    fn filtering_preserves_input_order() {
        let mut records = users();
        records.reverse();
        let view = engine().apply(EntityType::Users, &records, &FilterSpec::search("jo"));
        assert_eq!(ids(&view), vec![4, 3, 1]);
    }
}
