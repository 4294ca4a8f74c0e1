use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::error::{Result, TrackerError};
use crate::models::{FoodItem, IntakeEntry, format_date_iso};
use crate::store::{Store, intake_key};

/// Sum of `kcal_per_unit * units`. Always recomputed, never stored.
#[must_use]
pub fn total_kcal(entries: &[IntakeEntry]) -> f64 {
    entries.iter().map(IntakeEntry::kcal).sum()
}

/// One day's intake entries for one profile, keyed by `(profile_id, date)`.
///
/// Entries are kept in insertion order, oldest first. Every mutation writes
/// the full array back to the store.
pub struct Ledger<'a> {
    store: &'a Store,
    profile_id: String,
    date: NaiveDate,
    entries: Vec<IntakeEntry>,
}

impl<'a> Ledger<'a> {
    pub fn open(store: &'a Store, profile_id: &str, date: NaiveDate) -> Self {
        let entries = store.read_list(&intake_key(profile_id, date));
        Self {
            store,
            profile_id: profile_id.to_string(),
            date,
            entries,
        }
    }

    #[must_use]
    pub fn key(&self) -> String {
        intake_key(&self.profile_id, self.date)
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    #[must_use]
    pub fn entries(&self) -> &[IntakeEntry] {
        &self.entries
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<IntakeEntry> {
        self.entries
    }

    #[must_use]
    pub fn total_kcal(&self) -> f64 {
        total_kcal(&self.entries)
    }

    #[must_use]
    pub fn find(&self, entry_id: &str) -> Option<&IntakeEntry> {
        self.entries.iter().find(|e| e.id == entry_id)
    }

    /// Re-read the day from the store, e.g. after an external change.
    pub fn reload(&mut self) {
        self.entries = self.store.read_list(&self.key());
    }

    /// Log `units` servings of a catalog food. A second add of the same food
    /// on the same day increases the existing entry instead of adding a row.
    pub fn add_catalog_entry(&mut self, food: &FoodItem, units: u32) -> IntakeEntry {
        let units = units.max(1);
        let entry = if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.food_id.as_deref() == Some(food.id.as_str()))
        {
            existing.units = existing.units.saturating_add(units);
            existing.clone()
        } else {
            let entry = self.new_entry(Some(food.id.clone()), None, food.kcal_per_serving, units);
            self.entries.push(entry.clone());
            entry
        };
        self.persist();
        entry
    }

    /// Log a free-text entry. Never merged with other manual entries.
    pub fn add_manual_entry(
        &mut self,
        name: &str,
        kcal_per_unit: f64,
        units: u32,
    ) -> Result<IntakeEntry> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackerError::validation("Food name must not be empty"));
        }
        if !kcal_per_unit.is_finite() || kcal_per_unit <= 0.0 {
            return Err(TrackerError::validation(
                "Calories per unit must be greater than 0",
            ));
        }
        let entry = self.new_entry(None, Some(name.to_string()), kcal_per_unit, units.max(1));
        self.entries.push(entry.clone());
        self.persist();
        Ok(entry)
    }

    /// Set the units of an entry, floored at 1. Returns the updated entry, or
    /// `None` (and changes nothing) when the id is unknown.
    pub fn set_units(&mut self, entry_id: &str, units: i64) -> Option<IntakeEntry> {
        let units = u32::try_from(units.max(1)).unwrap_or(u32::MAX);
        let entry = self.entries.iter_mut().find(|e| e.id == entry_id)?;
        entry.units = units;
        let updated = entry.clone();
        self.persist();
        Some(updated)
    }

    pub fn increment(&mut self, entry_id: &str) -> Option<IntakeEntry> {
        let units = self.find(entry_id)?.units;
        self.set_units(entry_id, i64::from(units) + 1)
    }

    pub fn decrement(&mut self, entry_id: &str) -> Option<IntakeEntry> {
        let units = self.find(entry_id)?.units;
        self.set_units(entry_id, i64::from(units) - 1)
    }

    pub fn remove_entry(&mut self, entry_id: &str) -> Option<IntakeEntry> {
        let index = self.entries.iter().position(|e| e.id == entry_id)?;
        let removed = self.entries.remove(index);
        self.persist();
        Some(removed)
    }

    /// Clear every entry of the day.
    pub fn reset_day(&mut self) {
        self.entries.clear();
        self.store.remove(&self.key());
    }

    fn new_entry(
        &self,
        food_id: Option<String>,
        custom_name: Option<String>,
        kcal_per_unit: f64,
        units: u32,
    ) -> IntakeEntry {
        IntakeEntry {
            id: format!("entry-{}", Uuid::new_v4()),
            date_iso: format_date_iso(self.date),
            food_id,
            custom_name,
            kcal_per_unit,
            units,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    fn persist(&self) {
        self.store.write(&self.key(), &self.entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Change;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn apple() -> FoodItem {
        FoodItem {
            id: "apple".to_string(),
            name: "Apple".to_string(),
            category: "Fruits".to_string(),
            kcal_per_serving: 95.0,
            serving_name: "1 medium".to_string(),
            is_custom: None,
        }
    }

    #[test]
    fn test_add_same_catalog_food_merges() {
        let store = Store::in_memory().unwrap();
        let mut ledger = Ledger::open(&store, "p1", date());
        ledger.add_catalog_entry(&apple(), 1);
        let merged = ledger.add_catalog_entry(&apple(), 1);

        assert_eq!(ledger.entries().len(), 1);
        assert_eq!(merged.units, 2);
        assert!((ledger.total_kcal() - 190.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_catalog_entry_captures_kcal_at_insert() {
        let store = Store::in_memory().unwrap();
        let mut ledger = Ledger::open(&store, "p1", date());
        ledger.add_catalog_entry(&apple(), 1);

        let mut changed = apple();
        changed.kcal_per_serving = 120.0;
        let entry = ledger.add_catalog_entry(&changed, 1);
        assert!((entry.kcal_per_unit - 95.0).abs() < f64::EPSILON);
        assert_eq!(entry.date_iso, "2024-06-15");
    }

    #[test]
    fn test_manual_entries_never_merge() {
        let store = Store::in_memory().unwrap();
        let mut ledger = Ledger::open(&store, "p1", date());
        let a = ledger.add_manual_entry("Tacos", 150.0, 2).unwrap();
        let b = ledger.add_manual_entry("Tacos", 150.0, 1).unwrap();

        assert_eq!(ledger.entries().len(), 2);
        assert_ne!(a.id, b.id);
        assert_eq!(a.custom_name.as_deref(), Some("Tacos"));
        assert!(a.food_id.is_none());
    }

    #[test]
    fn test_manual_entry_validation() {
        let store = Store::in_memory().unwrap();
        let mut ledger = Ledger::open(&store, "p1", date());
        assert!(ledger.add_manual_entry("  ", 100.0, 1).is_err());
        assert!(ledger.add_manual_entry("Soup", 0.0, 1).is_err());
        assert!(ledger.add_manual_entry("Soup", -5.0, 1).is_err());
        assert!(ledger.entries().is_empty());

        let entry = ledger.add_manual_entry("Soup", 80.0, 0).unwrap();
        assert_eq!(entry.units, 1);
    }

    #[test]
    fn test_set_units_floors_at_one() {
        let store = Store::in_memory().unwrap();
        let mut ledger = Ledger::open(&store, "p1", date());
        let entry = ledger.add_catalog_entry(&apple(), 3);

        assert_eq!(ledger.set_units(&entry.id, 0).unwrap().units, 1);
        assert_eq!(ledger.set_units(&entry.id, -5).unwrap().units, 1);
        assert_eq!(ledger.set_units(&entry.id, 4).unwrap().units, 4);
        assert!(ledger.set_units("entry-missing", 2).is_none());
    }

    #[test]
    fn test_increment_decrement() {
        let store = Store::in_memory().unwrap();
        let mut ledger = Ledger::open(&store, "p1", date());
        let entry = ledger.add_manual_entry("Bread", 80.0, 1).unwrap();

        assert_eq!(ledger.increment(&entry.id).unwrap().units, 2);
        assert_eq!(ledger.decrement(&entry.id).unwrap().units, 1);
        assert_eq!(ledger.decrement(&entry.id).unwrap().units, 1);
        assert!(ledger.increment("nope").is_none());
    }

    #[test]
    fn test_remove_entry() {
        let store = Store::in_memory().unwrap();
        let mut ledger = Ledger::open(&store, "p1", date());
        let a = ledger.add_catalog_entry(&apple(), 1);
        ledger.add_manual_entry("Bread", 80.0, 1).unwrap();

        assert!(ledger.remove_entry(&a.id).is_some());
        assert!(ledger.remove_entry(&a.id).is_none());
        assert_eq!(ledger.entries().len(), 1);
    }

    #[test]
    fn test_mutations_persist() {
        let store = Store::in_memory().unwrap();
        {
            let mut ledger = Ledger::open(&store, "p1", date());
            ledger.add_catalog_entry(&apple(), 2);
            ledger.add_manual_entry("Bread", 80.0, 1).unwrap();
        }
        let ledger = Ledger::open(&store, "p1", date());
        assert_eq!(ledger.entries().len(), 2);
        assert_eq!(ledger.entries()[0].food_id.as_deref(), Some("apple"));
        assert!((ledger.total_kcal() - 270.0).abs() < f64::EPSILON);

        // Different day and different profile are independent.
        let next_day = date().succ_opt().unwrap();
        assert!(Ledger::open(&store, "p1", next_day).entries().is_empty());
        assert!(Ledger::open(&store, "p2", date()).entries().is_empty());
    }

    #[test]
    fn test_reset_day() {
        let store = Store::in_memory().unwrap();
        let mut ledger = Ledger::open(&store, "p1", date());
        ledger.add_catalog_entry(&apple(), 2);
        ledger.reset_day();

        assert!(ledger.entries().is_empty());
        assert!(store.keys_with_prefix("intake_p1_").is_empty());
    }

    #[test]
    fn test_reload_picks_up_external_change() {
        let store = Store::in_memory().unwrap();
        let mut ours = Ledger::open(&store, "p1", date());
        let sub = store.subscribe::<Vec<IntakeEntry>>(&ours.key());

        let mut theirs = Ledger::open(&store, "p1", date());
        theirs.add_manual_entry("Coffee", 5.0, 1).unwrap();

        assert!(matches!(sub.try_next(), Some(Change::Updated { .. })));
        assert!(ours.entries().is_empty());
        ours.reload();
        assert_eq!(ours.entries().len(), 1);
    }

    #[test]
    fn test_total_kcal_order_invariant() {
        let store = Store::in_memory().unwrap();
        let mut ledger = Ledger::open(&store, "p1", date());
        ledger.add_catalog_entry(&apple(), 3);
        ledger.add_manual_entry("Rice", 205.5, 2).unwrap();
        ledger.add_manual_entry("Oil", 119.0, 1).unwrap();

        let mut reversed = ledger.entries().to_vec();
        reversed.reverse();
        let expected = 95.0 * 3.0 + 205.5 * 2.0 + 119.0;
        assert!((total_kcal(ledger.entries()) - expected).abs() < 1e-9);
        assert!((total_kcal(&reversed) - expected).abs() < 1e-9);
        assert!(total_kcal(&[]).abs() < f64::EPSILON);
    }
}
