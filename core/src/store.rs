//! Typed access to the persistent key-value store.
//!
//! Values are JSON text. Reads degrade to a caller-supplied default when the
//! backend fails or a value does not parse; writes that fail are logged and
//! dropped, leaving in-memory state ahead of the persisted state until the
//! next successful write. Subscribers are pushed every change made through
//! the store, plus changes committed by other connections once
//! [`Store::sync_external`] notices them.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};

use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::db::Database;
use crate::error::StorageError;
use crate::models::format_date_iso;

pub const PROFILES_KEY: &str = "profiles";
pub const ACTIVE_PROFILE_KEY: &str = "activeProfileId";
pub const FOODS_CACHE_KEY: &str = "foodsCache";

#[must_use]
pub fn intake_key(profile_id: &str, date: NaiveDate) -> String {
    format!("{}{}", intake_prefix(profile_id), format_date_iso(date))
}

#[must_use]
pub fn intake_prefix(profile_id: &str) -> String {
    format!("intake_{profile_id}_")
}

#[must_use]
pub fn custom_foods_key(profile_id: &str) -> String {
    format!("customFoods_{profile_id}")
}

/// A durable, process-external string-keyed store.
pub trait KvBackend {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    /// Returns whether a value was present.
    fn remove(&self, key: &str) -> anyhow::Result<bool>;
    fn keys_with_prefix(&self, prefix: &str) -> anyhow::Result<Vec<String>>;
    /// A counter that moves when someone else commits to the same data.
    /// Backends with no outside writers return `None`.
    fn data_version(&self) -> anyhow::Result<Option<i64>> {
        Ok(None)
    }
}

/// A change delivered to a [`Subscription`].
#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    Updated { key: String, value: T },
    /// The key was deleted, or its new value could not be parsed. Readers
    /// fall back to their default.
    Reset { key: String },
}

impl<T> Change<T> {
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Change::Updated { key, .. } | Change::Reset { key } => key,
        }
    }

    pub fn into_value_or(self, default: T) -> T {
        match self {
            Change::Updated { value, .. } => value,
            Change::Reset { .. } => default,
        }
    }
}

#[derive(Debug, Clone)]
struct RawChange {
    key: String,
    value: Option<String>,
}

#[derive(Clone)]
enum KeyFilter {
    Exact(String),
    Prefix(String),
}

impl KeyFilter {
    fn matches(&self, key: &str) -> bool {
        match self {
            KeyFilter::Exact(k) => k == key,
            KeyFilter::Prefix(p) => key.starts_with(p.as_str()),
        }
    }
}

struct Subscriber {
    filter: KeyFilter,
    tx: Sender<RawChange>,
}

/// Receiving end of a key (or key prefix) subscription.
pub struct Subscription<T> {
    rx: Receiver<RawChange>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Subscription<T> {
    /// Next pending change, without blocking.
    pub fn try_next(&self) -> Option<Change<T>> {
        let raw = self.rx.try_recv().ok()?;
        Some(decode_change(raw))
    }

    /// All pending changes, oldest first.
    pub fn drain(&self) -> Vec<Change<T>> {
        self.rx.try_iter().map(decode_change).collect()
    }
}

fn decode_change<T: DeserializeOwned>(raw: RawChange) -> Change<T> {
    let RawChange { key, value } = raw;
    match value {
        None => Change::Reset { key },
        Some(text) => match serde_json::from_str(&text) {
            Ok(value) => Change::Updated { key, value },
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "unparseable value in change notification");
                Change::Reset { key }
            }
        },
    }
}

pub struct Store {
    backend: Box<dyn KvBackend>,
    subscribers: RefCell<Vec<Subscriber>>,
    /// Last raw value seen for each watched key, `None` when absent.
    watched: RefCell<BTreeMap<String, Option<String>>>,
    data_version: Cell<Option<i64>>,
}

impl Store {
    pub fn new(backend: impl KvBackend + 'static) -> Self {
        let data_version = backend.data_version().unwrap_or_else(|error| {
            tracing::warn!(error = %error, "failed to read data version");
            None
        });
        Self {
            backend: Box::new(backend),
            subscribers: RefCell::new(Vec::new()),
            watched: RefCell::new(BTreeMap::new()),
            data_version: Cell::new(data_version),
        }
    }

    pub fn open(path: &Path) -> anyhow::Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    // --- Reads ---

    pub fn try_read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(text) = self.try_read_raw(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| StorageError::Parse {
                key: key.to_string(),
                source,
            })
    }

    /// Read and parse `key`, falling back to `default` when it is absent,
    /// unreadable or malformed.
    pub fn read<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.try_read(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(error) => {
                tracing::warn!(key, error = %error, "falling back to default value");
                default
            }
        }
    }

    /// Read a JSON array record by record. Elements that do not match `T`
    /// are skipped; a value that is not an array at all reads as empty.
    pub fn read_list<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let items: Vec<serde_json::Value> = self.read(key, Vec::new());
        items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value(item) {
                Ok(value) => Some(value),
                Err(error) => {
                    tracing::warn!(key, index, error = %error, "skipping malformed record");
                    None
                }
            })
            .collect()
    }

    fn try_read_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.backend
            .get(key)
            .map_err(|source| StorageError::Backend {
                key: key.to_string(),
                source,
            })
    }

    // --- Writes ---

    pub fn try_write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let text = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.backend
            .set(key, &text)
            .map_err(|source| StorageError::Backend {
                key: key.to_string(),
                source,
            })?;
        self.notify(key, Some(text));
        Ok(())
    }

    /// Persist `value` under `key`. A failed write is logged and dropped.
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(error) = self.try_write(key, value) {
            tracing::warn!(key, error = %error, "dropping failed write");
        }
    }

    pub fn try_remove(&self, key: &str) -> Result<bool, StorageError> {
        let removed = self
            .backend
            .remove(key)
            .map_err(|source| StorageError::Backend {
                key: key.to_string(),
                source,
            })?;
        if removed {
            self.notify(key, None);
        }
        Ok(removed)
    }

    /// Best-effort removal; failures are logged.
    pub fn remove(&self, key: &str) -> bool {
        match self.try_remove(key) {
            Ok(removed) => removed,
            Err(error) => {
                tracing::warn!(key, error = %error, "failed to remove key");
                false
            }
        }
    }

    pub fn try_keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.backend
            .keys_with_prefix(prefix)
            .map_err(|source| StorageError::Backend {
                key: format!("{prefix}*"),
                source,
            })
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.try_keys_with_prefix(prefix).unwrap_or_else(|error| {
            tracing::warn!(prefix, error = %error, "failed to enumerate keys");
            Vec::new()
        })
    }

    // --- Subscriptions ---

    pub fn subscribe<T: DeserializeOwned>(&self, key: &str) -> Subscription<T> {
        self.add_subscriber(KeyFilter::Exact(key.to_string()))
    }

    pub fn subscribe_prefix<T: DeserializeOwned>(&self, prefix: &str) -> Subscription<T> {
        self.add_subscriber(KeyFilter::Prefix(prefix.to_string()))
    }

    fn add_subscriber<T>(&self, filter: KeyFilter) -> Subscription<T> {
        let (tx, rx) = mpsc::channel();
        for key in self.keys_matching(&filter) {
            let value = self.try_read_raw(&key).unwrap_or(None);
            self.watched.borrow_mut().insert(key, value);
        }
        self.subscribers.borrow_mut().push(Subscriber { filter, tx });
        Subscription {
            rx,
            _marker: PhantomData,
        }
    }

    /// Keys currently stored under `filter`, plus watched keys it covers.
    fn keys_matching(&self, filter: &KeyFilter) -> BTreeSet<String> {
        let mut keys: BTreeSet<String> = match filter {
            KeyFilter::Exact(key) => BTreeSet::from([key.clone()]),
            KeyFilter::Prefix(prefix) => self.keys_with_prefix(prefix).into_iter().collect(),
        };
        keys.extend(
            self.watched
                .borrow()
                .keys()
                .filter(|key| filter.matches(key))
                .cloned(),
        );
        keys
    }

    /// Deliver changes committed by other connections since the last call.
    ///
    /// When the backend's data version has moved, every key with a
    /// subscriber is re-read and each one whose value differs from what this
    /// store last saw is pushed. Returns the number of keys that changed.
    pub fn sync_external(&self) -> usize {
        let version = match self.backend.data_version() {
            Ok(Some(version)) => version,
            Ok(None) => return 0,
            Err(error) => {
                tracing::warn!(error = %error, "failed to read data version");
                return 0;
            }
        };
        if self.data_version.replace(Some(version)) == Some(version) {
            return 0;
        }

        let filters: Vec<KeyFilter> = self
            .subscribers
            .borrow()
            .iter()
            .map(|sub| sub.filter.clone())
            .collect();
        let keys: BTreeSet<String> = filters
            .iter()
            .flat_map(|filter| self.keys_matching(filter))
            .collect();

        let mut changed = 0;
        for key in keys {
            let current = match self.try_read_raw(&key) {
                Ok(current) => current,
                Err(error) => {
                    tracing::warn!(key = %key, error = %error, "failed to re-read watched key");
                    continue;
                }
            };
            let previous = self.watched.borrow().get(&key).cloned().flatten();
            if current != previous {
                tracing::debug!(key = %key, "external change");
                self.notify(&key, current);
                changed += 1;
            }
        }
        changed
    }

    fn notify(&self, key: &str, value: Option<String>) {
        let mut subscribers = self.subscribers.borrow_mut();
        if subscribers.iter().any(|sub| sub.filter.matches(key)) {
            self.watched
                .borrow_mut()
                .insert(key.to_string(), value.clone());
        }
        subscribers.retain(|sub| {
            if !sub.filter.matches(key) {
                return true;
            }
            let change = RawChange {
                key: key.to_string(),
                value: value.clone(),
            };
            // A send error means the receiver was dropped.
            sub.tx.send(change).is_ok()
        });
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// In-memory backend whose operations can be made to fail.
    #[derive(Default)]
    pub(crate) struct FlakyBackend {
        data: RefCell<BTreeMap<String, String>>,
        pub fail_reads: Cell<bool>,
        pub fail_writes: Cell<bool>,
        /// Removal of these keys fails.
        pub fail_remove: RefCell<Vec<String>>,
    }

    impl KvBackend for std::rc::Rc<FlakyBackend> {
        fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            if self.fail_reads.get() {
                anyhow::bail!("storage unavailable");
            }
            Ok(self.data.borrow().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
            if self.fail_writes.get() {
                anyhow::bail!("quota exceeded");
            }
            self.data
                .borrow_mut()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&self, key: &str) -> anyhow::Result<bool> {
            if self.fail_remove.borrow().iter().any(|k| k == key) {
                anyhow::bail!("remove failed");
            }
            Ok(self.data.borrow_mut().remove(key).is_some())
        }

        fn keys_with_prefix(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
            Ok(self
                .data
                .borrow()
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect())
        }
    }

    pub(crate) fn flaky_store() -> (Store, std::rc::Rc<FlakyBackend>) {
        let backend = std::rc::Rc::new(FlakyBackend::default());
        (Store::new(backend.clone()), backend)
    }

    #[test]
    fn test_read_missing_returns_default() {
        let store = Store::in_memory().unwrap();
        let value: Vec<String> = store.read("profiles", vec!["x".to_string()]);
        assert_eq!(value, vec!["x".to_string()]);
    }

    #[test]
    fn test_write_then_read() {
        let store = Store::in_memory().unwrap();
        store.write("activeProfileId", "profile-1");
        let id: Option<String> = store.read("activeProfileId", None);
        assert_eq!(id.as_deref(), Some("profile-1"));
    }

    #[test]
    fn test_corrupt_value_falls_back_to_default() {
        let (store, backend) = flaky_store();
        backend.set("profiles", "{not json").unwrap();

        let value: Vec<u32> = store.read("profiles", vec![7]);
        assert_eq!(value, vec![7]);
        assert!(matches!(
            store.try_read::<Vec<u32>>("profiles"),
            Err(StorageError::Parse { .. })
        ));
    }

    #[test]
    fn test_backend_read_failure_falls_back_to_default() {
        let (store, backend) = flaky_store();
        backend.set("foodsCache", "[1,2]").unwrap();
        backend.fail_reads.set(true);

        let value: Vec<u32> = store.read("foodsCache", Vec::new());
        assert!(value.is_empty());
        assert!(matches!(
            store.try_read::<Vec<u32>>("foodsCache"),
            Err(StorageError::Backend { .. })
        ));
    }

    #[test]
    fn test_failed_write_is_dropped() {
        let (store, backend) = flaky_store();
        store.write("profiles", &vec![1]);
        backend.fail_writes.set(true);

        store.write("profiles", &vec![1, 2]);
        assert!(store.try_write("profiles", &vec![1, 2]).is_err());

        backend.fail_writes.set(false);
        let value: Vec<u32> = store.read("profiles", Vec::new());
        assert_eq!(value, vec![1]);
    }

    #[test]
    fn test_read_list_skips_malformed_records() {
        let (store, backend) = flaky_store();
        backend.set("nums", r#"[1, "two", 3]"#).unwrap();
        let values: Vec<u32> = store.read_list("nums");
        assert_eq!(values, vec![1, 3]);

        backend.set("nums", r#"{"not":"a list"}"#).unwrap();
        let values: Vec<u32> = store.read_list("nums");
        assert!(values.is_empty());
    }

    #[test]
    fn test_subscribe_exact_key() {
        let store = Store::in_memory().unwrap();
        let sub = store.subscribe::<Vec<u32>>("intake_p1_2024-06-15");

        store.write("intake_p1_2024-06-15", &vec![1, 2]);
        store.write("intake_p1_2024-06-16", &vec![9]);

        assert_eq!(
            sub.try_next(),
            Some(Change::Updated {
                key: "intake_p1_2024-06-15".to_string(),
                value: vec![1, 2]
            })
        );
        assert!(sub.try_next().is_none());
    }

    #[test]
    fn test_subscribe_prefix_and_reset_on_remove() {
        let store = Store::in_memory().unwrap();
        let sub = store.subscribe_prefix::<Vec<u32>>(&intake_prefix("p1"));

        store.write("intake_p1_2024-06-15", &vec![1]);
        store.write("intake_p2_2024-06-15", &vec![2]);
        store.remove("intake_p1_2024-06-15");

        let changes = sub.drain();
        assert_eq!(changes.len(), 2);
        assert!(matches!(&changes[0], Change::Updated { value, .. } if value == &vec![1_u32]));
        assert_eq!(
            changes[1],
            Change::Reset {
                key: "intake_p1_2024-06-15".to_string()
            }
        );
    }

    #[test]
    fn test_removing_absent_key_does_not_notify() {
        let store = Store::in_memory().unwrap();
        let sub = store.subscribe::<u32>("k");
        assert!(!store.remove("k"));
        assert!(sub.try_next().is_none());
    }

    #[test]
    fn test_sync_external_delivers_other_connection_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nibble.db");
        let ours = Store::open(&path).unwrap();
        let theirs = Store::open(&path).unwrap();
        let key = "intake_p1_2024-06-15";
        let sub = ours.subscribe::<Vec<u32>>(key);
        let prefix_sub = ours.subscribe_prefix::<Vec<u32>>(&intake_prefix("p1"));

        assert_eq!(ours.sync_external(), 0);

        theirs.write(key, &vec![1, 2]);
        theirs.write("intake_p2_2024-06-15", &vec![9]);
        assert_eq!(ours.sync_external(), 1);
        assert_eq!(
            sub.try_next(),
            Some(Change::Updated {
                key: key.to_string(),
                value: vec![1, 2]
            })
        );
        assert_eq!(prefix_sub.drain().len(), 1);

        // Nothing new since the last sync.
        assert_eq!(ours.sync_external(), 0);
        assert!(sub.try_next().is_none());

        theirs.remove(key);
        assert_eq!(ours.sync_external(), 1);
        assert_eq!(
            sub.try_next(),
            Some(Change::Reset {
                key: key.to_string()
            })
        );
    }

    #[test]
    fn test_sync_external_skips_own_writes_and_unparseable_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nibble.db");
        let ours = Store::open(&path).unwrap();
        let theirs = Database::open(&path).unwrap();
        let sub = ours.subscribe::<String>(ACTIVE_PROFILE_KEY);

        ours.write(ACTIVE_PROFILE_KEY, "profile-1");
        theirs.set(PROFILES_KEY, "[]").unwrap();
        // The version moved, but the watched key still holds our own write.
        assert_eq!(ours.sync_external(), 0);
        assert_eq!(sub.drain().len(), 1);

        theirs.set(ACTIVE_PROFILE_KEY, "garbage").unwrap();
        assert_eq!(ours.sync_external(), 1);
        assert!(matches!(sub.try_next(), Some(Change::Reset { .. })));
    }

    #[test]
    fn test_sync_external_without_versioned_backend_is_noop() {
        let (store, backend) = flaky_store();
        let sub = store.subscribe::<u32>("k");
        backend.set("k", "1").unwrap();
        assert_eq!(store.sync_external(), 0);
        assert!(sub.try_next().is_none());
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let store = Store::in_memory().unwrap();
        let sub = store.subscribe::<u32>("k");
        let _other = store.subscribe::<u32>("other");
        assert_eq!(store.subscriber_count(), 2);

        drop(sub);
        store.write("k", &1);
        assert_eq!(store.subscriber_count(), 1);
    }

    #[test]
    fn test_key_helpers() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        assert_eq!(intake_key("p1", date), "intake_p1_2024-06-05");
        assert_eq!(intake_prefix("p1"), "intake_p1_");
        assert_eq!(custom_foods_key("p1"), "customFoods_p1");
    }
}
