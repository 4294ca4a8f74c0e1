use std::sync::OnceLock;

use uuid::Uuid;

use crate::error::{Result, TrackerError};
use crate::models::{FoodItem, IntakeEntry, NewFood};
use crate::store::{FOODS_CACHE_KEY, Store, custom_foods_key};

const BUILTIN_FOODS_JSON: &str = include_str!("../data/foods.json");

pub const CUSTOM_CATEGORY: &str = "Custom";
const DEFAULT_SERVING_NAME: &str = "1 serving";
pub const FALLBACK_ENTRY_NAME: &str = "Custom food";

/// The read-only catalog shipped with the application.
pub fn builtin_foods() -> &'static [FoodItem] {
    static FOODS: OnceLock<Vec<FoodItem>> = OnceLock::new();
    FOODS.get_or_init(|| {
        serde_json::from_str(BUILTIN_FOODS_JSON).unwrap_or_else(|error| {
            tracing::error!(error = %error, "built-in food catalog is malformed");
            Vec::new()
        })
    })
}

/// Mirror the built-in catalog into the `foodsCache` key.
pub fn sync_cache(store: &Store) {
    store.write(FOODS_CACHE_KEY, builtin_foods());
}

/// Display name of an entry: the catalog name, then the entry's own custom
/// name, then [`FALLBACK_ENTRY_NAME`].
pub fn entry_name<'f>(foods: impl IntoIterator<Item = &'f FoodItem>, entry: &IntakeEntry) -> String {
    let from_catalog = entry
        .food_id
        .as_deref()
        .and_then(|id| foods.into_iter().find(|f| f.id == id));
    match (from_catalog, &entry.custom_name) {
        (Some(food), _) => food.name.clone(),
        (None, Some(name)) => name.clone(),
        (None, None) => FALLBACK_ENTRY_NAME.to_string(),
    }
}

/// Built-in foods unioned with one profile's custom foods.
pub struct FoodCatalog<'a> {
    store: &'a Store,
    profile_id: String,
    custom: Vec<FoodItem>,
}

impl<'a> FoodCatalog<'a> {
    pub fn for_profile(store: &'a Store, profile_id: &str) -> Self {
        let custom = store.read_list(&custom_foods_key(profile_id));
        Self {
            store,
            profile_id: profile_id.to_string(),
            custom,
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &FoodItem> {
        builtin_foods().iter().chain(self.custom.iter())
    }

    #[must_use]
    pub fn custom_foods(&self) -> &[FoodItem] {
        &self.custom
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&FoodItem> {
        self.all().find(|f| f.id == id)
    }

    #[must_use]
    pub fn entry_name(&self, entry: &IntakeEntry) -> String {
        entry_name(self.all(), entry)
    }

    /// Case-insensitive substring match on the name, optionally restricted
    /// to one category.
    #[must_use]
    pub fn search(&self, query: &str, category: Option<&str>) -> Vec<&FoodItem> {
        let query = query.trim().to_lowercase();
        self.all()
            .filter(|f| category.is_none_or(|c| f.category.eq_ignore_ascii_case(c)))
            .filter(|f| query.is_empty() || f.name.to_lowercase().contains(&query))
            .collect()
    }

    /// Category names in catalog order, custom categories last.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = Vec::new();
        for food in self.all() {
            if !categories.iter().any(|c| c == &food.category) {
                categories.push(food.category.clone());
            }
        }
        categories
    }

    pub fn add_custom_food(&mut self, food: &NewFood) -> Result<FoodItem> {
        let name = food.name.trim();
        if name.is_empty() {
            return Err(TrackerError::validation("Food name must not be empty"));
        }
        if !food.kcal_per_serving.is_finite() || food.kcal_per_serving <= 0.0 {
            return Err(TrackerError::validation(
                "Calories per serving must be greater than 0",
            ));
        }

        let category = match food.category.trim() {
            "" => CUSTOM_CATEGORY,
            c => c,
        };
        let serving_name = match food.serving_name.trim() {
            "" => DEFAULT_SERVING_NAME,
            s => s,
        };

        let item = FoodItem {
            id: format!("custom-{}", Uuid::new_v4()),
            name: name.to_string(),
            category: category.to_string(),
            kcal_per_serving: food.kcal_per_serving,
            serving_name: serving_name.to_string(),
            is_custom: Some(true),
        };
        self.custom.push(item.clone());
        self.store
            .write(&custom_foods_key(&self.profile_id), &self.custom);
        tracing::debug!(profile_id = %self.profile_id, food_id = %item.id, "added custom food");
        Ok(item)
    }
}
