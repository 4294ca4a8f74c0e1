use std::path::Path;

use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;

use crate::catalog::{self, FoodCatalog};
use crate::error::TrackerError;
use crate::history::{self, DEFAULT_WINDOW_DAYS};
use crate::ledger::Ledger;
use crate::models::{HistoryPoint, HistorySummary, IntakeEntry};
use crate::profiles::{ProfileDirectory, Session};
use crate::report::DailyReport;
use crate::store::Store;
use crate::target::{Progress, classify, resolve_target};

/// Everything the dashboard shows for one day.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub profile_name: String,
    pub date: NaiveDate,
    pub entries: Vec<IntakeEntry>,
    pub progress: Progress,
    /// Encouragement for the current state, if a target exists.
    pub message: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct History {
    pub points: Vec<HistoryPoint>,
    pub summary: HistorySummary,
}

/// Facade over the store that applies session gating.
///
/// Consumption features need an active profile with completed registration;
/// anything else fails with `NoActiveProfile` or `SetupRequired`.
pub struct Tracker {
    store: Store,
    today: Option<NaiveDate>,
}

impl Tracker {
    pub fn new(db_path: &Path) -> Result<Self> {
        Ok(Self::with_store(Store::open(db_path)?))
    }

    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::with_store(Store::in_memory()?))
    }

    fn with_store(store: Store) -> Self {
        catalog::sync_cache(&store);
        Self { store, today: None }
    }

    /// Pin "today" instead of reading the local clock.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn directory(&self) -> ProfileDirectory<'_> {
        ProfileDirectory::new(&self.store)
    }

    /// Resolve the session after delivering changes other processes made.
    #[must_use]
    pub fn session(&self) -> Session {
        self.store.sync_external();
        self.directory().session()
    }

    fn check_date(&self, date: NaiveDate) -> crate::error::Result<()> {
        if date > self.today() {
            return Err(TrackerError::FutureDate(date));
        }
        Ok(())
    }

    // --- Intake ---

    pub fn ledger(&self, session: &Session, date: NaiveDate) -> crate::error::Result<Ledger<'_>> {
        let profile = session.require_ready()?;
        self.check_date(date)?;
        Ok(Ledger::open(&self.store, &profile.id, date))
    }

    pub fn catalog(&self, session: &Session) -> crate::error::Result<FoodCatalog<'_>> {
        let profile = session.require_ready()?;
        Ok(FoodCatalog::for_profile(&self.store, &profile.id))
    }

    pub fn dashboard(&self, session: &Session, date: NaiveDate) -> crate::error::Result<Dashboard> {
        let profile = session.require_ready()?;
        let entries = history::day_ledger(&self.store, &profile.id, date, self.today())?;
        let progress = classify(crate::ledger::total_kcal(&entries), resolve_target(profile));
        let message = progress
            .state
            .map(|state| state.message(date.ordinal0() as usize));
        Ok(Dashboard {
            profile_name: profile.name.clone(),
            date,
            entries,
            progress,
            message,
        })
    }

    // --- History ---

    /// The window ends today. The goal line is the profile's TDEE.
    pub fn history(&self, session: &Session, days: Option<u32>) -> crate::error::Result<History> {
        let profile = session.require_ready()?;
        let points = history::build_window(
            &self.store,
            &profile.id,
            profile.tdee,
            days.unwrap_or(DEFAULT_WINDOW_DAYS),
            self.today(),
        );
        let summary = history::summarize(&points);
        Ok(History { points, summary })
    }

    // --- Export ---

    pub fn report(&self, session: &Session, date: NaiveDate) -> crate::error::Result<DailyReport> {
        let profile = session.require_ready()?;
        let entries = history::day_ledger(&self.store, &profile.id, date, self.today())?;
        let foods = FoodCatalog::for_profile(&self.store, &profile.id)
            .all()
            .cloned()
            .collect();
        Ok(DailyReport::build(profile.clone(), date, entries, foods))
    }
}
