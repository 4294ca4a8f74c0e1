use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::energy::{Energy, compute_energy_for};
use crate::error::{Result, TrackerError};
use crate::models::{Goal, MIN_PASSWORD_LEN, PhysicalData, Profile, ProfileUpdate};
use crate::store::{ACTIVE_PROFILE_KEY, PROFILES_KEY, Store, custom_foods_key, intake_prefix};

/// The profile a caller is acting as, or explicitly nobody.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    profile: Option<Profile>,
}

impl Session {
    #[must_use]
    pub fn anonymous() -> Self {
        Self { profile: None }
    }

    #[must_use]
    pub fn for_profile(profile: Profile) -> Self {
        Self {
            profile: Some(profile),
        }
    }

    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.profile.is_some()
    }

    /// The active profile, or `NoActiveProfile`.
    pub fn require_profile(&self) -> Result<&Profile> {
        self.profile.as_ref().ok_or(TrackerError::NoActiveProfile)
    }

    /// The active profile once its registration is complete (`tdee > 0`).
    pub fn require_ready(&self) -> Result<&Profile> {
        let profile = self.require_profile()?;
        if !profile.is_setup_complete() {
            return Err(TrackerError::SetupRequired);
        }
        Ok(profile)
    }
}

/// Outcome of a profile deletion cascade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub profile_removed: bool,
    pub keys_removed: Vec<String>,
    pub keys_failed: Vec<String>,
}

/// CRUD over the `profiles` collection plus the active-profile pointer.
///
/// Every mutation rewrites the whole collection in a single write.
pub struct ProfileDirectory<'a> {
    store: &'a Store,
}

impl<'a> ProfileDirectory<'a> {
    #[must_use]
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// All profiles. Records that fail to parse are skipped; missing
    /// optional fields are filled with their defaults.
    #[must_use]
    pub fn profiles(&self) -> Vec<Profile> {
        self.store.read_list(PROFILES_KEY)
    }

    fn save(&self, profiles: &[Profile]) {
        self.store.write(PROFILES_KEY, profiles);
    }

    #[must_use]
    pub fn active_profile_id(&self) -> Option<String> {
        self.store
            .read::<Option<String>>(ACTIVE_PROFILE_KEY, None)
            .filter(|id| !id.is_empty())
    }

    fn set_active(&self, id: &str) {
        self.store.write(ACTIVE_PROFILE_KEY, id);
    }

    /// Resolve the current session. An active id that points at no profile
    /// yields an anonymous session.
    #[must_use]
    pub fn session(&self) -> Session {
        let Some(id) = self.active_profile_id() else {
            return Session::anonymous();
        };
        match self.profiles().into_iter().find(|p| p.id == id) {
            Some(profile) => Session::for_profile(profile),
            None => {
                tracing::debug!(profile_id = %id, "active profile id has no matching profile");
                Session::anonymous()
            }
        }
    }

    pub fn register(&self, name: &str, password: &str) -> Result<Profile> {
        let name = name.trim();
        let password = password.trim();
        if name.is_empty() || password.is_empty() {
            return Err(TrackerError::validation("Please fill in all fields"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(TrackerError::WeakPassword);
        }

        let mut profiles = self.profiles();
        if profiles.iter().any(|p| p.matches_name(name)) {
            return Err(TrackerError::DuplicateName(name.to_string()));
        }

        let profile = Profile {
            id: format!("profile-{}", Uuid::new_v4()),
            name: name.to_string(),
            password: password.to_string(),
            sex: Default::default(),
            age: 0,
            weight_kg: 0.0,
            height_cm: 0.0,
            activity_level: Default::default(),
            tdee: 0,
            goal: Goal::Maintenance,
            created_at: Utc::now().to_rfc3339(),
        };
        profiles.push(profile.clone());
        self.save(&profiles);
        self.set_active(&profile.id);
        tracing::info!(profile_id = %profile.id, "registered profile");
        Ok(profile)
    }

    pub fn login(&self, name: &str, password: &str) -> Result<Profile> {
        let name = name.trim();
        let password = password.trim();
        if name.is_empty() || password.is_empty() {
            return Err(TrackerError::validation("Please fill in all fields"));
        }

        let profile = self
            .profiles()
            .into_iter()
            .find(|p| p.matches_name(name))
            .ok_or_else(|| TrackerError::NotFound(name.to_string()))?;
        if profile.password != password {
            return Err(TrackerError::WrongPassword);
        }

        self.set_active(&profile.id);
        tracing::info!(profile_id = %profile.id, "logged in");
        Ok(profile)
    }

    /// Merge `update` into the active profile. Returns `None` when nobody is
    /// logged in. A new name is trimmed and must stay unique ignoring case.
    pub fn update_profile(&self, update: &ProfileUpdate) -> Result<Option<Profile>> {
        let Some(active_id) = self.active_profile_id() else {
            return Ok(None);
        };
        let mut profiles = self.profiles();

        if let Some(name) = &update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(TrackerError::validation("Name cannot be empty"));
            }
            if profiles
                .iter()
                .any(|p| p.id != active_id && p.matches_name(name))
            {
                return Err(TrackerError::DuplicateName(name.to_string()));
            }
        }

        let Some(profile) = profiles.iter_mut().find(|p| p.id == active_id) else {
            return Ok(None);
        };
        update.apply_to(profile);
        let updated = profile.clone();
        self.save(&profiles);
        Ok(Some(updated))
    }

    /// Registration completion: validate the physical data, compute BMR and
    /// TDEE and store them on the active profile.
    pub fn complete_registration(&self, data: &PhysicalData) -> Result<(Profile, Energy)> {
        data.validate()?;
        let energy = compute_energy_for(data);
        let update = ProfileUpdate {
            sex: Some(data.sex),
            age: Some(data.age),
            weight_kg: Some(data.weight_kg),
            height_cm: Some(data.height_cm),
            activity_level: Some(data.activity_level),
            tdee: Some(energy.tdee),
            ..ProfileUpdate::default()
        };
        let profile = self
            .update_profile(&update)?
            .ok_or(TrackerError::NoActiveProfile)?;
        Ok((profile, energy))
    }

    pub fn set_goal(&self, goal: Goal) -> Result<Profile> {
        self.update_profile(&ProfileUpdate {
            goal: Some(goal),
            ..ProfileUpdate::default()
        })?
        .ok_or(TrackerError::NoActiveProfile)
    }

    /// Remove a profile and everything keyed by its id.
    ///
    /// Each ledger and custom-food key is removed independently; a failure
    /// is logged and recorded and the cascade carries on. Keys left behind by
    /// an interrupted cascade are unreachable and harmless.
    pub fn delete_profile(&self, id: &str) -> DeletionReport {
        let mut report = DeletionReport::default();

        let mut profiles = self.profiles();
        let before = profiles.len();
        profiles.retain(|p| p.id != id);
        if profiles.len() != before {
            self.save(&profiles);
            report.profile_removed = true;
        }

        if self.active_profile_id().as_deref() == Some(id) {
            self.logout();
        }

        let mut keys = self.store.keys_with_prefix(&intake_prefix(id));
        keys.push(custom_foods_key(id));
        for key in keys {
            match self.store.try_remove(&key) {
                Ok(true) => report.keys_removed.push(key),
                Ok(false) => {}
                Err(error) => {
                    tracing::warn!(key = %key, error = %error, "cascade delete failed for key");
                    report.keys_failed.push(key);
                }
            }
        }

        tracing::info!(
            profile_id = id,
            removed = report.keys_removed.len(),
            failed = report.keys_failed.len(),
            "deleted profile"
        );
        report
    }

    /// Clear the active-profile pointer. Profile data is kept.
    pub fn logout(&self) {
        self.store.remove(ACTIVE_PROFILE_KEY);
    }
}
