use log::debug;

use crate::access::email::normalize_email;
use crate::access::profile::{AccessProfile, ProfileStore, Theme};
use crate::access::roster::{ClassRoster, ClassRosterStore};
use crate::error::{Error, Result};
use crate::store::{sort_ids, ScenarioSource};

/// What the current user may do.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessGrant {
    pub email: String,
    pub is_admin: bool,
    /// Sorted case-insensitively, spelled as stored.
    pub allowed_scenario_ids: Vec<String>,
    pub theme: Theme,
}

impl AccessGrant {
    /// The id as the grant spells it, if the grant covers it.
    pub fn allowed_id(&self, scenario_id: &str) -> Option<&str> {
        let scenario_id = scenario_id.trim();
        self.allowed_scenario_ids
            .iter()
            .find(|id| id.eq_ignore_ascii_case(scenario_id))
            .map(String::as_str)
    }

    pub fn allows(&self, scenario_id: &str) -> bool {
        self.allowed_id(scenario_id).is_some()
    }

    /// Returns the stored spelling of the id to load.
    pub fn ensure_allowed(&self, scenario_id: &str) -> Result<&str> {
        self.allowed_id(scenario_id).ok_or_else(|| {
            Error::AccessDenied(format!(
                "You do not have access to scenario '{}'.",
                scenario_id.trim()
            ))
        })
    }

    pub fn ensure_admin(&self) -> Result<()> {
        if self.is_admin {
            Ok(())
        } else if self.email.is_empty() {
            Err(Error::AccessDenied(
                "Sign in as an administrator first.".into(),
            ))
        } else {
            Err(Error::AccessDenied(format!(
                "'{}' is not an administrator.",
                self.email
            )))
        }
    }
}

/// Works out the allowed scenario set for the profile's current user.
///
/// Admins see everything. Students see the union of the allow-lists of every
/// class they belong to, limited to scenarios that exist; one class with an
/// empty allow-list opens everything.
pub fn resolve_access(
    profile: &AccessProfile,
    rosters: &[ClassRoster],
    existing_ids: &[String],
) -> AccessGrant {
    let email = normalize_email(&profile.current_email);
    let theme = profile.theme();

    let mut all = existing_ids.to_vec();
    sort_ids(&mut all);

    let grant = |allowed_scenario_ids: Vec<String>, is_admin: bool| AccessGrant {
        email: email.clone(),
        is_admin,
        allowed_scenario_ids,
        theme,
    };

    if profile.is_admin() {
        return grant(all, true);
    }
    if email.is_empty() {
        return grant(Vec::new(), false);
    }

    let member_of: Vec<&ClassRoster> = rosters.iter().filter(|r| r.has_student(&email)).collect();
    debug!("'{email}' belongs to {} class(es)", member_of.len());

    if member_of.is_empty() {
        return grant(Vec::new(), false);
    }
    if member_of.iter().any(|r| r.allows_everything()) {
        return grant(all, false);
    }

    let allowed = all
        .into_iter()
        .filter(|id| {
            member_of.iter().any(|r| {
                r.allowed_scenario_ids
                    .iter()
                    .any(|a| a.trim().eq_ignore_ascii_case(id))
            })
        })
        .collect();
    grant(allowed, false)
}

/// Reads the profile, the rosters and the scenario list, then resolves.
pub fn current_access(
    profiles: &ProfileStore,
    rosters: &ClassRosterStore,
    scenarios: &dyn ScenarioSource,
) -> Result<AccessGrant> {
    let profile = profiles.profile()?;
    let rosters = rosters.all()?;
    let ids = scenarios.scenario_ids()?;
    let grant = resolve_access(&profile, &rosters, &ids);
    debug!(
        "Access for '{}': admin={}, scenarios={:?}",
        grant.email, grant.is_admin, grant.allowed_scenario_ids
    );
    Ok(grant)
}
