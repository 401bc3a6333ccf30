use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::info;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::access::email::{looks_like_email, normalize_email};
use crate::access::{read_json, write_json};
use crate::error::{Error, Result};

const SEED_STUDENT: &str = "student@ua.edu";
const SEED_ADMIN: &str = "admin@ua.edu";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Anything other than "dark" is light.
    pub fn normalize(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("dark") {
            Theme::Dark
        } else {
            Theme::Light
        }
    }
}

impl From<String> for Theme {
    fn from(value: String) -> Self {
        Theme::normalize(&value)
    }
}

impl FromStr for Theme {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Theme::normalize(s))
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => f.write_str("light"),
            Theme::Dark => f.write_str("dark"),
        }
    }
}

/// Who is using the tool on this machine, and who counts as an admin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessProfile {
    #[serde(default)]
    pub current_email: String,
    #[serde(default)]
    pub admin_emails: Vec<String>,
    #[serde(default)]
    pub theme_by_email: BTreeMap<String, Theme>,
}

impl AccessProfile {
    fn seeded() -> Self {
        Self {
            current_email: SEED_STUDENT.into(),
            admin_emails: vec![SEED_ADMIN.into()],
            theme_by_email: BTreeMap::new(),
        }
    }

    /// Lower-cases everything, drops blank and duplicate admin entries.
    fn normalized(mut self) -> Self {
        self.current_email = normalize_email(&self.current_email);

        let mut admins: Vec<String> = Vec::with_capacity(self.admin_emails.len());
        for email in self.admin_emails.iter().map(|e| normalize_email(e)) {
            if !email.is_empty() && !admins.contains(&email) {
                admins.push(email);
            }
        }
        self.admin_emails = admins;

        self.theme_by_email = self
            .theme_by_email
            .into_iter()
            .map(|(email, theme)| (normalize_email(&email), theme))
            .filter(|(email, _)| !email.is_empty())
            .collect();
        self
    }

    pub fn is_admin(&self) -> bool {
        let current = normalize_email(&self.current_email);
        !current.is_empty() && self.admin_emails.iter().any(|a| normalize_email(a) == current)
    }

    pub fn theme(&self) -> Theme {
        self.theme_by_email
            .get(&normalize_email(&self.current_email))
            .copied()
            .unwrap_or_default()
    }
}

/// `access.json` behind a single lock.
#[derive(Debug)]
pub struct ProfileStore {
    path: PathBuf,
    gate: Mutex<()>,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            gate: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the profile, writing the default one first if the file is missing.
    pub fn profile(&self) -> Result<AccessProfile> {
        let _guard = self.gate.lock();
        self.read_unlocked()
    }

    /// Switches the current user. An empty email signs out.
    pub fn set_current_email(&self, email: &str) -> Result<AccessProfile> {
        let email = normalize_email(email);
        if !email.is_empty() && !looks_like_email(&email) {
            return Err(Error::Validation(format!(
                "'{email}' does not look like an email address."
            )));
        }

        let _guard = self.gate.lock();
        let mut profile = self.read_unlocked()?;
        profile.current_email = email;
        write_json(&self.path, &profile)?;

        info!("Current user is now '{}'", profile.current_email);
        Ok(profile)
    }

    pub fn set_theme(&self, theme: Theme) -> Result<AccessProfile> {
        let _guard = self.gate.lock();
        let mut profile = self.read_unlocked()?;
        if profile.current_email.is_empty() {
            return Err(Error::Validation("Current user is not set.".into()));
        }

        profile
            .theme_by_email
            .insert(profile.current_email.clone(), theme);
        write_json(&self.path, &profile)?;

        info!("Theme for '{}' set to {theme}", profile.current_email);
        Ok(profile)
    }

    fn read_unlocked(&self) -> Result<AccessProfile> {
        match read_json::<AccessProfile>(&self.path)? {
            Some(profile) => Ok(profile.normalized()),
            None => {
                let seed = AccessProfile::seeded();
                write_json(&self.path, &seed)?;
                info!("Wrote default access profile to {}", self.path.display());
                Ok(seed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn store() -> (TempDir, ProfileStore) {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new(dir.path().join("access.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_seeded() {
        let (_dir, store) = store();
        let profile = store.profile().unwrap();
        assert_eq!(profile.current_email, "student@ua.edu");
        assert_eq!(profile.admin_emails, vec!["admin@ua.edu"]);
        assert!(store.path().is_file());
        assert!(!profile.is_admin());
    }

    #[test]
    fn test_admin_check_ignores_case_and_padding() {
        let (_dir, store) = store();
        fs::write(
            store.path(),
            r#"{"currentEmail": "  Admin@UA.EDU ", "adminEmails": ["ADMIN@ua.edu", " ", "admin@ua.edu"]}"#,
        )
        .unwrap();

        let profile = store.profile().unwrap();
        assert_eq!(profile.current_email, "admin@ua.edu");
        assert_eq!(profile.admin_emails, vec!["admin@ua.edu"]);
        assert!(profile.is_admin());
    }

    #[test]
    fn test_set_current_email() {
        let (_dir, store) = store();
        let profile = store.set_current_email(" Someone@UA.edu").unwrap();
        assert_eq!(profile.current_email, "someone@ua.edu");
        assert_eq!(store.profile().unwrap().current_email, "someone@ua.edu");

        assert!(matches!(
            store.set_current_email("not-an-email"),
            Err(Error::Validation(_))
        ));
        assert_eq!(store.set_current_email("").unwrap().current_email, "");
    }

    #[test]
    fn test_theme_is_per_user() {
        let (_dir, store) = store();
        store.set_theme(Theme::Dark).unwrap();
        assert_eq!(store.profile().unwrap().theme(), Theme::Dark);

        store.set_current_email("other@ua.edu").unwrap();
        assert_eq!(store.profile().unwrap().theme(), Theme::Light);
    }

    #[test]
    fn test_theme_needs_current_user() {
        let (_dir, store) = store();
        store.set_current_email("").unwrap();
        assert!(matches!(
            store.set_theme(Theme::Dark),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_stored_themes_are_normalized() {
        let (_dir, store) = store();
        fs::write(
            store.path(),
            r#"{"currentEmail": "s@ua.edu", "adminEmails": [],
                "themeByEmail": {"s@ua.edu": "Dark", "x@ua.edu": "blue"}}"#,
        )
        .unwrap();

        let profile = store.profile().unwrap();
        assert_eq!(profile.theme(), Theme::Dark);
        assert_eq!(profile.theme_by_email.get("x@ua.edu"), Some(&Theme::Light));

        store.set_theme(Theme::Light).unwrap();
        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains(r#""s@ua.edu": "light""#));
    }

    #[test]
    fn test_theme_normalize() {
        assert_eq!(Theme::normalize("DARK"), Theme::Dark);
        assert_eq!(Theme::normalize("blue"), Theme::Light);
        assert_eq!("dark".parse::<Theme>().unwrap(), Theme::Dark);
    }
}
