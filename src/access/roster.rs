use std::path::{Path, PathBuf};

use log::{info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::email::{looks_like_email, normalize_email, same_email};
use crate::access::{read_json, write_json};
use crate::error::{Error, Result};
use crate::store::sort_ids;

/// A named group of students and the scenarios they may open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRoster {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub students: Vec<String>,
    /// Empty means every scenario.
    #[serde(default)]
    pub allowed_scenario_ids: Vec<String>,
}

/// Class names sort and compare by their Unicode lower-case form.
fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl ClassRoster {
    pub fn has_student(&self, email: &str) -> bool {
        self.students.iter().any(|s| same_email(s, email))
    }

    pub fn allows_everything(&self) -> bool {
        self.allowed_scenario_ids.iter().all(|id| id.trim().is_empty())
    }
}

/// `class_rosters.json` behind a single lock. Every mutation is a
/// read-modify-write while holding it.
#[derive(Debug)]
pub struct ClassRosterStore {
    path: PathBuf,
    gate: Mutex<()>,
}

impl ClassRosterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            gate: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All rosters, ordered by name (case-insensitive).
    pub fn all(&self) -> Result<Vec<ClassRoster>> {
        let _guard = self.gate.lock();
        let mut all = self.read_unlocked()?;
        all.sort_by_key(|r| name_key(&r.name));
        Ok(all)
    }

    pub fn get(&self, class_id: &str) -> Result<ClassRoster> {
        let _guard = self.gate.lock();
        self.read_unlocked()?
            .into_iter()
            .find(|r| r.id == class_id)
            .ok_or_else(|| Error::NotFound(format!("Class '{class_id}' not found.")))
    }

    pub fn create_class(&self, name: &str) -> Result<ClassRoster> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Class name cannot be empty.".into()));
        }

        let _guard = self.gate.lock();
        let mut all = self.read_unlocked()?;
        if all.iter().any(|r| name_key(&r.name) == name_key(name)) {
            return Err(Error::Validation(format!(
                "A class named '{name}' already exists."
            )));
        }

        let roster = ClassRoster {
            id: Uuid::new_v4().simple().to_string(),
            name: name.to_string(),
            students: Vec::new(),
            allowed_scenario_ids: Vec::new(),
        };
        all.push(roster.clone());
        write_json(&self.path, &all)?;

        info!("Created class '{}' ({})", roster.name, roster.id);
        Ok(roster)
    }

    pub fn delete_class(&self, class_id: &str) -> Result<bool> {
        self.modify(|all| {
            let before = all.len();
            all.retain(|r| r.id != class_id);
            before != all.len()
        })
    }

    /// `false` if the class does not exist or already has the student.
    pub fn add_student(&self, class_id: &str, email: &str) -> Result<bool> {
        let email = normalize_email(email);
        if !looks_like_email(&email) {
            return Err(Error::Validation(format!(
                "'{email}' does not look like an email address."
            )));
        }

        self.modify(|all| match all.iter_mut().find(|r| r.id == class_id) {
            Some(roster) if !roster.has_student(&email) => {
                roster.students.push(email.clone());
                true
            }
            Some(_) => false,
            None => {
                warn!("add_student: no class with id '{class_id}'");
                false
            }
        })
    }

    pub fn remove_student(&self, class_id: &str, email: &str) -> Result<bool> {
        self.modify(|all| {
            let Some(roster) = all.iter_mut().find(|r| r.id == class_id) else {
                return false;
            };
            let before = roster.students.len();
            roster.students.retain(|s| !same_email(s, email));
            before != roster.students.len()
        })
    }

    /// Replaces the allow-list. Passing nothing opens every scenario to the class.
    pub fn set_allowed_scenarios(&self, class_id: &str, ids: &[String]) -> Result<bool> {
        let mut cleaned: Vec<String> = ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        sort_ids(&mut cleaned);

        self.modify(|all| match all.iter_mut().find(|r| r.id == class_id) {
            Some(roster) => {
                roster.allowed_scenario_ids = cleaned.clone();
                true
            }
            None => false,
        })
    }

    /// Applies `change` under the lock and writes back only when it reports a change.
    fn modify(&self, change: impl FnOnce(&mut Vec<ClassRoster>) -> bool) -> Result<bool> {
        let _guard = self.gate.lock();
        let mut all = self.read_unlocked()?;
        let changed = change(&mut all);
        if changed {
            write_json(&self.path, &all)?;
        }
        Ok(changed)
    }

    fn read_unlocked(&self) -> Result<Vec<ClassRoster>> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }
}
