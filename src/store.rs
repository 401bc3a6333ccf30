use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{debug, info, trace};
use regex::Regex;

use crate::error::{Error, Result};
use crate::scenario::document::ScenarioDocument;
use crate::scenario::{seed, Scenario};

static SCENARIO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("scenario id pattern"));

pub fn is_valid_scenario_id(id: &str) -> bool {
    SCENARIO_ID.is_match(id)
}

/// Sorts ids ignoring ASCII case and drops ids that differ only in case.
pub fn sort_ids(ids: &mut Vec<String>) {
    ids.sort_by_key(|id| id.to_ascii_lowercase());
    ids.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
}

/// Where loaded scenarios come from.
pub trait ScenarioSource {
    /// Every scenario id that can be loaded, sorted case-insensitively.
    fn scenario_ids(&self) -> Result<Vec<String>>;

    /// The fully hydrated scenario, or [`Error::NotFound`].
    fn load_scenario(&self, id: &str) -> Result<Scenario>;
}

/// Directory of `<id>.json` scenario documents.
#[derive(Debug, Clone)]
pub struct ScenarioStore {
    dir: PathBuf,
}

impl ScenarioStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        if !is_valid_scenario_id(id) {
            return Err(Error::Validation(format!(
                "'{id}' is not a valid scenario id (letters, digits, '-' and '_' only)."
            )));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    pub fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.path_for(id)?.is_file())
    }

    pub fn load_document(&self, id: &str) -> Result<ScenarioDocument> {
        let path = self.path_for(id)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::NotFound(format!("Scenario '{id}' not found.")))
            }
            Err(e) => return Err(Error::io(path, e)),
        };
        trace!("Raw scenario {id}:\n{raw}");
        serde_json::from_str(&raw).map_err(|e| Error::json(path, e))
    }

    /// Validates the document, then writes it pretty-printed.
    pub fn save(&self, id: &str, doc: &ScenarioDocument) -> Result<()> {
        let path = self.path_for(id)?;
        Scenario::from_document(doc)?;

        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let json = serde_json::to_string_pretty(doc).map_err(|e| Error::json(&path, e))?;
        fs::write(&path, json).map_err(|e| Error::io(&path, e))?;

        info!("Saved scenario '{id}' to {}", path.display());
        Ok(())
    }

    /// Returns `false` when there was nothing to delete.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted scenario '{id}'");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// Writes the built-in scenarios that are not present yet. Returns the ids written.
    pub fn seed_defaults(&self) -> Result<Vec<String>> {
        let mut written = Vec::new();
        for (id, doc) in seed::default_scenarios() {
            if self.exists(id)? {
                debug!("Seed scenario '{id}' already present, skipping");
                continue;
            }
            self.save(id, &doc)?;
            written.push(id.to_string());
        }
        Ok(written)
    }
}

impl ScenarioSource for ScenarioStore {
    fn scenario_ids(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(&self.dir, e)),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| Error::io(&self.dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") || !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if is_valid_scenario_id(stem) {
                    ids.push(stem.to_string());
                }
            }
        }
        sort_ids(&mut ids);
        Ok(ids)
    }

    fn load_scenario(&self, id: &str) -> Result<Scenario> {
        let doc = self.load_document(id)?;
        let scenario = Scenario::from_document(&doc)?;
        info!("Loaded scenario '{id}': {}", scenario.title());
        Ok(scenario)
    }
}
