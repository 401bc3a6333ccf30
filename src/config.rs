use std::path::{Path, PathBuf};

use crate::access::profile::ProfileStore;
use crate::access::roster::ClassRosterStore;
use crate::store::ScenarioStore;

pub struct Config {
    /// Root of all persisted state.
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl Config {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// One `<id>.json` per scenario.
    pub fn scenarios_dir(&self) -> PathBuf {
        self.data_dir.join("scenarios")
    }

    pub fn rosters_path(&self) -> PathBuf {
        self.data_dir.join("class_rosters.json")
    }

    pub fn access_path(&self) -> PathBuf {
        self.data_dir.join("access.json")
    }

    pub fn open(&self) -> Stores {
        Stores {
            scenarios: ScenarioStore::new(self.scenarios_dir()),
            rosters: ClassRosterStore::new(self.rosters_path()),
            profiles: ProfileStore::new(self.access_path()),
        }
    }
}

/// The three file-backed stores rooted at one data directory.
pub struct Stores {
    pub scenarios: ScenarioStore,
    pub rosters: ClassRosterStore,
    pub profiles: ProfileStore,
}
