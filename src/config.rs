//! Server and campaign configuration parsing, validation and lookups.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::campaign::FileType;
use crate::{AppError, Result};

fn default_checkpoints_dir() -> PathBuf {
    PathBuf::from("checkpoints")
}

/// A DCS server whose saves directory holds campaign files.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    /// Directory the server reads and writes campaign saves in.
    pub path: PathBuf,
    /// Free-text description shown to operators.
    #[serde(default)]
    pub description: Option<String>,
}

/// Historically valid filenames for one campaign file type.
///
/// The first entry is the current canonical name; later entries are
/// names used by older campaign versions.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub struct FileList {
    /// Known filenames, canonical first.
    #[serde(default)]
    pub files: Vec<String>,
    /// Whether the campaign can run without this file.
    #[serde(default)]
    pub optional: bool,
}

/// Per-type file lists for a campaign.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub struct CampaignFiles {
    /// Main persistence script.
    #[serde(default)]
    pub persistence: FileList,
    /// CTLD save data.
    #[serde(default)]
    pub ctld_save: FileList,
    /// CTLD FARP data.
    #[serde(default)]
    pub ctld_farps: FileList,
    /// Warehouse storage data.
    #[serde(default)]
    pub storage: FileList,
}

impl CampaignFiles {
    /// File list for the given type.
    #[must_use]
    pub fn get(&self, file_type: FileType) -> &FileList {
        match file_type {
            FileType::Persistence => &self.persistence,
            FileType::CtldSave => &self.ctld_save,
            FileType::CtldFarps => &self.ctld_farps,
            FileType::Storage => &self.storage,
        }
    }

    /// Iterate over every configured filename across all types.
    pub fn all_files(&self) -> impl Iterator<Item = &str> {
        FileType::ALL
            .into_iter()
            .flat_map(move |ft| self.get(ft).files.iter().map(String::as_str))
    }
}

/// A registered campaign.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct CampaignConfig {
    /// Human-readable campaign name.
    pub display_name: String,
    /// Known filenames by type.
    #[serde(default)]
    pub files: CampaignFiles,
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Directory where checkpoint archives are written.
    #[serde(default = "default_checkpoints_dir")]
    pub checkpoints_dir: PathBuf,
    /// Servers by name.
    #[serde(default)]
    pub servers: BTreeMap<String, ServerConfig>,
    /// Campaigns by identifier.
    #[serde(default)]
    pub campaigns: BTreeMap<String, CampaignConfig>,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// A relative `checkpoints_dir` is resolved against the directory
    /// holding the configuration file.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the file does not exist,
    /// `AppError::Config` if it contains invalid TOML or fails validation.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => {
                AppError::NotFound(format!("config file {}", path.display()))
            }
            _ => AppError::Config(format!("failed to read config: {err}")),
        })?;
        let mut config = Self::from_toml_str(&raw)?;

        if config.checkpoints_dir.is_relative() {
            if let Some(base) = path.parent() {
                config.checkpoints_dir = base.join(&config.checkpoints_dir);
            }
        }

        Ok(config)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Directory where checkpoint archives are written and listed.
    #[must_use]
    pub fn checkpoints_dir(&self) -> &Path {
        &self.checkpoints_dir
    }

    /// Look up a server by name.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the server is not configured.
    pub fn server(&self, name: &str) -> Result<&ServerConfig> {
        self.servers.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.servers.keys().map(String::as_str).collect();
            AppError::NotFound(format!(
                "server '{name}' is not configured (known servers: {})",
                known.join(", ")
            ))
        })
    }

    /// Files of one type for a campaign, if the campaign is configured.
    #[must_use]
    pub fn campaign_files(&self, campaign_id: &str, file_type: FileType) -> Option<&FileList> {
        self.campaigns
            .get(campaign_id)
            .map(|campaign| campaign.files.get(file_type))
    }

    /// Build the historical-to-canonical rename table for a campaign.
    ///
    /// Returns an empty table for unknown campaigns.
    #[must_use]
    pub fn rename_table(&self, campaign_id: &str) -> RenameTable {
        let mut table = RenameTable::default();
        let Some(campaign) = self.campaigns.get(campaign_id) else {
            return table;
        };

        for file_type in FileType::ALL {
            let list = campaign.files.get(file_type);
            if let Some((canonical, historical)) = list.files.split_first() {
                for old in historical {
                    if old != canonical {
                        table.insert(old.clone(), canonical.clone());
                    }
                }
            }
        }

        table
    }

    fn validate(&self) -> Result<()> {
        for (name, server) in &self.servers {
            if server.path.as_os_str().is_empty() {
                return Err(AppError::Config(format!(
                    "server '{name}' must have a non-empty path"
                )));
            }
        }

        let mut owners: HashMap<&str, &str> = HashMap::new();
        for (id, campaign) in &self.campaigns {
            if id.trim().is_empty() {
                return Err(AppError::Config("campaign id must not be empty".into()));
            }
            if campaign.display_name.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "campaign '{id}' must have a display_name"
                )));
            }
            if campaign.files.persistence.files.is_empty() {
                return Err(AppError::Config(format!(
                    "campaign '{id}' must list at least one persistence file"
                )));
            }
            for file in campaign.files.all_files() {
                if let Some(other) = owners.insert(file, id.as_str()) {
                    if other != id.as_str() {
                        return Err(AppError::Config(format!(
                            "file '{file}' is claimed by both '{other}' and '{id}'"
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Maps historical campaign filenames to their current canonical names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameTable {
    entries: HashMap<String, String>,
}

impl RenameTable {
    /// Record that `old` should be restored as `new`.
    pub fn insert(&mut self, old: String, new: String) {
        self.entries.insert(old, new);
    }

    /// Destination filename for an archive member.
    #[must_use]
    pub fn destination_for<'a>(&'a self, name: &'a str) -> &'a str {
        self.entries.get(name).map_or(name, String::as_str)
    }

    /// Whether the table contains no renames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for RenameTable {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
