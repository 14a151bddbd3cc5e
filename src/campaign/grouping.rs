//! Grouping of directory listings into campaigns.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::{bare_name, is_campaign_file, is_ranks_file, normalize_campaign_name};
use crate::config::GlobalConfig;

/// Campaign identifier to the bare filenames that belong to it.
pub type CampaignGroups = BTreeMap<String, Vec<String>>;

/// How a directory listing is split into campaigns.
#[derive(Debug, Clone, Copy)]
pub enum Grouping<'a> {
    /// Detect campaigns from the `foothold_` naming pattern.
    Pattern,
    /// Only accept files explicitly listed in the configuration.
    Configured(&'a GlobalConfig),
}

impl Grouping<'_> {
    /// Group `filenames` according to this strategy.
    #[must_use]
    pub fn group<S: AsRef<str>>(&self, filenames: &[S]) -> CampaignGroups {
        match self {
            Self::Pattern => group_campaign_files_by_pattern(filenames),
            Self::Configured(config) => group_campaign_files(filenames, config),
        }
    }
}

/// Group filenames by campaign using the explicit file lists in `config`.
///
/// Each input is reduced to its bare name and looked up exactly in the
/// configured `persistence`, `ctld_save`, `ctld_farps` and `storage`
/// lists. The shared ranks file and any file not listed are dropped.
#[must_use]
pub fn group_campaign_files<S: AsRef<str>>(
    filenames: &[S],
    config: &GlobalConfig,
) -> CampaignGroups {
    let mut owner: HashMap<&str, &str> = HashMap::new();
    for (id, campaign) in &config.campaigns {
        for file in campaign.files.all_files() {
            owner.insert(file, id.as_str());
        }
    }

    let mut groups = CampaignGroups::new();
    for name in filenames {
        let bare = bare_name(name.as_ref());
        if is_ranks_file(bare) {
            continue;
        }
        if let Some(id) = owner.get(bare) {
            groups
                .entry((*id).to_owned())
                .or_default()
                .push(bare.to_owned());
        }
    }

    for files in groups.values_mut() {
        files.sort();
    }
    groups
}

/// Group filenames by campaign using only the naming pattern.
///
/// Keys are the normalized campaign name in lowercase, so
/// `FootHold_CA_v0.2.lua` and `foothold_ca_storage.csv` share the key `ca`.
#[must_use]
pub fn group_campaign_files_by_pattern<S: AsRef<str>>(filenames: &[S]) -> CampaignGroups {
    let mut groups = CampaignGroups::new();
    for name in filenames {
        let bare = bare_name(name.as_ref());
        if !is_campaign_file(bare) {
            continue;
        }
        let campaign = normalize_campaign_name(bare);
        if campaign.is_empty() {
            continue;
        }
        groups
            .entry(campaign.to_lowercase())
            .or_default()
            .push(bare.to_owned());
    }

    for files in groups.values_mut() {
        files.sort();
    }
    groups
}

/// Foothold-looking files that no configured campaign claims.
///
/// Status files (`*.status`) and the shared ranks file are never
/// reported. Result order follows the input order.
#[must_use]
pub fn detect_unknown_files<S: AsRef<str>>(filenames: &[S], config: &GlobalConfig) -> Vec<String> {
    let known: HashSet<&str> = config
        .campaigns
        .values()
        .flat_map(|campaign| campaign.files.all_files())
        .collect();

    filenames
        .iter()
        .map(|name| bare_name(name.as_ref()))
        .filter(|bare| is_campaign_file(bare))
        .filter(|bare| !bare.to_ascii_lowercase().ends_with(".status"))
        .filter(|bare| !known.contains(bare))
        .map(ToOwned::to_owned)
        .collect()
}
