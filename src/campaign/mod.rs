//! Campaign file classification.
//!
//! Foothold writes every campaign's state into files named
//! `Foothold_<Campaign>[_<type>][_<version>].<ext>`. This module decides
//! which filenames belong to a campaign and reduces them to a canonical
//! campaign identifier. Grouping a directory listing into campaigns lives
//! in [`grouping`]; configuration suggestions for unregistered campaigns
//! live in [`suggestion`].

use std::sync::OnceLock;

use regex::Regex;

pub mod grouping;
pub mod suggestion;

pub use grouping::{
    detect_unknown_files, group_campaign_files, group_campaign_files_by_pattern, Grouping,
};
pub use suggestion::generate_config_suggestion;

/// Filename of the ranks file shared by every campaign on a server.
pub const RANKS_FILE: &str = "Foothold_Ranks.lua";

const PREFIX: &str = "foothold_";

/// Kind of save data a campaign file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FileType {
    /// Main persistence script.
    Persistence,
    /// CTLD save data (`_CTLD_Save`).
    CtldSave,
    /// CTLD FARP data (`_CTLD_FARPS`).
    CtldFarps,
    /// Warehouse storage (`_storage`).
    Storage,
}

impl FileType {
    /// Every file type, in configuration order.
    pub const ALL: [Self; 4] = [
        Self::Persistence,
        Self::CtldSave,
        Self::CtldFarps,
        Self::Storage,
    ];

    /// Configuration key for this type.
    #[must_use]
    pub fn config_key(self) -> &'static str {
        match self {
            Self::Persistence => "persistence",
            Self::CtldSave => "ctld_save",
            Self::CtldFarps => "ctld_farps",
            Self::Storage => "storage",
        }
    }

    /// Operator-facing description.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Persistence => "main persistence file",
            Self::CtldSave => "CTLD save file",
            Self::CtldFarps => "CTLD FARPs file",
            Self::Storage => "storage file",
        }
    }
}

#[allow(clippy::expect_used)] // Patterns are literals checked by the unit tests below.
fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid campaign filename pattern")
}

fn extension_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"\.[A-Za-z][A-Za-z0-9]*$"))
}

fn type_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"(?i)_(storage|ctld_farps|ctld_save)$"))
}

fn version_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| compile(r"(?i)_v?\d+(\.\d+)?$"))
}

/// Final path component of `name`, accepting both `/` and `\` separators.
#[must_use]
pub fn bare_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Whether `name` is the shared ranks file (case-insensitive).
#[must_use]
pub fn is_ranks_file(name: &str) -> bool {
    bare_name(name).eq_ignore_ascii_case(RANKS_FILE)
}

/// Whether `name` is a campaign-specific Foothold file.
///
/// The bare filename must start with `foothold_` (any case) and must not
/// be the shared ranks file. Hidden files never match.
#[must_use]
pub fn is_campaign_file(name: &str) -> bool {
    let bare = bare_name(name);
    if bare.starts_with('.') || bare.len() <= PREFIX.len() {
        return false;
    }
    let has_prefix = bare
        .get(..PREFIX.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(PREFIX));
    has_prefix && !is_ranks_file(bare)
}

/// Reduce a campaign filename to its canonical campaign name.
///
/// Strips the `foothold_` prefix, the file extension, and any trailing
/// version token (`_v0.2`, `_V1`, `_2.0`) and type suffix (`_storage`,
/// `_CTLD_FARPS`, `_CTLD_Save`) in whichever order they appear.
/// Returns an empty string for names that are not campaign files.
#[must_use]
pub fn normalize_campaign_name(name: &str) -> String {
    split_campaign_name(name).map_or_else(String::new, |(base, _)| base)
}

/// File type of a campaign filename, judged by its type suffix.
///
/// Returns `None` for names that are not campaign files.
#[must_use]
pub fn file_type_of(name: &str) -> Option<FileType> {
    split_campaign_name(name).map(|(_, file_type)| file_type)
}

fn split_campaign_name(name: &str) -> Option<(String, FileType)> {
    let bare = bare_name(name);
    if !is_campaign_file(bare) {
        return None;
    }

    let stem = extension_re().replace(bare, "");
    let mut base = stem.get(PREFIX.len()..).unwrap_or_default();
    let mut file_type = None;
    let mut version_stripped = false;

    loop {
        if file_type.is_none() {
            if let Some(found) = type_suffix_re().find(base) {
                file_type = Some(type_from_suffix(found.as_str()));
                base = &base[..found.start()];
                continue;
            }
        }
        if !version_stripped {
            if let Some(found) = version_suffix_re().find(base) {
                version_stripped = true;
                base = &base[..found.start()];
                continue;
            }
        }
        break;
    }

    Some((base.to_owned(), file_type.unwrap_or(FileType::Persistence)))
}

fn type_from_suffix(suffix: &str) -> FileType {
    match suffix.to_ascii_lowercase().as_str() {
        "_storage" => FileType::Storage,
        "_ctld_farps" => FileType::CtldFarps,
        _ => FileType::CtldSave,
    }
}
