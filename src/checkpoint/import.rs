//! Adoption of backup directories that were not created by this tool.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{info, info_span, warn};

use super::builder::create_checkpoint;
use super::save::{campaign_inputs, find_campaign, list_source_dir};
use super::{CheckpointLabel, ProgressSink};
use crate::campaign::{file_type_of, group_campaign_files_by_pattern, is_ranks_file, FileType, RANKS_FILE};
use crate::Result;

/// Result of importing a backup directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Path of the archive that was written.
    pub archive: PathBuf,
    /// Non-fatal notes about files that were expected but not found.
    pub warnings: Vec<String>,
}

/// Package a hand-made backup directory as a checkpoint.
///
/// Files are grouped by naming pattern exactly as for a save. Missing
/// main, storage, CTLD save, CTLD FARPs or ranks files do not block the
/// import; each produces a warning in the returned report.
///
/// # Errors
///
/// Returns the same errors as [`super::save_checkpoint`].
pub fn import_checkpoint(
    source_dir: &Path,
    campaign_name: &str,
    server_name: &str,
    output_dir: &Path,
    label: &CheckpointLabel,
    progress: &mut dyn ProgressSink,
) -> Result<ImportReport> {
    let span = info_span!("import_checkpoint", campaign = campaign_name, server = server_name);
    let _guard = span.enter();

    let names = list_source_dir(source_dir)?;
    let groups = group_campaign_files_by_pattern(&names);
    let (campaign, files) = find_campaign(&groups, campaign_name, source_dir)?;

    let warnings = missing_file_warnings(campaign, files, &names);
    for warning in &warnings {
        warn!(campaign, "{warning}");
    }

    let inputs = campaign_inputs(source_dir, files, &names);
    let archive = create_checkpoint(campaign, server_name, &inputs, output_dir, label, progress)?;

    info!(
        archive = %archive.display(),
        warnings = warnings.len(),
        "backup directory imported"
    );

    Ok(ImportReport { archive, warnings })
}

fn missing_file_warnings(campaign: &str, files: &[String], names: &[String]) -> Vec<String> {
    let present: BTreeSet<FileType> = files.iter().filter_map(|f| file_type_of(f)).collect();

    let mut warnings: Vec<String> = FileType::ALL
        .into_iter()
        .filter(|file_type| !present.contains(file_type))
        .map(|file_type| format!("no {} found for campaign '{campaign}'", file_type.label()))
        .collect();

    if !names.iter().any(|name| is_ranks_file(name)) {
        warnings.push(format!("shared ranks file {RANKS_FILE} not found"));
    }

    warnings
}
