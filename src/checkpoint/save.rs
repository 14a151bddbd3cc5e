//! Checkpoints taken from a server's saves directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, info_span, warn};

use super::builder::create_checkpoint;
use super::paths::ensure_dir;
use super::{CheckpointLabel, ProgressSink};
use crate::campaign::grouping::CampaignGroups;
use crate::campaign::{is_ranks_file, Grouping};
use crate::{AppError, Result};

/// Save one campaign from `source_dir` into a checkpoint in `output_dir`.
///
/// The directory listing is grouped with `grouping` and the group whose
/// identifier matches `campaign_name` (case-insensitive) is archived,
/// together with the shared ranks file when present. The archive records
/// the matched group identifier as its campaign name.
///
/// # Errors
///
/// - `AppError::NotFound` / `AppError::InvalidArgument` if `source_dir` is
///   missing or not a directory.
/// - `AppError::PermissionDenied` if it cannot be listed.
/// - `AppError::Conflict` if no group matches, listing the campaigns that
///   were detected.
/// - Any error from [`create_checkpoint`].
pub fn save_checkpoint(
    campaign_name: &str,
    server_name: &str,
    source_dir: &Path,
    output_dir: &Path,
    label: &CheckpointLabel,
    grouping: Grouping<'_>,
    progress: &mut dyn ProgressSink,
) -> Result<PathBuf> {
    let span = info_span!("save_checkpoint", campaign = campaign_name, server = server_name);
    let _guard = span.enter();

    let names = list_source_dir(source_dir)?;
    let groups = grouping.group(&names);
    let (campaign, files) = find_campaign(&groups, campaign_name, source_dir)?;

    let inputs = campaign_inputs(source_dir, files, &names);
    create_checkpoint(campaign, server_name, &inputs, output_dir, label, progress)
}

/// Save every campaign detected in `source_dir`, one archive each.
///
/// All archives share one timestamp, name and comment. With
/// `continue_on_error` a failing campaign is logged and left out of the
/// result; without it the first failure is returned and no further
/// campaigns are attempted. An error raised by `progress` always stops
/// the run and is returned unchanged.
///
/// # Errors
///
/// Returns the directory errors of [`save_checkpoint`],
/// `AppError::Conflict` when no campaign files are found, any error from
/// `progress`, and, when `continue_on_error` is false, the first
/// per-campaign failure.
pub fn save_all_campaigns(
    server_name: &str,
    source_dir: &Path,
    output_dir: &Path,
    label: &CheckpointLabel,
    grouping: Grouping<'_>,
    continue_on_error: bool,
    progress: &mut dyn ProgressSink,
) -> Result<BTreeMap<String, PathBuf>> {
    let span = info_span!("save_all_campaigns", server = server_name);
    let _guard = span.enter();

    let names = list_source_dir(source_dir)?;
    let groups = grouping.group(&names);
    if groups.is_empty() {
        return Err(AppError::Conflict(format!(
            "no campaign files found in {}",
            source_dir.display()
        )));
    }

    let shared = label.clone().with_created_at(label.timestamp());
    let mut saved = BTreeMap::new();
    let mut progress = AbortTracker {
        inner: progress,
        aborted: false,
    };

    for (campaign, files) in &groups {
        let inputs = campaign_inputs(source_dir, files, &names);
        let result = create_checkpoint(
            campaign,
            server_name,
            &inputs,
            output_dir,
            &shared,
            &mut progress,
        );
        match result {
            Ok(path) => {
                saved.insert(campaign.clone(), path);
            }
            Err(err) if progress.aborted => {
                info!(%campaign, %err, "save-all aborted by progress callback");
                return Err(err);
            }
            Err(err) if continue_on_error => {
                warn!(%campaign, %err, "campaign checkpoint failed, continuing");
            }
            Err(err) => return Err(err),
        }
    }

    info!(
        saved = saved.len(),
        detected = groups.len(),
        "campaign checkpoints saved"
    );

    Ok(saved)
}

/// Remembers whether the wrapped sink asked to abort, so a callback
/// error is never mistaken for a per-campaign failure.
struct AbortTracker<'s> {
    inner: &'s mut dyn ProgressSink,
    aborted: bool,
}

impl ProgressSink for AbortTracker<'_> {
    fn report(&mut self, stage: &str, current: usize, total: usize) -> Result<()> {
        let result = self.inner.report(stage, current, total);
        self.aborted = result.is_err();
        result
    }
}

/// Names of every non-hidden entry in `source_dir`, sorted.
pub(crate) fn list_source_dir(source_dir: &Path) -> Result<Vec<String>> {
    ensure_dir(source_dir, "source")?;

    let entries = fs::read_dir(source_dir)
        .map_err(|err| AppError::from_io("cannot list source directory", source_dir, &err))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|err| AppError::from_io("cannot list source directory", source_dir, &err))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with('.') {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Find the group for `campaign_name`, ignoring case.
pub(crate) fn find_campaign<'g>(
    groups: &'g CampaignGroups,
    campaign_name: &str,
    source_dir: &Path,
) -> Result<(&'g str, &'g [String])> {
    let matches: Vec<(&String, &Vec<String>)> = groups
        .iter()
        .filter(|(id, _)| id.eq_ignore_ascii_case(campaign_name))
        .collect();

    match matches.as_slice() {
        [(id, files)] => Ok((id.as_str(), files.as_slice())),
        [] => {
            let available: Vec<&str> = groups.keys().map(String::as_str).collect();
            let available = if available.is_empty() {
                "none".to_owned()
            } else {
                available.join(", ")
            };
            Err(AppError::Conflict(format!(
                "no files found for campaign '{campaign_name}' in {} (available campaigns: {available})",
                source_dir.display()
            )))
        }
        _ => Err(AppError::Conflict(format!(
            "campaign name '{campaign_name}' is ambiguous"
        ))),
    }
}

/// Full input paths for a campaign, plus the shared ranks file if listed.
pub(crate) fn campaign_inputs(source_dir: &Path, files: &[String], names: &[String]) -> Vec<PathBuf> {
    let mut inputs: Vec<PathBuf> = files.iter().map(|f| source_dir.join(f)).collect();
    if let Some(ranks) = names.iter().find(|name| is_ranks_file(name)) {
        inputs.push(source_dir.join(ranks));
    }
    inputs
}
