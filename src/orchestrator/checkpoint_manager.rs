//! Configuration-aware front door for checkpoint operations.
//!
//! [`CheckpointManager`] resolves server directories, the checkpoints
//! directory and rename tables from a [`GlobalConfig`], delegates to the
//! core functions in [`crate::checkpoint`], and notifies observers after
//! every successful mutation. It holds no global state; each CLI or bot
//! request builds or borrows its own manager.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::campaign::{detect_unknown_files, generate_config_suggestion, Grouping};
use crate::checkpoint::save::list_source_dir;
use crate::checkpoint::{
    check_restore_conflicts, delete_checkpoint, import_checkpoint, list_checkpoints,
    read_metadata, restore_checkpoint, save_all_campaigns, save_checkpoint, CheckpointLabel,
    DeletePolicy, ImportReport, ProgressSink, RestoreOptions,
};
use crate::config::{GlobalConfig, RenameTable};
use crate::hooks::{notify_observers, CheckpointEvent, CheckpointEventKind, CheckpointObserver};
use crate::models::{CheckpointMetadata, CheckpointSummary};
use crate::Result;

/// Runs checkpoint operations against a loaded configuration.
pub struct CheckpointManager {
    config: GlobalConfig,
    rename_tables: HashMap<String, RenameTable>,
    observers: Vec<Box<dyn CheckpointObserver>>,
}

impl CheckpointManager {
    /// Construct a manager for `config` with no observers.
    #[must_use]
    pub fn new(config: GlobalConfig) -> Self {
        let rename_tables = config
            .campaigns
            .keys()
            .map(|id| (id.clone(), config.rename_table(id)))
            .filter(|(_, table)| !table.is_empty())
            .collect();

        Self {
            config,
            rename_tables,
            observers: Vec::new(),
        }
    }

    /// Register an observer notified after each successful operation.
    #[must_use]
    pub fn with_observer(mut self, observer: Box<dyn CheckpointObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Configuration this manager runs against.
    #[must_use]
    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// Resolve an archive argument; bare filenames live in the
    /// checkpoints directory.
    #[must_use]
    pub fn resolve_archive(&self, archive: &Path) -> PathBuf {
        if archive.components().count() == 1 {
            self.config.checkpoints_dir().join(archive)
        } else {
            archive.to_path_buf()
        }
    }

    fn grouping(&self) -> Grouping<'_> {
        if self.config.campaigns.is_empty() {
            Grouping::Pattern
        } else {
            Grouping::Configured(&self.config)
        }
    }

    /// Save one campaign from a configured server.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown server, otherwise the
    /// errors of [`save_checkpoint`].
    pub fn save(
        &self,
        server: &str,
        campaign: &str,
        label: &CheckpointLabel,
        progress: &mut dyn ProgressSink,
    ) -> Result<PathBuf> {
        let source = &self.config.server(server)?.path;
        let archive = save_checkpoint(
            campaign,
            server,
            source,
            self.config.checkpoints_dir(),
            label,
            self.grouping(),
            progress,
        )?;
        self.notify_saved(CheckpointEventKind::Saved, server, &archive);
        Ok(archive)
    }

    /// Save every campaign found on a configured server.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown server, otherwise the
    /// errors of [`save_all_campaigns`].
    pub fn save_all(
        &self,
        server: &str,
        label: &CheckpointLabel,
        continue_on_error: bool,
        progress: &mut dyn ProgressSink,
    ) -> Result<BTreeMap<String, PathBuf>> {
        let source = &self.config.server(server)?.path;
        let saved = save_all_campaigns(
            server,
            source,
            self.config.checkpoints_dir(),
            label,
            self.grouping(),
            continue_on_error,
            progress,
        )?;
        for archive in saved.values() {
            self.notify_saved(CheckpointEventKind::Saved, server, archive);
        }
        Ok(saved)
    }

    /// Restore a checkpoint into a configured server's directory.
    ///
    /// When `options` carries no rename table, the table configured for
    /// the archive's campaign is applied.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown server, otherwise the
    /// errors of [`read_metadata`] and [`restore_checkpoint`].
    pub fn restore<'a>(
        &'a self,
        archive: &Path,
        server: &str,
        mut options: RestoreOptions<'a>,
    ) -> Result<Vec<PathBuf>> {
        let target = &self.config.server(server)?.path;
        let archive = self.resolve_archive(archive);
        let metadata = read_metadata(&archive)?;

        if options.rename_table.is_none() {
            options.rename_table = self.rename_tables.get(metadata.campaign_name());
        }

        let written = restore_checkpoint(&archive, target, options)?;

        let event = CheckpointEvent::new(
            CheckpointEventKind::Restored,
            metadata.campaign_name(),
            server,
            archive,
        )
        .with_files(written.len());
        notify_observers(&self.observers, &event);

        Ok(written)
    }

    /// Files a restore into a configured server's directory would overwrite.
    ///
    /// Uses the same rename table as [`Self::restore`], so the names match
    /// the ones a restore would refuse or ask about.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown server, otherwise the
    /// errors of [`read_metadata`] and [`check_restore_conflicts`].
    pub fn restore_conflicts(
        &self,
        archive: &Path,
        server: &str,
        restore_ranks: bool,
    ) -> Result<Vec<String>> {
        let target = &self.config.server(server)?.path;
        let archive = self.resolve_archive(archive);
        let metadata = read_metadata(&archive)?;
        check_restore_conflicts(
            &archive,
            target,
            restore_ranks,
            self.rename_tables.get(metadata.campaign_name()),
        )
    }

    /// List checkpoints in the configured checkpoints directory.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`list_checkpoints`].
    pub fn list(
        &self,
        server_filter: Option<&str>,
        campaign_filter: Option<&str>,
    ) -> Result<Vec<CheckpointSummary>> {
        list_checkpoints(self.config.checkpoints_dir(), server_filter, campaign_filter)
    }

    /// Delete a checkpoint archive.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`delete_checkpoint`].
    pub fn delete(
        &self,
        archive: &Path,
        policy: DeletePolicy<'_>,
    ) -> Result<Option<CheckpointMetadata>> {
        let archive = self.resolve_archive(archive);
        let deleted = delete_checkpoint(&archive, policy)?;

        if let Some(metadata) = &deleted {
            let event = CheckpointEvent::new(
                CheckpointEventKind::Deleted,
                metadata.campaign_name(),
                metadata.server_name(),
                archive,
            )
            .with_files(metadata.files().len());
            notify_observers(&self.observers, &event);
        }

        Ok(deleted)
    }

    /// Import a backup directory into the checkpoints directory.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`import_checkpoint`].
    pub fn import(
        &self,
        source_dir: &Path,
        campaign: &str,
        server: &str,
        label: &CheckpointLabel,
        progress: &mut dyn ProgressSink,
    ) -> Result<ImportReport> {
        let report = import_checkpoint(
            source_dir,
            campaign,
            server,
            self.config.checkpoints_dir(),
            label,
            progress,
        )?;
        self.notify_saved(CheckpointEventKind::Imported, server, &report.archive);
        Ok(report)
    }

    /// Foothold files on a server that no configured campaign claims.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown server and the
    /// directory errors of [`save_checkpoint`].
    pub fn unknown_files(&self, server: &str) -> Result<Vec<String>> {
        let source = &self.config.server(server)?.path;
        let names = list_source_dir(source)?;
        let unknown = detect_unknown_files(&names, &self.config);
        if !unknown.is_empty() {
            info!(server, count = unknown.len(), "unregistered campaign files found");
        }
        Ok(unknown)
    }

    /// Suggested configuration for a server's unregistered files, or an
    /// empty string if there are none.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::unknown_files`].
    pub fn config_suggestion(&self, server: &str) -> Result<String> {
        Ok(generate_config_suggestion(&self.unknown_files(server)?))
    }

    fn notify_saved(&self, kind: CheckpointEventKind, server: &str, archive: &Path) {
        if self.observers.is_empty() {
            return;
        }
        let (campaign, files) = read_metadata(archive).map_or_else(
            |_| (String::new(), 0),
            |m| (m.campaign_name().to_owned(), m.files().len()),
        );
        let event =
            CheckpointEvent::new(kind, campaign, server, archive.to_path_buf()).with_files(files);
        notify_observers(&self.observers, &event);
    }
}
