//! Integration tests for restore-time verification and overwrite handling.
//!
//! Every failure case asserts that the target directory is left exactly
//! as it was found.

use std::fs;
use std::path::{Path, PathBuf};

use foothold_checkpoint::checkpoint::{
    check_restore_conflicts, create_checkpoint, restore_checkpoint, NoProgress, RestoreOptions,
};
use foothold_checkpoint::config::RenameTable;
use foothold_checkpoint::AppError;

use super::test_helpers::{
    label_at, read_members, rewrite_archive, seed_syria, write_archive, write_file,
};

fn build_archive(output: &Path) -> PathBuf {
    let source = tempfile::tempdir().expect("tempdir");
    let files = seed_syria(source.path());
    create_checkpoint(
        "syria",
        "production",
        &files,
        output,
        &label_at(9, 30, 0),
        &mut NoProgress,
    )
    .expect("create checkpoint")
}

fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn tampered_member_fails_checksum_and_writes_nothing() {
    let output = tempfile::tempdir().expect("tempdir");
    let target = tempfile::tempdir().expect("tempdir");
    let archive = build_archive(output.path());
    rewrite_archive(&archive, |name, content| {
        if name == "foothold_syria_storage.csv" {
            Some((name.to_owned(), b"warehouse,fuel\nDamascus,999999\n".to_vec()))
        } else {
            Some((name.to_owned(), content))
        }
    });

    let err = restore_checkpoint(&archive, target.path(), RestoreOptions::default()).unwrap_err();

    let msg = err.to_string();
    assert!(matches!(err, AppError::Validation(_)), "{msg}");
    assert!(msg.contains("checksum mismatch"), "{msg}");
    assert!(msg.contains("foothold_syria_storage.csv"), "{msg}");
    assert!(dir_listing(target.path()).is_empty());
}

#[test]
fn member_without_recorded_digest_is_rejected() {
    let output = tempfile::tempdir().expect("tempdir");
    let target = tempfile::tempdir().expect("tempdir");
    let archive = build_archive(output.path());
    let mut members = read_members(&archive);
    members.push(("foothold_syria_CTLD_FARPS.csv".to_owned(), b"farp,1".to_vec()));
    write_archive(&archive, &members);

    let err = restore_checkpoint(&archive, target.path(), RestoreOptions::default()).unwrap_err();

    assert!(matches!(err, AppError::Validation(_)), "{err}");
    assert!(err.to_string().contains("no recorded checksum"), "{err}");
    assert!(dir_listing(target.path()).is_empty());
}

#[test]
fn recorded_file_missing_from_archive_is_rejected() {
    let output = tempfile::tempdir().expect("tempdir");
    let target = tempfile::tempdir().expect("tempdir");
    let archive = build_archive(output.path());
    rewrite_archive(&archive, |name, content| {
        (name != "foothold_syria_CTLD_Save.csv").then(|| (name.to_owned(), content))
    });

    let err = restore_checkpoint(&archive, target.path(), RestoreOptions::default()).unwrap_err();

    assert!(matches!(err, AppError::Validation(_)), "{err}");
    assert!(err.to_string().contains("foothold_syria_CTLD_Save.csv"), "{err}");
    assert!(dir_listing(target.path()).is_empty());
}

#[test]
fn traversal_member_name_is_rejected() {
    let output = tempfile::tempdir().expect("tempdir");
    let target = tempfile::tempdir().expect("tempdir");
    let archive = output.path().join("evil.zip");
    let metadata = r#"{"campaign_name": "syria", "server_name": "production",
        "created_at": "2024-03-01T09:30:00Z",
        "files": {"../escape.lua": "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"}}"#;
    write_archive(
        &archive,
        &[
            ("../escape.lua".to_owned(), Vec::new()),
            ("metadata.json".to_owned(), metadata.as_bytes().to_vec()),
        ],
    );

    let err = restore_checkpoint(&archive, target.path(), RestoreOptions::default()).unwrap_err();

    assert!(matches!(err, AppError::Validation(_)), "{err}");
    assert!(!output.path().join("escape.lua").exists());
    assert!(dir_listing(target.path()).is_empty());
}

#[test]
fn declined_overwrite_is_cancelled_and_leaves_target_untouched() {
    let output = tempfile::tempdir().expect("tempdir");
    let target = tempfile::tempdir().expect("tempdir");
    let archive = build_archive(output.path());
    write_file(target.path(), "foothold_syria.lua", "live state");
    let mut asked_with = Vec::new();
    let mut confirm = |files: &[String]| {
        asked_with = files.to_vec();
        false
    };

    let err = restore_checkpoint(
        &archive,
        target.path(),
        RestoreOptions::default().with_confirmation(&mut confirm),
    )
    .unwrap_err();

    assert!(matches!(err, AppError::Cancelled(_)), "{err}");
    assert_eq!(asked_with, vec!["foothold_syria.lua"]);
    assert_eq!(dir_listing(target.path()), vec!["foothold_syria.lua"]);
    assert_eq!(
        fs::read_to_string(target.path().join("foothold_syria.lua")).unwrap(),
        "live state"
    );
}

#[test]
fn accepted_overwrite_replaces_files() {
    let output = tempfile::tempdir().expect("tempdir");
    let target = tempfile::tempdir().expect("tempdir");
    let archive = build_archive(output.path());
    write_file(target.path(), "foothold_syria.lua", "live state");
    let mut confirm = |_: &[String]| true;

    restore_checkpoint(
        &archive,
        target.path(),
        RestoreOptions::default().with_confirmation(&mut confirm),
    )
    .expect("restore");

    assert_eq!(
        fs::read_to_string(target.path().join("foothold_syria.lua")).unwrap(),
        "zones = { Damascus = 'blue' }\n"
    );
}

#[test]
fn conflicts_without_confirmation_are_refused() {
    let output = tempfile::tempdir().expect("tempdir");
    let target = tempfile::tempdir().expect("tempdir");
    let archive = build_archive(output.path());
    write_file(target.path(), "foothold_syria_storage.csv", "live");

    let err = restore_checkpoint(&archive, target.path(), RestoreOptions::default()).unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)), "{err}");
    assert_eq!(
        fs::read_to_string(target.path().join("foothold_syria_storage.csv")).unwrap(),
        "live"
    );
}

#[test]
fn conflict_check_reports_existing_files_only() {
    let output = tempfile::tempdir().expect("tempdir");
    let target = tempfile::tempdir().expect("tempdir");
    let archive = build_archive(output.path());
    write_file(target.path(), "foothold_syria.lua", "live");
    write_file(target.path(), "Foothold_Ranks.lua", "live ranks");
    write_file(target.path(), "unrelated.txt", "x");

    let without_ranks =
        check_restore_conflicts(&archive, target.path(), false, None).expect("check");
    let with_ranks = check_restore_conflicts(&archive, target.path(), true, None).expect("check");

    assert_eq!(without_ranks, vec!["foothold_syria.lua"]);
    assert_eq!(with_ranks, vec!["Foothold_Ranks.lua", "foothold_syria.lua"]);
}

#[test]
fn rename_table_redirects_historical_names() {
    let output = tempfile::tempdir().expect("tempdir");
    let target = tempfile::tempdir().expect("tempdir");
    let archive = build_archive(output.path());
    let table: RenameTable = [(
        "foothold_syria.lua".to_owned(),
        "foothold_syria_v2.lua".to_owned(),
    )]
    .into_iter()
    .collect();

    let written = restore_checkpoint(
        &archive,
        target.path(),
        RestoreOptions::default().with_rename_table(&table),
    )
    .expect("restore");

    assert!(written.contains(&target.path().join("foothold_syria_v2.lua")));
    assert!(!target.path().join("foothold_syria.lua").exists());
    assert_eq!(
        fs::read_to_string(target.path().join("foothold_syria_v2.lua")).unwrap(),
        "zones = { Damascus = 'blue' }\n"
    );
}

#[test]
fn conflict_check_reports_renamed_destinations() {
    let output = tempfile::tempdir().expect("tempdir");
    let target = tempfile::tempdir().expect("tempdir");
    let archive = build_archive(output.path());
    write_file(target.path(), "foothold_syria_v2.lua", "live");
    let table: RenameTable = [(
        "foothold_syria.lua".to_owned(),
        "foothold_syria_v2.lua".to_owned(),
    )]
    .into_iter()
    .collect();

    let conflicts =
        check_restore_conflicts(&archive, target.path(), false, Some(&table)).expect("check");
    let err = restore_checkpoint(
        &archive,
        target.path(),
        RestoreOptions::default().with_rename_table(&table),
    )
    .unwrap_err();

    assert_eq!(conflicts, vec!["foothold_syria_v2.lua"]);
    assert!(err.to_string().contains("foothold_syria_v2.lua"), "{err}");
}

#[test]
fn members_sharing_a_destination_are_rejected() {
    let output = tempfile::tempdir().expect("tempdir");
    let target = tempfile::tempdir().expect("tempdir");
    let source = tempfile::tempdir().expect("tempdir");
    let files = vec![
        write_file(source.path(), "foothold_syria.lua", "old layout"),
        write_file(source.path(), "foothold_syria_v2.lua", "new layout"),
    ];
    let archive = create_checkpoint(
        "syria",
        "production",
        &files,
        output.path(),
        &label_at(9, 30, 0),
        &mut NoProgress,
    )
    .expect("create checkpoint");
    let table: RenameTable = [(
        "foothold_syria.lua".to_owned(),
        "foothold_syria_v2.lua".to_owned(),
    )]
    .into_iter()
    .collect();

    let err = restore_checkpoint(
        &archive,
        target.path(),
        RestoreOptions::default()
            .with_rename_table(&table)
            .skip_overwrite_check(),
    )
    .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)), "{err}");
    assert!(err.to_string().contains("foothold_syria_v2.lua"), "{err}");
    assert!(dir_listing(target.path()).is_empty());
}

#[test]
fn restore_progress_reports_each_file() {
    let output = tempfile::tempdir().expect("tempdir");
    let target = tempfile::tempdir().expect("tempdir");
    let archive = build_archive(output.path());
    let mut seen = Vec::new();
    let mut sink = |stage: &str, current: usize, total: usize| -> foothold_checkpoint::Result<()> {
        seen.push(format!("{current}/{total} {stage}"));
        Ok(())
    };

    restore_checkpoint(
        &archive,
        target.path(),
        RestoreOptions::default().with_progress(&mut sink),
    )
    .expect("restore");

    assert_eq!(
        seen,
        vec![
            "1/3 Restoring foothold_syria.lua",
            "2/3 Restoring foothold_syria_CTLD_Save.csv",
            "3/3 Restoring foothold_syria_storage.csv",
        ]
    );
}

#[test]
fn unusable_archives_and_targets_are_classified() {
    let output = tempfile::tempdir().expect("tempdir");
    let target = tempfile::tempdir().expect("tempdir");
    let archive = build_archive(output.path());

    let missing = restore_checkpoint(
        &output.path().join("absent.zip"),
        target.path(),
        RestoreOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(missing, AppError::NotFound(_)), "{missing}");

    let garbage = write_file(output.path(), "garbage.zip", "not a zip at all");
    let err = restore_checkpoint(&garbage, target.path(), RestoreOptions::default()).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{err}");

    let no_target = restore_checkpoint(
        &archive,
        &target.path().join("absent"),
        RestoreOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(no_target, AppError::NotFound(_)), "{no_target}");

    let file_target = write_file(target.path(), "a_file", "x");
    let err = restore_checkpoint(&archive, &file_target, RestoreOptions::default()).unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)), "{err}");
}

#[test]
fn archive_without_metadata_is_rejected() {
    let output = tempfile::tempdir().expect("tempdir");
    let target = tempfile::tempdir().expect("tempdir");
    let archive = build_archive(output.path());
    rewrite_archive(&archive, |name, content| {
        (name != "metadata.json").then(|| (name.to_owned(), content))
    });

    let err = restore_checkpoint(&archive, target.path(), RestoreOptions::default()).unwrap_err();

    assert!(matches!(err, AppError::Validation(_)), "{err}");
    assert!(err.to_string().contains("metadata.json"), "{err}");
}
