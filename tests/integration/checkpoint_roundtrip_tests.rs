//! Integration tests for building, listing and restoring checkpoints.

use std::fs;

use foothold_checkpoint::checkpoint::{
    create_checkpoint, list_checkpoints, read_metadata, restore_checkpoint, NoProgress,
    RestoreOptions,
};
use foothold_checkpoint::{AppError, Result};

use super::test_helpers::{at, label_at, member_names, seed_syria, write_file};

#[test]
fn created_archive_is_listed_with_metadata() {
    let source = tempfile::tempdir().expect("tempdir");
    let output = tempfile::tempdir().expect("tempdir");
    let files = seed_syria(source.path());
    let label = label_at(12, 0, 0)
        .with_name("pre-update")
        .with_comment("before the 2.9 patch");

    let archive = create_checkpoint(
        "syria",
        "production",
        &files,
        output.path(),
        &label,
        &mut NoProgress,
    )
    .expect("create checkpoint");

    assert_eq!(
        archive.file_name().unwrap().to_str().unwrap(),
        "syria_2024-03-01_12-00-00.zip"
    );

    let listed = list_checkpoints(output.path(), None, None).expect("list");
    assert_eq!(listed.len(), 1);
    let summary = &listed[0];
    assert_eq!(summary.campaign, "syria");
    assert_eq!(summary.server, "production");
    assert_eq!(summary.created_at, at(12, 0, 0));
    assert_eq!(summary.name.as_deref(), Some("pre-update"));
    assert_eq!(summary.comment.as_deref(), Some("before the 2.9 patch"));
    assert_eq!(summary.size, fs::metadata(&archive).unwrap().len());
    assert_eq!(summary.files.len(), 4);
}

#[test]
fn archive_holds_bare_names_and_metadata() {
    let source = tempfile::tempdir().expect("tempdir");
    let output = tempfile::tempdir().expect("tempdir");
    let files = seed_syria(source.path());

    let archive = create_checkpoint(
        "syria",
        "production",
        &files,
        output.path(),
        &label_at(12, 0, 0),
        &mut NoProgress,
    )
    .expect("create checkpoint");

    assert_eq!(
        member_names(&archive),
        vec![
            "Foothold_Ranks.lua",
            "foothold_syria.lua",
            "foothold_syria_CTLD_Save.csv",
            "foothold_syria_storage.csv",
            "metadata.json",
        ]
    );

    let metadata = read_metadata(&archive).expect("metadata");
    for path in &files {
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(metadata.files()[name].starts_with("sha256:"));
    }
}

#[test]
fn restore_is_byte_identical_and_skips_ranks_by_default() {
    let source = tempfile::tempdir().expect("tempdir");
    let output = tempfile::tempdir().expect("tempdir");
    let target = tempfile::tempdir().expect("tempdir");
    let files = seed_syria(source.path());
    let archive = create_checkpoint(
        "syria",
        "production",
        &files,
        output.path(),
        &label_at(12, 0, 0),
        &mut NoProgress,
    )
    .expect("create checkpoint");

    let written =
        restore_checkpoint(&archive, target.path(), RestoreOptions::default()).expect("restore");

    assert_eq!(written.len(), 3);
    assert!(!target.path().join("Foothold_Ranks.lua").exists());
    for name in [
        "foothold_syria.lua",
        "foothold_syria_storage.csv",
        "foothold_syria_CTLD_Save.csv",
    ] {
        assert_eq!(
            fs::read(target.path().join(name)).unwrap(),
            fs::read(source.path().join(name)).unwrap(),
            "{name} differs after restore"
        );
    }
}

#[test]
fn restore_with_ranks_includes_shared_file() {
    let source = tempfile::tempdir().expect("tempdir");
    let output = tempfile::tempdir().expect("tempdir");
    let target = tempfile::tempdir().expect("tempdir");
    let files = seed_syria(source.path());
    let archive = create_checkpoint(
        "syria",
        "production",
        &files,
        output.path(),
        &label_at(12, 0, 0),
        &mut NoProgress,
    )
    .expect("create checkpoint");

    let written = restore_checkpoint(
        &archive,
        target.path(),
        RestoreOptions::default().with_ranks(true),
    )
    .expect("restore");

    assert_eq!(written.len(), 4);
    assert_eq!(
        fs::read_to_string(target.path().join("Foothold_Ranks.lua")).unwrap(),
        "ranks = { pilot = 3 }\n"
    );
}

#[test]
fn second_restore_overwrites_when_check_is_skipped() {
    let source = tempfile::tempdir().expect("tempdir");
    let output = tempfile::tempdir().expect("tempdir");
    let target = tempfile::tempdir().expect("tempdir");
    let files = seed_syria(source.path());
    let archive = create_checkpoint(
        "syria",
        "production",
        &files,
        output.path(),
        &label_at(12, 0, 0),
        &mut NoProgress,
    )
    .expect("create checkpoint");

    restore_checkpoint(&archive, target.path(), RestoreOptions::default()).expect("first");
    write_file(target.path(), "foothold_syria.lua", "zones = { Damascus = 'red' }\n");

    restore_checkpoint(
        &archive,
        target.path(),
        RestoreOptions::default().skip_overwrite_check(),
    )
    .expect("second restore");

    assert_eq!(
        fs::read_to_string(target.path().join("foothold_syria.lua")).unwrap(),
        "zones = { Damascus = 'blue' }\n"
    );
}

#[test]
fn progress_reports_each_checksum_then_archive() {
    let source = tempfile::tempdir().expect("tempdir");
    let output = tempfile::tempdir().expect("tempdir");
    let files = seed_syria(source.path());
    let mut stages = Vec::new();
    let mut sink = |stage: &str, current: usize, total: usize| -> Result<()> {
        stages.push((stage.to_owned(), current, total));
        Ok(())
    };

    create_checkpoint(
        "syria",
        "production",
        &files,
        output.path(),
        &label_at(12, 0, 0),
        &mut sink,
    )
    .expect("create checkpoint");

    assert_eq!(stages.len(), 5);
    assert_eq!(
        stages[0],
        ("Computing checksum for foothold_syria.lua".to_owned(), 1, 4)
    );
    assert_eq!(stages[4], ("Creating archive".to_owned(), 4, 4));
}

#[test]
fn progress_error_aborts_without_archive() {
    let source = tempfile::tempdir().expect("tempdir");
    let output = tempfile::tempdir().expect("tempdir");
    let files = seed_syria(source.path());
    let mut sink = |_: &str, current: usize, _: usize| -> Result<()> {
        if current == 2 {
            Err(AppError::Cancelled("operator pressed stop".into()))
        } else {
            Ok(())
        }
    };

    let err = create_checkpoint(
        "syria",
        "production",
        &files,
        output.path(),
        &label_at(12, 0, 0),
        &mut sink,
    )
    .unwrap_err();

    assert!(matches!(err, AppError::Cancelled(_)), "{err}");
    assert_eq!(fs::read_dir(output.path()).unwrap().count(), 0);
}

#[test]
fn existing_archive_is_a_conflict() {
    let source = tempfile::tempdir().expect("tempdir");
    let output = tempfile::tempdir().expect("tempdir");
    let files = seed_syria(source.path());
    let label = label_at(12, 0, 0);

    create_checkpoint("syria", "production", &files, output.path(), &label, &mut NoProgress)
        .expect("first");
    let err = create_checkpoint("syria", "production", &files, output.path(), &label, &mut NoProgress)
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)), "{err}");
}

#[test]
fn output_directory_is_created() {
    let source = tempfile::tempdir().expect("tempdir");
    let output = tempfile::tempdir().expect("tempdir");
    let nested = output.path().join("checkpoints").join("production");
    let files = seed_syria(source.path());

    let archive = create_checkpoint(
        "syria",
        "production",
        &files,
        &nested,
        &label_at(12, 0, 0),
        &mut NoProgress,
    )
    .expect("create checkpoint");

    assert!(archive.starts_with(&nested));
}

#[test]
fn invalid_inputs_are_rejected_before_writing() {
    let source = tempfile::tempdir().expect("tempdir");
    let other = tempfile::tempdir().expect("tempdir");
    let output = tempfile::tempdir().expect("tempdir");
    let files = seed_syria(source.path());
    let label = label_at(12, 0, 0);

    let missing = vec![source.path().join("foothold_absent.lua")];
    let err = create_checkpoint("syria", "production", &missing, output.path(), &label, &mut NoProgress)
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "{err}");

    let directory = vec![source.path().to_path_buf()];
    let err = create_checkpoint("syria", "production", &directory, output.path(), &label, &mut NoProgress)
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)), "{err}");

    let duplicate = vec![
        files[0].clone(),
        write_file(other.path(), "foothold_syria.lua", "other"),
    ];
    let err = create_checkpoint("syria", "production", &duplicate, output.path(), &label, &mut NoProgress)
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)), "{err}");

    let err = create_checkpoint(" ", "production", &files, output.path(), &label, &mut NoProgress)
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{err}");

    assert_eq!(fs::read_dir(output.path()).unwrap().count(), 0);
}

#[test]
fn empty_file_set_still_produces_archive() {
    let output = tempfile::tempdir().expect("tempdir");

    let archive = create_checkpoint(
        "syria",
        "production",
        &[],
        output.path(),
        &label_at(12, 0, 0),
        &mut NoProgress,
    )
    .expect("create checkpoint");

    assert_eq!(member_names(&archive), vec!["metadata.json"]);
    assert!(read_metadata(&archive).unwrap().files().is_empty());
}
