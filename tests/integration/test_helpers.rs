//! Shared fixtures for checkpoint integration tests.
//!
//! Builds campaign save directories on disk, pins checkpoint timestamps
//! so archive names are predictable, and rewrites archives member by
//! member for tamper tests.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use foothold_checkpoint::checkpoint::CheckpointLabel;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Files of a complete Syria campaign plus the shared ranks file.
pub const SYRIA_FILES: [(&str, &str); 4] = [
    ("foothold_syria.lua", "zones = { Damascus = 'blue' }\n"),
    ("foothold_syria_storage.csv", "warehouse,fuel\nDamascus,100\n"),
    ("foothold_syria_CTLD_Save.csv", "crate,pos\nhawk,10:20\n"),
    ("Foothold_Ranks.lua", "ranks = { pilot = 3 }\n"),
];

/// Write `content` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write fixture file");
    path
}

/// Populate `dir` with the Syria campaign and the ranks file.
pub fn seed_syria(dir: &Path) -> Vec<PathBuf> {
    SYRIA_FILES
        .iter()
        .map(|(name, content)| write_file(dir, name, content))
        .collect()
}

/// A fixed UTC instant on 2024-03-01.
pub fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, second)
        .single()
        .expect("valid timestamp")
}

/// Label pinned to a fixed instant.
pub fn label_at(hour: u32, minute: u32, second: u32) -> CheckpointLabel {
    CheckpointLabel::default().with_created_at(at(hour, minute, second))
}

/// Read every member of an archive as `(name, bytes)`.
pub fn read_members(archive: &Path) -> Vec<(String, Vec<u8>)> {
    let mut zip = ZipArchive::new(File::open(archive).expect("open archive")).expect("zip");
    (0..zip.len())
        .map(|i| {
            let mut member = zip.by_index(i).expect("member");
            let mut content = Vec::new();
            member.read_to_end(&mut content).expect("read member");
            (member.name().to_owned(), content)
        })
        .collect()
}

/// Write a fresh archive at `path` holding `members`.
pub fn write_archive(path: &Path, members: &[(String, Vec<u8>)]) {
    let mut zip = ZipWriter::new(File::create(path).expect("create archive"));
    for (name, content) in members {
        zip.start_file(name.as_str(), SimpleFileOptions::default())
            .expect("start member");
        zip.write_all(content).expect("write member");
    }
    zip.finish().expect("finish archive");
}

/// Rebuild `archive` after passing each member through `edit`.
///
/// Returning `None` from `edit` drops the member.
pub fn rewrite_archive(
    archive: &Path,
    mut edit: impl FnMut(&str, Vec<u8>) -> Option<(String, Vec<u8>)>,
) {
    let members: Vec<(String, Vec<u8>)> = read_members(archive)
        .into_iter()
        .filter_map(|(name, content)| edit(&name, content))
        .collect();
    write_archive(archive, &members);
}

/// Names of the archive members, sorted.
pub fn member_names(archive: &Path) -> Vec<String> {
    let mut names: Vec<String> = read_members(archive).into_iter().map(|(n, _)| n).collect();
    names.sort();
    names
}
