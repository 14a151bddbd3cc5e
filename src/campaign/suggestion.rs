//! Configuration suggestions for campaigns missing from the config file.

use std::collections::BTreeMap;

use super::{bare_name, file_type_of, normalize_campaign_name, FileType};

/// Suggest a `[campaigns.<id>]` entry covering `unknown_files`.
///
/// The campaign id and display name are inferred from the first file;
/// every file is slotted into the list matching its type suffix. The
/// output is a starting point for an operator to review, not a
/// guaranteed-valid configuration. Returns an empty string when no
/// campaign name can be inferred.
#[must_use]
pub fn generate_config_suggestion<S: AsRef<str>>(unknown_files: &[S]) -> String {
    let Some(first) = unknown_files.first() else {
        return String::new();
    };
    let campaign = normalize_campaign_name(first.as_ref());
    if campaign.is_empty() {
        return String::new();
    }

    let id = campaign.to_lowercase();
    let display_name = campaign.replace('_', " ");

    let mut by_type: BTreeMap<FileType, Vec<&str>> = BTreeMap::new();
    for name in unknown_files {
        let bare = bare_name(name.as_ref());
        if let Some(file_type) = file_type_of(bare) {
            by_type.entry(file_type).or_default().push(bare);
        }
    }

    let mut lines = vec![
        format!("[campaigns.{id}]"),
        format!("display_name = \"{display_name}\""),
    ];
    for file_type in FileType::ALL {
        let Some(files) = by_type.get(&file_type) else {
            continue;
        };
        let quoted: Vec<String> = files.iter().map(|f| format!("\"{f}\"")).collect();
        lines.push(String::new());
        lines.push(format!("[campaigns.{id}.files.{}]", file_type.config_key()));
        lines.push(format!("files = [{}]", quoted.join(", ")));
        if file_type != FileType::Persistence {
            lines.push("optional = true".to_owned());
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
