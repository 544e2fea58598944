use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

static ANSI_ESCAPE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").ok());

/// Folder the backend writes into when the user does not pick one
pub fn default_output_dir() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\mp3")
    } else {
        PathBuf::from("/mnt/c/mp3")
    }
}

/// Make downloader output readable in a plain text block.
///
/// Drops ANSI escape sequences and keeps only the last rewrite of lines
/// that were redrawn with carriage returns (progress bars).
pub fn clean_log_tail(raw: &str) -> String {
    let stripped = match ANSI_ESCAPE.as_ref() {
        Some(re) => re.replace_all(raw, "").into_owned(),
        None => raw.to_string(),
    };

    stripped
        .split('\n')
        .map(|line| {
            line.split('\r')
                .rev()
                .find(|segment| !segment.is_empty())
                .unwrap_or("")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
