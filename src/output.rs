//! Output formatting for CLI display.
//!
//! Provides the [`PrettyPrint`] trait for human-readable output
//! as an alternative to JSON serialization.

use serde_json::Value;
use tabled::{Table, Tabled};

use crate::{AnalysisMatch, FileInfo, Observable};

/// Trait for human-readable key-value output.
///
/// Implemented by model types to provide formatted output
/// suitable for terminal display when `--json` is not specified.
pub trait PrettyPrint {
    /// Returns a formatted string for terminal display.
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for FileInfo {
    fn pretty_print(&self) -> String {
        let or_blank = |v: &Option<String>| v.clone().unwrap_or_default();

        let mut lines = vec![
            "File info:".to_string(),
            format!("{:>15}   {}", "Added on:", or_blank(&self.created)),
            format!("{:>15}   {}", "Filenames:", self.filenames.join(", ")),
            format!("{:>15}   {}", "Tags:", self.tag_names().join(", ")),
            format!("{:>15}   {}", "MIME-type:", or_blank(&self.mime_type)),
            format!("{:>15}   {}", "URL:", or_blank(&self.human_url)),
            String::new(),
            "Hashes:".to_string(),
        ];

        for h in &self.hashes {
            lines.push(format!("{:>15}   {}", format!("{}:", h.hash), h.value));
        }

        lines.join("\n")
    }
}

impl PrettyPrint for Observable {
    fn pretty_print(&self) -> String {
        let header = format!("Observable: {}", self.value);
        let divider = "─".repeat(header.len().max(30));

        let mut lines = vec![header, divider, format!("ID:             {}", self.id)];

        if let Some(ref kind) = self.kind {
            lines.push(format!("Type:           {}", kind));
        }

        let tags = self.tag_names();
        if !tags.is_empty() {
            lines.push(format!("Tags:           {}", tags.join(", ")));
        }

        if let Some(ref source) = self.source {
            lines.push(format!("Source:         {}", source));
        }

        lines.join("\n")
    }
}

impl PrettyPrint for AnalysisMatch {
    fn pretty_print(&self) -> String {
        let mut lines = Vec::new();

        let known = self.known_values();
        lines.push(format!("Known ({}):", known.len()));
        lines.extend(known.iter().map(|v| format!("  {}", v)));

        lines.push(format!("Unknown ({}):", self.unknown.len()));
        lines.extend(self.unknown.iter().map(|v| format!("  {}", v)));

        if let Some(Value::Array(matches)) = self.extra.get("matches") {
            lines.push(format!("Indicator matches: {}", matches.len()));
        }

        lines.join("\n")
    }
}

/// One uploaded file in the `addfiles` summary table.
#[derive(Tabled)]
pub struct FileRow {
    #[tabled(rename = "SHA256")]
    pub sha256: String,
    #[tabled(rename = "Tags")]
    pub tags: String,
    #[tabled(rename = "Filenames")]
    pub filenames: String,
}

impl From<&FileInfo> for FileRow {
    fn from(f: &FileInfo) -> Self {
        Self {
            sha256: f.sha256().unwrap_or_default().to_string(),
            tags: f.tag_names().join(", "),
            filenames: f.filenames.join(", "),
        }
    }
}

/// Upload summary: the file table followed by a count line.
pub fn upload_summary(files: &[FileInfo]) -> String {
    let rows: Vec<FileRow> = files.iter().map(FileRow::from).collect();
    format!(
        "{}\nSuccessfully uploaded {} file{}.",
        Table::new(rows),
        files.len(),
        if files.len() == 1 { "" } else { "s" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn file_info() -> FileInfo {
        serde_json::from_value(json!({
            "id": "f1",
            "value": "FILE:abc",
            "created": "2020-01-01T00:00:00",
            "filenames": ["evil.exe"],
            "tags": [{"name": "malware"}],
            "mime_type": "application/x-dosexec",
            "human_url": "http://localhost:5000/observable/f1",
            "hashes": [{"hash": "md5", "value": "d41d"}, {"hash": "sha256", "value": "e3b0"}]
        }))
        .unwrap()
    }

    #[test]
    fn test_file_info_pretty_print_format() {
        let output = file_info().pretty_print();
        assert!(output.starts_with("File info:"));
        assert!(output.contains("Filenames:   evil.exe"));
        assert!(output.contains("     Tags:   malware"));
        assert!(output.contains("sha256:   e3b0"));
    }

    #[test]
    fn test_upload_summary_counts() {
        let summary = upload_summary(&[file_info()]);
        assert!(summary.contains("SHA256"));
        assert!(summary.contains("e3b0"));
        assert!(summary.ends_with("Successfully uploaded 1 file."));

        let summary = upload_summary(&[file_info(), file_info()]);
        assert!(summary.ends_with("Successfully uploaded 2 files."));
    }
}
