//! Closed set of outcome notifications shown on the list screen.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Outcome notification passed to `Screen::show_message`.
///
/// Messages are values, never errors: every consumer matches them
/// exhaustively, so a new outcome fails to compile until it is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Message {
    CouldNotExport,
    ImportSuccessful,
    ImportFailed,
    DatabaseRepaired,
    CouldNotRepairDatabase,
    CouldNotGenerateBugReport,
    FileNotRecognized,
    SyncEnabled,
    SyncKeyAlreadyInstalled,
}

impl Message {
    pub const ALL: [Message; 9] = [
        Self::CouldNotExport,
        Self::ImportSuccessful,
        Self::ImportFailed,
        Self::DatabaseRepaired,
        Self::CouldNotRepairDatabase,
        Self::CouldNotGenerateBugReport,
        Self::FileNotRecognized,
        Self::SyncEnabled,
        Self::SyncKeyAlreadyInstalled,
    ];

    /// Stable identifier used in logs and by non-Rust frontends.
    pub fn code(self) -> &'static str {
        match self {
            Self::CouldNotExport => "could_not_export",
            Self::ImportSuccessful => "import_successful",
            Self::ImportFailed => "import_failed",
            Self::DatabaseRepaired => "database_repaired",
            Self::CouldNotRepairDatabase => "could_not_repair_database",
            Self::CouldNotGenerateBugReport => "could_not_generate_bug_report",
            Self::FileNotRecognized => "file_not_recognized",
            Self::SyncEnabled => "sync_enabled",
            Self::SyncKeyAlreadyInstalled => "sync_key_already_installed",
        }
    }

    /// Default English text.
    pub fn text(self) -> &'static str {
        match self {
            Self::CouldNotExport => "Failed to export data.",
            Self::ImportSuccessful => "Habits imported successfully.",
            Self::ImportFailed => "Import failed.",
            Self::DatabaseRepaired => "Database repaired.",
            Self::CouldNotRepairDatabase => "Failed to repair database.",
            Self::CouldNotGenerateBugReport => "Could not generate bug report.",
            Self::FileNotRecognized => "File not recognized.",
            Self::SyncEnabled => "Device sync enabled.",
            Self::SyncKeyAlreadyInstalled => "Sync key already installed.",
        }
    }

    /// Whether the message reports a failure.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::CouldNotExport
                | Self::ImportFailed
                | Self::CouldNotRepairDatabase
                | Self::CouldNotGenerateBugReport
                | Self::FileNotRecognized
        )
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::Message;
    use std::collections::HashSet;

    #[test]
    fn codes_are_unique_and_match_serde_names() {
        let codes: HashSet<&str> = Message::ALL.iter().map(|m| m.code()).collect();
        assert_eq!(codes.len(), Message::ALL.len());
        for message in Message::ALL {
            let json = serde_json::to_string(&message).expect("serialize");
            assert_eq!(json, format!("\"{}\"", message.code()));
        }
    }

    #[test]
    fn failure_classification() {
        assert!(Message::CouldNotExport.is_failure());
        assert!(!Message::SyncEnabled.is_failure());
        assert_eq!(Message::DatabaseRepaired.to_string(), "Database repaired.");
    }
}
