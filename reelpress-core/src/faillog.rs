//! Append-only failure logs, one file per category.
//!
//! The crawl is unattended; failures surface here rather than stopping
//! anything. Files are plain timestamped text for humans, never parsed
//! back by the system.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::PathBuf;

use chrono::Local;

/// Writes failure entries under a log directory, `<category>.log` per
/// category. Logging is best-effort: an unwritable log directory is
/// reported through tracing and otherwise ignored.
#[derive(Debug, Clone)]
pub struct FailureLog {
    dir: PathBuf,
}

impl FailureLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Append one entry to `<category>.log`.
    pub fn log(&self, category: &str, message: &str) {
        if let Err(err) = self.append(category, message) {
            tracing::warn!(%category, %err, "failed to write failure log entry");
        }
    }

    fn append(&self, category: &str, message: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{category}.log"));
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "{stamp} LOG:  {message}")?;
        writeln!(file, "{}", "-".repeat(80))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_append_per_category() {
        let dir = tempfile::tempdir().unwrap();
        let log = FailureLog::new(dir.path());

        log.log("no_title", "first");
        log.log("no_title", "second");
        log.log("episodes", "other category");

        let no_title = std::fs::read_to_string(dir.path().join("no_title.log")).unwrap();
        assert!(no_title.contains("first"));
        assert!(no_title.contains("second"));
        assert_eq!(no_title.matches("LOG:").count(), 2);

        let episodes = std::fs::read_to_string(dir.path().join("episodes.log")).unwrap();
        assert!(episodes.contains("other category"));
    }
}
