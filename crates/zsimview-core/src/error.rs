//! Error types shared by the container adapter, normalizer and session.

use std::fmt;
use std::path::PathBuf;

/// Errors that abort a single operation (open, read, config load).
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerError {
    /// Path does not exist on disk.
    NotFound(PathBuf),
    /// File exists but is not a readable hierarchical container.
    FileFormat { path: PathBuf, reason: String },
    /// Node path does not exist inside the open container.
    MissingNode(String),
    /// Node exists but is a group where a dataset was expected.
    NotALeaf(String),
    /// Node exists but is a dataset where a group was expected.
    NotAGroup(String),
    /// I/O failure while reading an already opened container.
    Io(String),
    /// Invalid configuration value.
    Config(String),
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerError::NotFound(path) => write!(f, "file not found: {}", path.display()),
            ViewerError::FileFormat { path, reason } => {
                write!(f, "unreadable container {}: {}", path.display(), reason)
            }
            ViewerError::MissingNode(path) => write!(f, "no such node: {}", path),
            ViewerError::NotALeaf(path) => write!(f, "node is a group, not a dataset: {}", path),
            ViewerError::NotAGroup(path) => write!(f, "node is a dataset, not a group: {}", path),
            ViewerError::Io(msg) => write!(f, "I/O error: {}", msg),
            ViewerError::Config(msg) => write!(f, "config error: {}", msg),
        }
    }
}

impl std::error::Error for ViewerError {}

impl From<std::io::Error> for ViewerError {
    fn from(e: std::io::Error) -> Self {
        ViewerError::Io(e.to_string())
    }
}

/// Non-fatal problem with one leaf found during normalization.
///
/// The leaf is still listed (as a raw record); sibling leaves are unaffected.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaWarning {
    pub snapshot: usize,
    pub path: String,
    pub reason: String,
}

impl fmt::Display for SchemaWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "snapshot {}: {} shown as raw value ({})",
            self.snapshot, self.path, self.reason
        )
    }
}

/// Rejected `select` request. The selection state is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    /// No snapshot is loaded.
    NoSnapshot,
    UnknownModule(String),
    UnknownRecord { module: String, record: String },
    /// Whole-module selection on a module without exactly one record.
    AmbiguousWhole { module: String, records: usize },
}

impl fmt::Display for SelectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectError::NoSnapshot => write!(f, "no snapshot loaded"),
            SelectError::UnknownModule(m) => write!(f, "no module named {:?}", m),
            SelectError::UnknownRecord { module, record } => {
                write!(f, "module {:?} has no record {:?}", module, record)
            }
            SelectError::AmbiguousWhole { module, records } => write!(
                f,
                "module {:?} has {} records, pick one explicitly",
                module, records
            ),
        }
    }
}

impl std::error::Error for SelectError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = ViewerError::NotFound(PathBuf::from("/tmp/zsim.h5"));
        assert_eq!(e.to_string(), "file not found: /tmp/zsim.h5");

        let e = ViewerError::FileFormat {
            path: PathBuf::from("x.zsv"),
            reason: "bad magic".into(),
        };
        assert!(e.to_string().contains("bad magic"));

        let w = SchemaWarning {
            snapshot: 2,
            path: "/2/core/hist".into(),
            reason: "2-dimensional dataset".into(),
        };
        assert_eq!(
            w.to_string(),
            "snapshot 2: /2/core/hist shown as raw value (2-dimensional dataset)"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::other("disk gone");
        let e: ViewerError = io.into();
        assert_eq!(e, ViewerError::Io("disk gone".into()));
    }

    #[test]
    fn test_select_error_display() {
        let e = SelectError::AmbiguousWhole {
            module: "l2".into(),
            records: 3,
        };
        assert_eq!(e.to_string(), "module \"l2\" has 3 records, pick one explicitly");
    }
}
