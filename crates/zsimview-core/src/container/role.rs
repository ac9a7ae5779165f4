//! Recognized statistics file roles.

use std::path::{Path, PathBuf};

/// The three files a simulation run produces. All share one schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileRole {
    /// Periodic statistics (`zsim.h5`).
    Primary,
    /// Event-driven statistics (`zsim-ev.h5`).
    EventDriven,
    /// Comparison statistics (`zsim-cmp.h5`).
    Comparison,
}

impl FileRole {
    pub fn all() -> &'static [FileRole] {
        &[FileRole::Primary, FileRole::EventDriven, FileRole::Comparison]
    }

    pub fn name(&self) -> &'static str {
        match self {
            FileRole::Primary => "primary",
            FileRole::EventDriven => "event",
            FileRole::Comparison => "comparison",
        }
    }

    /// File stem the simulator writes for this role.
    pub fn stem(&self) -> &'static str {
        match self {
            FileRole::Primary => "zsim",
            FileRole::EventDriven => "zsim-ev",
            FileRole::Comparison => "zsim-cmp",
        }
    }

    pub fn default_filename(&self) -> String {
        format!("{}.h5", self.stem())
    }

    pub fn default_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.default_filename())
    }

    /// Detects the role from the file stem, ignoring the extension.
    pub fn detect(path: &Path) -> Option<FileRole> {
        let stem = path.file_stem()?.to_str()?;
        FileRole::all().iter().copied().find(|r| r.stem() == stem)
    }

    /// Parses a CLI role name (`primary`, `ev`, `event`, `cmp`, `comparison`).
    pub fn parse(s: &str) -> Option<FileRole> {
        match s.to_ascii_lowercase().as_str() {
            "primary" | "zsim" => Some(FileRole::Primary),
            "ev" | "event" | "zsim-ev" => Some(FileRole::EventDriven),
            "cmp" | "comparison" | "zsim-cmp" => Some(FileRole::Comparison),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_stem() {
        assert_eq!(FileRole::detect(Path::new("/out/zsim.h5")), Some(FileRole::Primary));
        assert_eq!(
            FileRole::detect(Path::new("zsim-ev.zsv")),
            Some(FileRole::EventDriven)
        );
        assert_eq!(
            FileRole::detect(Path::new("run/zsim-cmp.json")),
            Some(FileRole::Comparison)
        );
        assert_eq!(FileRole::detect(Path::new("other.h5")), None);
    }

    #[test]
    fn test_parse_and_default_path() {
        assert_eq!(FileRole::parse("EV"), Some(FileRole::EventDriven));
        assert_eq!(FileRole::parse("bogus"), None);
        assert_eq!(
            FileRole::Comparison.default_path(Path::new("/run")),
            PathBuf::from("/run/zsim-cmp.h5")
        );
    }
}
