//! JSON tree variant: the node tree serialized with serde_json.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::ViewerError;

use super::tree::{MemorySource, Node};
use super::unreadable;

/// True if the prefix starts (after whitespace) with a JSON object.
pub(super) fn looks_like_json(head: &[u8]) -> bool {
    head.iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{')
}

pub(super) fn load(path: &Path) -> Result<MemorySource, ViewerError> {
    let bytes = fs::read(path).map_err(|e| unreadable(path, e))?;
    let root: Node = serde_json::from_slice(&bytes).map_err(|e| ViewerError::FileFormat {
        path: path.to_path_buf(),
        reason: format!("invalid JSON container: {}", e),
    })?;
    if !matches!(root, Node::Group { .. }) {
        return Err(ViewerError::FileFormat {
            path: path.to_path_buf(),
            reason: "JSON container root is not a group".to_string(),
        });
    }
    debug!(path = %path.display(), children = root.children().len(), "json container loaded");
    Ok(MemorySource::with_format(root, "json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerSource;
    use crate::container::types::{NodePath, Value};
    use tempfile::tempdir;

    #[test]
    fn test_looks_like_json() {
        assert!(looks_like_json(b"  \n{\"Gr"));
        assert!(!looks_like_json(b"ZSV1"));
        assert!(!looks_like_json(b""));
    }

    #[test]
    fn test_load_rejects_non_group_root() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.json");
        let node = Node::scalar("x", Value::Int(1));
        fs::write(&path, serde_json::to_vec(&node).unwrap()).unwrap();
        assert!(matches!(load(&path), Err(ViewerError::FileFormat { .. })));

        fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(load(&path), Err(ViewerError::FileFormat { .. })));
    }

    #[test]
    fn test_load_group() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("x.json");
        let root = Node::group("/").with_child(Node::group("0"));
        fs::write(&path, serde_json::to_vec(&root).unwrap()).unwrap();
        let src = load(&path).unwrap();
        assert_eq!(src.format_name(), "json");
        assert_eq!(src.list_children(&NodePath::root()).unwrap().len(), 1);
    }
}
