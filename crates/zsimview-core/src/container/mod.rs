//! Container adapter: a uniform view over hierarchical statistics files.
//!
//! The rest of the crate only sees [`ContainerSource`], a read-only tree of
//! named groups and typed datasets. Concrete on-disk variants (native chunked
//! files, JSON trees) and the packed-snapshot layout written by the simulator
//! all implement it, so the normalizer never knows which one is open.

mod json;
mod native;
mod packed;
mod role;
mod tree;
mod types;

pub use native::{MAGIC as NATIVE_MAGIC, write_container};
pub use role::FileRole;
pub use tree::{Attribute, MemorySource, Node};
pub use types::{ChildEntry, DataType, FieldDef, LeafData, LeafDescriptor, NodeKind, NodePath, Value};

use std::fs;
use std::io::Read as _;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::ViewerConfig;
use crate::error::ViewerError;

/// Read-only access to one opened hierarchical container.
///
/// Paths are absolute from the container root. Implementations may re-read
/// the underlying file on every call; callers must not assume caching.
pub trait ContainerSource {
    /// Lists direct children of a group in declaration order.
    fn list_children(&self, path: &NodePath) -> Result<Vec<ChildEntry>, ViewerError>;

    /// Returns attributes attached to a group or dataset.
    fn attributes(&self, path: &NodePath) -> Result<Vec<Attribute>, ViewerError>;

    /// Returns type and shape of a dataset without reading its values.
    fn describe(&self, path: &NodePath) -> Result<LeafDescriptor, ViewerError>;

    /// Reads a dataset's values.
    fn read_leaf(&self, path: &NodePath) -> Result<LeafData, ViewerError>;

    /// Short name of the format variant, for status lines and logs.
    fn format_name(&self) -> &'static str;
}

/// The single opened file.
///
/// Owned by the session; dropping or [`Container::close`] releases the file
/// handle held by the source.
pub struct Container {
    path: PathBuf,
    role: Option<FileRole>,
    source: Box<dyn ContainerSource>,
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("path", &self.path)
            .field("role", &self.role)
            .field("format", &self.source.format_name())
            .finish()
    }
}

impl Container {
    /// Opens a container, detecting the format from the file contents.
    ///
    /// Fails with [`ViewerError::NotFound`] when the path does not exist and
    /// [`ViewerError::FileFormat`] when it is not a recognized container.
    pub fn open(path: impl AsRef<Path>, config: &ViewerConfig) -> Result<Self, ViewerError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ViewerError::NotFound(path.to_path_buf()));
        }
        if path.is_dir() {
            return Err(ViewerError::FileFormat {
                path: path.to_path_buf(),
                reason: "path is a directory".to_string(),
            });
        }

        let mut head = [0u8; 8];
        let head_len = {
            let mut file = fs::File::open(path).map_err(|e| unreadable(path, e))?;
            read_prefix(&mut file, &mut head).map_err(|e| unreadable(path, e))?
        };
        let head = &head[..head_len];

        let source: Box<dyn ContainerSource> = if head.starts_with(&NATIVE_MAGIC) {
            Box::new(native::NativeSource::open(path)?)
        } else if json::looks_like_json(head) {
            Box::new(json::load(path)?)
        } else {
            return Err(ViewerError::FileFormat {
                path: path.to_path_buf(),
                reason: format!("unrecognized header {:02x?}", head),
            });
        };

        let source = packed::wrap_if_packed(source, config);
        let role = FileRole::detect(path);
        info!(
            path = %path.display(),
            format = source.format_name(),
            role = role.map(|r| r.name()).unwrap_or("-"),
            "opened container"
        );

        Ok(Self {
            path: path.to_path_buf(),
            role,
            source,
        })
    }

    /// Wraps an in-memory tree, applying the same packed-layout detection as files.
    pub fn from_tree(name: impl Into<PathBuf>, root: Node, config: &ViewerConfig) -> Self {
        let path = name.into();
        let role = FileRole::detect(&path);
        let source = packed::wrap_if_packed(Box::new(MemorySource::new(root)), config);
        Self { path, role, source }
    }

    /// Releases the underlying file handle.
    pub fn close(self) {
        debug!(path = %self.path.display(), "closing container");
        drop(self);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn role(&self) -> Option<FileRole> {
        self.role
    }

    pub fn format_name(&self) -> &'static str {
        self.source.format_name()
    }

    pub fn list_children(&self, path: &NodePath) -> Result<Vec<ChildEntry>, ViewerError> {
        self.source.list_children(path)
    }

    pub fn attributes(&self, path: &NodePath) -> Result<Vec<Attribute>, ViewerError> {
        self.source.attributes(path)
    }

    pub fn describe(&self, path: &NodePath) -> Result<LeafDescriptor, ViewerError> {
        self.source.describe(path)
    }

    pub fn read_leaf(&self, path: &NodePath) -> Result<LeafData, ViewerError> {
        self.source.read_leaf(path)
    }
}

/// Maps a failure to open or read a path that exists to `FileFormat`.
pub(crate) fn unreadable(path: &Path, e: std::io::Error) -> ViewerError {
    if e.kind() == std::io::ErrorKind::NotFound {
        return ViewerError::NotFound(path.to_path_buf());
    }
    ViewerError::FileFormat {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

fn read_prefix(file: &mut fs::File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
