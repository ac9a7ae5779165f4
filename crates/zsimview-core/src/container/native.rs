//! Native container format: one zstd frame per top-level node with O(1)
//! random access, so opening a file never decodes snapshots the user does
//! not visit.
//!
//! File layout:
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ HEADER (32 bytes, uncompressed)                         │
//! │   magic: [u8; 4]              = b"ZSV1"                 │
//! │   version: u16                = 1                       │
//! │   _reserved: u16                                        │
//! │   frame_count: u32                                      │
//! │   manifest_offset: u64                                  │
//! │   manifest_len: u64                                     │
//! │   _reserved: [u8; 4]                                    │
//! ├─────────────────────────────────────────────────────────┤
//! │ INDEX TABLE (frame_count × 24 bytes, uncompressed)      │
//! │     offset: u64                                         │
//! │     compressed_len: u64                                 │
//! │     uncompressed_len: u32                               │
//! │     crc32: u32          (of the compressed bytes)       │
//! ├─────────────────────────────────────────────────────────┤
//! │ NODE FRAMES                                             │
//! │   zstd(postcard(Node_0)) ...                            │
//! ├─────────────────────────────────────────────────────────┤
//! │ MANIFEST FRAME                                          │
//! │   zstd(postcard(Manifest { root attrs, child entries }))│
//! └─────────────────────────────────────────────────────────┘
//! ```

use std::cell::RefCell;
use std::fs;
use std::io::{Read as _, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ViewerError;

use super::{ContainerSource, unreadable};
use super::tree::{Attribute, Node};
use super::types::{ChildEntry, LeafData, LeafDescriptor, NodePath};

pub const MAGIC: [u8; 4] = *b"ZSV1";
const VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;
const INDEX_ENTRY_SIZE: usize = 24;
const COMPRESSION_LEVEL: i32 = 3;

/// Root-level metadata stored in its own frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    attrs: Vec<Attribute>,
    children: Vec<ChildEntry>,
}

#[derive(Debug, Clone, Copy)]
struct FrameEntry {
    offset: u64,
    compressed_len: u64,
    uncompressed_len: u32,
    crc32: u32,
}

/// Reader holding the open file for the container's lifetime.
pub struct NativeSource {
    path: PathBuf,
    file: RefCell<fs::File>,
    manifest: Manifest,
    index: Vec<FrameEntry>,
    /// Most recently decoded frame.
    cache: RefCell<Option<(usize, Rc<Node>)>>,
}

impl NativeSource {
    /// Opens a native file: reads header, index and manifest (no node frames).
    pub fn open(path: &Path) -> Result<Self, ViewerError> {
        let mut file = fs::File::open(path).map_err(|e| unreadable(path, e))?;
        let file_len = file.metadata().map_err(|e| unreadable(path, e))?.len();

        let mut header = [0u8; HEADER_SIZE];
        file.read_exact(&mut header)
            .map_err(|_| format_error(path, "file too small for header"))?;

        if header[0..4] != MAGIC {
            return Err(format_error(
                path,
                &format!("invalid magic: expected ZSV1, got {:?}", &header[0..4]),
            ));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(format_error(path, &format!("unsupported version: {}", version)));
        }
        let frame_count = read_u32(&header[8..12]) as usize;
        let manifest_offset = read_u64(&header[12..20]);
        let manifest_len = read_u64(&header[20..28]);

        let index_size = frame_count
            .checked_mul(INDEX_ENTRY_SIZE)
            .ok_or_else(|| format_error(path, "frame count overflow"))?;
        if (HEADER_SIZE + index_size) as u64 > file_len {
            return Err(format_error(path, "file too small for index"));
        }
        let mut index_buf = vec![0u8; index_size];
        file.read_exact(&mut index_buf)?;

        let mut index = Vec::with_capacity(frame_count);
        for i in 0..frame_count {
            let base = i * INDEX_ENTRY_SIZE;
            let entry = FrameEntry {
                offset: read_u64(&index_buf[base..base + 8]),
                compressed_len: read_u64(&index_buf[base + 8..base + 16]),
                uncompressed_len: read_u32(&index_buf[base + 16..base + 20]),
                crc32: read_u32(&index_buf[base + 20..base + 24]),
            };
            if entry.offset.saturating_add(entry.compressed_len) > file_len {
                return Err(format_error(
                    path,
                    &format!("frame {} extends past end of file", i),
                ));
            }
            index.push(entry);
        }

        if manifest_offset.saturating_add(manifest_len) > file_len {
            return Err(format_error(path, "manifest extends past end of file"));
        }
        file.seek(SeekFrom::Start(manifest_offset))?;
        let mut compressed = vec![0u8; manifest_len as usize];
        file.read_exact(&mut compressed)?;
        let raw = zstd::decode_all(&compressed[..])
            .map_err(|e| format_error(path, &format!("manifest decompression: {}", e)))?;
        let manifest: Manifest = postcard::from_bytes(&raw)
            .map_err(|e| format_error(path, &format!("manifest decode: {}", e)))?;

        if manifest.children.len() != frame_count {
            return Err(format_error(
                path,
                &format!(
                    "manifest lists {} children but index has {} frames",
                    manifest.children.len(),
                    frame_count
                ),
            ));
        }

        debug!(path = %path.display(), frames = frame_count, "native container opened");

        Ok(Self {
            path: path.to_path_buf(),
            file: RefCell::new(file),
            manifest,
            index,
            cache: RefCell::new(None),
        })
    }

    fn load_frame(&self, idx: usize) -> Result<Rc<Node>, ViewerError> {
        if let Some((cached_idx, node)) = self.cache.borrow().as_ref()
            && *cached_idx == idx
        {
            return Ok(Rc::clone(node));
        }

        let entry = self.index[idx];
        let mut compressed = vec![0u8; entry.compressed_len as usize];
        {
            let mut file = self.file.borrow_mut();
            file.seek(SeekFrom::Start(entry.offset))?;
            file.read_exact(&mut compressed)?;
        }

        let crc = crc32fast::hash(&compressed);
        if crc != entry.crc32 {
            warn!(
                path = %self.path.display(),
                frame = idx,
                expected = entry.crc32,
                actual = crc,
                "native: frame checksum mismatch"
            );
            return Err(format_error(&self.path, &format!("frame {} checksum mismatch", idx)));
        }

        let raw = zstd::bulk::decompress(&compressed, entry.uncompressed_len as usize)
            .map_err(|e| format_error(&self.path, &format!("frame {}: {}", idx, e)))?;
        let node: Node = postcard::from_bytes(&raw).map_err(|e| {
            warn!(
                frame = idx,
                uncompressed_len = entry.uncompressed_len,
                error = %e,
                "native: frame deserialization failed"
            );
            format_error(&self.path, &format!("frame {}: {}", idx, e))
        })?;

        let node = Rc::new(node);
        *self.cache.borrow_mut() = Some((idx, Rc::clone(&node)));
        Ok(node)
    }

    /// Resolves a non-root path: the first component (by position when known)
    /// selects the frame.
    fn with_node<T>(
        &self,
        path: &NodePath,
        f: impl FnOnce(&Node) -> Result<T, ViewerError>,
    ) -> Result<T, ViewerError> {
        let (first, rest) = path
            .components()
            .split_first()
            .ok_or_else(|| ViewerError::MissingNode(path.to_string()))?;
        let idx = match path.top_position() {
            Some(position) => self
                .manifest
                .children
                .get(position)
                .filter(|c| &c.name == first)
                .map(|_| position),
            None => self.manifest.children.iter().position(|c| &c.name == first),
        }
        .ok_or_else(|| ViewerError::MissingNode(path.to_string()))?;
        let frame = self.load_frame(idx)?;
        let node = frame
            .find(rest)
            .ok_or_else(|| ViewerError::MissingNode(path.to_string()))?;
        f(node)
    }
}

impl ContainerSource for NativeSource {
    fn list_children(&self, path: &NodePath) -> Result<Vec<ChildEntry>, ViewerError> {
        if path.is_root() {
            return Ok(self.manifest.children.clone());
        }
        self.with_node(path, |node| node.group_children(path))
    }

    fn attributes(&self, path: &NodePath) -> Result<Vec<Attribute>, ViewerError> {
        if path.is_root() {
            return Ok(self.manifest.attrs.clone());
        }
        self.with_node(path, |node| Ok(node.attrs().to_vec()))
    }

    fn describe(&self, path: &NodePath) -> Result<LeafDescriptor, ViewerError> {
        if path.is_root() {
            return Err(ViewerError::NotALeaf(path.to_string()));
        }
        self.with_node(path, |node| node.leaf_descriptor(path))
    }

    fn read_leaf(&self, path: &NodePath) -> Result<LeafData, ViewerError> {
        if path.is_root() {
            return Err(ViewerError::NotALeaf(path.to_string()));
        }
        self.with_node(path, |node| node.leaf_data(path))
    }

    fn format_name(&self) -> &'static str {
        "native"
    }
}

/// Writes a tree in the native format. `root` must be a group; each of its
/// children becomes one frame.
///
/// The file is written atomically via a `.tmp` intermediate file.
pub fn write_container(path: &Path, root: &Node) -> Result<(), ViewerError> {
    let Node::Group {
        attrs, children, ..
    } = root
    else {
        return Err(ViewerError::NotAGroup("/".to_string()));
    };
    if children.len() > u32::MAX as usize {
        return Err(ViewerError::Io("too many top-level nodes".to_string()));
    }

    let tmp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&tmp_path)?;

    // Placeholder header + index, rewritten once offsets are known.
    file.write_all(&[0u8; HEADER_SIZE])?;
    file.write_all(&vec![0u8; children.len() * INDEX_ENTRY_SIZE])?;

    let mut entries = Vec::with_capacity(children.len());
    for child in children {
        let raw = postcard::to_allocvec(child).map_err(|e| ViewerError::Io(e.to_string()))?;
        let uncompressed_len = frame_len(raw.len())?;
        let compressed = zstd::bulk::compress(&raw, COMPRESSION_LEVEL)?;
        let offset = file.stream_position()?;
        file.write_all(&compressed)?;
        entries.push(FrameEntry {
            offset,
            compressed_len: compressed.len() as u64,
            uncompressed_len,
            crc32: crc32fast::hash(&compressed),
        });
    }

    let manifest = Manifest {
        attrs: attrs.clone(),
        children: root.child_entries(),
    };
    let raw_manifest =
        postcard::to_allocvec(&manifest).map_err(|e| ViewerError::Io(e.to_string()))?;
    let compressed_manifest = zstd::encode_all(&raw_manifest[..], COMPRESSION_LEVEL)?;
    let manifest_offset = file.stream_position()?;
    file.write_all(&compressed_manifest)?;

    file.seek(SeekFrom::Start(0))?;
    let mut header = [0u8; HEADER_SIZE];
    header[0..4].copy_from_slice(&MAGIC);
    header[4..6].copy_from_slice(&VERSION.to_le_bytes());
    header[8..12].copy_from_slice(&(entries.len() as u32).to_le_bytes());
    header[12..20].copy_from_slice(&manifest_offset.to_le_bytes());
    header[20..28].copy_from_slice(&(compressed_manifest.len() as u64).to_le_bytes());
    file.write_all(&header)?;

    for entry in &entries {
        file.write_all(&entry.offset.to_le_bytes())?;
        file.write_all(&entry.compressed_len.to_le_bytes())?;
        file.write_all(&entry.uncompressed_len.to_le_bytes())?;
        file.write_all(&entry.crc32.to_le_bytes())?;
    }

    file.sync_all()?;
    drop(file);
    fs::rename(tmp_path, path)?;

    Ok(())
}

/// Index entries store the decoded frame size as u32.
fn frame_len(len: usize) -> Result<u32, ViewerError> {
    u32::try_from(len)
        .map_err(|_| ViewerError::Io(format!("frame of {} bytes exceeds the 4 GiB limit", len)))
}

fn format_error(path: &Path, reason: &str) -> ViewerError {
    ViewerError::FileFormat {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}
