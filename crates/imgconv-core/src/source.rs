//! Input image sources.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::format::Format;

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for one source within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(u64);

impl SourceId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Allocate a fresh, process-unique id.
    pub fn next() -> Self {
        Self(NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "src-{}", self.0)
    }
}

/// A raw file handed over by the collaborator layer, before intake.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub declared_type: String,
    pub bytes: Bytes,
}

impl SourceFile {
    pub fn new(
        name: impl Into<String>,
        declared_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// Immutable handle to one input image.
///
/// The byte buffer is reference counted, so clones share storage and the
/// pipeline never copies or mutates the original bytes.
#[derive(Debug, Clone)]
pub struct ImageSource {
    id: SourceId,
    name: String,
    declared_type: String,
    bytes: Bytes,
}

impl ImageSource {
    pub fn new(
        id: SourceId,
        name: impl Into<String>,
        declared_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            declared_type: declared_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Accept a collaborator file if it is image-typed, assigning a new id.
    ///
    /// Returns `None` for non-image entries; those are dropped silently.
    pub fn from_file(file: SourceFile) -> Option<Self> {
        if !is_image_type(&file.declared_type) {
            return None;
        }
        Some(Self {
            id: SourceId::next(),
            name: file.name,
            declared_type: file.declared_type,
            bytes: file.bytes,
        })
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The MIME type the caller declared. Used as a decode hint only.
    pub fn declared_type(&self) -> &str {
        &self.declared_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn byte_length(&self) -> usize {
        self.bytes.len()
    }

    /// Suggested download name for this source converted to `format`.
    pub fn suggested_file_name(&self, format: Format) -> String {
        suggested_file_name(&self.name, format)
    }
}

/// Whether a declared MIME type names an image (`image/*`).
pub fn is_image_type(declared_type: &str) -> bool {
    declared_type
        .trim()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}

/// `<base>.<ext>` where base is the name up to its first `.`.
pub fn suggested_file_name(original: &str, format: Format) -> String {
    let base = original.split('.').next().unwrap_or_default();
    let base = if base.is_empty() { "image" } else { base };
    format!("{}.{}", base, format.extension())
}
