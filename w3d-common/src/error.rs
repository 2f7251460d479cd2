//! Error taxonomy for W3D import and export
//!
//! Every structural violation found while parsing is fatal to the call that
//! found it; no partially built scene is ever returned.

use std::io;

use crate::options::ExportMode;

/// Result alias used throughout the crate
pub type Result<T, E = W3dError> = std::result::Result<T, E>;

/// Errors produced by the W3D codec
#[derive(Debug, thiserror::Error)]
pub enum W3dError {
    /// Chunk framing is inconsistent (size overruns its parent, bad container flag)
    #[error("malformed chunk 0x{tag:08X} at offset {offset}: {reason}")]
    MalformedChunk {
        tag: u32,
        offset: usize,
        reason: String,
    },

    /// Input ended before a header, payload or primitive could be read
    #[error("truncated input reading {what}: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput {
        what: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// Pivot tree violates ordering, root or naming rules
    #[error("invalid hierarchy '{hierarchy}': {reason}")]
    InvalidHierarchy { hierarchy: String, reason: String },

    /// Bone name lookup failed
    #[error("unknown bone '{0}'")]
    UnknownBone(String),

    /// Mesh arrays disagree with each other or with the mesh header
    #[error("inconsistent mesh '{mesh}': {reason}")]
    InconsistentMesh { mesh: String, reason: String },

    /// Channel data disagrees with the animation header or the codec tables
    #[error("corrupt channel for pivot {pivot} in animation '{animation}': {reason}")]
    CorruptAnimationChannel {
        animation: String,
        pivot: u16,
        reason: String,
    },

    /// A mesh, animation or HLOD refers to a hierarchy, pivot or mesh that is not present
    #[error("dangling reference: {0}")]
    DanglingReference(String),

    /// A value does not fit the on-disk representation
    #[error("cannot encode {0}")]
    Unencodable(String),

    /// The selected export mode has no content in the scene
    #[error("nothing to export in {0} mode")]
    NothingToExport(ExportMode),

    /// Underlying file system error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl W3dError {
    pub(crate) fn invalid_hierarchy(hierarchy: &str, reason: impl Into<String>) -> Self {
        W3dError::InvalidHierarchy {
            hierarchy: hierarchy.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn inconsistent_mesh(mesh: &str, reason: impl Into<String>) -> Self {
        W3dError::InconsistentMesh {
            mesh: mesh.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt_channel(animation: &str, pivot: u16, reason: impl Into<String>) -> Self {
        W3dError::CorruptAnimationChannel {
            animation: animation.to_string(),
            pivot,
            reason: reason.into(),
        }
    }
}
