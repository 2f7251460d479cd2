//! W3D model and animation codec
//!
//! Reads and writes the chunked binary format used by Westwood's W3D engine:
//! skeleton hierarchies, meshes, hierarchical LOD tables and animations in
//! uncompressed, time-coded and adaptive-delta encodings.
//!
//! # Layers
//! - [`chunk`]: tag/size framing, shared by every other module
//! - [`hierarchy`], [`mesh`], [`hlod`], [`animation`]: one module per container
//! - [`scene`]: top-level dispatch and cross-reference checks
//! - [`builder`]: name-based scene construction
//! - [`file`]: path and byte-buffer entry points
//!
//! All values are little-endian. Parsing never panics on hostile input and
//! never returns a partially built scene.

pub mod animation;
pub mod builder;
pub mod chunk;
pub mod error;
pub mod file;
pub mod hierarchy;
pub mod hlod;
pub mod mesh;
pub mod options;
pub mod primitives;
pub mod scene;

pub use animation::{Animation, Channel, ChannelKind, ChannelValue, Keyframe};
pub use builder::{AnimationClip, BoneWeight, ROOT_PIVOT_NAME, SceneBuilder, Track};
pub use chunk::{ChunkKind, ChunkReader, ChunkWriter, RawChunk, read_chunks};
pub use error::{Result, W3dError};
pub use file::{export, import, read_scene, write_scene};
pub use hierarchy::{Hierarchy, Pivot};
pub use hlod::{Hlod, HlodLod, HlodSubObject};
pub use mesh::{Mesh, Triangle, VertexInfluence};
pub use options::{Compression, ExportMode, ExportOptions};
pub use scene::Scene;
