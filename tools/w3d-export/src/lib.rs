//! w3d-export library
//!
//! Settings persistence, scene summaries and the convert pipeline behind the
//! `w3d-export` binary.

pub mod convert;
pub mod settings;
pub mod summary;

pub use convert::{convert, default_output_path, load_scene};
pub use settings::{DEFAULT_SETTINGS_FILE, Settings};
pub use summary::describe;
