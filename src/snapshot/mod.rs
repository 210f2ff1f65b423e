//! Snapshot export, import and persistence

pub mod codec;
pub mod persist;

pub use codec::{EnvFields, RatingSnapshot, SnapshotContext, SnapshotImport, SnapshotMeta, DEFAULT_SOURCE};
pub use persist::SnapshotFile;
