//! Model import boundary.
//!
//! Parsing concrete model formats is left to implementors of [`Importer`];
//! [`JsonImporter`] reads the crate's own JSON layout.

pub mod importer;

pub use importer::{Importer, JsonImporter, MAX_INFLUENCES, MeshRecord, ModelFile};
