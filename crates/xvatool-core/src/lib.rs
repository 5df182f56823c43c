//! xvatool Core Library
//!
//! This crate converts Xen XVA export archives into sparse raw disk images,
//! each paired with a monolithic-flat VMDK descriptor.
//!
//! # Overview
//!
//! An XVA export is a tar archive carrying interleaved disk-block and
//! checksum entries. The conversion is a single streaming pass: blocks are
//! written to growable sparse files at their computed offsets, checksums
//! are verified as they arrive, and descriptors are synthesized once the
//! pass completes. The main entry point is [`convert_archive`].
//!
//! # Modules
//!
//! - [`error`] - Error types and Result alias
//! - [`xva`] - Archive entry classification
//! - [`disk`] - Sparse raw image reconstruction
//! - [`checksum`] - SHA-1 verification of written blocks
//! - [`vmdk`] - VMDK descriptor synthesis
//! - [`convert`] - Conversion orchestrator
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use xvatool_core::{convert_archive, ConvertOptions, RandomCid};
//!
//! let archive = Path::new("/exports/vm.xva");
//! let out_dir = Path::new("/exports");
//! let mut cids = RandomCid::new();
//!
//! convert_archive(archive, out_dir, &ConvertOptions::default(), &mut cids).unwrap();
//! ```

pub mod checksum;
pub mod convert;
pub mod disk;
pub mod error;
pub mod vmdk;
pub mod xva;

pub use error::{Error, Result};

// Re-export the conversion surface for convenience
pub use convert::{
    archive_base_name, convert_archive, ConvertOptions, ConvertReport, DiskReport,
};
pub use vmdk::{CidGenerator, RandomCid};
