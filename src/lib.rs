#![warn(missing_docs)]
#![warn(unsafe_code)]
//! Read-only FAT12 disk image reader
//!
//! Decodes the geometry in the boot sector, the packed 12-bit allocation
//! table and the root directory of a FAT12 image, including VFAT long names,
//! and follows cluster chains to find file content.  The image is never
//! written to.

/// Error types
pub mod error;

/// Read-only access to the backing image
pub mod store;

/// nom helpers shared by the record parsers
pub mod parse;

/// Boot record parser and volume geometry
pub mod layout;

/// File Allocation Table Cluster functions and data structures
pub mod cluster;

/// Cluster chain walker
pub mod cluster_chain;

/// SanityCheck trait
pub mod sanity_check;

/// FAT Directory Table parser
pub mod directory_table;

/// VFAT long file names
pub mod long_name;

/// File-handling functions
/// This module combines the directory table with the FAT cluster
/// to piece together files
pub mod file;

/// Reader settings
pub mod settings;

/// Read sessions over an image
pub mod scan;

#[cfg(test)]
mod test_image;
