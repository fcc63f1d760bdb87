// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stepflow contributors

//! Graph primitives
//!
//! Leaf building blocks with no knowledge of projects or pipelines:
//! glob listings, content checksums and the filesystem capability.

mod checksum;
mod fs;
mod listing;

pub use checksum::{checksum_files, ContentHasher};
pub use fs::{FileSystem, LocalFileSystem};
pub use listing::FileListing;
