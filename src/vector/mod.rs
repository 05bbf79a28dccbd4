// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vector storage and similarity search

pub mod hnsw;

pub use hnsw::{IndexEntry, RetrievedSegment, VectorIndex};
