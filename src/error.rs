// Copyright 2024
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Error types for batchframe operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for batchframe operations.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The output file could not be created or truncated.
    #[error("Failed to create '{}': {source}", path.display())]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A chunk payload does not fit the 32-bit length field.
    #[error("Chunk record of {len} bytes exceeds the maximum frame payload of {max} bytes")]
    FrameTooLarge { len: u64, max: u64 },

    /// An offset value does not fit a 4-byte offset frame.
    #[error("Offset {0} does not fit in a 32-bit offset frame")]
    OffsetTooLarge(u64),

    /// The header slot was reserved after other bytes had been written.
    #[error("Header slot must be reserved at offset 0, writer is at offset {offset}")]
    HeaderSlotMisplaced { offset: u64 },

    /// A header patch was requested before the header slot reached the output stream.
    #[error("Header slot is not committed yet ({committed} bytes committed), flush first")]
    HeaderSlotNotCommitted { committed: u64 },

    /// An I/O error occurred while writing, seeking or flushing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The writer has already been finalized.
    #[error("Writer is closed")]
    Closed,
}

/// A specialized Result type for batchframe operations.
pub type Result<T> = std::result::Result<T, FrameError>;
