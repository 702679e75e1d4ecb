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

//! Constants used in the batchframe file layout.

/// Size of the reserved header slot at the start of every file.
pub const HEADER_SLOT_SIZE: usize = 4;

/// Size of the little-endian length field in front of each chunk record.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Size of a raw offset frame.
pub const OFFSET_FRAME_SIZE: usize = 4;

/// Largest payload a chunk record can carry (the length field is a `u32`).
pub const MAX_CHUNK_PAYLOAD: u64 = u32::MAX as u64;

/// Largest value a raw offset frame can hold.
pub const MAX_OFFSET_VALUE: u64 = u32::MAX as u64;

/// Default number of frame units accumulated before a flush.
pub const DEFAULT_MAX_CHUNKS_IN_BATCH: usize = 256;

/// Default per-chunk size hint used to pre-size the accumulation buffer (8 KiB).
pub const DEFAULT_CHUNK_MAX_SIZE: usize = 8 * 1024;

/// Upper bound on the up-front buffer allocation (1 GiB).
///
/// The accumulation buffer may still grow past this on demand.
pub const MAX_BUFFER_PREALLOCATION: usize = 1 << 30;
