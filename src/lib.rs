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

//! Batchframe is a batched writer for length-prefixed binary frame files.
//!
//! It is the output stage of a deduplicating backup pipeline: unique chunks are
//! written as length-prefixed records, offset tables as raw 4-byte values, and
//! a 4-byte header slot at the start of the file can be patched once the body
//! is complete. Frames are accumulated in memory and flushed in large
//! sequential writes.

pub mod constants;
pub mod error;
pub mod frames;
pub mod writer;

#[cfg(test)]
mod tests;

pub use error::{FrameError, Result};
pub use writer::{BatchedFrameWriter, BatchedFrameWriterConfig, WriterState};
