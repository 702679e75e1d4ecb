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

//! Frame encoding primitives.
//!
//! A batchframe file is a 4-byte header slot followed by a sequence of frames:
//!
//! ```text
//! +-------------+------------------------------------------------------+
//! | header slot | frames ...                                           |
//! |  (4 bytes)  |                                                      |
//! +-------------+------------------------------------------------------+
//!
//! chunk record:  +------------+------------------+
//!                | length L   | payload          |
//!                | (u32 LE)   | (L bytes)        |
//!                +------------+------------------+
//!
//! raw offset:    +------------+
//!                | value      |
//!                | (u32 LE)   |
//!                +------------+
//! ```
//!
//! Both frame kinds share the same 4-byte little-endian primitive, so a reader
//! has to learn out-of-band (usually from the patched header slot) which region
//! holds chunk records and which holds raw offsets.

pub mod encoder;

pub use encoder::{
    chunk_record_len, header_field_bytes, put_chunk_record, put_offset, validate_offset,
};
