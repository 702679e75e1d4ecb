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

//! Batched frame writer implementation.
//!
//! This module accumulates chunk records and raw offsets in memory and hands
//! them to the output stream in large sequential writes.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use bytes::BytesMut;
use log::{debug, info, trace, warn};

use crate::constants::{
    DEFAULT_CHUNK_MAX_SIZE, DEFAULT_MAX_CHUNKS_IN_BATCH, HEADER_SLOT_SIZE,
    MAX_BUFFER_PREALLOCATION,
};
use crate::error::{FrameError, Result};
use crate::frames::{
    chunk_record_len, header_field_bytes, put_chunk_record, put_offset, validate_offset,
};

/// Configuration options for a BatchedFrameWriter.
#[derive(Debug, Clone)]
pub struct BatchedFrameWriterConfig {
    /// Number of frame units (chunk records or single offsets) accumulated
    /// before the next framed append triggers a flush.
    ///
    /// A value of 0 makes every framed append flush the previous one first.
    pub max_chunks_in_batch: usize,

    /// Expected maximum chunk size in bytes.
    ///
    /// Only used to pre-size the accumulation buffer; larger chunks are accepted.
    pub chunk_max_size: usize,
}

impl Default for BatchedFrameWriterConfig {
    fn default() -> Self {
        Self {
            max_chunks_in_batch: DEFAULT_MAX_CHUNKS_IN_BATCH,
            chunk_max_size: DEFAULT_CHUNK_MAX_SIZE,
        }
    }
}

impl BatchedFrameWriterConfig {
    /// Creates a new configuration with the given batch threshold and chunk size hint.
    pub fn new(max_chunks_in_batch: usize, chunk_max_size: usize) -> Self {
        Self {
            max_chunks_in_batch,
            chunk_max_size,
        }
    }

    /// Returns the initial capacity of the accumulation buffer.
    ///
    /// This is `chunk_max_size * max_chunks_in_batch`, capped at
    /// [`MAX_BUFFER_PREALLOCATION`].
    pub fn buffer_capacity_hint(&self) -> usize {
        self.chunk_max_size
            .saturating_mul(self.max_chunks_in_batch)
            .min(MAX_BUFFER_PREALLOCATION)
    }
}

/// State of a BatchedFrameWriter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// The writer accepts appends.
    Open,

    /// The writer has been finalized, or gave up its sink after an I/O error.
    Closed,
}

/// Writer for batched chunk records and offset frames.
///
/// Frames are appended to an in-memory accumulation buffer. Once the batch
/// holds `max_chunks_in_batch` frame units, the next framed append first
/// flushes the whole buffer to a buffered output stream in a single write.
///
/// The first 4 bytes of the file are a header slot that can be patched after
/// the body has been written, typically to record where a trailing offset
/// table begins.
///
/// All mutating operations take `&mut self`, so a writer can only be driven
/// from one place at a time. Sharing it between threads requires wrapping it
/// in a `Mutex`.
///
/// # Example
///
/// ```no_run
/// use batchframe::writer::{BatchedFrameWriter, BatchedFrameWriterConfig};
///
/// let config = BatchedFrameWriterConfig::new(1024, 16 * 1024);
/// let mut writer = BatchedFrameWriter::create("chunks.bin", config).unwrap();
///
/// writer.reserve_header_slot().unwrap();
/// writer.append_chunk_record(b"chunk 1").unwrap();
/// writer.append_chunk_record(b"chunk 2").unwrap();
///
/// // Record where the offset table starts, then write it
/// let table_start = writer.offset();
/// writer.append_offsets(&[4, 15]).unwrap();
///
/// writer.flush().unwrap();
/// writer.patch_header_field(table_start as u32).unwrap();
/// writer.finalize_and_close().unwrap();
/// ```
pub struct BatchedFrameWriter<Sink: Write + Seek = File> {
    /// Buffered output stream, `None` once closed.
    stream: Option<BufWriter<Sink>>,

    /// Bytes not yet handed to the output stream.
    buffer: BytesMut,

    /// Frame units appended since the last flush.
    batch_len: usize,

    /// Bytes handed to the output stream so far, including the sink's
    /// starting position.
    committed: u64,

    /// Position of the sink when the writer took it over.
    start_position: u64,

    /// Number of non-empty flushes performed.
    flush_count: u64,

    /// Configuration for the writer.
    config: BatchedFrameWriterConfig,

    /// Current state of the writer.
    state: WriterState,
}

impl BatchedFrameWriter<File> {
    /// Creates (or truncates) the file at `path` and opens a writer on it.
    pub fn create<P: AsRef<Path>>(path: P, config: BatchedFrameWriterConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| FrameError::CreateFailed {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(
            "Created frame file {} (batch of {} frames, {} byte buffer hint)",
            path.display(),
            config.max_chunks_in_batch,
            config.buffer_capacity_hint()
        );

        Self::with_config(file, config)
    }
}

impl<Sink: Write + Seek> BatchedFrameWriter<Sink> {
    /// Creates a new BatchedFrameWriter with default configuration.
    pub fn new(sink: Sink) -> Result<Self> {
        Self::with_config(sink, BatchedFrameWriterConfig::default())
    }

    /// Creates a new BatchedFrameWriter with custom configuration.
    ///
    /// Offsets reported by the writer are absolute positions in `sink`,
    /// starting from its current position.
    pub fn with_config(mut sink: Sink, config: BatchedFrameWriterConfig) -> Result<Self> {
        let committed = sink.stream_position()?;

        Ok(Self {
            stream: Some(BufWriter::new(sink)),
            buffer: BytesMut::with_capacity(config.buffer_capacity_hint()),
            batch_len: 0,
            committed,
            start_position: committed,
            flush_count: 0,
            config,
            state: WriterState::Open,
        })
    }

    /// Appends bytes verbatim, with no framing.
    ///
    /// Raw bytes do not count towards the batch and never trigger a flush.
    ///
    /// # Returns
    ///
    /// * `Result<usize>` - The number of bytes appended
    pub fn append_raw(&mut self, bytes: &[u8]) -> Result<usize> {
        self.ensure_open()?;
        self.buffer.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    /// Reserves the 4-byte header slot with zero bytes.
    ///
    /// Must be the first thing written; fails with
    /// [`FrameError::HeaderSlotMisplaced`] otherwise.
    pub fn reserve_header_slot(&mut self) -> Result<usize> {
        self.ensure_open()?;

        let offset = self.offset();
        if offset != 0 {
            return Err(FrameError::HeaderSlotMisplaced { offset });
        }

        debug!("Reserved {} byte header slot", HEADER_SLOT_SIZE);
        self.append_raw(&[0u8; HEADER_SLOT_SIZE])
    }

    /// Appends a length-prefixed chunk record.
    ///
    /// If the batch is full it is flushed before the record is buffered. The
    /// record is either buffered completely or not at all.
    ///
    /// # Arguments
    ///
    /// * `payload` - The chunk bytes, at most `u32::MAX` long
    ///
    /// # Returns
    ///
    /// * `Result<usize>` - The encoded frame size (`payload.len() + 4`)
    pub fn append_chunk_record(&mut self, payload: &[u8]) -> Result<usize> {
        self.ensure_open()?;

        // Reject oversized payloads before they can cause a flush.
        chunk_record_len(payload.len())?;

        self.flush_if_batch_full()?;
        let written = put_chunk_record(&mut self.buffer, payload)?;
        self.batch_len += 1;

        Ok(written)
    }

    /// Appends a sequence of raw 4-byte offsets, in order.
    ///
    /// Each offset counts as one frame unit, so a long sequence may be split
    /// across several flushes. All values are range-checked up front: if any
    /// does not fit in 32 bits nothing is buffered.
    ///
    /// # Returns
    ///
    /// * `Result<usize>` - The number of offsets written
    pub fn append_offsets(&mut self, offsets: &[u64]) -> Result<usize> {
        self.ensure_open()?;

        let narrowed = offsets
            .iter()
            .map(|&offset| validate_offset(offset))
            .collect::<Result<Vec<u32>>>()?;

        for offset in narrowed {
            self.flush_if_batch_full()?;
            put_offset(&mut self.buffer, offset);
            self.batch_len += 1;
        }

        Ok(offsets.len())
    }

    /// Overwrites the header slot at file position 0 with `value`.
    ///
    /// The slot must already be committed to the output stream (reserve it,
    /// then [`flush`](Self::flush)), and the writer must have started at
    /// position 0 of its sink. Afterwards the stream is repositioned at the
    /// end of the committed data, so later flushes keep appending.
    ///
    /// If any step of the patch fails the stream position is unknown, so the
    /// writer is closed and later calls fail with [`FrameError::Closed`].
    ///
    /// # Returns
    ///
    /// * `Result<usize>` - The number of bytes patched (always 4)
    pub fn patch_header_field(&mut self, value: u32) -> Result<usize> {
        self.ensure_open()?;

        // The slot at position 0 was not written by this writer.
        if self.start_position != 0 {
            return Err(FrameError::HeaderSlotMisplaced {
                offset: self.start_position,
            });
        }

        if self.committed < HEADER_SLOT_SIZE as u64 {
            return Err(FrameError::HeaderSlotNotCommitted {
                committed: self.committed,
            });
        }

        let resume_at = self.committed;
        let stream = self.stream.as_mut().ok_or(FrameError::Closed)?;

        if let Err(e) = write_header_field(stream, value, resume_at) {
            self.abandon_stream();
            return Err(e.into());
        }

        debug!("Patched header slot with {}", value);

        Ok(HEADER_SLOT_SIZE)
    }

    /// Hands all accumulated bytes to the output stream and starts a new batch.
    ///
    /// This does not force the bytes to disk; the output stream keeps its own
    /// buffer until [`finalize_and_close`](Self::finalize_and_close). Flushing
    /// an empty buffer is a no-op.
    ///
    /// A failed write closes the writer; the batch is kept but cannot be
    /// retried, since part of it may already be in the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.flush_batch()
    }

    /// Flushes everything to the underlying sink and closes the writer.
    ///
    /// The sink is released even if the final flush fails. Any later call
    /// fails with [`FrameError::Closed`].
    pub fn finalize_and_close(&mut self) -> Result<()> {
        self.finish().map(drop)
    }

    /// Like [`finalize_and_close`](Self::finalize_and_close), but hands the
    /// sink back instead of dropping it.
    pub fn finalize_into_inner(&mut self) -> Result<Sink> {
        self.finish()
    }

    /// Returns the logical file length: committed bytes plus bytes still
    /// waiting in the accumulation buffer.
    ///
    /// This is the file position at which the next frame will start.
    pub fn offset(&self) -> u64 {
        self.committed + self.buffer.len() as u64
    }

    /// Returns the number of bytes already handed to the output stream.
    pub fn committed(&self) -> u64 {
        self.committed
    }

    /// Returns the number of frame units in the current batch.
    pub fn batch_len(&self) -> usize {
        self.batch_len
    }

    /// Returns the number of bytes waiting in the accumulation buffer.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns how many non-empty flushes have been performed.
    pub fn flush_count(&self) -> u64 {
        self.flush_count
    }

    /// Returns the current writer state.
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Returns the writer configuration.
    pub fn config(&self) -> &BatchedFrameWriterConfig {
        &self.config
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            WriterState::Open => Ok(()),
            WriterState::Closed => Err(FrameError::Closed),
        }
    }

    fn flush_if_batch_full(&mut self) -> Result<()> {
        if self.batch_len >= self.config.max_chunks_in_batch {
            self.flush_batch()?;
        }
        Ok(())
    }

    fn flush_batch(&mut self) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(FrameError::Closed)?;

        let len = self.buffer.len();
        if len == 0 {
            trace!("Nothing to flush");
            self.batch_len = 0;
            return Ok(());
        }

        // A partial write leaves an unknown prefix of the batch in the sink.
        if let Err(e) = stream.write_all(&self.buffer) {
            self.abandon_stream();
            return Err(e.into());
        }

        // clear() keeps the allocation for the next batch
        self.buffer.clear();
        self.batch_len = 0;
        self.committed += len as u64;
        self.flush_count += 1;

        info!("Wrote {} bytes to frame file", len);

        Ok(())
    }

    /// Closes the writer after a failed write or seek without flushing what
    /// the output stream still holds.
    fn abandon_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            let (_sink, unflushed) = stream.into_parts();
            warn!(
                "Closing frame writer after an I/O error, {} bytes in the output stream discarded",
                unflushed.map(|bytes| bytes.len()).unwrap_or(0)
            );
        }
        self.state = WriterState::Closed;
    }

    fn finish(&mut self) -> Result<Sink> {
        self.ensure_open()?;

        let flushed = self.flush_batch();
        let stream = self.stream.take();
        self.state = WriterState::Closed;
        flushed?;

        let mut stream = stream.ok_or(FrameError::Closed)?;
        stream.flush()?;
        let sink = stream
            .into_inner()
            .map_err(|e| FrameError::Io(e.into_error()))?;

        debug!(
            "Closed frame writer after {} bytes in {} flushes",
            self.committed, self.flush_count
        );

        Ok(sink)
    }
}

/// Overwrites the header slot and moves the stream back to `resume_at`.
fn write_header_field<Sink: Write + Seek>(
    stream: &mut BufWriter<Sink>,
    value: u32,
    resume_at: u64,
) -> std::io::Result<()> {
    // Seeking a BufWriter writes out its internal buffer first.
    stream.seek(SeekFrom::Start(0))?;
    stream.write_all(&header_field_bytes(value))?;
    stream.flush()?;
    stream.seek(SeekFrom::Start(resume_at))?;
    Ok(())
}

impl<Sink: Write + Seek> Drop for BatchedFrameWriter<Sink> {
    fn drop(&mut self) {
        // Never drop buffered frames silently.
        if self.state == WriterState::Open {
            if let Err(e) = self.finish() {
                warn!("Failed to finalize frame writer on drop: {}", e);
            }
        }
    }
}
