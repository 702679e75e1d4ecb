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

//! Tests for finalizing, closing and dropping writers.

use std::io::Cursor;

use crate::error::FrameError;
use crate::tests::utils::{decode_chunk_records, SharedSink};
use crate::tests::writer::cursor_writer;
use crate::writer::{BatchedFrameWriter, BatchedFrameWriterConfig, WriterState};

#[test]
fn test_finalize_writes_pending_batch() {
    let mut writer = cursor_writer(100);

    writer.append_chunk_record(b"pending 1").unwrap();
    writer.append_chunk_record(b"pending 2").unwrap();
    assert_eq!(writer.committed(), 0);

    let cursor = writer.finalize_into_inner().unwrap();
    assert_eq!(writer.state(), WriterState::Closed);
    assert_eq!(writer.committed(), 26);

    assert_eq!(
        decode_chunk_records(cursor.get_ref()),
        vec![b"pending 1".to_vec(), b"pending 2".to_vec()]
    );
}

#[test]
fn test_finalize_twice_fails() {
    let mut writer = cursor_writer(4);

    writer.finalize_and_close().unwrap();
    assert!(matches!(writer.finalize_and_close(), Err(FrameError::Closed)));
    assert!(matches!(writer.finalize_into_inner(), Err(FrameError::Closed)));
}

#[test]
fn test_finalize_empty_writer() {
    let mut writer = cursor_writer(4);
    let cursor = writer.finalize_into_inner().unwrap();

    assert!(cursor.get_ref().is_empty());
    assert_eq!(writer.flush_count(), 0);
}

#[test]
fn test_drop_finalizes_open_writer() {
    let sink = SharedSink::default();

    {
        let config = BatchedFrameWriterConfig::new(100, 16);
        let mut writer = BatchedFrameWriter::with_config(sink.clone(), config).unwrap();
        writer.reserve_header_slot().unwrap();
        writer.append_chunk_record(b"kept on drop").unwrap();
        writer.append_offsets(&[4]).unwrap();
        // Dropped without finalize
    }

    let data = sink.contents();
    assert_eq!(data.len(), 4 + 4 + 12 + 4);
    assert_eq!(decode_chunk_records(&data[4..20]), vec![b"kept on drop".to_vec()]);
}

#[test]
fn test_drop_after_finalize_writes_nothing_more() {
    let sink = SharedSink::default();

    {
        let mut writer = BatchedFrameWriter::new(sink.clone()).unwrap();
        writer.append_chunk_record(b"once").unwrap();
        writer.finalize_and_close().unwrap();
    }

    assert_eq!(sink.contents(), vec![0x04, 0x00, 0x00, 0x00, b'o', b'n', b'c', b'e']);
}

#[test]
fn test_writer_moves_across_threads() {
    let writer = BatchedFrameWriter::new(Cursor::new(Vec::new())).unwrap();

    let handle = std::thread::spawn(move || {
        let mut writer = writer;
        writer.append_chunk_record(b"from another thread").unwrap();
        writer.get_data().unwrap()
    });

    let data = handle.join().unwrap();
    assert_eq!(decode_chunk_records(&data), vec![b"from another thread".to_vec()]);
}

#[test]
fn test_shared_writer_behind_mutex() {
    use std::sync::{Arc, Mutex};

    let writer = Arc::new(Mutex::new(cursor_writer(3)));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let writer = Arc::clone(&writer);
            std::thread::spawn(move || {
                for i in 0..10 {
                    let record = format!("t{}-{}", t, i);
                    writer
                        .lock()
                        .unwrap()
                        .append_chunk_record(record.as_bytes())
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let writer = Arc::try_unwrap(writer).ok().unwrap().into_inner().unwrap();
    let records = decode_chunk_records(&writer.get_data().unwrap());
    assert_eq!(records.len(), 40);

    // Each thread's records keep their relative order
    for t in 0..4 {
        let prefix = format!("t{}-", t);
        let ours: Vec<String> = records
            .iter()
            .map(|r| String::from_utf8(r.clone()).unwrap())
            .filter(|r| r.starts_with(&prefix))
            .collect();
        let expected: Vec<String> = (0..10).map(|i| format!("t{}-{}", t, i)).collect();
        assert_eq!(ours, expected);
    }
}
