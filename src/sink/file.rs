//! C8 (writer half): the `.qrsdp` chunked-LZ4 binary log format — a
//! 64-byte file header, a sequence of LZ4-compressed chunks each prefixed
//! by a 32-byte ChunkHeader, and an optional index footer.

use super::EventSink;
use crate::error::Result;
use crate::types::{DiskEventRecord, EventRecord, TradingSession, DISK_EVENT_RECORD_SIZE};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

pub const MAGIC: &[u8; 8] = b"QRSDPLOG";
pub const VERSION_MAJOR: u16 = 1;
pub const VERSION_MINOR: u16 = 0;
pub const FILE_HEADER_SIZE: u64 = 64;
pub const CHUNK_HEADER_SIZE: usize = 32;
pub const INDEX_ENTRY_SIZE: usize = 32;
pub const INDEX_TAIL_SIZE: usize = 16;
pub const INDEX_MAGIC: &[u8; 4] = b"QIDX";
pub const HAS_INDEX_FLAG: u32 = 1 << 0;

#[derive(Debug, Clone, Copy)]
pub struct IndexEntry {
    pub file_offset: u64,
    pub first_ts_ns: u64,
    pub last_ts_ns: u64,
    pub record_count: u32,
}

impl IndexEntry {
    pub fn to_bytes(&self) -> [u8; INDEX_ENTRY_SIZE] {
        let mut buf = [0u8; INDEX_ENTRY_SIZE];
        buf[0..8].copy_from_slice(&self.file_offset.to_le_bytes());
        buf[8..16].copy_from_slice(&self.first_ts_ns.to_le_bytes());
        buf[16..24].copy_from_slice(&self.last_ts_ns.to_le_bytes());
        buf[24..28].copy_from_slice(&self.record_count.to_le_bytes());
        buf[28..32].copy_from_slice(&0u32.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; INDEX_ENTRY_SIZE]) -> Self {
        IndexEntry {
            file_offset: u64::from_le_bytes(buf[0..8].try_into().unwrap()),
            first_ts_ns: u64::from_le_bytes(buf[8..16].try_into().unwrap()),
            last_ts_ns: u64::from_le_bytes(buf[16..24].try_into().unwrap()),
            record_count: u32::from_le_bytes(buf[24..28].try_into().unwrap()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkHeader {
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    pub record_count: u32,
    pub chunk_flags: u32,
    pub first_ts_ns: u64,
    pub last_ts_ns: u64,
}

impl ChunkHeader {
    pub fn to_bytes(&self) -> [u8; CHUNK_HEADER_SIZE] {
        let mut buf = [0u8; CHUNK_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.uncompressed_size.to_le_bytes());
        buf[4..8].copy_from_slice(&self.compressed_size.to_le_bytes());
        buf[8..12].copy_from_slice(&self.record_count.to_le_bytes());
        buf[12..16].copy_from_slice(&self.chunk_flags.to_le_bytes());
        buf[16..24].copy_from_slice(&self.first_ts_ns.to_le_bytes());
        buf[24..32].copy_from_slice(&self.last_ts_ns.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; CHUNK_HEADER_SIZE]) -> Self {
        ChunkHeader {
            uncompressed_size: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            compressed_size: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
            record_count: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            chunk_flags: u32::from_le_bytes(buf[12..16].try_into().unwrap()),
            first_ts_ns: u64::from_le_bytes(buf[16..24].try_into().unwrap()),
            last_ts_ns: u64::from_le_bytes(buf[24..32].try_into().unwrap()),
        }
    }
}

pub fn write_header(w: &mut impl Write, session: &TradingSession, header_flags: u32) -> Result<()> {
    let mut buf = [0u8; FILE_HEADER_SIZE as usize];
    buf[0..8].copy_from_slice(MAGIC);
    buf[8..10].copy_from_slice(&VERSION_MAJOR.to_le_bytes());
    buf[10..12].copy_from_slice(&VERSION_MINOR.to_le_bytes());
    buf[12..16].copy_from_slice(&(DISK_EVENT_RECORD_SIZE as u32).to_le_bytes());
    buf[16..24].copy_from_slice(&session.seed.to_le_bytes());
    buf[24..28].copy_from_slice(&session.p0_ticks.to_le_bytes());
    buf[28..32].copy_from_slice(&session.tick_size.to_le_bytes());
    buf[32..36].copy_from_slice(&session.session_seconds.to_le_bytes());
    buf[36..40].copy_from_slice(&session.levels_per_side.to_le_bytes());
    buf[40..44].copy_from_slice(&session.initial_spread_ticks.to_le_bytes());
    buf[44..48].copy_from_slice(&session.initial_depth.to_le_bytes());
    buf[48..52].copy_from_slice(&session.chunk_capacity.to_le_bytes());
    buf[52..56].copy_from_slice(&header_flags.to_le_bytes());
    buf[56..64].copy_from_slice(&session.market_open_ns.to_le_bytes());
    w.write_all(&buf)?;
    Ok(())
}

/// Writes the `.qrsdp` chunked compressed format. Owns a write-ahead
/// buffer of `chunk_capacity` records and an index of emitted chunks.
pub struct BinaryFileSink {
    file: File,
    chunk_capacity: usize,
    buffer: Vec<DiskEventRecord>,
    index: Vec<IndexEntry>,
    bytes_written: u64,
    total_records: u64,
    closed: bool,
}

impl BinaryFileSink {
    pub fn create(path: &Path, session: &TradingSession) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new().create(true).write(true).truncate(true).open(path)?;
        write_header(&mut file, session, 0)?;
        Ok(BinaryFileSink {
            file,
            chunk_capacity: session.chunk_capacity.max(1) as usize,
            buffer: Vec::with_capacity(session.chunk_capacity as usize),
            index: Vec::new(),
            bytes_written: FILE_HEADER_SIZE,
            total_records: 0,
            closed: false,
        })
    }

    pub fn total_records(&self) -> u64 {
        self.total_records
    }

    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    fn flush_chunk(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let mut raw = Vec::with_capacity(self.buffer.len() * DISK_EVENT_RECORD_SIZE);
        for r in &self.buffer {
            raw.extend_from_slice(&r.to_bytes());
        }
        let compressed = lz4_flex::block::compress(&raw);
        let header = ChunkHeader {
            uncompressed_size: raw.len() as u32,
            compressed_size: compressed.len() as u32,
            record_count: self.buffer.len() as u32,
            chunk_flags: 0,
            first_ts_ns: self.buffer.first().unwrap().ts_ns,
            last_ts_ns: self.buffer.last().unwrap().ts_ns,
        };
        let chunk_offset = self.bytes_written;
        self.file.write_all(&header.to_bytes())?;
        self.file.write_all(&compressed)?;
        self.index.push(IndexEntry {
            file_offset: chunk_offset,
            first_ts_ns: header.first_ts_ns,
            last_ts_ns: header.last_ts_ns,
            record_count: header.record_count,
        });
        self.bytes_written += (CHUNK_HEADER_SIZE + compressed.len()) as u64;
        self.buffer.clear();
        Ok(())
    }

    fn write_footer(&mut self) -> Result<()> {
        let index_start = self.bytes_written;
        for entry in &self.index {
            self.file.write_all(&entry.to_bytes())?;
        }
        let mut tail = [0u8; INDEX_TAIL_SIZE];
        tail[0..4].copy_from_slice(&(self.index.len() as u32).to_le_bytes());
        tail[4..8].copy_from_slice(INDEX_MAGIC);
        tail[8..16].copy_from_slice(&index_start.to_le_bytes());
        self.file.write_all(&tail)?;
        self.file.seek(SeekFrom::Start(52))?;
        self.file.write_all(&HAS_INDEX_FLAG.to_le_bytes())?;
        self.file.seek(SeekFrom::End(0))?;
        Ok(())
    }
}

impl EventSink for BinaryFileSink {
    fn append(&mut self, record: &EventRecord) -> Result<()> {
        self.buffer.push(DiskEventRecord::from_event_record(record));
        self.total_records += 1;
        if self.buffer.len() >= self.chunk_capacity {
            self.flush_chunk()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flush_chunk()?;
        self.file.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.flush_chunk()?;
        self.write_footer()?;
        self.file.flush()?;
        self.closed = true;
        Ok(())
    }
}

impl Drop for BinaryFileSink {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}
