//! C8 (reader half): seekable `.qrsdp` reader with index-driven range
//! queries and a sequential-scan fallback when the footer is missing.

use super::file::{
    ChunkHeader, IndexEntry, CHUNK_HEADER_SIZE, FILE_HEADER_SIZE, HAS_INDEX_FLAG, INDEX_MAGIC, INDEX_TAIL_SIZE, MAGIC,
    VERSION_MAJOR,
};
use crate::error::{QrsdpError, Result};
use crate::types::{DiskEventRecord, DISK_EVENT_RECORD_SIZE};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct FileHeaderInfo {
    pub version_major: u16,
    pub version_minor: u16,
    pub record_size: u32,
    pub seed: u64,
    pub p0_ticks: i32,
    pub tick_size: u32,
    pub session_seconds: u32,
    pub levels_per_side: u32,
    pub initial_spread_ticks: u32,
    pub initial_depth: u32,
    pub chunk_capacity: u32,
    pub header_flags: u32,
    pub market_open_ns: u64,
}

impl FileHeaderInfo {
    pub fn has_index(&self) -> bool {
        self.header_flags & HAS_INDEX_FLAG != 0
    }
}

pub struct EventLogReader {
    file: File,
    pub header: FileHeaderInfo,
    index: Option<Vec<IndexEntry>>,
}

impl EventLogReader {
    /// Validates magic, major version match, and `record_size ==
    /// sizeof(DiskEventRecord)`; fails on mismatch.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut buf = [0u8; FILE_HEADER_SIZE as usize];
        file.read_exact(&mut buf)?;
        if &buf[0..8] != MAGIC {
            return Err(QrsdpError::CorruptLog("bad magic".into()));
        }
        let header = FileHeaderInfo {
            version_major: u16::from_le_bytes(buf[8..10].try_into().unwrap()),
            version_minor: u16::from_le_bytes(buf[10..12].try_into().unwrap()),
            record_size: u32::from_le_bytes(buf[12..16].try_into().unwrap()),
            seed: u64::from_le_bytes(buf[16..24].try_into().unwrap()),
            p0_ticks: i32::from_le_bytes(buf[24..28].try_into().unwrap()),
            tick_size: u32::from_le_bytes(buf[28..32].try_into().unwrap()),
            session_seconds: u32::from_le_bytes(buf[32..36].try_into().unwrap()),
            levels_per_side: u32::from_le_bytes(buf[36..40].try_into().unwrap()),
            initial_spread_ticks: u32::from_le_bytes(buf[40..44].try_into().unwrap()),
            initial_depth: u32::from_le_bytes(buf[44..48].try_into().unwrap()),
            chunk_capacity: u32::from_le_bytes(buf[48..52].try_into().unwrap()),
            header_flags: u32::from_le_bytes(buf[52..56].try_into().unwrap()),
            market_open_ns: u64::from_le_bytes(buf[56..64].try_into().unwrap()),
        };
        if header.version_major != VERSION_MAJOR {
            return Err(QrsdpError::CorruptLog(format!(
                "version mismatch: file is v{}, reader supports v{}",
                header.version_major, VERSION_MAJOR
            )));
        }
        if header.record_size as usize != DISK_EVENT_RECORD_SIZE {
            return Err(QrsdpError::CorruptLog(format!(
                "record_size mismatch: file says {}, expected {}",
                header.record_size, DISK_EVENT_RECORD_SIZE
            )));
        }
        let mut reader = EventLogReader { file, header, index: None };
        if reader.header.has_index() {
            reader.index = reader.load_index().ok();
        }
        Ok(reader)
    }

    fn load_index(&mut self) -> Result<Vec<IndexEntry>> {
        let file_len = self.file.metadata()?.len();
        if file_len < INDEX_TAIL_SIZE as u64 {
            return Err(QrsdpError::CorruptLog("truncated footer".into()));
        }
        self.file.seek(SeekFrom::End(-(INDEX_TAIL_SIZE as i64)))?;
        let mut tail = [0u8; INDEX_TAIL_SIZE];
        self.file.read_exact(&mut tail)?;
        if &tail[4..8] != INDEX_MAGIC {
            return Err(QrsdpError::CorruptLog("bad index tail magic".into()));
        }
        let chunk_count = u32::from_le_bytes(tail[0..4].try_into().unwrap()) as usize;
        let index_start = u64::from_le_bytes(tail[8..16].try_into().unwrap());
        self.file.seek(SeekFrom::Start(index_start))?;
        let mut entries = Vec::with_capacity(chunk_count);
        for _ in 0..chunk_count {
            let mut buf = [0u8; 32];
            self.file.read_exact(&mut buf)?;
            entries.push(IndexEntry::from_bytes(&buf));
        }
        Ok(entries)
    }

    /// Decompresses a single chunk by its 0-based index; O(chunk size).
    pub fn read_chunk(&mut self, idx: usize) -> Result<Vec<DiskEventRecord>> {
        let offset = match &self.index {
            Some(entries) => entries
                .get(idx)
                .ok_or_else(|| QrsdpError::CorruptLog(format!("chunk {idx} out of range")))?
                .file_offset,
            None => return Err(QrsdpError::CorruptLog("no index available; use read_all".into())),
        };
        self.file.seek(SeekFrom::Start(offset))?;
        self.read_chunk_at_current_position()
    }

    fn read_chunk_at_current_position(&mut self) -> Result<Vec<DiskEventRecord>> {
        let mut header_buf = [0u8; CHUNK_HEADER_SIZE];
        self.file.read_exact(&mut header_buf)?;
        let header = ChunkHeader::from_bytes(&header_buf);
        let mut compressed = vec![0u8; header.compressed_size as usize];
        self.file.read_exact(&mut compressed)?;
        let raw = lz4_flex::block::decompress(&compressed, header.uncompressed_size as usize)
            .map_err(|e| QrsdpError::CorruptLog(format!("lz4 decompress failed: {e}")))?;
        if raw.len() != header.record_count as usize * DISK_EVENT_RECORD_SIZE {
            return Err(QrsdpError::CorruptLog("decompressed size does not match record count".into()));
        }
        let mut records = Vec::with_capacity(header.record_count as usize);
        for chunk in raw.chunks_exact(DISK_EVENT_RECORD_SIZE) {
            let arr: [u8; DISK_EVENT_RECORD_SIZE] = chunk.try_into().unwrap();
            records.push(DiskEventRecord::from_bytes(&arr));
        }
        Ok(records)
    }

    /// Scans the index for chunks whose `[first_ts_ns, last_ts_ns]`
    /// overlaps `[ts_start, ts_end]` and decompresses only those.
    /// Per-record filtering within a chunk is the caller's responsibility.
    pub fn read_range(&mut self, ts_start: u64, ts_end: u64) -> Result<Vec<DiskEventRecord>> {
        let entries = match &self.index {
            Some(e) => e.clone(),
            None => return self.scan_fallback_range(ts_start, ts_end),
        };
        let mut out = Vec::new();
        for (idx, entry) in entries.iter().enumerate() {
            if entry.last_ts_ns >= ts_start && entry.first_ts_ns <= ts_end {
                out.extend(self.read_chunk(idx)?);
            }
        }
        Ok(out)
    }

    fn scan_fallback_range(&mut self, ts_start: u64, ts_end: u64) -> Result<Vec<DiskEventRecord>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| r.ts_ns >= ts_start && r.ts_ns <= ts_end)
            .collect())
    }

    /// Sequential scan convenience. Falls back to reading ChunkHeaders one
    /// at a time from offset 64 when the footer is absent (HAS_INDEX
    /// unset); truncated data past the last complete chunk is discarded.
    pub fn read_all(&mut self) -> Result<Vec<DiskEventRecord>> {
        if let Some(entries) = self.index.clone() {
            let mut out = Vec::new();
            for idx in 0..entries.len() {
                out.extend(self.read_chunk(idx)?);
            }
            return Ok(out);
        }
        self.sequential_scan()
    }

    fn sequential_scan(&mut self) -> Result<Vec<DiskEventRecord>> {
        let file_len = self.file.metadata()?.len();
        self.file.seek(SeekFrom::Start(FILE_HEADER_SIZE))?;
        let mut out = Vec::new();
        loop {
            let pos = self.file.stream_position()?;
            if pos + CHUNK_HEADER_SIZE as u64 > file_len {
                break;
            }
            let mut header_buf = [0u8; CHUNK_HEADER_SIZE];
            if self.file.read_exact(&mut header_buf).is_err() {
                break;
            }
            let header = ChunkHeader::from_bytes(&header_buf);
            let chunk_end = pos + CHUNK_HEADER_SIZE as u64 + header.compressed_size as u64;
            if chunk_end > file_len {
                break;
            }
            self.file.seek(SeekFrom::Start(pos))?;
            match self.read_chunk_at_current_position() {
                Ok(records) => out.extend(records),
                Err(_) => break,
            }
        }
        Ok(out)
    }

    pub fn total_records(&mut self) -> Result<u64> {
        Ok(self.read_all()?.len() as u64)
    }

    pub fn chunk_count(&self) -> Option<usize> {
        self.index.as_ref().map(|e| e.len())
    }
}
