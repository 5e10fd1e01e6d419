//! Flat weight tables for the n-tuple network, plus their binary format.
//!
//! File layout (little-endian, no padding):
//!
//! ```text
//! u32 table_count
//! f32 * table_len   // table 0
//! f32 * table_len   // table 1
//! ...
//! ```
//!
//! `table_len` is not stored; it comes from the reader's [`Topology`]. A file
//! whose count or payload length disagrees with the topology is rejected.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::engine::{Board, Direction, Rank};
use crate::features::{Topology, GROUPS, TUPLES};

/// Floats converted per I/O chunk.
const IO_CHUNK: usize = 1 << 16;

#[derive(thiserror::Error, Debug)]
pub enum WeightError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("weight file declares {found} tables, topology expects {expected}")]
    TableCount { expected: usize, found: usize },
    #[error("weight file ends inside table {table} (expected {expected} floats per table)")]
    Truncated { table: usize, expected: usize },
    #[error("weight file has trailing bytes after {tables} tables")]
    TrailingBytes { tables: usize },
}

/// One contiguous `f32` table per tuple group.
#[derive(Clone)]
pub struct WeightStore {
    topology: Topology,
    tables: Vec<Box<[f32]>>,
}

impl WeightStore {
    /// Zero-filled tables sized for `topology`.
    pub fn new(topology: Topology) -> Self {
        let len = topology.table_len();
        let tables = (0..GROUPS).map(|_| vec![0.0f32; len].into_boxed_slice()).collect();
        Self { topology, tables }
    }

    #[inline]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    #[inline]
    pub fn tables(&self) -> &[Box<[f32]>] {
        &self.tables
    }

    #[inline]
    pub fn lookup(&self, group: usize, key: usize) -> f32 {
        self.tables[group][key]
    }

    #[inline]
    pub fn accumulate(&mut self, group: usize, key: usize, delta: f32) {
        self.tables[group][key] += delta;
    }

    /// Sum of the 32 weights selected by `board` under (`mv`, `hint`).
    #[inline]
    pub fn value(&self, board: &Board, mv: Direction, hint: Rank) -> f32 {
        let mut sum = 0.0;
        for (group, placements) in TUPLES.iter().enumerate() {
            let table = &self.tables[group];
            for cells in placements {
                sum += table[self.topology.key(board, cells, mv, hint)];
            }
        }
        sum
    }

    /// Add `fix` to each of the 32 weights selected by `board`.
    ///
    /// Placements that collide on one key receive `fix` once per placement.
    pub fn update(&mut self, board: &Board, mv: Direction, hint: Rank, fix: f32) {
        let keys = self.topology.keys(board, mv, hint);
        for (group, group_keys) in keys.iter().enumerate() {
            for &key in group_keys {
                self.accumulate(group, key, fix);
            }
        }
    }

    /// Serialize all tables to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), WeightError> {
        w.write_all(&(self.tables.len() as u32).to_le_bytes())?;
        let mut buf = Vec::with_capacity(IO_CHUNK * 4);
        for table in &self.tables {
            for chunk in table.chunks(IO_CHUNK) {
                buf.clear();
                for &v in chunk {
                    buf.extend_from_slice(&v.to_le_bytes());
                }
                w.write_all(&buf)?;
            }
        }
        Ok(())
    }

    /// Deserialize tables sized by `topology` from `r`. The whole stream must
    /// be consumed exactly.
    pub fn read_from<R: Read>(r: &mut R, topology: Topology) -> Result<Self, WeightError> {
        let mut count = [0u8; 4];
        r.read_exact(&mut count)?;
        let found = u32::from_le_bytes(count) as usize;
        if found != GROUPS {
            return Err(WeightError::TableCount { expected: GROUPS, found });
        }

        let mut store = WeightStore::new(topology);
        let expected = topology.table_len();
        let mut buf = vec![0u8; IO_CHUNK * 4];
        for (idx, table) in store.tables.iter_mut().enumerate() {
            for chunk in table.chunks_mut(IO_CHUNK) {
                let bytes = &mut buf[..chunk.len() * 4];
                r.read_exact(bytes).map_err(|e| match e.kind() {
                    io::ErrorKind::UnexpectedEof => WeightError::Truncated { table: idx, expected },
                    _ => WeightError::Io(e),
                })?;
                for (slot, raw) in chunk.iter_mut().zip(bytes.chunks_exact(4)) {
                    *slot = f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
                }
            }
        }

        let mut extra = [0u8; 1];
        if r.read(&mut extra)? != 0 {
            return Err(WeightError::TrailingBytes { tables: found });
        }
        Ok(store)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.tables.len() * self.topology.table_len() * 4);
        // writing into a Vec cannot fail
        let _ = self.write_to(&mut out);
        out
    }

    pub fn from_bytes(mut bytes: &[u8], topology: Topology) -> Result<Self, WeightError> {
        Self::read_from(&mut bytes, topology)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), WeightError> {
        let path = path.as_ref();
        let mut w = BufWriter::new(File::create(path)?);
        self.write_to(&mut w)?;
        w.flush()?;
        info!(path = %path.display(), topology = %self.topology, "saved weights");
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P, topology: Topology) -> Result<Self, WeightError> {
        let path = path.as_ref();
        debug!(path = %path.display(), %topology, "loading weights");
        let mut r = BufReader::new(File::open(path)?);
        let store = Self::read_from(&mut r, topology)?;
        info!(path = %path.display(), topology = %topology, "loaded weights");
        Ok(store)
    }
}

impl std::fmt::Debug for WeightStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightStore")
            .field("topology", &self.topology)
            .field("tables", &self.tables.len())
            .field("table_len", &self.topology.table_len())
            .finish()
    }
}
