//! Exact L2 vector index.
//!
//! Vectors live in one flat buffer; position `i` is handle `i`. Search is an
//! exhaustive scan with a bounded max-heap, which is fine for tens of
//! thousands of chunks. An approximate structure can replace it behind the
//! same `build`/`search` surface.
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use medcopilot_core::error::{Error, Result};
use medcopilot_core::types::{Handle, SearchHit};

const BLOB_MAGIC: u32 = 0x4D43_5658; // "MCVX"
const BLOB_VERSION: u32 = 1;
const HEADER_LEN: usize = 16;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatL2Index {
    dim: usize,
    data: Vec<f32>,
}

/// Max-heap entry: the top is the worst of the current best `k`.
struct HeapEntry {
    distance: f32,
    handle: Handle,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool { self.cmp(other) == Ordering::Equal }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.handle.cmp(&other.handle))
    }
}

pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl FlatL2Index {
    /// An empty index; its dimension is fixed by the first vector added.
    pub fn new() -> Self { Self::default() }

    pub fn build(vectors: &[Vec<f32>]) -> Result<Self> {
        let mut index = Self::new();
        for v in vectors { index.add(v)?; }
        Ok(index)
    }

    /// Append a vector and return its handle.
    pub fn add(&mut self, vector: &[f32]) -> Result<Handle> {
        if vector.is_empty() {
            return Err(Error::DimensionMismatch { expected: self.dim.max(1), actual: 0 });
        }
        if self.dim == 0 {
            self.dim = vector.len();
        } else if vector.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: vector.len() });
        }
        let handle = self.len();
        self.data.extend_from_slice(vector);
        Ok(handle)
    }

    pub fn dim(&self) -> usize { self.dim }

    pub fn len(&self) -> usize {
        if self.dim == 0 { 0 } else { self.data.len() / self.dim }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn vector(&self, handle: Handle) -> Option<&[f32]> {
        if handle >= self.len() { return None; }
        Some(&self.data[handle * self.dim..(handle + 1) * self.dim])
    }

    /// The `min(k, len)` nearest handles by squared L2, closest first.
    /// Equal distances are ordered by handle.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Err(Error::InvalidConfig("search k must be > 0".into()));
        }
        if self.is_empty() { return Ok(Vec::new()); }
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(k + 1);
        for (handle, v) in self.data.chunks_exact(self.dim).enumerate() {
            let entry = HeapEntry { distance: squared_l2(query, v), handle };
            if heap.len() < k {
                heap.push(entry);
            } else if heap.peek().is_some_and(|worst| entry < *worst) {
                heap.pop();
                heap.push(entry);
            }
        }
        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|e| SearchHit { handle: e.handle, distance: e.distance })
            .collect())
    }

    /// `magic | version | dim | count` (u32 LE each) followed by `count * dim` f32 LE.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        for word in [BLOB_MAGIC, BLOB_VERSION, self.dim as u32, self.len() as u32] {
            out.extend_from_slice(&word.to_le_bytes());
        }
        for x in &self.data {
            out.extend_from_slice(&x.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Persist("index blob too small (no header)".into()));
        }
        let word = |i: usize| {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(&bytes[i * 4..i * 4 + 4]);
            u32::from_le_bytes(buf)
        };
        let (magic, version, dim, count) = (word(0), word(1), word(2) as usize, word(3) as usize);
        if magic != BLOB_MAGIC {
            return Err(Error::Persist(format!("invalid index magic {magic:#X} (expected {BLOB_MAGIC:#X})")));
        }
        if version != BLOB_VERSION {
            return Err(Error::Persist(format!("unsupported index version {version}")));
        }
        let expected = dim
            .checked_mul(count)
            .and_then(|n| n.checked_mul(4))
            .and_then(|n| n.checked_add(HEADER_LEN))
            .ok_or_else(|| Error::Persist(format!("index header is not plausible (dim={dim}, count={count})")))?;
        if bytes.len() != expected {
            return Err(Error::Persist(format!(
                "index blob size mismatch: got {}, expected {expected} (dim={dim}, count={count})",
                bytes.len()
            )));
        }
        if dim == 0 && count > 0 {
            return Err(Error::Persist("index blob declares vectors of dimension 0".into()));
        }
        let data = bytes[HEADER_LEN..]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { dim: if count == 0 { 0 } else { dim }, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five() -> Vec<Vec<f32>> {
        vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 2.0],
            vec![3.0, 3.0],
            vec![-1.0, -1.0],
        ]
    }

    #[test]
    fn search_returns_three_nearest_ascending() {
        let index = FlatL2Index::build(&five()).expect("build");
        let hits = index.search(&[0.9, 0.1], 3).expect("search");
        let handles: Vec<Handle> = hits.iter().map(|h| h.handle).collect();
        // distances: h0=0.82, h1=0.02, h2=4.42, h3=12.82, h4=4.82
        assert_eq!(handles, vec![1, 0, 2]);
        assert!((hits[0].distance - 0.02).abs() < 1e-5);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn k_larger_than_index_returns_everything() {
        let index = FlatL2Index::build(&five()).expect("build");
        assert_eq!(index.search(&[0.0, 0.0], 50).expect("search").len(), 5);
    }

    #[test]
    fn ties_prefer_lower_handle() {
        let index = FlatL2Index::build(&[vec![1.0], vec![-1.0], vec![1.0]]).expect("build");
        let hits = index.search(&[0.0], 2).expect("search");
        assert_eq!(hits.iter().map(|h| h.handle).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn mixed_dimensions_are_rejected() {
        let err = FlatL2Index::build(&[vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 1 }));
        let index = FlatL2Index::build(&five()).expect("build");
        assert!(index.search(&[1.0, 2.0, 3.0], 1).is_err());
        assert!(index.search(&[1.0, 2.0], 0).is_err());
    }

    #[test]
    fn empty_index_search_is_empty() {
        let index = FlatL2Index::build(&[]).expect("build");
        assert!(index.search(&[1.0, 2.0], 3).expect("search").is_empty());
    }

    #[test]
    fn blob_reload_gives_same_results() {
        let index = FlatL2Index::build(&five()).expect("build");
        let reloaded = FlatL2Index::from_bytes(&index.to_bytes()).expect("reload");
        assert_eq!(reloaded, index);
        assert_eq!(reloaded.search(&[2.0, 2.0], 2).expect("a"), index.search(&[2.0, 2.0], 2).expect("b"));
    }

    #[test]
    fn corrupt_blobs_are_rejected() {
        let mut bytes = FlatL2Index::build(&five()).expect("build").to_bytes();
        assert!(FlatL2Index::from_bytes(&bytes[..10]).is_err());
        assert!(FlatL2Index::from_bytes(&bytes[..bytes.len() - 4]).is_err());
        bytes[0] ^= 0xFF;
        assert!(FlatL2Index::from_bytes(&bytes).is_err());
    }

    #[test]
    fn oversized_header_is_rejected_without_overflow() {
        let mut bytes = Vec::new();
        for word in [BLOB_MAGIC, BLOB_VERSION, u32::MAX, u32::MAX] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes.extend_from_slice(&[0u8; 64]);
        assert!(matches!(FlatL2Index::from_bytes(&bytes), Err(Error::Persist(_))));
    }
}
