//! n-tuple pattern feature with 8-way board isomorphism.
//!
//! A pattern watches a fixed tuple of cells. The ranks found there are packed
//! 4 bits per cell into an index into one weight table. The tuple is replayed
//! under all 8 board symmetries (4 rotations, each with and without a
//! horizontal reflection), and every view indexes the *same* table, so what is
//! learned for a state is learned for all of its symmetric twins.
//!
//! ```
//! use threes_tdl::engine::Board;
//! use threes_tdl::pattern::Pattern;
//!
//! let mut p = Pattern::new(&[0, 1, 2, 3]).unwrap();
//! let b = Board::from_cells([1, 2, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
//! assert_eq!(p.estimate(&b), 0.0);
//! p.update(&b, 8.0);
//! assert!(p.estimate(&b) > 0.0);
//! ```

use std::io::{self, Read, Write};

use crate::engine::{Board, GameBoard};

/// Number of symmetric views per pattern.
pub const ISO_LEVEL: usize = 8;

/// Longest tuple accepted; a tuple of length `k` owns `2^(4k)` weights.
pub const MAX_TUPLE_LEN: usize = 8;

const IO_CHUNK: usize = 1 << 14;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern tuple is empty")]
    Empty,
    #[error("pattern tuple has {len} cells, at most {max} are supported")]
    TooLong { len: usize, max: usize },
    #[error("pattern position {0} is off the board")]
    Position(usize),
}

/// Errors raised while reading or writing weight tables.
#[derive(thiserror::Error, Debug)]
pub enum WeightError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("weight file ended early")]
    Truncated,
    #[error("pattern name mismatch: expected {expected:?}, found {found:?}")]
    NameMismatch { expected: String, found: String },
    #[error("weight table of {name:?} holds {found} entries, expected {expected}")]
    SizeMismatch { name: String, expected: u64, found: u64 },
    #[error("weight file holds {found} patterns, network has {expected}")]
    CountMismatch { expected: u64, found: u64 },
    #[error("pattern name is not valid UTF-8")]
    BadName,
}

/// One n-tuple feature: its 8 isomorphic position lists and the shared table.
#[derive(Clone, PartialEq)]
pub struct Pattern {
    isomorphism: [Vec<usize>; ISO_LEVEL],
    weight: Vec<f32>,
}

impl Pattern {
    /// Build a pattern over `tuple` with an all-zero table.
    pub fn new(tuple: &[usize]) -> Result<Self, PatternError> { Self::with_value(tuple, 0.0) }

    /// Build a pattern over `tuple` with every weight set to `init`.
    pub fn with_value(tuple: &[usize], init: f32) -> Result<Self, PatternError> {
        if tuple.is_empty() {
            return Err(PatternError::Empty);
        }
        if tuple.len() > MAX_TUPLE_LEN {
            return Err(PatternError::TooLong { len: tuple.len(), max: MAX_TUPLE_LEN });
        }
        if let Some(&pos) = tuple.iter().find(|&&pos| pos >= 16) {
            return Err(PatternError::Position(pos));
        }

        // The reference board holds its own positions, so after a transform the
        // value sitting at `t` names the real cell that view reads for `t`.
        let isomorphism = std::array::from_fn(|i| {
            let mut idx = Board::identity();
            if i >= 4 {
                idx.reflect_horizontal();
            }
            idx.rotate(i as i32);
            tuple.iter().map(|&t| idx.cell(t) as usize).collect()
        });

        Ok(Pattern { isomorphism, weight: vec![init; 1 << (tuple.len() << 2)] })
    }

    /// Sum of the table entries picked by all 8 views of `b`.
    pub fn estimate<B: GameBoard>(&self, b: &B) -> f32 {
        self.isomorphism.iter().map(|iso| self.weight[indexof(iso, b)]).sum()
    }

    /// Add `u / 8` through each view and return the sum of the updated entries.
    ///
    /// Views of the same board may share an index; such a slot receives one
    /// share per view.
    pub fn update<B: GameBoard>(&mut self, b: &B, u: f32) -> f32 {
        let u_split = u / ISO_LEVEL as f32;
        let mut value = 0.0;
        for iso in &self.isomorphism {
            let index = indexof(iso, b);
            self.weight[index] += u_split;
            value += self.weight[index];
        }
        value
    }

    /// Tuple length.
    pub fn tuple_len(&self) -> usize { self.isomorphism[0].len() }

    /// Position list read by view `i` (view 0 is the tuple as given).
    pub fn isomorphism(&self, i: usize) -> &[usize] { &self.isomorphism[i] }

    pub fn weights(&self) -> &[f32] { &self.weight }

    pub fn weights_mut(&mut self) -> &mut [f32] { &mut self.weight }

    /// Identity tag stored with the weights, e.g. `"6-tuple pattern 012345"`.
    pub fn name(&self) -> String {
        let positions: String = self.isomorphism[0].iter().map(|p| format!("{:x}", p)).collect();
        format!("{}-tuple pattern {}", self.tuple_len(), positions)
    }

    /// Write the name, the entry count and every weight, all little-endian.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let name = self.name();
        out.write_all(&(name.len() as u32).to_le_bytes())?;
        out.write_all(name.as_bytes())?;
        out.write_all(&(self.weight.len() as u64).to_le_bytes())?;
        let mut buf = Vec::with_capacity(IO_CHUNK * 4);
        for chunk in self.weight.chunks(IO_CHUNK) {
            buf.clear();
            for w in chunk {
                buf.extend_from_slice(&w.to_le_bytes());
            }
            out.write_all(&buf)?;
        }
        Ok(())
    }

    /// Read a table written by [`Pattern::write_to`] for this same tuple.
    ///
    /// The table is only replaced once the whole record has been read and checked.
    pub fn read_from<R: Read>(&mut self, input: &mut R) -> Result<(), WeightError> {
        self.weight = self.read_table(input)?;
        Ok(())
    }

    /// Read and check one record, leaving this pattern untouched.
    pub(crate) fn read_table<R: Read>(&self, input: &mut R) -> Result<Vec<f32>, WeightError> {
        let expected = self.name();
        let mut len = [0u8; 4];
        read_exact(input, &mut len)?;
        let len = u32::from_le_bytes(len) as usize;
        if len != expected.len() {
            return Err(WeightError::NameMismatch { expected, found: format!("<{len}-byte name>") });
        }
        let mut name = vec![0u8; len];
        read_exact(input, &mut name)?;
        let found = String::from_utf8(name).map_err(|_| WeightError::BadName)?;
        if found != expected {
            return Err(WeightError::NameMismatch { expected, found });
        }

        let mut size = [0u8; 8];
        read_exact(input, &mut size)?;
        let size = u64::from_le_bytes(size);
        if size != self.weight.len() as u64 {
            return Err(WeightError::SizeMismatch { name: expected, expected: self.weight.len() as u64, found: size });
        }

        let mut weight = Vec::with_capacity(self.weight.len());
        let mut buf = vec![0u8; IO_CHUNK * 4];
        while weight.len() < self.weight.len() {
            let n = (self.weight.len() - weight.len()).min(IO_CHUNK);
            read_exact(input, &mut buf[..n * 4])?;
            weight.extend(buf[..n * 4].chunks_exact(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])));
        }
        Ok(weight)
    }

    /// Swap in a table returned by [`Pattern::read_table`].
    pub(crate) fn replace_table(&mut self, weight: Vec<f32>) {
        debug_assert_eq!(weight.len(), self.weight.len());
        self.weight = weight;
    }
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pattern")
            .field("name", &self.name())
            .field("isomorphism", &self.isomorphism)
            .field("entries", &self.weight.len())
            .finish()
    }
}

#[inline]
fn indexof<B: GameBoard>(p: &[usize], b: &B) -> usize {
    p.iter().enumerate().fold(0, |index, (i, &pos)| index | ((b.cell(pos) as usize) << (i << 2)))
}

fn read_exact<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<(), WeightError> {
    input.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => WeightError::Truncated,
        _ => WeightError::Io(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn transformed(b: &Board, i: usize) -> Board {
        let mut t = *b;
        if i >= 4 {
            t.reflect_horizontal();
        }
        t.rotate(i as i32);
        t
    }

    #[test]
    fn test_construction_errors() {
        assert_eq!(Pattern::new(&[]).unwrap_err(), PatternError::Empty);
        assert_eq!(Pattern::new(&[0, 16]).unwrap_err(), PatternError::Position(16));
        assert!(matches!(Pattern::new(&[0; 9]), Err(PatternError::TooLong { len: 9, .. })));
    }

    #[test]
    fn test_table_size() {
        assert_eq!(Pattern::new(&[5]).unwrap().weights().len(), 16);
        assert_eq!(Pattern::new(&[0, 1, 2]).unwrap().weights().len(), 1 << 12);
        assert!(Pattern::with_value(&[3, 7], 0.5).unwrap().weights().iter().all(|&w| w == 0.5));
    }

    #[test]
    fn test_corner_isomorphisms() {
        let p = Pattern::new(&[0]).unwrap();
        let views: Vec<usize> = (0..ISO_LEVEL).map(|i| p.isomorphism(i)[0]).collect();
        assert_eq!(views, vec![0, 12, 15, 3, 3, 15, 12, 0]);
    }

    #[test]
    fn test_isomorphisms_of_a_row() {
        let p = Pattern::new(&[0, 1, 2, 3]).unwrap();
        assert_eq!(p.isomorphism(0), &[0, 1, 2, 3]);
        assert_eq!(p.isomorphism(1), &[12, 8, 4, 0]);
        assert_eq!(p.isomorphism(2), &[15, 14, 13, 12]);
        assert_eq!(p.isomorphism(3), &[3, 7, 11, 15]);
        assert_eq!(p.isomorphism(4), &[3, 2, 1, 0]);
        assert_eq!(p.isomorphism(7), &[0, 4, 8, 12]);
    }

    #[test]
    fn test_single_cell_update_hand_computed() {
        let mut p = Pattern::new(&[0]).unwrap();
        // views 0,7 read cell 0; views 1,6 read cell 12; the rest read empty corners
        let b = Board::from_cells([1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0]);
        // shares land on slots 1,2,0,0,0,0,2,1 in view order
        assert_eq!(p.update(&b, 8.0), 1.0 + 1.0 + 1.0 + 2.0 + 3.0 + 4.0 + 2.0 + 2.0);
        assert_eq!(&p.weights()[..3], &[4.0, 2.0, 2.0]);
        assert_eq!(p.estimate(&b), 2.0 + 2.0 + 4.0 * 4.0 + 2.0 + 2.0);
    }

    #[test]
    fn test_update_on_empty_board_hits_one_slot() {
        let mut p = Pattern::new(&[0]).unwrap();
        assert_eq!(p.update(&Board::EMPTY, 8.0), 36.0);
        assert_eq!(p.weights()[0], 8.0);
        assert_eq!(p.estimate(&Board::EMPTY), 64.0);
    }

    #[test]
    fn test_estimate_is_symmetric() {
        let mut p = Pattern::new(&[0, 1, 2, 5]).unwrap();
        for (i, w) in p.weights_mut().iter_mut().enumerate() {
            *w = (i % 97) as f32;
        }
        let b = Board::from_cells([1, 2, 3, 4, 0, 5, 1, 6, 2, 0, 7, 3, 1, 8, 0, 2]);
        let base = p.estimate(&b);
        assert!(base > 0.0);
        for i in 0..ISO_LEVEL {
            assert_eq!(p.estimate(&transformed(&b, i)), base, "transform {i}");
        }
    }

    #[test]
    fn test_name() {
        assert_eq!(Pattern::new(&[4, 5, 6, 8, 9, 10]).unwrap().name(), "6-tuple pattern 45689a");
        assert_eq!(Pattern::new(&[15, 0]).unwrap().name(), "2-tuple pattern f0");
    }

    #[test]
    fn test_weights_round_trip() {
        let mut p = Pattern::new(&[0, 1]).unwrap();
        for (i, w) in p.weights_mut().iter_mut().enumerate() {
            *w = i as f32 * 0.37 - 5.0;
        }
        let mut bytes = Vec::new();
        p.write_to(&mut bytes).unwrap();
        let name = p.name();
        assert_eq!(bytes.len(), 4 + name.len() + 8 + 256 * 4);
        assert_eq!(&bytes[..4], &(name.len() as u32).to_le_bytes());

        let mut q = Pattern::new(&[0, 1]).unwrap();
        q.read_from(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(q, p);
    }

    #[test]
    fn test_load_into_other_tuple_fails() {
        let p = Pattern::new(&[0, 1]).unwrap();
        let mut bytes = Vec::new();
        p.write_to(&mut bytes).unwrap();

        let mut q = Pattern::new(&[0, 4]).unwrap();
        let err = q.read_from(&mut Cursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, WeightError::NameMismatch { .. }));
        assert!(q.weights().iter().all(|&w| w == 0.0));
    }

    #[test]
    fn test_truncated_table_fails() {
        let mut p = Pattern::new(&[2]).unwrap();
        p.weights_mut()[3] = 1.5;
        let mut bytes = Vec::new();
        p.write_to(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 2);

        let mut q = Pattern::new(&[2]).unwrap();
        assert!(matches!(q.read_from(&mut Cursor::new(&bytes)), Err(WeightError::Truncated)));
        assert_eq!(q.weights()[3], 0.0);
    }

    #[test]
    fn test_name_length_checked_before_reading() {
        let mut bytes = u32::MAX.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"1-tuple pattern 2");
        let mut q = Pattern::new(&[2]).unwrap();
        let err = q.read_from(&mut Cursor::new(&bytes)).unwrap_err();
        assert!(matches!(err, WeightError::NameMismatch { ref expected, .. } if expected == "1-tuple pattern 2"));
    }
}
