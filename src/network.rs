//! n-tuple network: the value function as a sum over patterns.
//!
//! Weight files hold a little-endian `u64` pattern count followed by each
//! pattern's record (see [`Pattern::write_to`]), in network order.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::engine::GameBoard;
use crate::pattern::{Pattern, PatternError, WeightError};

/// The four 6-tuples the learning agent trains.
pub const TDL_TUPLES: [[usize; 6]; 4] = [
    [0, 1, 2, 3, 4, 5],
    [4, 5, 6, 7, 8, 9],
    [0, 1, 2, 4, 5, 6],
    [4, 5, 6, 8, 9, 10],
];

/// An ordered ensemble of patterns acting as one value function.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Network {
    patterns: Vec<Pattern>,
}

impl Network {
    /// Network over the given tuples, all weights zero.
    pub fn from_tuples<T: AsRef<[usize]>>(tuples: &[T]) -> Result<Self, PatternError> {
        let patterns = tuples.iter().map(|t| Pattern::new(t.as_ref())).collect::<Result<_, _>>()?;
        Ok(Network { patterns })
    }

    /// The network used by the TD learner (4 x 6-tuples, 2^24 weights each).
    pub fn tdl() -> Self {
        Network::from_tuples(&TDL_TUPLES).expect("built-in tuples are valid")
    }

    pub fn patterns(&self) -> &[Pattern] { &self.patterns }

    pub fn patterns_mut(&mut self) -> &mut [Pattern] { &mut self.patterns }

    /// Accumulate the total value of `b`.
    pub fn estimate<B: GameBoard>(&self, b: &B) -> f32 {
        self.patterns.iter().map(|p| p.estimate(b)).sum()
    }

    /// Split `u` evenly over the patterns and return the sum of their updated values.
    pub fn update<B: GameBoard>(&mut self, b: &B, u: f32) -> f32 {
        let u_split = u / self.patterns.len() as f32;
        self.patterns.iter_mut().map(|p| p.update(b, u_split)).sum()
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&(self.patterns.len() as u64).to_le_bytes())?;
        for p in &self.patterns {
            p.write_to(out)?;
        }
        Ok(())
    }

    /// Read weights for every pattern, in order.
    ///
    /// The stored count must match this network and every record must carry the
    /// name of the pattern in its slot; anything else is an integrity error.
    /// The weights are replaced only after every record has been read.
    pub fn read_from<R: Read>(&mut self, input: &mut R) -> Result<(), WeightError> {
        let mut count = [0u8; 8];
        input.read_exact(&mut count).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => WeightError::Truncated,
            _ => WeightError::Io(e),
        })?;
        let count = u64::from_le_bytes(count);
        if count != self.patterns.len() as u64 {
            return Err(WeightError::CountMismatch { expected: self.patterns.len() as u64, found: count });
        }
        let tables = self.patterns.iter().map(|p| p.read_table(&mut *input)).collect::<Result<Vec<_>, _>>()?;
        for (p, table) in self.patterns.iter_mut().zip(tables) {
            p.replace_table(table);
        }
        Ok(())
    }

    /// Load weights from `path`.
    ///
    /// Returns `Ok(false)` and leaves the weights untouched when the file cannot
    /// be opened; a file that opens but does not match is an error.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<bool, WeightError> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "weights not loaded");
                return Ok(false);
            }
        };
        self.read_from(&mut BufReader::new(file))?;
        tracing::info!(path = %path.display(), patterns = self.patterns.len(), "weights loaded");
        Ok(true)
    }

    /// Save weights to `path`, truncating it.
    ///
    /// Returns `Ok(false)` when the file cannot be created.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<bool, WeightError> {
        let path = path.as_ref();
        let file = match File::create(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "weights not saved");
                return Ok(false);
            }
        };
        let mut out = BufWriter::new(file);
        self.write_to(&mut out)?;
        out.flush()?;
        tracing::info!(path = %path.display(), patterns = self.patterns.len(), "weights saved");
        Ok(true)
    }
}
