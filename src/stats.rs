//! Training statistics, summarized every `block` episodes.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use serde::Serialize;

use crate::engine::{tile_value, Cell};
use crate::episode::Outcome;

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Share of a block's episodes whose largest tile reached `tile`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileShare {
    pub tile: u32,
    /// Fraction of episodes ending with exactly this max tile.
    pub share: f64,
    /// Fraction ending with this tile or better.
    pub reached: f64,
}

/// Summary of the last `block` episodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockSummary {
    /// Episodes finished so far, this block included.
    pub episodes: usize,
    pub block: usize,
    pub avg_score: f64,
    pub max_score: u32,
    pub slides_per_sec: f64,
    /// Largest tile first.
    pub tiles: Vec<TileShare>,
}

impl BlockSummary {
    fn from_block(episodes: usize, block: &[Outcome]) -> Self {
        let n = block.len().max(1) as f64;
        let avg_score = block.iter().map(|o| o.score as f64).sum::<f64>() / n;
        let max_score = block.iter().map(|o| o.score).max().unwrap_or(0);
        let slides: usize = block.iter().map(|o| o.slides).sum();
        let elapsed: Duration = block.iter().map(|o| o.elapsed).sum();
        let slides_per_sec = slides as f64 / elapsed.as_secs_f64().max(1e-6);

        let mut count = [0usize; 16];
        for o in block {
            count[(o.max_tile as usize).min(15)] += 1;
        }
        let mut tiles = Vec::new();
        let mut reached = 0;
        for rank in (1..16).rev() {
            if count[rank] == 0 {
                continue;
            }
            reached += count[rank];
            tiles.push(TileShare {
                tile: tile_value(rank as Cell),
                share: count[rank] as f64 / n,
                reached: reached as f64 / n,
            });
        }
        BlockSummary { episodes, block: block.len(), avg_score, max_score, slides_per_sec, tiles }
    }

    /// Append as one JSON line.
    pub fn write_jsonl<W: Write>(&self, out: &mut W) -> Result<(), StatsError> {
        serde_json::to_writer(&mut *out, self)?;
        out.write_all(b"\n")?;
        Ok(())
    }
}

/// Collects finished episodes and summarizes them in blocks.
pub struct Statistics {
    total: usize,
    block: usize,
    finished: usize,
    current: Vec<Outcome>,
    out: Option<BufWriter<File>>,
}

impl Statistics {
    /// Expect `total` episodes, summarizing every `block` (0 means one block).
    pub fn new(total: usize, block: usize) -> Self {
        let block = if block == 0 { total.max(1) } else { block };
        Statistics { total, block, finished: 0, current: Vec::with_capacity(block), out: None }
    }

    /// Also append every summary to `path` as JSON lines.
    pub fn with_output<P: AsRef<Path>>(mut self, path: P) -> Result<Self, StatsError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        self.out = Some(BufWriter::new(file));
        Ok(self)
    }

    pub fn is_finished(&self) -> bool { self.finished >= self.total }

    /// Record one episode. Returns the block summary when this episode closes a block.
    pub fn push(&mut self, outcome: Outcome) -> Result<Option<BlockSummary>, StatsError> {
        self.finished += 1;
        self.current.push(outcome);
        if self.current.len() < self.block && !self.is_finished() {
            return Ok(None);
        }
        let summary = BlockSummary::from_block(self.finished, &self.current);
        self.current.clear();
        tracing::info!(
            episodes = summary.episodes,
            avg = summary.avg_score,
            max = summary.max_score,
            ops_per_sec = summary.slides_per_sec,
            "block finished"
        );
        if let Some(out) = &mut self.out {
            summary.write_jsonl(out)?;
            out.flush()?;
        }
        Ok(Some(summary))
    }
}
