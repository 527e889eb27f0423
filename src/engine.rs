use std::fmt;
use std::sync::OnceLock;

/// Tile rank stored in a cell: 0 is empty, 1 and 2 are the basic tiles and
/// rank `k >= 3` is the face value `3 * 2^(k-3)`.
pub type Cell = u8;

/// Immediate reward of an action. [`ILLEGAL`] marks an action the board refused.
pub type Reward = i32;

/// Reward returned for an action that does not apply to the board.
pub const ILLEGAL: Reward = -1;

/// Value of [`GameBoard::last`] before the first slide of a game.
pub const NO_SLIDE: usize = 4;

/// Highest rank a 4-bit cell can hold; tiles of this rank never merge.
pub const MAX_RANK: Cell = 15;

const FULL_BAG: [u8; 3] = [1, 1, 1];
const LINE_TABLE_SIZE: usize = 0x1_0000; // 65,536 possible 16-bit rows

/// A direction to slide tiles. The discriminant is the operator code used in
/// actions and in [`GameBoard::last`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Move {
    /// All four operators in code order.
    pub const ALL: [Move; 4] = [Move::Up, Move::Right, Move::Down, Move::Left];

    #[inline]
    pub fn code(self) -> usize { self as usize }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Move::Up => "U",
            Move::Right => "R",
            Move::Down => "D",
            Move::Left => "L",
        };
        f.write_str(s)
    }
}

/// The board surface the learner and the placer work against.
///
/// Positions are row-major indices `0..16` on a 4x4 grid.
pub trait GameBoard: Clone {
    /// Rank stored at `pos`.
    fn cell(&self, pos: usize) -> Cell;
    /// Slide all tiles toward `op`; returns the reward or [`ILLEGAL`] if nothing moved.
    fn slide(&mut self, op: Move) -> Reward;
    /// Put `tile` at the empty cell `pos` and announce `hint` as the next tile.
    fn place(&mut self, pos: usize, tile: Cell, hint: Cell) -> Reward;
    /// Rotate clockwise by `quarter_turns` (taken mod 4, negative turns go counterclockwise).
    fn rotate(&mut self, quarter_turns: i32);
    /// Mirror every row left to right.
    fn reflect_horizontal(&mut self);
    /// Code of the last slide, or [`NO_SLIDE`].
    fn last(&self) -> usize;
    /// Announced next tile, 0 if none.
    fn hint(&self) -> Cell;
    /// Copies of `tile` (1..=3) left in the bag.
    fn bag(&self, tile: Cell) -> usize;
}

struct Stores {
    slide_left: Box<[u16]>,
    slide_right: Box<[u16]>,
    score: Box<[u32]>,
}

type BoardRaw = u64;
type Line = u16;

/// Threes! board: 16 ranks packed as 4-bit nibbles in a `u64` (cell `p` at
/// bits `4p..4p+4`) plus the hint tile, the last slide and the tile bag.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    tiles: BoardRaw,
    hint: Cell,
    last: u8,
    bag: [u8; 3],
}

impl Default for Board {
    fn default() -> Self { Board::EMPTY }
}

impl Board {
    /// An empty board with a full bag and no hint.
    pub const EMPTY: Board = Board { tiles: 0, hint: 0, last: NO_SLIDE as u8, bag: FULL_BAG };

    /// Board whose cells are the nibbles of `raw`; attributes start fresh.
    #[inline]
    pub fn from_raw(raw: BoardRaw) -> Self { Board { tiles: raw, ..Board::EMPTY } }

    /// Board built from 16 row-major ranks. Ranks above [`MAX_RANK`] are truncated to 4 bits.
    pub fn from_cells(cells: [Cell; 16]) -> Self {
        let raw = cells
            .iter()
            .enumerate()
            .fold(0, |acc, (pos, &c)| acc | ((c as u64 & 0xf) << (4 * pos)));
        Board::from_raw(raw)
    }

    /// Reference board where each cell holds its own position.
    ///
    /// Transforming it shows where every position lands, which is how the
    /// pattern isomorphisms are built.
    pub fn identity() -> Self { Board::from_raw(0xfedc_ba98_7654_3210) }

    /// Same board with a different hint tile.
    pub fn with_hint(mut self, hint: Cell) -> Self {
        self.hint = hint;
        self
    }

    /// Same board with the bag counts for ranks 1, 2 and 3.
    pub fn with_bag(mut self, bag: [u8; 3]) -> Self {
        self.bag = bag;
        self
    }

    #[inline]
    pub fn cell(&self, pos: usize) -> Cell { ((self.tiles >> (4 * pos)) & 0xf) as Cell }

    #[inline]
    pub fn set(&mut self, pos: usize, rank: Cell) {
        let shift = 4 * pos;
        self.tiles = (self.tiles & !(0xf << shift)) | ((rank as u64 & 0xf) << shift);
    }

    /// Slide/merge toward `op`: every tile moves at most one cell.
    ///
    /// ```
    /// use threes_tdl::engine::{Board, Move, ILLEGAL};
    /// let mut b = Board::from_cells([0, 1, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    /// assert_eq!(b.slide(Move::Left), 0);
    /// assert_eq!(b.cell(0), 1);
    /// assert_eq!(b.slide(Move::Left), 3); // 1 + 2 -> 3
    /// assert_eq!(b.slide(Move::Left), ILLEGAL);
    /// ```
    pub fn slide(&mut self, op: Move) -> Reward {
        let moved = match op {
            Move::Left => shift_rows(self.tiles, &stores().slide_left),
            Move::Right => shift_rows(self.tiles, &stores().slide_right),
            Move::Up => transpose(shift_rows(transpose(self.tiles), &stores().slide_left)),
            Move::Down => transpose(shift_rows(transpose(self.tiles), &stores().slide_right)),
        };
        if moved == self.tiles {
            return ILLEGAL;
        }
        let before = get_score(self.tiles);
        self.tiles = moved;
        self.last = op as u8;
        (get_score(moved) - before) as Reward
    }

    /// Place `tile` at `pos` and announce `hint` (0 for none).
    ///
    /// Tiles drawn from the bag are taken out of it; an emptied bag refills.
    pub fn place(&mut self, pos: usize, tile: Cell, hint: Cell) -> Reward {
        if pos >= 16 || !(1..=3).contains(&tile) || hint > 3 || self.cell(pos) != 0 {
            return ILLEGAL;
        }
        if self.hint == 0 {
            self.take_from_bag(tile);
        }
        self.set(pos, tile);
        if hint != 0 {
            self.take_from_bag(hint);
        }
        self.hint = hint;
        0
    }

    fn take_from_bag(&mut self, tile: Cell) {
        let slot = &mut self.bag[tile as usize - 1];
        *slot = slot.saturating_sub(1);
        if self.bag == [0; 3] {
            self.bag = FULL_BAG;
        }
    }

    /// Rotate clockwise by `quarter_turns`.
    pub fn rotate(&mut self, quarter_turns: i32) {
        self.tiles = match quarter_turns.rem_euclid(4) {
            1 => rotate_right(self.tiles),
            2 => reverse(self.tiles),
            3 => rotate_left(self.tiles),
            _ => self.tiles,
        };
    }

    #[inline]
    pub fn reflect_horizontal(&mut self) { self.tiles = reflect_horizontal(self.tiles); }

    #[inline]
    pub fn reflect_vertical(&mut self) { self.tiles = reflect_vertical(self.tiles); }

    #[inline]
    pub fn transpose(&mut self) { self.tiles = transpose(self.tiles); }

    #[inline]
    pub fn last(&self) -> usize { self.last as usize }

    #[inline]
    pub fn hint(&self) -> Cell { self.hint }

    #[inline]
    pub fn bag(&self, tile: Cell) -> usize {
        match tile {
            1..=3 => self.bag[tile as usize - 1] as usize,
            _ => 0,
        }
    }

    /// Sum of `3^(rank-2)` over tiles of rank 3 and above.
    ///
    /// ```
    /// use threes_tdl::engine::Board;
    /// let b = Board::from_cells([3, 4, 1, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    /// assert_eq!(b.score(), 3 + 9);
    /// ```
    #[inline]
    pub fn score(&self) -> u32 { get_score(self.tiles) }

    /// Highest rank on the board.
    pub fn max_tile(&self) -> Cell { (0..16).map(|p| self.cell(p)).max().unwrap_or(0) }

    /// Count the number of empty cells on the board.
    pub fn count_empty(&self) -> usize { (0..16).filter(|&p| self.cell(p) == 0).count() }
}

impl GameBoard for Board {
    #[inline]
    fn cell(&self, pos: usize) -> Cell { Board::cell(self, pos) }
    #[inline]
    fn slide(&mut self, op: Move) -> Reward { Board::slide(self, op) }
    #[inline]
    fn place(&mut self, pos: usize, tile: Cell, hint: Cell) -> Reward { Board::place(self, pos, tile, hint) }
    #[inline]
    fn rotate(&mut self, quarter_turns: i32) { Board::rotate(self, quarter_turns) }
    #[inline]
    fn reflect_horizontal(&mut self) { Board::reflect_horizontal(self) }
    #[inline]
    fn last(&self) -> usize { Board::last(self) }
    #[inline]
    fn hint(&self) -> Cell { Board::hint(self) }
    #[inline]
    fn bag(&self, tile: Cell) -> usize { Board::bag(self, tile) }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({:#018x}, hint={}, last={}, bag={:?})", self.tiles, self.hint, self.last, self.bag)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+------------------------+")?;
        for r in 0..4 {
            write!(f, "|")?;
            for c in 0..4 {
                write!(f, "{:>6}", tile_value(self.cell(r * 4 + c)))?;
            }
            writeln!(f, "|")?;
        }
        writeln!(f, "+------------------------+")?;
        write!(f, "hint: {}", tile_value(self.hint))
    }
}

/// Face value of a rank: 0, 1, 2, 3, 6, 12, ...
#[inline]
pub fn tile_value(rank: Cell) -> u32 {
    match rank {
        0..=2 => rank as u32,
        _ => 3 << (rank - 3),
    }
}

/// Initialize internal tables on first use. Safe to call multiple times.
pub fn new() {
    let _ = stores();
}

static STORES: OnceLock<Stores> = OnceLock::new();

#[inline(always)]
fn stores() -> &'static Stores { STORES.get_or_init(create_stores) }

fn create_stores() -> Stores {
    // Allocate on the heap to avoid large stack frames
    let mut slide_left = vec![0u16; LINE_TABLE_SIZE];
    let mut slide_right = vec![0u16; LINE_TABLE_SIZE];
    let mut score = vec![0u32; LINE_TABLE_SIZE];

    for (val, ((left, right), sc)) in slide_left
        .iter_mut()
        .zip(slide_right.iter_mut())
        .zip(score.iter_mut())
        .enumerate()
    {
        let line = val as Line;
        *left = slide_line_left(line);
        *right = reverse_line(slide_line_left(reverse_line(line)));
        *sc = calc_score(line);
    }

    Stores {
        slide_left: slide_left.into_boxed_slice(),
        slide_right: slide_right.into_boxed_slice(),
        score: score.into_boxed_slice(),
    }
}

#[inline(always)]
fn extract_line(board: BoardRaw, row: usize) -> Line { (board >> (16 * row)) as Line }

fn shift_rows(board: BoardRaw, table: &[u16]) -> BoardRaw {
    (0..4).fold(0, |acc, row| {
        let shifted = table[extract_line(board, row) as usize] as u64;
        acc | (shifted << (16 * row))
    })
}

fn get_score(board: BoardRaw) -> u32 {
    let score = &stores().score;
    (0..4).map(|row| score[extract_line(board, row) as usize]).sum()
}

fn line_to_tiles(line: Line) -> [Cell; 4] {
    [0, 1, 2, 3].map(|c| ((line >> (4 * c)) & 0xf) as Cell)
}

fn tiles_to_line(tiles: [Cell; 4]) -> Line {
    tiles.iter().enumerate().fold(0, |acc, (c, &t)| acc | ((t as Line) << (4 * c)))
}

fn reverse_line(line: Line) -> Line {
    let mut tiles = line_to_tiles(line);
    tiles.reverse();
    tiles_to_line(tiles)
}

fn merge(hold: Cell, tile: Cell) -> Option<Cell> {
    if (hold == 1 && tile == 2) || (hold == 2 && tile == 1) {
        Some(3)
    } else if hold == tile && hold >= 3 && hold < MAX_RANK {
        Some(hold + 1)
    } else {
        None
    }
}

// Column 0 is the leading edge. A gap or a merge lets everything behind it advance one cell.
fn slide_line_left(line: Line) -> Line {
    let mut tiles = line_to_tiles(line);
    for c in 1..4 {
        let (hold, tile) = (tiles[c - 1], tiles[c]);
        if tile == 0 {
            continue;
        }
        if hold == 0 {
            tiles[c - 1] = tile;
            tiles[c] = 0;
        } else if let Some(merged) = merge(hold, tile) {
            tiles[c - 1] = merged;
            tiles[c] = 0;
        }
    }
    tiles_to_line(tiles)
}

fn calc_score(line: Line) -> u32 {
    line_to_tiles(line)
        .iter()
        .filter(|&&t| t >= 3)
        .map(|&t| 3u32.pow(t as u32 - 2))
        .sum()
}

// Credit to Nneonneo
pub(crate) fn transpose(x: BoardRaw) -> BoardRaw {
    let a1 = x & 0xF0F00F0FF0F00F0F;
    let a2 = x & 0x0000F0F00000F0F0;
    let a3 = x & 0x0F0F00000F0F0000;
    let a = a1 | (a2 << 12) | (a3 >> 12);
    let b1 = a & 0xFF00FF0000FF00FF;
    let b2 = a & 0x00FF00FF00000000;
    let b3 = a & 0x00000000FF00FF00;
    b1 | (b2 >> 24) | (b3 << 24)
}

fn reflect_horizontal(x: BoardRaw) -> BoardRaw {
    let x = ((x & 0x0F0F0F0F0F0F0F0F) << 4) | ((x >> 4) & 0x0F0F0F0F0F0F0F0F);
    ((x & 0x00FF00FF00FF00FF) << 8) | ((x >> 8) & 0x00FF00FF00FF00FF)
}

fn reflect_vertical(x: BoardRaw) -> BoardRaw {
    let x = x.rotate_left(32);
    ((x & 0x0000FFFF0000FFFF) << 16) | ((x >> 16) & 0x0000FFFF0000FFFF)
}

fn rotate_right(x: BoardRaw) -> BoardRaw { reflect_horizontal(transpose(x)) }

fn rotate_left(x: BoardRaw) -> BoardRaw { transpose(reflect_horizontal(x)) }

fn reverse(x: BoardRaw) -> BoardRaw { reflect_vertical(reflect_horizontal(x)) }
