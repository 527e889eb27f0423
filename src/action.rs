use std::fmt;

use crate::engine::{tile_value, Cell, GameBoard, Move, Reward, ILLEGAL};

/// What an agent does on its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Slide the board in a direction (player).
    Slide(Move),
    /// Put `tile` at `pos` and announce `hint` (environment).
    Place { pos: usize, tile: Cell, hint: Cell },
    /// No action: the agent has nothing to do and the episode ends.
    #[default]
    None,
}

impl Action {
    /// Apply to `board`, returning the reward or [`ILLEGAL`].
    pub fn apply<B: GameBoard>(&self, board: &mut B) -> Reward {
        match *self {
            Action::Slide(op) => board.slide(op),
            Action::Place { pos, tile, hint } => board.place(pos, tile, hint),
            Action::None => ILLEGAL,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Slide(op) => write!(f, "#{}", op),
            Action::Place { pos, tile, hint } => write!(f, "{}@{}+{}", tile_value(*tile), pos, tile_value(*hint)),
            Action::None => f.write_str("??"),
        }
    }
}
