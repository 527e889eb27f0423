use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::action::Action;
use crate::config::AgentConfig;
use crate::engine::{Cell, GameBoard};

use super::{Agent, AgentError};

/// Candidate cells for the next tile, indexed by the last slide.
///
/// A slide opens the edge opposite its direction; before the first slide
/// every cell is a candidate.
const SPACES: [&[usize]; 5] = [
    &[12, 13, 14, 15],
    &[0, 4, 8, 12],
    &[0, 1, 2, 3],
    &[3, 7, 11, 15],
    &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
];

/// Environment placing bag tiles at random on the edge the last slide opened.
pub struct RandomPlacer {
    config: AgentConfig,
    engine: StdRng,
}

impl RandomPlacer {
    /// Seeded from `seed=` when given, from entropy otherwise.
    pub fn new(args: &str) -> Result<Self, AgentError> {
        let config = AgentConfig::parse("name=place role=placer", args)?;
        let engine = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(RandomPlacer { config, engine })
    }

    /// Shuffled copy of the bag `after` still holds.
    fn shuffled_bag<B: GameBoard>(&mut self, after: &B) -> Vec<Cell> {
        let mut bag: Vec<Cell> = (1..=3).flat_map(|t| std::iter::repeat(t).take(after.bag(t))).collect();
        bag.shuffle(&mut self.engine);
        bag
    }

    fn draw(&mut self, bag: &mut Vec<Cell>) -> Cell {
        if bag.is_empty() {
            *bag = vec![1, 2, 3];
            bag.shuffle(&mut self.engine);
        }
        bag.pop().unwrap_or(1)
    }
}

impl<B: GameBoard> Agent<B> for RandomPlacer {
    fn take_action(&mut self, after: &B) -> Action {
        tracing::trace!(agent = self.config.name(), "placer");
        let mut space = SPACES.get(after.last()).copied().unwrap_or(SPACES[4]).to_vec();
        space.shuffle(&mut self.engine);
        let Some(pos) = space.into_iter().find(|&p| after.cell(p) == 0) else {
            return Action::None;
        };

        let mut bag = self.shuffled_bag(after);
        let tile = match after.hint() {
            0 => self.draw(&mut bag),
            hint => hint,
        };
        let hint = self.draw(&mut bag);
        Action::Place { pos, tile, hint }
    }

    fn config(&self) -> &AgentConfig { &self.config }

    fn config_mut(&mut self) -> &mut AgentConfig { &mut self.config }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Board, Move};

    fn placer(seed: u64) -> RandomPlacer { RandomPlacer::new(&format!("seed={seed}")).unwrap() }

    fn place(p: &mut RandomPlacer, b: &Board) -> (usize, Cell, Cell) {
        match p.take_action(b) {
            Action::Place { pos, tile, hint } => (pos, tile, hint),
            other => panic!("expected a placement, got {other}"),
        }
    }

    #[test]
    fn test_places_on_empty_cell_from_bag() {
        let mut p = placer(3);
        for bag in [[1, 1, 1], [0, 1, 0], [2, 0, 1], [0, 0, 3]] {
            for _ in 0..50 {
                let b = Board::from_cells([1, 0, 3, 0, 0, 2, 0, 4, 0, 0, 5, 0, 6, 0, 0, 0]).with_bag(bag);
                let (pos, tile, _) = place(&mut p, &b);
                assert_eq!(b.cell(pos), 0);
                assert!(b.bag(tile) > 0, "tile {tile} not in bag {bag:?}");
            }
        }
    }

    #[test]
    fn test_position_follows_last_slide() {
        let mut p = placer(11);
        let mut b = Board::from_cells([0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(b.slide(Move::Left), 0);
        for _ in 0..20 {
            let (pos, _, _) = place(&mut p, &b);
            assert!([3, 7, 11, 15].contains(&pos));
        }
        assert_eq!(b.slide(Move::Up), 0);
        for _ in 0..20 {
            let (pos, _, _) = place(&mut p, &b);
            assert!([12, 13, 14, 15].contains(&pos));
        }
    }

    #[test]
    fn test_hint_becomes_the_tile() {
        let mut p = placer(5);
        let b = Board::EMPTY.with_hint(2).with_bag([1, 0, 0]);
        let (_, tile, hint) = place(&mut p, &b);
        assert_eq!(tile, 2);
        assert_eq!(hint, 1);
    }

    #[test]
    fn test_full_board_gives_up() {
        let mut p = placer(1);
        let b = Board::from_cells([1; 16]);
        assert_eq!(p.take_action(&b), Action::None);
    }

    #[test]
    fn test_same_seed_same_game() {
        let b = Board::EMPTY;
        let first: Vec<Action> = {
            let mut p = placer(42);
            (0..10).map(|_| p.take_action(&b)).collect()
        };
        let mut p = placer(42);
        let again: Vec<Action> = (0..10).map(|_| p.take_action(&b)).collect();
        assert_eq!(first, again);
    }
}
