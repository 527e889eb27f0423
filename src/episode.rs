//! One game between a slider and a placer.
//!
//! The placer opens with [`INITIAL_PLACEMENTS`] tiles; afterwards the two
//! alternate, slider first, until an action returns [`ILLEGAL`].

use std::time::{Duration, Instant};

use crate::action::Action;
use crate::agent::Agent;
use crate::engine::{Board, Cell, Reward, ILLEGAL};

/// Tiles placed before the first slide.
pub const INITIAL_PLACEMENTS: usize = 9;

/// A finished (or in-progress) game and its move list.
#[derive(Debug, Clone)]
pub struct Episode {
    state: Board,
    actions: Vec<(Action, Reward)>,
    slides: usize,
    elapsed: Duration,
}

/// Compact result of an episode, kept by [`crate::stats::Statistics`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Outcome {
    pub score: u32,
    pub max_tile: Cell,
    pub slides: usize,
    pub elapsed: Duration,
}

impl Default for Episode {
    fn default() -> Self { Episode::new() }
}

impl Episode {
    pub fn new() -> Self { Episode { state: Board::EMPTY, actions: Vec::new(), slides: 0, elapsed: Duration::ZERO } }

    /// Play a full game from an empty board.
    pub fn play<P, E>(player: &mut P, env: &mut E) -> Episode
    where
        P: Agent<Board> + ?Sized,
        E: Agent<Board> + ?Sized,
    {
        let mut ep = Episode::new();
        player.open_episode(&format!("~:{}", env.name()));
        env.open_episode(&format!("{}:~", player.name()));
        let start = Instant::now();
        loop {
            let sliding = ep.slider_to_move();
            let action = if sliding { player.take_action(&ep.state) } else { env.take_action(&ep.state) };
            if !ep.apply(action) {
                tracing::trace!(action = %action, slides = ep.slides, "episode over");
                break;
            }
        }
        ep.elapsed = start.elapsed();
        player.close_episode("");
        env.close_episode("");
        ep
    }

    /// Whether the next action belongs to the slider.
    pub fn slider_to_move(&self) -> bool { self.actions.len() >= INITIAL_PLACEMENTS && self.actions.len() % 2 == 1 }

    /// Apply `action` to the board. Returns `false`, leaving the episode
    /// unchanged, when it is illegal.
    pub fn apply(&mut self, action: Action) -> bool {
        let reward = action.apply(&mut self.state);
        if reward == ILLEGAL {
            return false;
        }
        if matches!(action, Action::Slide(_)) {
            self.slides += 1;
        }
        self.actions.push((action, reward));
        true
    }

    pub fn state(&self) -> &Board { &self.state }

    /// Every applied action with its reward, in order.
    pub fn actions(&self) -> &[(Action, Reward)] { &self.actions }

    pub fn slides(&self) -> usize { self.slides }

    pub fn score(&self) -> u32 { self.state.score() }

    pub fn max_tile(&self) -> Cell { self.state.max_tile() }

    pub fn elapsed(&self) -> Duration { self.elapsed }

    pub fn outcome(&self) -> Outcome {
        Outcome { score: self.score(), max_tile: self.max_tile(), slides: self.slides, elapsed: self.elapsed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Greedy, RandomPlacer};
    use crate::config::AgentConfig;
    use crate::engine::Move;
    use crate::network::Network;

    /// Replays a fixed list of actions, then gives up.
    struct Scripted {
        config: AgentConfig,
        script: Vec<Action>,
        opened: Vec<String>,
        closed: usize,
    }

    impl Scripted {
        fn new(script: Vec<Action>) -> Self {
            Scripted { config: AgentConfig::default(), script: script.into_iter().rev().collect(), opened: vec![], closed: 0 }
        }
    }

    impl Agent<Board> for Scripted {
        fn open_episode(&mut self, flag: &str) { self.opened.push(flag.to_string()) }

        fn close_episode(&mut self, _flag: &str) { self.closed += 1 }

        fn take_action(&mut self, _board: &Board) -> Action { self.script.pop().unwrap_or_default() }

        fn config(&self) -> &AgentConfig { &self.config }

        fn config_mut(&mut self) -> &mut AgentConfig { &mut self.config }
    }

    #[test]
    fn test_turn_order() {
        let mut ep = Episode::new();
        for pos in 0..INITIAL_PLACEMENTS {
            assert!(!ep.slider_to_move());
            assert!(ep.apply(Action::Place { pos, tile: 3, hint: 0 }));
        }
        assert!(ep.slider_to_move());
        assert!(ep.apply(Action::Slide(Move::Down)));
        assert!(!ep.slider_to_move());
        assert_eq!(ep.slides(), 1);
    }

    #[test]
    fn test_illegal_action_is_not_recorded() {
        let mut ep = Episode::new();
        assert!(!ep.apply(Action::Slide(Move::Left)));
        assert!(!ep.apply(Action::None));
        assert!(ep.actions().is_empty());
    }

    #[test]
    fn test_scripted_game() {
        let mut placements: Vec<Action> = (0..INITIAL_PLACEMENTS).map(|pos| Action::Place { pos, tile: 3, hint: 0 }).collect();
        placements.push(Action::Place { pos: 15, tile: 3, hint: 0 });
        let mut env = Scripted::new(placements);
        let mut player = Scripted::new(vec![Action::Slide(Move::Up)]);

        let ep = Episode::play(&mut player, &mut env);
        // rows 0-1 hold 3s plus cell 8: Up merges all four columns, score 27 -> 39
        assert_eq!(ep.slides(), 1);
        assert_eq!(ep.actions().len(), INITIAL_PLACEMENTS + 2);
        assert_eq!(ep.actions()[INITIAL_PLACEMENTS], (Action::Slide(Move::Up), 12));
        assert_eq!(player.opened, vec!["~:unknown"]);
        assert_eq!(env.opened, vec!["unknown:~"]);
        assert_eq!((player.closed, env.closed), (1, 1));
    }

    #[test]
    fn test_greedy_game_ends() {
        let net = Network::from_tuples(&[[0usize, 1, 2, 3]]).unwrap();
        let mut player = Greedy::new(&net);
        let mut env = RandomPlacer::new("seed=1").unwrap();
        let ep = Episode::play(&mut player, &mut env);
        assert!(ep.slides() > 0);
        assert!(ep.actions().len() > INITIAL_PLACEMENTS);
        assert!(ep.score() > 0);
        let outcome = ep.outcome();
        assert_eq!(outcome.slides, ep.slides());
        assert_eq!(outcome.max_tile, ep.state().max_tile());
    }
}
