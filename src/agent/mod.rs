//! Players and environments.
//!
//! Every agent owns an [`AgentConfig`] and answers [`Agent::take_action`] for
//! the boards it is shown:
//! - [`TdlAgent`]: the learning slider (n-tuple network + TD(0) backward pass).
//! - [`Greedy`]: a read-only slider over a borrowed network, for evaluation.
//! - [`RandomPlacer`]: the environment placing tiles next to the last slide.
//!
//! Both sliders pick moves with [`select_afterstate`]: a one-ply search over
//! the four slides scoring each afterstate as `reward + V(afterstate)`.

use crate::action::Action;
use crate::config::{AgentConfig, ConfigError};
use crate::engine::{GameBoard, Move, Reward, ILLEGAL};
use crate::network::Network;
use crate::pattern::WeightError;

mod placer;
mod tdl;

pub use placer::RandomPlacer;
pub use tdl::{EpisodeUpdate, Step, TdlAgent};

#[derive(thiserror::Error, Debug)]
pub enum AgentError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("weight error: {0}")]
    Weights(#[from] WeightError),
}

/// A participant in an episode, acting on boards of type `B`.
pub trait Agent<B: GameBoard> {
    fn open_episode(&mut self, _flag: &str) {}

    fn close_episode(&mut self, _flag: &str) {}

    /// Choose the next action for `board`. [`Action::None`] ends the episode.
    fn take_action(&mut self, board: &B) -> Action;

    fn config(&self) -> &AgentConfig;

    fn config_mut(&mut self) -> &mut AgentConfig;

    fn name(&self) -> &str { self.config().name() }

    fn role(&self) -> &str { self.config().role() }

    /// Update one `key=value` setting at runtime.
    fn notify(&mut self, msg: &str) -> Result<(), ConfigError> { self.config_mut().notify(msg) }
}

/// Best slide found by [`select_afterstate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Afterstate<B> {
    pub op: Move,
    pub after: B,
    pub reward: Reward,
    /// `reward + V(after)`.
    pub value: f32,
}

/// One-ply afterstate search: the slide maximizing `reward + V(after)`.
///
/// Illegal slides score negative infinity; ties go to the lowest operator
/// code. Returns `None` when no slide beats negative infinity.
pub fn select_afterstate<B: GameBoard>(network: &Network, before: &B) -> Option<Afterstate<B>> {
    let mut after: [B; 4] = std::array::from_fn(|_| before.clone());
    let mut reward = [ILLEGAL; 4];
    let mut value = [f32::NEG_INFINITY; 4];
    for op in Move::ALL {
        let i = op.code();
        reward[i] = after[i].slide(op);
        if reward[i] != ILLEGAL {
            value[i] = reward[i] as f32 + network.estimate(&after[i]);
        }
    }

    let mut best = 0;
    for i in 1..4 {
        if value[i] > value[best] {
            best = i;
        }
    }
    if !(value[best] > f32::NEG_INFINITY) {
        return None;
    }
    let after = after.into_iter().nth(best)?;
    Some(Afterstate { op: Move::ALL[best], after, reward: reward[best], value: value[best] })
}

/// Slider that follows a network without learning.
pub struct Greedy<'a> {
    config: AgentConfig,
    network: &'a Network,
}

impl<'a> Greedy<'a> {
    pub fn new(network: &'a Network) -> Self {
        let config = AgentConfig::parse("name=greedy role=player", "").unwrap_or_default();
        Greedy { config, network }
    }
}

impl<B: GameBoard> Agent<B> for Greedy<'_> {
    fn take_action(&mut self, board: &B) -> Action {
        tracing::trace!(agent = self.config.name(), "slider");
        select_afterstate(self.network, board).map(|a| Action::Slide(a.op)).unwrap_or_default()
    }

    fn config(&self) -> &AgentConfig { &self.config }

    fn config_mut(&mut self) -> &mut AgentConfig { &mut self.config }
}
