use crate::action::Action;
use crate::config::AgentConfig;
use crate::engine::{Board, GameBoard, Move, Reward};
use crate::network::Network;

use super::{select_afterstate, Agent, AgentError};

/// Steps reserved up front for one episode's trajectory.
const TRAJECTORY_CAPACITY: usize = 20000;

/// One recorded move of the learning slider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step<B> {
    pub before: B,
    pub after: B,
    pub op: Move,
    pub reward: Reward,
    /// `reward + V(after)` at the time the move was chosen.
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Record<B> {
    Step(Step<B>),
    /// No legal slide was left; contributes no update.
    Terminal,
}

/// Result of one backward pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EpisodeUpdate {
    /// Number of afterstates updated.
    pub steps: usize,
    /// Running target after the earliest step.
    pub exact: f32,
}

/// Learning slider: greedy over `reward + V(afterstate)`, trained by a TD(0)
/// pass over the finished episode.
///
/// Weights are loaded from `load=` on construction and written to `save=`
/// when the agent is dropped.
pub struct TdlAgent<B = Board> {
    config: AgentConfig,
    network: Network,
    path: Vec<Record<B>>,
}

impl<B: GameBoard> TdlAgent<B> {
    /// Agent over the standard 4 x 6-tuple network.
    pub fn new(args: &str) -> Result<Self, AgentError> { Self::with_network(args, Network::tdl()) }

    pub fn with_network(args: &str, mut network: Network) -> Result<Self, AgentError> {
        let config = AgentConfig::parse("name=tdl role=player", args)?;
        if let Some(path) = &config.load {
            network.load(path)?;
        }
        Ok(TdlAgent { config, network, path: Vec::with_capacity(TRAJECTORY_CAPACITY) })
    }

    pub fn network(&self) -> &Network { &self.network }

    /// Records (terminal included) waiting for the next backward pass.
    pub fn trajectory_len(&self) -> usize { self.path.len() }

    /// Backward TD(0) pass over the recorded trajectory, latest move first.
    ///
    /// For each step, `error = exact - (value - reward)` and
    /// `exact = reward + network.update(after, alpha * error)`, starting from
    /// `exact = 0`. The trajectory is empty afterwards.
    pub fn update_episode(&mut self) -> EpisodeUpdate {
        let alpha = self.config.alpha;
        let mut report = EpisodeUpdate::default();
        while let Some(record) = self.path.pop() {
            let Record::Step(step) = record else { continue };
            let reward = step.reward as f32;
            let error = report.exact - (step.value - reward);
            report.exact = reward + self.network.update(&step.after, alpha * error);
            report.steps += 1;
        }
        report
    }
}

impl<B: GameBoard> Agent<B> for TdlAgent<B> {
    fn close_episode(&mut self, _flag: &str) {
        let report = self.update_episode();
        tracing::debug!(steps = report.steps, exact = report.exact, "episode learned");
    }

    fn take_action(&mut self, before: &B) -> Action {
        tracing::trace!(agent = self.config.name(), "slider");
        match select_afterstate(&self.network, before) {
            Some(best) => {
                self.path.push(Record::Step(Step {
                    before: before.clone(),
                    after: best.after,
                    op: best.op,
                    reward: best.reward,
                    value: best.value,
                }));
                Action::Slide(best.op)
            }
            None => {
                self.path.push(Record::Terminal);
                Action::None
            }
        }
    }

    fn config(&self) -> &AgentConfig { &self.config }

    fn config_mut(&mut self) -> &mut AgentConfig { &mut self.config }
}

impl<B> Drop for TdlAgent<B> {
    fn drop(&mut self) {
        let Some(path) = &self.config.save else { return };
        if let Err(e) = self.network.save(path) {
            tracing::error!(path = %path.display(), error = %e, "failed to save weights");
        }
    }
}
