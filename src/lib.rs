//! threes-tdl: a Threes! engine and an n-tuple network trained by TD(0)
//!
//! This crate provides:
//! - A compact `Board` type (`engine` module) with table-driven slides, tile placement and the tile bag
//! - Symmetric n-tuple `Pattern`s and a `Network` summing them, with a binary weight format
//! - Agents: the learning `TdlAgent`, a read-only `Greedy` slider and the `RandomPlacer` environment
//! - An `Episode` driver, block `Statistics` and parallel greedy evaluation
//!
//! Quick start:
//! ```
//! use threes_tdl::agent::{Greedy, RandomPlacer};
//! use threes_tdl::engine as GameEngine;
//! use threes_tdl::episode::Episode;
//! use threes_tdl::network::Network;
//!
//! // One-time table init
//! GameEngine::new();
//!
//! let net = Network::from_tuples(&[[0usize, 1, 2, 3]]).unwrap();
//! let mut player = Greedy::new(&net);
//! let mut env = RandomPlacer::new("seed=42").unwrap();
//! let ep = Episode::play(&mut player, &mut env);
//! assert!(ep.slides() > 0);
//! ```
pub mod action;
pub mod agent;
pub mod config;
pub mod engine;
pub mod episode;
pub mod evaluate;
pub mod network;
pub mod pattern;
pub mod stats;
