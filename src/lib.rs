//! ai-2048-td: a hint-tile 2048 variant with an n-tuple TD(0) learner
//!
//! This crate provides:
//! - A packed `Board` with table-driven slides and reward accounting (`engine`)
//! - Symmetry-expanded n-tuple feature keys (`features`) over flat weight tables (`weights`)
//! - A one-ply greedy evaluator and a backward TD(0) pass (`evaluator`, `learner`)
//! - The tile environment with a shuffled bag, hint tile and bonus escalation (`environment`)
//! - Agents, `key=value` configuration and an episode driver (`agent`, `config`, `episode`)
//!
//! Quick start:
//! ```
//! use ai_2048_td::agent::Player;
//! use ai_2048_td::engine as GameEngine;
//! use ai_2048_td::environment::TileEnvironment;
//! use ai_2048_td::episode::{play_episode, DEFAULT_OPENING};
//! use ai_2048_td::features::Topology;
//! use ai_2048_td::weights::WeightStore;
//!
//! // One-time table init
//! GameEngine::new();
//!
//! let store = WeightStore::new(Topology::new(6, 4).unwrap());
//! let mut player = Player::new(store, 0.1);
//! let mut env = TileEnvironment::seeded(42);
//! let stats = play_episode(&mut player, &mut env, DEFAULT_OPENING);
//! assert!(stats.moves > 0);
//! ```
//!
pub mod agent;
pub mod config;
pub mod engine;
pub mod environment;
pub mod episode;
pub mod evaluator;
pub mod features;
pub mod learner;
pub mod weights;
