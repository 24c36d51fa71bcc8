//! # AuPair - Greedy Dictionary Merging for Prefix-Free Parses
//!
//! A prefix-free parse (PFP) represents a text as a dictionary of phrases plus
//! a sequence of phrase references; consecutive phrases overlap by a fixed
//! window. AuPair shrinks a PFP by merging adjacent phrases across selected
//! boundary windows ("trigger strings"):
//! 1. **Cost model**: every trigger string is scored by the bytes saved if all
//!    of its occurrences were merged at once
//! 2. **Greedy loop**: the best trigger string is removed, its neighbours are
//!    rescored, and the loop stops once no score exceeds a threshold
//!
//! Document-boundary markers are never touched, so the output is still a
//! valid PFP of the same text.
//!
//! ## Example
//!
//! ```no_run
//! use aupair_rs::{AuPair, AuPairConfig, RemovedTriggers};
//!
//! let config = AuPairConfig::new("data/chr20", 10)?.with_compress_dictionary(true);
//! let mut au_pair = AuPair::new(config);
//!
//! let mut removed = RemovedTriggers::new();
//! let bytes_removed = au_pair.run(&mut removed)?;
//! let removed_path = au_pair.config().default_removed_path();
//! au_pair.write_removed_triggers(&removed_path, &removed)?;
//!
//! println!("Removed {} trigger strings, saving {} bytes", removed.len(), bytes_removed);
//! # Ok::<(), aupair_rs::AuPairError>(())
//! ```
//!
//! ## Performance
//!
//! - O(log t) per cost update over t trigger strings
//! - O(1) removal and neighbour lookup in the parse (generational indices via SlotMap)
//! - The input parse is memory-mapped

mod aupair;
mod config;
mod cost;
mod dictionary;
mod error;
mod id_gen;
pub mod io;
pub mod markers;
mod merge;
mod parse;
mod pq;
mod trigger;

#[cfg(test)]
mod tests;

pub use aupair::{AuPair, AuPairStats, EngineState, Finalized, RemovedTriggers};
pub use config::AuPairConfig;
pub use dictionary::Dictionary;
pub use error::{AuPairError, Result};
pub use parse::{Parse, ParsePos, Positions};
pub use pq::IndexMaxPq;
pub use trigger::{TriggerId, TriggerTable};
