//! Parse `.env` files and apply them in parallel.
//!
//! Clean lines are split into contiguous chunks, each chunk is applied by its
//! own worker thread, and per-worker diagnostics are fanned into one bounded
//! channel that is drained once every worker has joined.
//!
//! [`EnvLoader::load`] targets an in-memory map by default. [`load_env`] and
//! [`TargetEnv::process`] mutate the process environment and are `unsafe`,
//! because callers must guarantee no concurrent process-environment access.
//!
//! Keys assigned more than once are folded to their last line before
//! partitioning, so workers always write disjoint keys.

mod env;
mod error;
mod loader;
mod model;
mod parser;
mod partition;
mod worker;

pub use env::TargetEnv;
pub use error::{Error, SetVarError, SetVarErrorKind};
pub use loader::{EnvLoader, load_env};
pub use model::{Chunk, CleanLine, Entry, LoadReport, StatusMessage, WorkerId};
pub use parser::{filter_lines, parse_assignment, parse_str, retain_last_assignments};
pub use partition::{SMALL_INPUT_THRESHOLD, parallelism_hint, partition};
