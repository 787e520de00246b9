//! Hardware dispatch and thread pool
//!
//! The dispatcher probes CPU capabilities once and hands out a kernel set
//! for the hot operations; the work-stealing pool parallelizes block and
//! channel processing. Both are per-encoder instances rather than process
//! singletons so the library embeds cleanly.

pub mod dispatch;
pub mod workpool;

pub use dispatch::{Backend, Dispatcher, Kernels};
pub use workpool::WorkStealingPool;
