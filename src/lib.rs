// Time-driven HTTP dispatcher library
//
// The core is the next-occurrence resolver (resolver) and the per-job
// dispatch loops (loops). Everything else is a thin collaborator: a
// shared HTTP dispatcher, a clock seam for tests, layered configuration,
// and an optional WebSocket progress watcher.

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod loops;
pub mod models;
pub mod progress;
pub mod resolver;
