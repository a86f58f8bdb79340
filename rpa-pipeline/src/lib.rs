//! # RPA Pipeline
//!
//! The receiver's background scan loop: request prefix-matching history
//! from an indexing server in bounded chunks, fetch the matching raw
//! transactions, run them through the payment scanner, and persist a
//! resumable cursor.
//!
//! The pipeline is deliberately synchronous and callback-driven. A host
//! wallet calls [`ScanPipeline::tick`] on its own cadence and routes
//! server responses back through the `on_*_response` methods; nothing in
//! here owns a thread or a socket.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

mod config;
mod pipeline;
mod state;

pub use config::PipelineConfig;
pub use pipeline::ScanPipeline;
