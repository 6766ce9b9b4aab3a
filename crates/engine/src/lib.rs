//! # Chunk Engine
//!
//! Owns the active feature index and answers protocol requests.
//!
//! ## Flow
//!
//! ```text
//! Request::InitFromText
//!     │
//!     ├──> parse graph JSON
//!     ├──> detect file / chunk groups
//!     ├──> build feature index
//!     └──> publish Arc<LoadedGraph>  ──> Response::Ready
//!
//! Request::Compute
//!     └──> LoadedGraph::query (ALL | ANY)  ──> Response::Result
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use chunk_engine::{Engine, EngineWorker};
//! use chunk_protocol::Request;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (worker, mut responses) = EngineWorker::start(Engine::default());
//!     worker
//!         .send(Request::InitFromText {
//!             text: std::fs::read_to_string("graph.json")?,
//!             file_group_hint: None,
//!             chunk_group_hint: None,
//!         })
//!         .await?;
//!
//!     println!("{:?}", responses.next_terminal().await);
//!     Ok(())
//! }
//! ```

mod engine;
mod error;
mod stats;
mod worker;

pub use engine::{Engine, LoadedGraph, ProgressFn};
pub use error::{EngineError, Result};
pub use stats::LoadStats;
pub use worker::{EngineWorker, ResponseStream};
