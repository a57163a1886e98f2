//! # Transcript QA
//!
//! Retrieval-augmented question answering over a therapy-session
//! transcript. The core pipeline lives in `transcript-qa-core`; this crate
//! supplies configuration, logging, HTTP embedding and completion
//! providers, the SQLite history store, the CLI and the HTTP server.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ transcript │──▶│ QaSession    │──▶│ QaService    │
//! │  (.txt)    │   │ parse+embed  │   │ fallback+log │
//! └────────────┘   └──────┬───────┘   └──────┬───────┘
//!                         │                  │
//!              ┌──────────┴───┐       ┌──────┴───────┐
//!              ▼              ▼       ▼              ▼
//!         ┌─────────┐  ┌──────────┐ ┌──────┐   ┌─────────┐
//!         │Embedder │  │Completer │ │SQLite│   │CLI/HTTP │
//!         └─────────┘  └──────────┘ └──────┘   └─────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`history`] | SQLite history store |
//! | [`embedding`] | Embedding providers |
//! | [`completion`] | Completion providers |
//! | [`bootstrap`] | Service construction from config |
//! | [`ask`] | One-shot question commands |
//! | [`stats`] | History and usage commands |
//! | [`server`] | HTTP API |
//! | [`logging`] | Tracing subscriber |

pub mod ask;
pub mod bootstrap;
pub mod completion;
pub mod config;
pub mod db;
pub mod embedding;
pub mod history;
pub mod logging;
pub mod migrate;
pub mod server;
pub mod stats;
