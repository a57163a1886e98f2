//! # Transcript QA Core
//!
//! Retrieval-augmented question answering over a single therapy-session
//! transcript: parsing, retrieval units, text splitting, the embedding
//! index, answer synthesis, confidence scoring and the session state
//! machine, plus the service boundary and history storage trait.
//!
//! This crate performs no network, filesystem or database I/O. Embedding
//! and completion providers are injected through the [`embedding::Embedder`]
//! and [`synth::Completer`] traits; history backends through
//! [`history::HistoryStore`].
//!
//! # Pipeline
//!
//! ```text
//! raw text ─▶ transcript::parse ─▶ documents::build_units ─▶ index::EmbeddingIndex::build
//!
//! question ─▶ index.search(k) ─▶ synth::AnswerSynthesizer ─▶ answer
//!                       └──────▶ speaker-turn quotes + confidence::estimate(count)
//! ```

pub mod chunk;
pub mod confidence;
pub mod documents;
pub mod embedding;
pub mod error;
pub mod history;
pub mod index;
pub mod models;
pub mod service;
pub mod session;
pub mod synth;
pub mod transcript;
