//! # GRC Assist
//!
//! A retrieval-augmented compliance assistant: an embedding-based
//! document index plus a generative-answer orchestrator that turns a
//! user question into a grounded answer with cited sources.
//!
//! ## Architecture
//!
//! ```text
//! build phase (once):
//! ┌───────────────┐   ┌─────────────────┐   ┌─────────────┐
//! │ DocumentStore │──▶│ EmbeddingClient │──▶│ VectorIndex │
//! └───────────────┘   └─────────────────┘   └──────┬──────┘
//!                                                  │ snapshot
//! query phase:                                     ▼
//! Session ─▶ Orchestrator ─▶ embed ─▶ search ─▶ prompt ─▶ generate
//! ```
//!
//! The orchestrator is a process-wide singleton with single-flight
//! initialization; the index is built once and read-only afterward.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Error taxonomy |
//! | [`documents`] | Document stores (built-in corpus, JSON file) |
//! | [`embedding`] | Embedding client and cosine similarity |
//! | [`generation`] | Generative text client |
//! | [`index`] | In-memory vector index with snapshot persistence |
//! | [`service`] | Orchestrator: initialization state machine and query |
//! | [`session`] | Per-conversation message sequencing |

pub mod config;
pub mod documents;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod models;
pub mod service;
pub mod session;
