#![deny(missing_docs)]

//! Core library for the docagent HTTP services.
//!
//! Two thin web backends share this crate: the document service (upload a PDF,
//! summarize it, ask questions about it) and the legal chat service (a single
//! `/chat` endpoint backed by a preconfigured legal assistant). Both forward
//! work to a hosted agent framework; this crate validates requests, adapts the
//! upstream API, and reshapes replies into JSON.

/// Hosted agent framework client and reply contract.
pub mod agent;
/// HTTP routing and handlers for the document service.
pub mod api;
/// Agent and knowledge clients composed behind a testable trait.
pub mod assistant;
/// Environment-driven configuration management.
pub mod config;
/// PDF text extraction.
pub mod extract;
/// Knowledge-base loading through the agent framework.
pub mod knowledge;
/// Preconfigured legal agent and the chat service router.
pub mod legal;
/// Structured logging and tracing setup.
pub mod logging;
