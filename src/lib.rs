//! Purpose: Decode ledger-query API responses into typed Rust records.
//! Exports: `core` (strkey, asset, muxed, predicate codecs) and `api`
//! (record families, registries, pages, transport).
//! Invariants: Decoders reject malformed input rather than defaulting.
//! Invariants: Core codecs are pure; all network access lives behind `api::Transport`.
pub mod api;
pub mod core;
