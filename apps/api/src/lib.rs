//! CVForge API: backend for the CVForge résumé builder.
//!
//! Serves the template catalog, premium-access checks and LLM-backed
//! writing help. Every outbound call runs through [`retry`].

pub mod ai;
pub mod config;
pub mod db;
pub mod errors;
pub mod llm_client;
pub mod models;
pub mod premium;
pub mod retry;
pub mod routes;
pub mod state;
pub mod templates;
