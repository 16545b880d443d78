//! Runners and building blocks for prompting an OpenAI-compatible chat API
//! and for caching text embeddings in pgvector for similarity search.

pub mod app;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod models;
pub mod service;
pub mod vector_store;
