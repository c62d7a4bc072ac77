//! Ingres - Groundwater RAG Assistant
//!
//! Ingests groundwater/rainfall spreadsheets into a vector store and answers
//! natural-language questions by retrieving matching rows and handing them to
//! a hosted language model. Embedding, vector search, generation, translation
//! and speech-to-text are external services reached through small traits.

pub mod cli;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod forecast;
pub mod generation;
pub mod ingest;
pub mod logging;
pub mod persona;
pub mod pipeline;
pub mod predictions;
pub mod prompt;
pub mod records;
pub mod server;
pub mod spreadsheet;
pub mod states;
pub mod translation;
pub mod vector_store;
pub mod voice;
