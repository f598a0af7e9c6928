pub mod chunking;
pub mod corpus;
pub mod embeddings;
pub mod finance;
pub mod gemini;
mod http;
pub mod index;
pub mod llm;
pub mod ollama;
pub mod output;
pub mod prompts;
pub mod rag;
pub mod retrieve;
pub mod synth;

pub use http::{DATASET_PAGE_TIMEOUT, EMBED_TIMEOUT, GENERATE_TIMEOUT};
