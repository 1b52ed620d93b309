pub mod builder;
pub mod cli;
pub mod config;
pub mod error;
pub mod index;
pub mod intent;
pub mod provider;
pub mod rerank;
pub mod retriever;
pub mod store;
pub mod utils;

pub use builder::{IndexBuilder, build};
pub use config::{ConfDir, Opts};
pub use error::{BuildError, QueryError, ScoreError, StoreError};
pub use intent::{QueryIntent, extract_query_intent};
pub use rerank::{SearchResult, rerank};
pub use retriever::{Retriever, RetrieverBuilder};
pub use store::IndexSet;
