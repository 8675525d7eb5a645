//! biocorpus-ingestion: Corpus construction pipeline.
//! - BioC XML reading and record normalisation
//! - Web page normalisation and fetching
//! - Corpus building over a folder of source documents
//! - Embedding backends and the flat L2 vector index
//! - Index/metadata artifacts kept positionally aligned
//! - Metadata merging with backup

pub mod aligned;
pub mod artifacts;
pub mod author;
pub mod corpus;
pub mod embedding;
pub mod index;
pub mod merge;
pub mod models;
pub mod normalise;
pub mod pipeline;
pub mod sources;
