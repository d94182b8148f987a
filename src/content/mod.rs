mod chunker;
mod generator;
mod normalizer;
pub mod refine;

pub use chunker::split_text;
pub use generator::generate_post;
pub use normalizer::split_metadata;
