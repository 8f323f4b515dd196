// Database module
// LanceDB holds chunk vectors; a JSON manifest beside it records how the index was built

pub mod lancedb;

pub use self::lancedb::IndexManifest;
pub use self::lancedb::vector_store::{SearchResult, VectorIndex};
