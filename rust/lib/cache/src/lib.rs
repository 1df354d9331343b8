//! Incremental generation cache.
//!
//! Maps each input (a header, or a whole module) to the fingerprint of the
//! content it was last generated from. The cache is advisory: anything it
//! cannot vouch for is regenerated.
//!
//! Used by:
//! - `sharpgen-generate` to skip modules whose inputs and outputs are unchanged

pub mod error;
pub mod fingerprint;
pub mod store;

pub use error::CacheError;
pub use fingerprint::{fingerprint, fingerprint_file, Fingerprinter};
pub use store::{module_key, CacheEntry, IncrementalCache, LoadStatus, CACHE_VERSION};
