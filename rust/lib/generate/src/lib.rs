//! sharpgen generate
//!
//! One generation run over a project tree:
//! 1. load the configuration and resolve the module graph (`project`)
//! 2. find headers and assign them to modules (`discover`)
//! 3. fingerprint modules and consult the incremental cache
//! 4. parse the headers that matter, in parallel
//! 5. assemble outputs rank by rank and write them (`sink`)
//! 6. record outputs in the cache and save it

pub mod discover;
pub mod error;
pub mod project;
pub mod report;
pub mod run;
pub mod sink;

pub use error::GenerateError;
pub use project::Project;
pub use report::RunReport;
pub use run::{GenerateOptions, Generator};
pub use sink::DiskSink;
