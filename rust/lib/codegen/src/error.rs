use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssembleError {
    /// A generated file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("assembly of module '{0}' panicked")]
    WorkerPanicked(String),
}
