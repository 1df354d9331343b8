use sharpgen_codegen::AssembleError;
use sharpgen_modules::GraphError;
use thiserror::Error;

/// Conditions that end a run. Everything else is a diagnostic.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Cycle(#[from] GraphError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),
}
