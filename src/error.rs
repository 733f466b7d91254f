use thiserror::Error;

/// dalift errors
///
/// Schema-shape limitations never show up here; they travel as
/// diagnostics inside the generated artifact tree.
#[derive(Error, Debug)]
pub enum DaliftError {
    #[error("Failed to import schema from '{source_name}': {message}")]
    Import {
        source_name: String,
        message: String,
    },

    #[error("Malformed schema: {0}")]
    Contract(String),

    #[error("Failed to render artifacts: {0}")]
    Render(String),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
