use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single shader's generation unit. None of these are
/// retried; any one of them fails the whole batch.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("unnamed types are not yet supported (near '{type_name}')")]
    UnsupportedType { type_name: String },

    #[error("conflicting member lists for type '{type_name}'")]
    TypeRedefinition { type_name: String },

    #[error("type '{type_name}' contains itself and cannot be declared")]
    RecursiveType { type_name: String },

    #[error("tool '{name}' not found; install the Vulkan SDK or check the VULKAN_SDK environment variable")]
    ToolNotFound { name: String },

    #[error("shader reflection failed for {}: {message}", path.display())]
    ReflectionTool { path: PathBuf, message: String },

    #[error("failed to build layout check program: {message}")]
    BuildTool { message: String },

    #[error("layout checks failed for {}:\n{output}", path.display())]
    LayoutMismatch { path: PathBuf, output: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Render(#[from] askama::Error),
}
