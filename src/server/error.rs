use crate::compiler::CompileError;
use crate::settings::SettingsError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Config Error: {0}")]
    ConfigError(#[from] SettingsError),

    #[error("Compile Error: {0}")]
    CompileError(#[from] CompileError),

    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
}
