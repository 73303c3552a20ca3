pub mod config;
pub mod connect;
pub mod session;

pub use config::ConfigError;
pub use connect::ConnectError;
pub use session::SessionError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
