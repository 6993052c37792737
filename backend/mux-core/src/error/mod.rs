pub mod channel;
pub mod config;
pub mod registration;
pub mod registry;
pub mod sink;
pub mod transport;

pub use channel::ChannelError;
pub use config::ConfigError;
pub use registration::RegistrationError;
pub use registry::RegistryError;
pub use sink::SinkError;
pub use transport::TransportError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
