use antogram_config::ConfigError;
use antogram_field::FieldError;
use antogram_simulation::SimulationError;
use antogram_transport::TransportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Field error: {0}")]
    Field(#[from] FieldError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Failed to install Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("Field loader exited without producing a field")]
    LoaderDisconnected,
}
