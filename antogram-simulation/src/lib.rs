//! Agent coordination and motion: the swarm that carries bits from where
//! they lie to where the picture needs them.

pub mod agent;
pub mod render;
pub mod snapshot;
pub mod spatial;
pub mod targeting;
pub mod world;

pub use agent::{Agent, AgentState};
pub use render::{render, Surface};
pub use snapshot::{AgentFrame, BitFrame, FrameSnapshot};
pub use spatial::SpatialGrid;
pub use targeting::{
    strategy_for, Assignment, JobQueueTargeting, TargetPoolTargeting, TargetingStrategy,
};
pub use world::Simulation;

use antogram_core::{BitId, CoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("bit {0} does not exist")]
    UnknownBit(BitId),

    #[error("assignment {0:?} does not belong to this targeting strategy")]
    ForeignAssignment(Assignment),

    #[error("field has {bits} bits but {jobs} jobs")]
    FieldMismatch { bits: usize, jobs: usize },
}
