use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares a `u32` index newtype for one kind of simulation entity.
///
/// The wrapped value is the entity's index into the collection that owns it.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            pub fn new(index: usize) -> Self {
                $name(index as u32)
            }

            /// Index into the owning collection.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identifies a bit inside the simulation's bit list.
    BitId
);
entity_id!(
    /// Identifies a job inside the job queue.
    JobId
);
entity_id!(
    /// Identifies an agent inside the swarm.
    AgentId
);
