//! Builder API for declaring machine kinds.
//!
//! States are declared with [`state_enum!`](crate::state_enum) and transition
//! tables with [`TransitionTableBuilder`].

pub mod error;
pub mod macros;
pub mod table;

pub use error::BuildError;
pub use table::TransitionTableBuilder;
