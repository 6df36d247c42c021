pub mod task;
pub mod consensus;

pub use task::*;
pub use consensus::*;
