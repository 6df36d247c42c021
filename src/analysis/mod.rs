pub mod prompts;
pub mod diff;
pub mod reference;
pub mod consensus;
pub mod store;

pub use consensus::ConsensusEngine;
pub use diff::{is_valid_source_file, DiffUnit};
pub use reference::reference_url;
pub use store::ConsensusStore;
