pub mod rcs;
pub mod vex;

pub use rcs::{aggregate_store_text, CommitAggregate, RepoFilter};
pub use vex::{VexBuilder, VexDocument};
