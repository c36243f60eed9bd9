pub mod consensus;
pub mod registry;

pub use consensus::{HttpChainSource, adopt, best_candidate};
pub use registry::NodeRegistry;
