pub mod aggregator;
pub mod classifier;
pub mod dispatcher;
pub mod executors; // One backend executor per Azure service family
pub mod registry;

pub use aggregator::*;
pub use classifier::*;
pub use dispatcher::*;
pub use registry::*;
