pub mod context;
pub mod datasource;
pub mod query;
pub mod result;
pub mod service_type;

pub use context::*;
pub use datasource::*;
pub use query::*;
pub use result::*;
pub use service_type::*;
