pub mod category;
pub mod filter;
pub mod node;
pub mod record;
pub mod search;
pub mod stats;
pub mod store;

pub use category::*;
pub use filter::*;
pub use node::*;
pub use record::*;
pub use store::*;
