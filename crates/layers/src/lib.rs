pub mod backend;
pub mod detail;
pub mod emoji;
pub mod layer;
pub mod markers;
pub mod symbology;
pub mod sync;

pub use backend::*;
pub use detail::{DetailRow, DetailValue, node_detail};
pub use layer::*;
pub use markers::*;
pub use sync::*;
