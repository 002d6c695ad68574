pub mod handler;
pub mod registry;

pub use handler::*;
pub use registry::*;
