pub mod document;
pub mod errors;
pub mod model;
pub mod nav_tree;
pub mod resolver;

pub use document::*;
pub use errors::*;
pub use model::*;
pub use nav_tree::*;
pub use resolver::*;
