mod entity_type;
mod enum_type;
mod property;

pub use entity_type::*;
pub use enum_type::*;
pub use property::*;
