mod metadata;
mod path;
mod resolver;
mod table;

pub use metadata::*;
pub use path::*;
pub use resolver::*;
pub use table::*;
