mod cell;
mod detector;
mod memory;
mod slots;
mod spriteling;

pub use cell::*;
pub use detector::*;
pub use memory::*;
pub use slots::*;
pub use spriteling::*;
