pub mod layout;
mod process;
mod reader;

// Mock memory reader for testing (always available for unit and integration tests)
#[doc(hidden)]
pub mod mock;

pub use process::*;
pub use reader::{MemoryReader, ReadMemory, decode_utf16};

#[doc(hidden)]
pub use mock::{MockMemoryBuilder, MockMemoryReader};
