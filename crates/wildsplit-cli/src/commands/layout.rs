//! Layout table export command.

use std::path::Path;

use anyhow::Result;
use wildsplit_core::{LayoutTable, save_layout};

/// Write the built-in layout table as JSON, as a starting point for a patched table.
pub fn run(output: &Path) -> Result<()> {
    let table = LayoutTable::builtin();
    save_layout(output, &table)?;
    println!(
        "Wrote layout {} ({} entries) to {}",
        table.version,
        table.entries.len(),
        output.display()
    );
    Ok(())
}
