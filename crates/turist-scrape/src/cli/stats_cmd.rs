//! `turist-scrape stats`: text summary of a scrape output.

use crate::analysis;
use crate::console::Console;
use anyhow::{bail, Result};
use std::path::Path;

pub fn run(input: &Path, top: usize, console: &Console) -> Result<()> {
    if !input.exists() {
        bail!(
            "{} not found; run `turist-scrape scrape` first",
            input.display()
        );
    }
    console.line(format!("--- Analysis of {} ---", input.display()));
    analysis::run_stats(input, top, console)?;
    Ok(())
}
