//! Environment readiness check.

use crate::browser::chromium::find_chromium;
use crate::config::{self, INPUT_FILE, OUTPUT_FILE};
use crate::console::Console;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Outcome of the individual checks.
#[derive(Debug)]
pub struct Report {
    pub chromium: Option<PathBuf>,
    pub input_present: bool,
    pub output_writable: bool,
}

impl Report {
    /// A scrape can start: Chromium exists and the output can be written.
    pub fn ready(&self) -> bool {
        self.chromium.is_some() && self.output_writable
    }
}

/// Check Chromium, the seed artifact, and the output directory.
pub fn check(chromium: Option<&PathBuf>, input: &Path, output: &Path) -> Report {
    Report {
        chromium: config::resolve_chromium_override(chromium).or_else(find_chromium),
        input_present: input.is_file(),
        output_writable: dir_writable(output),
    }
}

fn dir_writable(output: &Path) -> bool {
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    tempfile::tempfile_in(dir).is_ok()
}

pub fn run(console: &Console) -> Result<()> {
    let out = |s: String| console.always(s);

    out("turist-scrape doctor".to_string());
    out("====================".to_string());
    out(String::new());
    out(format!("OS:   {}", std::env::consts::OS));
    out(format!("Arch: {}", std::env::consts::ARCH));
    out(String::new());

    let report = check(None, Path::new(INPUT_FILE), Path::new(OUTPUT_FILE));

    match &report.chromium {
        Some(path) => out(format!("[OK] Chromium found: {}", path.display())),
        None => out(format!(
            "[!!] Chromium NOT found. Install Chrome/Chromium or set {}.",
            config::CHROMIUM_PATH_ENV
        )),
    }
    if report.input_present {
        out(format!("[OK] Seed file {INPUT_FILE} present"));
    } else {
        out(format!(
            "[!!] Seed file {INPUT_FILE} missing. Run `turist-scrape seed` first."
        ));
    }
    if report.output_writable {
        out("[OK] Output directory is writable".to_string());
    } else {
        out("[!!] Output directory is not writable".to_string());
    }

    out(String::new());
    if report.ready() {
        out("Status: READY".to_string());
    } else {
        out("Status: NOT READY".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_paths() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("seed.json");
        std::fs::write(&input, "[]").unwrap();

        let report = check(None, &input, &dir.path().join("out.json"));
        assert!(report.input_present);
        assert!(report.output_writable);

        let report = check(None, &dir.path().join("absent.json"), Path::new("/nonexistent/dir/out.json"));
        assert!(!report.input_present);
        assert!(!report.output_writable);
        assert!(!report.ready());
    }

    #[test]
    fn test_run_prints_status_line() {
        let (console, buf) = Console::capture();
        run(&console).unwrap();
        let last = buf.lines().pop().unwrap();
        assert!(last == "Status: READY" || last == "Status: NOT READY");
    }
}
