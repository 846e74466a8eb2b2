//! CLI subcommand implementations for the turist-scrape binary.

pub mod doctor;
pub mod scrape_cmd;
pub mod seed_cmd;
pub mod stats_cmd;
