// Copyright 2026 turist-scrape contributors
// SPDX-License-Identifier: Apache-2.0

//! turist-scrape: concurrent deep scraper for turistinfo.ro accommodation
//! listings.
//!
//! This library crate exposes the core modules for integration testing.

pub mod analysis;
pub mod audit;
pub mod browser;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod extract;
pub mod page;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod record;
pub mod seed;
pub mod sink;
