//! Batch client for the CMD isochrone web form (PARSEC + COLIBRI tracks).
//!
//! For every requested metallicity the pipeline resolves the form payload,
//! posts it, scrapes the result token out of the answer page, downloads and
//! decodes the generated table, and puts back the per-block age comments
//! the service no longer writes.

pub mod app;
pub mod cmd;
pub mod config;
pub mod domain;
pub mod error;
pub mod grid;
pub mod output;
pub mod params;
pub mod payload;
pub mod reconstruct;
pub mod scrape;
pub mod store;
