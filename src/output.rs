use std::io::{self, Write};

use serde::Serialize;

use crate::app::{BatchResult, ProgressEvent, ProgressSink, SystemsResult};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_fetch(result: &BatchResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_systems(result: &SystemsResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Plain-text progress on stderr and summaries on stdout.
pub struct ConsoleOutput;

impl ConsoleOutput {
    pub fn print_fetch(result: &BatchResult) {
        if result.dry_run {
            println!("\nDry run, nothing was requested:");
        } else {
            println!("\nAll done!");
        }
        for file in &result.files {
            match &file.token {
                Some(token) => println!(
                    "  {} ({} blocks, {} rows dropped, {token})",
                    file.path, file.blocks, file.dropped_rows
                ),
                None => println!("  {} ({} blocks)", file.path, file.blocks),
            }
        }
        if let Some(side_table) = &result.side_table {
            println!(
                "  {} ({} filters)",
                side_table.path,
                side_table.metadata.filters.len()
            );
        }
    }

    pub fn print_systems(result: &SystemsResult) {
        println!("\n{:<40} System's name", "System's ID");
        println!("{}", "-".repeat(54));
        for system in &result.systems {
            println!("{:<40} {}", system.id, system.name);
        }
        println!("\nAll systems listed");
    }
}

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("  {} ({:.1}s)", event.message, elapsed.as_secs_f64()),
            None => eprintln!("  {}", event.message),
        }
    }
}
