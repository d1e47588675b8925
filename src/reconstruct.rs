//! Restores what CMD 3.x leaves out of its tables.
//!
//! The service no longer writes an `# Age = ... yr` comment ahead of each
//! isochrone block, and its `logAge` column is rounded to three decimals, so
//! the age has to come from the requested grid. Blocks appear in grid order,
//! one per age.

use serde::Serialize;

use crate::error::IsoError;

pub const BLOCK_HEADER_MARKER: &str = "# Zini";
/// Zero-based column holding the evolutionary-stage label.
pub const STAGE_COLUMN: usize = 9;
/// Stage label of the post-AGB / discarded phase.
pub const DISCARDED_STAGE: &str = "9";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconstruction {
    #[serde(skip)]
    pub text: String,
    pub blocks: usize,
    pub dropped_rows: usize,
}

pub fn block_header_positions<S: AsRef<str>>(lines: &[S]) -> Vec<usize> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.as_ref().starts_with(BLOCK_HEADER_MARKER))
        .map(|(index, _)| index)
        .collect()
}

pub fn age_comment(age_yr: f64) -> String {
    format!("# Age = {} yr", format_scientific(age_yr))
}

/// `{:.6E}` with a signed, two-digit exponent (`3.981072E+06`).
pub fn format_scientific(value: f64) -> String {
    let formatted = format!("{value:.6E}");
    match formatted.split_once('E') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exponent) => {
                let sign = if exponent < 0 { '-' } else { '+' };
                format!("{mantissa}E{sign}{:02}", exponent.unsigned_abs())
            }
            Err(_) => formatted,
        },
        None => formatted,
    }
}

/// Puts the i-th age comment directly above the i-th block header.
pub fn insert_age_comments(lines: Vec<String>, ages_yr: &[f64]) -> Result<Vec<String>, IsoError> {
    let headers = block_header_positions(&lines);
    if headers.len() != ages_yr.len() {
        return Err(IsoError::BlockCountMismatch {
            headers: headers.len(),
            ages: ages_yr.len(),
        });
    }

    let mut output = Vec::with_capacity(lines.len() + ages_yr.len());
    let mut ages = ages_yr.iter();
    for line in lines {
        if line.starts_with(BLOCK_HEADER_MARKER) {
            if let Some(age) = ages.next() {
                output.push(age_comment(*age));
            }
        }
        output.push(line);
    }
    Ok(output)
}

pub fn is_discarded_stage(line: &str) -> bool {
    line.split_whitespace().nth(STAGE_COLUMN) == Some(DISCARDED_STAGE)
}

/// Removes rows labelled with the discarded stage. Rows too short to carry
/// a stage column are kept. Returns the number of rows removed.
pub fn drop_discarded_stage(lines: &mut Vec<String>) -> usize {
    let before = lines.len();
    lines.retain(|line| !is_discarded_stage(line));
    before - lines.len()
}

pub fn reconstruct(
    text: &str,
    ages_yr: &[f64],
    drop_discarded: bool,
) -> Result<Reconstruction, IsoError> {
    let lines = text.split('\n').map(str::to_string).collect::<Vec<_>>();
    let mut lines = insert_age_comments(lines, ages_yr)?;
    let dropped_rows = if drop_discarded {
        drop_discarded_stage(&mut lines)
    } else {
        0
    };
    Ok(Reconstruction {
        text: lines.join("\n"),
        blocks: ages_yr.len(),
        dropped_rows,
    })
}
