use regex::Regex;
use serde::Serialize;

use crate::domain::{PhotometricSystem, ResultToken, Track};
use crate::error::IsoError;

const EXCERPT_CHARS: usize = 100;

/// Filter names, effective wavelengths and extinction weights listed in the
/// response page for the requested photometric system.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterMetadata {
    pub filters: Vec<String>,
    pub wavelengths: Vec<String>,
    pub weights: Vec<String>,
}

impl FilterMetadata {
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.wavelengths.is_empty() && self.weights.is_empty()
    }

    /// Line written to `filterslambdas.dat`.
    pub fn sidecar_line(&self, track: Track) -> String {
        let values = self
            .filters
            .iter()
            .chain(&self.wavelengths)
            .chain(&self.weights)
            .map(String::as_str)
            .collect::<Vec<_>>();
        format!("{}     {}", track.code(), values.join("    "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemEntry {
    pub id: String,
    pub name: String,
}

/// Everything the pipeline reads out of CMD's HTML. The page layout is an
/// external, versioned schema; swapping the implementation must not touch
/// the batch driver.
pub trait ResponseScraper: Send + Sync {
    fn result_token(&self, document: &str) -> Option<ResultToken>;
    fn rejection(&self, document: &str, system: &PhotometricSystem) -> IsoError;
    fn filter_metadata(&self, document: &str) -> FilterMetadata;
    fn photometric_systems(&self, form_page: &str) -> Vec<SystemEntry>;
}

/// Regex scraper for the CMD 3.x result page.
pub struct CmdHtmlScraper {
    token: Regex,
    filter_row: Regex,
    lambda_row: Regex,
    omega_row: Regex,
    tags: Regex,
    select: Regex,
    option: Regex,
}

impl Default for CmdHtmlScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl CmdHtmlScraper {
    pub fn new() -> Self {
        Self {
            token: Regex::new(r"output\d+").expect("static pattern"),
            filter_row: Regex::new(r"Filter(.*?)<th>&lambda").expect("static pattern"),
            lambda_row: Regex::new(r"lambda(.*?)omega").expect("static pattern"),
            omega_row: Regex::new(r"(?m)omega(.*?)(?:lambda|</table>|$)").expect("static pattern"),
            tags: Regex::new(r"<[^>]*>").expect("static pattern"),
            select: Regex::new(r"(?is)<select[^>]*>(.*?)</select>").expect("static pattern"),
            option: Regex::new(r#"(?is)<option[^>]*value="([^"]*)"[^>]*>(.*?)</option>"#)
                .expect("static pattern"),
        }
    }

    fn row_cells(&self, regex: &Regex, document: &str) -> Vec<String> {
        let Some(captures) = regex.captures(document) else {
            return Vec::new();
        };
        let row = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        table_cells(row)
    }

    fn strip_tags(&self, fragment: &str) -> String {
        self.tags.replace_all(fragment, "").trim().to_string()
    }
}

impl ResponseScraper for CmdHtmlScraper {
    fn result_token(&self, document: &str) -> Option<ResultToken> {
        self.token
            .find(document)
            .map(|m| ResultToken::new(m.as_str()))
    }

    fn rejection(&self, document: &str, system: &PhotometricSystem) -> IsoError {
        let unsupported = IsoError::UnsupportedPhotometricSystem(system.to_string());
        if document.contains(&unsupported.to_string()) {
            return unsupported;
        }

        let excerpt = document
            .find("errorwarning")
            .map(|index| &document[index + "errorwarning".len()..])
            .map(|rest| rest.split_once('>').map(|(_, tail)| tail).unwrap_or(rest))
            .map(|rest| rest.chars().take(EXCERPT_CHARS).collect::<String>())
            .map(|rest| {
                let first = rest.split("<br>").next().unwrap_or_default();
                self.strip_tags(first)
            })
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| "server response is incorrect".to_string());
        IsoError::Rejected(excerpt)
    }

    fn filter_metadata(&self, document: &str) -> FilterMetadata {
        let filters = self
            .row_cells(&self.filter_row, document)
            .into_iter()
            .map(|name| format!("{name}mag"))
            .collect();
        FilterMetadata {
            filters,
            wavelengths: self.row_cells(&self.lambda_row, document),
            weights: self.row_cells(&self.omega_row, document),
        }
    }

    fn photometric_systems(&self, form_page: &str) -> Vec<SystemEntry> {
        let Some(select) = self.select.captures(form_page) else {
            return Vec::new();
        };
        let body = select.get(1).map(|m| m.as_str()).unwrap_or_default();
        self.option
            .captures_iter(body)
            .filter_map(|captures| {
                let value = captures.get(1)?.as_str();
                let label = captures.get(2)?.as_str();
                let id = value
                    .rsplit_once("tab_mag_")
                    .map(|(_, rest)| rest)
                    .unwrap_or(value)
                    .trim_end_matches(".dat")
                    .trim()
                    .to_string();
                if id.is_empty() {
                    return None;
                }
                Some(SystemEntry {
                    id,
                    name: self.strip_tags(label),
                })
            })
            .collect()
    }
}

fn table_cells(row: &str) -> Vec<String> {
    row.split("<td>")
        .skip(1)
        .map(|cell| cell.split("</td>").next().unwrap_or_default().trim().to_string())
        .collect()
}
