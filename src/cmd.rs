use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::blocking::multipart::Form;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::domain::{PhotometricSystem, ResultToken};
use crate::error::IsoError;
use crate::params::QueryParameters;
use crate::scrape::ResponseScraper;

pub const CMD_BASE_URL: &str = "http://stev.oapd.inaf.it";
pub const FORM_PATH: &str = "/cgi-bin/cmd";
/// Used when the config leaves `timeout_secs` unset.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub trait CmdClient: Send + Sync {
    /// Posts the form and returns the HTML page the service answers with.
    fn submit_form(&self, params: &QueryParameters) -> Result<String, IsoError>;
    /// Downloads the raw bytes of a generated table.
    fn download_result(&self, token: &ResultToken) -> Result<Vec<u8>, IsoError>;
    /// The blank input form, used to list photometric systems.
    fn form_page(&self) -> Result<String, IsoError>;
}

#[derive(Clone)]
pub struct CmdHttpClient {
    client: Client,
    base_url: String,
}

impl CmdHttpClient {
    pub fn new(timeout: Option<Duration>) -> Result<Self, IsoError> {
        Self::with_base_url(CMD_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Option<Duration>) -> Result<Self, IsoError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("cmd-iso/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| IsoError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(request_timeout(timeout))
            .build()
            .map_err(|err| IsoError::Http(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn form_url(&self) -> String {
        format!("{}{}", self.base_url, FORM_PATH)
    }

    pub fn result_url(&self, token: &ResultToken) -> String {
        result_url(&self.base_url, token)
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, IsoError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "CMD request failed".to_string());
        Err(IsoError::Status { status, message })
    }

    fn multipart(params: &QueryParameters) -> Form {
        params.iter().fold(Form::new(), |form, (name, value)| {
            form.text(name.to_string(), value.to_string())
        })
    }
}

impl CmdClient for CmdHttpClient {
    fn submit_form(&self, params: &QueryParameters) -> Result<String, IsoError> {
        let url = self.form_url();
        debug!(url = %url, fields = params.len(), "submitting CMD form");
        let form = Self::multipart(params);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|err| IsoError::Http(err.to_string()))?;
        let response = Self::handle_status(response)?;
        response
            .text()
            .map_err(|err| IsoError::Http(err.to_string()))
    }

    fn download_result(&self, token: &ResultToken) -> Result<Vec<u8>, IsoError> {
        let url = self.result_url(token);
        debug!(url = %url, "downloading isochrone table");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| IsoError::Http(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let bytes = response
            .bytes()
            .map_err(|err| IsoError::Http(err.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn form_page(&self) -> Result<String, IsoError> {
        let response = self
            .client
            .get(self.form_url())
            .send()
            .map_err(|err| IsoError::Http(err.to_string()))?;
        let response = Self::handle_status(response)?;
        response
            .text()
            .map_err(|err| IsoError::Http(err.to_string()))
    }
}

pub fn request_timeout(timeout: Option<Duration>) -> Duration {
    timeout.unwrap_or(DEFAULT_TIMEOUT)
}

/// `<base>/tmp/<token>.dat`, where the service parks generated tables.
pub fn result_url(base_url: &str, token: &ResultToken) -> String {
    format!(
        "{}/tmp/{}.dat",
        base_url.trim_end_matches('/'),
        token.as_str()
    )
}

#[derive(Debug, Clone)]
pub struct QuerySubmission {
    pub token: ResultToken,
    pub document: String,
}

/// Single-attempt submission. A page without a result token is a rejection.
pub fn submit_query<C, S>(
    client: &C,
    scraper: &S,
    params: &QueryParameters,
    system: &PhotometricSystem,
) -> Result<QuerySubmission, IsoError>
where
    C: CmdClient + ?Sized,
    S: ResponseScraper + ?Sized,
{
    let document = client.submit_form(params)?;
    match scraper.result_token(&document) {
        Some(token) => Ok(QuerySubmission { token, document }),
        None => Err(scraper.rejection(&document, system)),
    }
}
