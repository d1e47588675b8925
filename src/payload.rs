use std::io::{Cursor, Read};

use flate2::read::MultiGzDecoder;
use serde::Serialize;
use tracing::debug;
use zip::ZipArchive;

use crate::cmd::CmdClient;
use crate::domain::ResultToken;
use crate::error::IsoError;

const GZIP_MAGIC: &[u8] = b"\x1f\x8b\x08";
const BZIP2_MAGIC: &[u8] = b"BZh";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Gzip,
    Bzip2,
    Zip,
    Text,
}

/// Content sniffing on the leading bytes.
pub fn sniff(bytes: &[u8]) -> PayloadKind {
    if bytes.starts_with(GZIP_MAGIC) {
        PayloadKind::Gzip
    } else if bytes.starts_with(ZIP_MAGIC) {
        PayloadKind::Zip
    } else if bytes.starts_with(BZIP2_MAGIC) {
        PayloadKind::Bzip2
    } else {
        PayloadKind::Text
    }
}

#[derive(Debug, Clone)]
pub struct DecodedPayload {
    pub kind: PayloadKind,
    pub text: String,
}

pub fn decode_payload(bytes: &[u8]) -> Result<DecodedPayload, IsoError> {
    let kind = sniff(bytes);
    let text = match kind {
        PayloadKind::Gzip => {
            let mut text = String::new();
            MultiGzDecoder::new(bytes)
                .read_to_string(&mut text)
                .map_err(|err| IsoError::Decode(format!("gzip: {err}")))?;
            text
        }
        PayloadKind::Zip => {
            let mut archive = ZipArchive::new(Cursor::new(bytes))
                .map_err(|err| IsoError::Decode(format!("zip: {err}")))?;
            if archive.is_empty() {
                return Err(IsoError::Decode("zip: archive has no entries".to_string()));
            }
            let mut entry = archive
                .by_index(0)
                .map_err(|err| IsoError::Decode(format!("zip: {err}")))?;
            let mut text = String::new();
            entry
                .read_to_string(&mut text)
                .map_err(|err| IsoError::Decode(format!("zip: {err}")))?;
            text
        }
        PayloadKind::Bzip2 => {
            return Err(IsoError::Decode(
                "bzip2 payloads are not produced by CMD 3.x and are not supported".to_string(),
            ));
        }
        PayloadKind::Text => String::from_utf8(bytes.to_vec())
            .map_err(|err| IsoError::Decode(format!("text: {err}")))?,
    };
    Ok(DecodedPayload { kind, text })
}

/// Downloads the table behind `token` and decodes it to text.
pub fn fetch_table<C: CmdClient + ?Sized>(
    client: &C,
    token: &ResultToken,
) -> Result<DecodedPayload, IsoError> {
    let bytes = client.download_result(token)?;
    let decoded = decode_payload(&bytes)?;
    debug!(
        token = %token,
        kind = ?decoded.kind,
        bytes = bytes.len(),
        "decoded isochrone payload"
    );
    Ok(decoded)
}
