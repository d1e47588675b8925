use std::fs;
use std::io::{Cursor, Write};

use assert_matches::assert_matches;
use flate2::Compression;
use flate2::write::GzEncoder;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use cmd_isochrones::error::IsoError;
use cmd_isochrones::payload::{PayloadKind, decode_payload, sniff};

fn table() -> String {
    fs::read_to_string("tests/fixtures/isochrones.dat").unwrap()
}

#[test]
fn gzip_table_matches_plain_text() {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(table().as_bytes()).unwrap();
    let bytes = encoder.finish().unwrap();

    let decoded = decode_payload(&bytes).unwrap();
    assert_eq!(decoded.kind, PayloadKind::Gzip);
    assert_eq!(decoded.text, table());
}

#[test]
fn legacy_zip_reads_first_entry() {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    writer.start_file("output1234.dat", options).unwrap();
    writer.write_all(table().as_bytes()).unwrap();
    writer.start_file("output1234.log", options).unwrap();
    writer.write_all(b"log").unwrap();
    let bytes = writer.finish().unwrap().into_inner();

    assert_eq!(sniff(&bytes), PayloadKind::Zip);
    let decoded = decode_payload(&bytes).unwrap();
    assert_eq!(decoded.text, table());
}

#[test]
fn text_table_is_not_sniffed_as_archive() {
    assert_eq!(sniff(table().as_bytes()), PayloadKind::Text);
    assert_eq!(sniff(b""), PayloadKind::Text);
}

#[test]
fn broken_zip_is_decode_error() {
    let err = decode_payload(b"PK\x03\x04truncated").unwrap_err();
    assert_matches!(err, IsoError::Decode(ref message) if message.starts_with("zip"));
}

#[test]
fn invalid_utf8_in_gzip_and_text_both_fail() {
    let raw = b"# Zini MH\n\xff 1 2\n";
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw).unwrap();
    let gzipped = encoder.finish().unwrap();

    assert_matches!(decode_payload(raw).unwrap_err(), IsoError::Decode(_));
    assert_matches!(decode_payload(&gzipped).unwrap_err(), IsoError::Decode(_));
}
