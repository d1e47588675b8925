use std::fs;
use std::time::Duration;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use cmd_isochrones::config::ConfigLoader;
use cmd_isochrones::domain::{AgeScale, Imf, MetallicityScale, PhotometricVersion, Track};
use cmd_isochrones::error::IsoError;

fn write_config(content: &str) -> (tempfile::TempDir, String) {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("cmd-iso.json");
    fs::write(&path, content).unwrap();
    let path = path.to_str().unwrap().to_string();
    (temp, path)
}

#[test]
fn resolves_full_config() {
    let (_temp, path) = write_config(
        r#"{
            "compress": true,
            "track": "PAR12+CS_35",
            "rm_label9": true,
            "photometric_system": "gaiaEDR3",
            "photometric_version": "YBC",
            "imf": "chab_log",
            "metallicity": { "scale": "mh", "range": [-1.0, 0.0, 0.5] },
            "age": { "scale": "linear", "range": [1e9, 2e9, 5e8] },
            "output_dir": "out",
            "timeout_secs": 120,
            "extra_fields": { "extinction_av": "0.1" }
        }"#,
    );

    let resolved = ConfigLoader::resolve(Some(&path)).unwrap();
    let selection = &resolved.selection;
    assert_eq!(selection.track, Track::Parsec12Colibri35);
    assert_eq!(selection.photometric_system.as_str(), "gaiaEDR3");
    assert_eq!(selection.photometric_version, PhotometricVersion::Ybc);
    assert_eq!(selection.imf, Imf::ChabrierLognormal);
    assert!(selection.compress);
    assert_eq!(selection.ages.scale(), AgeScale::Linear);
    assert_eq!(selection.ages.len(), 3);
    assert_eq!(selection.extra_fields.get("extinction_av").map(String::as_str), Some("0.1"));

    assert_eq!(resolved.metallicities.scale(), MetallicityScale::Mh);
    assert_eq!(resolved.metallicities.len(), 2);
    assert!(resolved.drop_discarded_stage);
    assert_eq!(resolved.output_dir, Utf8PathBuf::from("out"));
    assert_eq!(resolved.timeout, Some(Duration::from_secs(120)));
}

#[test]
fn missing_explicit_path_is_read_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, IsoError::ConfigRead(ref reported) if *reported == path);
}

#[test]
fn malformed_json_is_parse_error() {
    let (_temp, path) = write_config(r#"{ "track": "PAR12+CS_37", "#);
    let err = ConfigLoader::resolve(Some(&path)).unwrap_err();
    assert_matches!(err, IsoError::ConfigParse(_));
}

#[test]
fn metallicity_needs_range_or_values() {
    let (_temp, path) = write_config(
        r#"{
            "track": "PAR12+CS_37",
            "photometric_system": "2mass_spitzer",
            "metallicity": { "scale": "z" },
            "age": { "range": [6.6, 7.0, 0.2] }
        }"#,
    );
    let err = ConfigLoader::resolve(Some(&path)).unwrap_err();
    assert_matches!(err, IsoError::InvalidRange(_));
}

#[test]
fn bad_photometric_system_is_rejected() {
    let (_temp, path) = write_config(
        r#"{
            "track": "PAR12+CS_37",
            "photometric_system": "../etc/passwd",
            "metallicity": { "values": [0.0152] },
            "age": { "range": [6.6, 7.0, 0.2] }
        }"#,
    );
    let err = ConfigLoader::resolve(Some(&path)).unwrap_err();
    assert_matches!(err, IsoError::InvalidPhotometricSystem(_));
}

#[test]
fn dot_only_system_cannot_escape_output_dir() {
    let (_temp, path) = write_config(
        r#"{
            "track": "PAR12+CS_37",
            "photometric_system": "..",
            "metallicity": { "values": [0.0001] },
            "age": { "range": [6.6, 7.0, 0.2] }
        }"#,
    );
    let err = ConfigLoader::resolve(Some(&path)).unwrap_err();
    assert_matches!(err, IsoError::InvalidPhotometricSystem(ref value) if value == "..");
}

#[test]
fn tiny_age_step_is_rejected() {
    let (_temp, path) = write_config(
        r#"{
            "track": "PAR12+CS_37",
            "photometric_system": "2mass_spitzer",
            "metallicity": { "values": [0.0001] },
            "age": { "range": [6.6, 10.1, 1e-12] }
        }"#,
    );
    let err = ConfigLoader::resolve(Some(&path)).unwrap_err();
    assert_matches!(err, IsoError::InvalidRange(_));
}
