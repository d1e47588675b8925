use std::collections::BTreeMap;

use assert_matches::assert_matches;

use cmd_isochrones::domain::{
    AgeScale, Imf, Metallicity, MetallicityScale, PhotometricVersion, Track,
};
use cmd_isochrones::error::IsoError;
use cmd_isochrones::grid::{AgeGrid, mh_to_z, z_to_mh};
use cmd_isochrones::params::{QuerySelection, default_template, resolve_parameters};

fn selection(extra_fields: BTreeMap<String, String>) -> QuerySelection {
    QuerySelection {
        track: Track::Parsec12NoColibri,
        photometric_system: "ubvrijhk".parse().unwrap(),
        photometric_version: PhotometricVersion::Ybc,
        imf: Imf::Kroupa,
        compress: false,
        ages: AgeGrid::new(AgeScale::Log, 6.6, 10.1, 0.05).unwrap(),
        extra_fields,
    }
}

#[test]
fn selection_maps_to_form_fields() {
    let params = resolve_parameters(
        &selection(BTreeMap::new()),
        Metallicity::new(MetallicityScale::Z, 0.0152),
    )
    .unwrap();

    assert_eq!(params.get("track_parsec"), Some("parsec_CAF09_v1.2S"));
    assert_eq!(params.get("track_colibri"), Some("no"));
    assert_eq!(
        params.get("photsys_file"),
        Some("YBC_tab_mag_odfnew/tab_mag_ubvrijhk.dat")
    );
    assert_eq!(params.get("photsys_version"), Some("YBC"));
    assert_eq!(params.get("imf_file"), Some("tab_imf/imf_kroupa_orig.dat"));
    assert_eq!(params.get("output_gzip"), Some("0"));
    assert_eq!(params.get("isoc_isagelog"), Some("1"));
    assert_eq!(params.get("isoc_lagelow"), Some("6.6"));
    assert_eq!(params.get("isoc_lageupp"), Some("10.1"));
    assert_eq!(params.get("isoc_dlage"), Some("0.05"));
    assert_eq!(params.get("isoc_ismetlog"), Some("0"));
    assert_eq!(params.get("isoc_zlow"), Some("0.0152"));
    assert!(!params.contains("isoc_metlow"));
    assert!(!params.contains("isoc_agelow"));
    assert_eq!(params.get("submit_form"), Some("Submit"));
}

#[test]
fn extra_fields_are_merged() {
    let extra = BTreeMap::from([("extinction_av".to_string(), "0.5".to_string())]);
    let params = resolve_parameters(
        &selection(extra),
        Metallicity::new(MetallicityScale::Z, 0.0152),
    )
    .unwrap();
    assert_eq!(params.get("extinction_av"), Some("0.5"));
    assert!(!default_template().contains("extinction_av"));
}

#[test]
fn reserved_extra_field_is_rejected() {
    let extra = BTreeMap::from([("isoc_zlow".to_string(), "0.02".to_string())]);
    let err = resolve_parameters(
        &selection(extra),
        Metallicity::new(MetallicityScale::Z, 0.0152),
    )
    .unwrap_err();
    assert_matches!(err, IsoError::InvalidField(ref message) if message.starts_with("isoc_zlow"));
}

#[test]
fn solar_mh_converts_to_mass_fraction() {
    let a = 0.0207;
    let expected = (1.0 - 0.2485) * a / (1.0 + 2.78 * a);
    assert!((mh_to_z(0.0) - expected).abs() < 1e-12);
    assert!((z_to_mh(mh_to_z(-1.25)) + 1.25).abs() < 1e-9);

    let solar = Metallicity::new(MetallicityScale::Mh, 0.0);
    assert_eq!(solar.file_stem(), "0_014710");
}
