use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::domain::{
    AgeScale, Imf, Metallicity, MetallicityScale, PhotometricSystem, PhotometricVersion, Track,
};
use crate::error::IsoError;
use crate::grid::AgeGrid;

/// Text fields posted to the CMD form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters {
    fields: BTreeMap<String, String>,
}

impl QueryParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Checks every field the form declares as required for the active
    /// age and metallicity representations.
    pub fn validate(&self) -> Result<(), IsoError> {
        let age_fields = match self.get("isoc_isagelog") {
            Some("1") => LOG_AGE_FIELDS,
            Some("0") => LINEAR_AGE_FIELDS,
            _ => {
                return Err(IsoError::InvalidField(
                    "isoc_isagelog must be 0 or 1".to_string(),
                ));
            }
        };
        let metal_fields = match self.get("isoc_ismetlog") {
            Some("0") => Z_FIELDS,
            Some("1") => MH_FIELDS,
            _ => {
                return Err(IsoError::InvalidField(
                    "isoc_ismetlog must be 0 or 1".to_string(),
                ));
            }
        };
        let missing = REQUIRED_FIELDS
            .iter()
            .chain(age_fields)
            .chain(metal_fields)
            .find(|name| !self.contains(name));
        if let Some(name) = missing {
            return Err(IsoError::InvalidField(format!(
                "required field {name} is missing"
            )));
        }
        Ok(())
    }
}

const REQUIRED_FIELDS: &[&str] = &[
    "submit_form",
    "track_parsec",
    "track_colibri",
    "track_postagb",
    "photsys_file",
    "photsys_version",
    "dust_sourceM",
    "dust_sourceC",
    "extinction_coeff",
    "extinction_curve",
    "kind_LPV",
    "imf_file",
    "isoc_isagelog",
    "isoc_ismetlog",
    "output_kind",
    "output_gzip",
];

const LOG_AGE_FIELDS: &[&str] = &["isoc_lagelow", "isoc_lageupp", "isoc_dlage"];
const LINEAR_AGE_FIELDS: &[&str] = &["isoc_agelow", "isoc_ageupp", "isoc_dage"];
const Z_FIELDS: &[&str] = &["isoc_zlow"];
const MH_FIELDS: &[&str] = &["isoc_metlow"];

/// Fields written by the resolver. Extra fields may not use these names.
pub const RESERVED_FIELDS: &[&str] = &[
    "submit_form",
    "track_parsec",
    "track_colibri",
    "photsys_file",
    "photsys_version",
    "imf_file",
    "output_gzip",
    "isoc_isagelog",
    "isoc_ismetlog",
    "isoc_lagelow",
    "isoc_lageupp",
    "isoc_dlage",
    "isoc_agelow",
    "isoc_ageupp",
    "isoc_dage",
    "isoc_zlow",
    "isoc_metlow",
];

/// Defaults of the CMD 3.x form: every input that is pre-checked when the
/// page loads.
pub fn default_template() -> &'static QueryParameters {
    static TEMPLATE: OnceLock<QueryParameters> = OnceLock::new();
    TEMPLATE.get_or_init(|| {
        let mut params = QueryParameters::new();
        for (name, value) in [
            ("submit_form", "Submit"),
            ("track_parsec", "parsec_CAF09_v1.2S"),
            ("track_colibri", "no"),
            ("track_postagb", "no"),
            ("photsys_version", "YBCnewVega"),
            ("dust_sourceM", "dpmod60alox40"),
            ("dust_sourceC", "AMCSIC15"),
            ("extinction_coeff", "constant"),
            ("extinction_curve", "cardelli"),
            ("kind_LPV", "1"),
            ("isoc_isagelog", "1"),
            ("isoc_ismetlog", "0"),
            ("output_kind", "0"),
            ("output_gzip", "0"),
            ("imf_file", "tab_imf/imf_kroupa_orig.dat"),
        ] {
            params.set(name, value);
        }
        params
    })
}

/// Batch-wide choices that are the same for every metallicity.
#[derive(Debug, Clone)]
pub struct QuerySelection {
    pub track: Track,
    pub photometric_system: PhotometricSystem,
    pub photometric_version: PhotometricVersion,
    pub imf: Imf,
    pub compress: bool,
    pub ages: AgeGrid,
    pub extra_fields: BTreeMap<String, String>,
}

pub fn resolve_parameters(
    selection: &QuerySelection,
    metallicity: Metallicity,
) -> Result<QueryParameters, IsoError> {
    resolve_with_template(default_template(), selection, metallicity)
}

/// Copies `template` and applies the selection on the copy.
pub fn resolve_with_template(
    template: &QueryParameters,
    selection: &QuerySelection,
    metallicity: Metallicity,
) -> Result<QueryParameters, IsoError> {
    let mut params = template.clone();

    params.set("track_parsec", selection.track.parsec_id());
    params.set("track_colibri", selection.track.colibri_id());
    params.set("photsys_file", selection.photometric_system.file_path());
    params.set("photsys_version", selection.photometric_version.as_str());
    params.set("imf_file", selection.imf.file_path());
    params.set("output_gzip", if selection.compress { "1" } else { "0" });

    let (start, stop, step) = selection.ages.bounds();
    let (flag, active, inactive) = match selection.ages.scale() {
        AgeScale::Log => ("1", LOG_AGE_FIELDS, LINEAR_AGE_FIELDS),
        AgeScale::Linear => ("0", LINEAR_AGE_FIELDS, LOG_AGE_FIELDS),
    };
    params.set("isoc_isagelog", flag);
    for (name, value) in active.iter().zip([start, stop, step]) {
        params.set(name, format_number(value));
    }
    for name in inactive {
        params.remove(name);
    }

    match metallicity.scale {
        MetallicityScale::Z => {
            params.set("isoc_ismetlog", "0");
            params.set("isoc_zlow", format_number(metallicity.value));
            params.remove("isoc_metlow");
        }
        MetallicityScale::Mh => {
            params.set("isoc_ismetlog", "1");
            params.set("isoc_metlow", format_number(metallicity.value));
            params.remove("isoc_zlow");
        }
    }

    for (name, value) in &selection.extra_fields {
        let name = name.trim();
        if name.is_empty() {
            return Err(IsoError::InvalidField("empty field name".to_string()));
        }
        if RESERVED_FIELDS.contains(&name) {
            return Err(IsoError::InvalidField(format!(
                "{name} is set from the track/system/age/metallicity selection"
            )));
        }
        params.set(name, value.as_str());
    }

    params.validate()?;
    Ok(params)
}

pub fn format_number(value: f64) -> String {
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn selection(scale: AgeScale) -> QuerySelection {
        QuerySelection {
            track: Track::Parsec12Colibri35,
            photometric_system: "gaiaEDR3".parse().unwrap(),
            photometric_version: PhotometricVersion::YbcNewVega,
            imf: Imf::Kroupa,
            compress: true,
            ages: match scale {
                AgeScale::Log => AgeGrid::new(AgeScale::Log, 6.6, 7.0, 0.2).unwrap(),
                AgeScale::Linear => AgeGrid::new(AgeScale::Linear, 1e9, 2e9, 5e8).unwrap(),
            },
            extra_fields: BTreeMap::new(),
        }
    }

    #[test]
    fn template_is_untouched() {
        let params = resolve_parameters(
            &selection(AgeScale::Log),
            Metallicity::new(MetallicityScale::Z, 0.0001),
        )
        .unwrap();
        assert_eq!(params.get("track_colibri"), Some("parsec_CAF09_v1.2S_S35"));
        assert_eq!(default_template().get("track_colibri"), Some("no"));
        assert!(!default_template().contains("isoc_zlow"));
    }

    #[test]
    fn linear_ages_drop_log_fields() {
        let params = resolve_parameters(
            &selection(AgeScale::Linear),
            Metallicity::new(MetallicityScale::Mh, -0.5),
        )
        .unwrap();
        assert_eq!(params.get("isoc_isagelog"), Some("0"));
        assert_eq!(params.get("isoc_agelow"), Some("1000000000"));
        assert!(!params.contains("isoc_lagelow"));
        assert_eq!(params.get("isoc_ismetlog"), Some("1"));
        assert_eq!(params.get("isoc_metlow"), Some("-0.5"));
        assert!(!params.contains("isoc_zlow"));
    }

    #[test]
    fn validate_reports_missing_field() {
        let mut params = default_template().clone();
        params.remove("dust_sourceC");
        let err = params.validate().unwrap_err();
        assert_matches!(err, IsoError::InvalidField(_));
    }
}
