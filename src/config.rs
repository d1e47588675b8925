use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::{
    AgeScale, Imf, MetallicityScale, PhotometricSystem, PhotometricVersion, Track,
};
use crate::error::IsoError;
use crate::grid::{AgeGrid, MetallicityGrid};
use crate::params::QuerySelection;
use crate::store::DEFAULT_OUTPUT_DIR;

pub const CONFIG_FILE: &str = "cmd-iso.json";
/// Local override that takes precedence and is meant to stay out of VCS.
pub const LOCAL_CONFIG_FILE: &str = "cmd-iso.not_tracked.json";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub compress: bool,
    pub track: String,
    #[serde(default, alias = "rm_label9")]
    pub drop_discarded_stage: bool,
    pub photometric_system: String,
    #[serde(default)]
    pub photometric_version: PhotometricVersion,
    #[serde(default)]
    pub imf: Option<String>,
    pub metallicity: MetallicityEntry,
    pub age: AgeEntry,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub extra_fields: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MetallicityEntry {
    #[serde(default)]
    pub scale: MetallicityScale,
    #[serde(default)]
    pub range: Option<[f64; 3]>,
    /// Explicit list; wins over `range` when both are given.
    #[serde(default)]
    pub values: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AgeEntry {
    #[serde(default)]
    pub scale: AgeScale,
    pub range: [f64; 3],
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub selection: QuerySelection,
    pub metallicities: MetallicityGrid,
    pub drop_discarded_stage: bool,
    pub output_dir: Utf8PathBuf,
    pub timeout: Option<Duration>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, IsoError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => [LOCAL_CONFIG_FILE, CONFIG_FILE]
                .into_iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.is_file())
                .ok_or(IsoError::MissingConfig)?,
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| IsoError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| IsoError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, IsoError> {
        let track: Track = config.track.parse()?;
        let photometric_system: PhotometricSystem = config.photometric_system.parse()?;
        let imf = config
            .imf
            .as_deref()
            .map(str::parse::<Imf>)
            .transpose()?
            .unwrap_or_default();

        let [start, stop, step] = config.age.range;
        let ages = AgeGrid::new(config.age.scale, start, stop, step)?;

        let scale = config.metallicity.scale;
        let metallicities = match (config.metallicity.values, config.metallicity.range) {
            (Some(values), _) => MetallicityGrid::from_values(scale, values)?,
            (None, Some([start, stop, step])) => {
                MetallicityGrid::from_range(scale, start, stop, step)?
            }
            (None, None) => {
                return Err(IsoError::InvalidRange(
                    "metallicity needs either `range` or `values`".to_string(),
                ));
            }
        };

        let output_dir = Utf8PathBuf::from(
            config
                .output_dir
                .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
        );

        Ok(ResolvedConfig {
            selection: QuerySelection {
                track,
                photometric_system,
                photometric_version: config.photometric_version,
                imf,
                compress: config.compress,
                ages,
                extra_fields: config.extra_fields,
            },
            metallicities,
            drop_discarded_stage: config.drop_discarded_stage,
            output_dir,
            timeout: config.timeout_secs.map(Duration::from_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn parse(json: &str) -> Config {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn values_override_range() {
        let config = parse(
            r#"{
                "track": "PAR12+CS_37",
                "photometric_system": "2mass_spitzer",
                "metallicity": { "range": [0.001, 0.004, 0.001], "values": [0.0152] },
                "age": { "range": [6.6, 10.1, 0.05] }
            }"#,
        );
        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.metallicities.len(), 1);
        assert_eq!(resolved.selection.track, Track::Parsec12Colibri37);
        assert_eq!(resolved.selection.imf, Imf::Kroupa);
        assert_eq!(resolved.output_dir, Utf8PathBuf::from("isochrones"));
        assert!(!resolved.drop_discarded_stage);
    }

    #[test]
    fn unknown_track_fails_before_network() {
        let config = parse(
            r#"{
                "track": "PAR99",
                "photometric_system": "2mass_spitzer",
                "metallicity": { "values": [0.0152] },
                "age": { "range": [6.6, 7.0, 0.2] }
            }"#,
        );
        let err = ConfigLoader::resolve_config(config).unwrap_err();
        assert_matches!(err, IsoError::InvalidTrack(_));
    }
}
