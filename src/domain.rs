use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IsoError;
use crate::grid::mh_to_z;

/// Track sets offered by the CMD form, keyed by the short codes used in config files.
///
/// Each set is the pairing of a PARSEC track family with a COLIBRI TP-AGB
/// extension (or none).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Track {
    Parsec12Colibri37,
    Parsec12Colibri35,
    Parsec12Colibri07,
    Parsec12ColibriPr16,
    Parsec12NoColibri,
}

impl Track {
    pub const ALL: [Track; 5] = [
        Track::Parsec12Colibri37,
        Track::Parsec12Colibri35,
        Track::Parsec12Colibri07,
        Track::Parsec12ColibriPr16,
        Track::Parsec12NoColibri,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Track::Parsec12Colibri37 => "PAR12+CS_37",
            Track::Parsec12Colibri35 => "PAR12+CS_35",
            Track::Parsec12Colibri07 => "PAR12+CS_07",
            Track::Parsec12ColibriPr16 => "PAR12+CPR16",
            Track::Parsec12NoColibri => "PAR12+No",
        }
    }

    pub fn parsec_id(&self) -> &'static str {
        "parsec_CAF09_v1.2S"
    }

    pub fn colibri_id(&self) -> &'static str {
        match self {
            Track::Parsec12Colibri37 => "parsec_CAF09_v1.2S_S_LMC_08_web",
            Track::Parsec12Colibri35 => "parsec_CAF09_v1.2S_S35",
            Track::Parsec12Colibri07 => "parsec_CAF09_v1.2S_S07",
            Track::Parsec12ColibriPr16 => "parsec_CAF09_v1.2S_NOV13",
            Track::Parsec12NoColibri => "no",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Track::Parsec12Colibri37 => "PARSEC v1.2S + COLIBRI S_37",
            Track::Parsec12Colibri35 => "PARSEC v1.2S + COLIBRI S_35",
            Track::Parsec12Colibri07 => "PARSEC v1.2S + COLIBRI S_07",
            Track::Parsec12ColibriPr16 => "PARSEC v1.2S + COLIBRI PR16",
            Track::Parsec12NoColibri => "PARSEC v1.2S + No",
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Track {
    type Err = IsoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Track::ALL
            .into_iter()
            .find(|track| track.code() == trimmed)
            .ok_or_else(|| IsoError::InvalidTrack(value.to_string()))
    }
}

/// Bolometric-correction table version (`photsys_version` on the form).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PhotometricVersion {
    #[serde(rename = "YBC")]
    Ybc,
    #[default]
    #[serde(rename = "YBCnewVega")]
    YbcNewVega,
}

impl PhotometricVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhotometricVersion::Ybc => "YBC",
            PhotometricVersion::YbcNewVega => "YBCnewVega",
        }
    }
}

impl fmt::Display for PhotometricVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub const PHOTSYS_FILE_ROOT: &str = "YBC_tab_mag_odfnew/tab_mag";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhotometricSystem(String);

impl PhotometricSystem {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Table path the form expects in `photsys_file`.
    pub fn file_path(&self) -> String {
        format!("{PHOTSYS_FILE_ROOT}_{}.dat", self.0)
    }

    pub fn dir_name(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for PhotometricSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PhotometricSystem {
    type Err = IsoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let starts_alphanumeric = normalized
            .chars()
            .next()
            .is_some_and(|ch| ch.is_ascii_alphanumeric());
        let is_valid = starts_alphanumeric
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '+' | '-' | '.'));
        if !is_valid {
            return Err(IsoError::InvalidPhotometricSystem(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Imf {
    #[default]
    Kroupa,
    Salpeter,
    ChabrierExponential,
    ChabrierLognormal,
    ChabrierLognormalSalpeter,
}

impl Imf {
    pub fn code(&self) -> &'static str {
        match self {
            Imf::Kroupa => "kroupa",
            Imf::Salpeter => "salpeter",
            Imf::ChabrierExponential => "chab_exp",
            Imf::ChabrierLognormal => "chab_log",
            Imf::ChabrierLognormalSalpeter => "chab_log_sal",
        }
    }

    pub fn file_path(&self) -> &'static str {
        match self {
            Imf::Kroupa => "tab_imf/imf_kroupa_orig.dat",
            Imf::Salpeter => "tab_imf/imf_salpeter.dat",
            Imf::ChabrierExponential => "tab_imf/imf_chabrier_exponential.dat",
            Imf::ChabrierLognormal => "tab_imf/imf_chabrier_lognormal.dat",
            Imf::ChabrierLognormalSalpeter => "tab_imf/imf_chabrier_lognormal_salpeter.dat",
        }
    }
}

impl FromStr for Imf {
    type Err = IsoError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "kroupa" => Ok(Imf::Kroupa),
            "salpeter" => Ok(Imf::Salpeter),
            "chab_exp" => Ok(Imf::ChabrierExponential),
            "chab_log" => Ok(Imf::ChabrierLognormal),
            "chab_log_sal" => Ok(Imf::ChabrierLognormalSalpeter),
            _ => Err(IsoError::InvalidImf(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetallicityScale {
    /// Mass fraction `Z`.
    #[default]
    Z,
    /// `[M/H]`, log abundance relative to solar.
    Mh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeScale {
    /// `log10(t/yr)`.
    #[default]
    Log,
    /// `t` in years.
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metallicity {
    pub scale: MetallicityScale,
    pub value: f64,
}

impl Metallicity {
    pub fn new(scale: MetallicityScale, value: f64) -> Self {
        Self { scale, value }
    }

    pub fn mass_fraction(&self) -> f64 {
        match self.scale {
            MetallicityScale::Z => self.value,
            MetallicityScale::Mh => mh_to_z(self.value),
        }
    }

    /// Output file stem: `Z` with six decimals and `_` for the decimal point.
    pub fn file_stem(&self) -> String {
        format!("{:.6}", self.mass_fraction()).replace('.', "_")
    }
}

impl fmt::Display for Metallicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scale {
            MetallicityScale::Z => write!(f, "z = {}", self.value),
            MetallicityScale::Mh => write!(f, "[M/H] = {}", self.value),
        }
    }
}

/// Identifier of the table the service generated for one submission
/// (`output<digits>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResultToken(String);

impl ResultToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResultToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_track_codes() {
        let track: Track = "PAR12+CS_37".parse().unwrap();
        assert_eq!(track, Track::Parsec12Colibri37);
        assert_eq!(track.colibri_id(), "parsec_CAF09_v1.2S_S_LMC_08_web");

        let err = "PAR11".parse::<Track>().unwrap_err();
        assert_matches!(err, IsoError::InvalidTrack(_));
    }

    #[test]
    fn photometric_system_paths() {
        let system: PhotometricSystem = "2mass_Spitzer".parse().unwrap();
        assert_eq!(
            system.file_path(),
            "YBC_tab_mag_odfnew/tab_mag_2mass_Spitzer.dat"
        );
        assert_eq!(system.dir_name(), "2mass_spitzer");
    }

    #[test]
    fn photometric_system_rejects_paths() {
        let err = "../etc/passwd".parse::<PhotometricSystem>().unwrap_err();
        assert_matches!(err, IsoError::InvalidPhotometricSystem(_));
        for value in ["  ", ".", "..", ".hidden", "-x"] {
            let err = value.parse::<PhotometricSystem>().unwrap_err();
            assert_matches!(err, IsoError::InvalidPhotometricSystem(_));
        }
        assert!("acs_wfc.old".parse::<PhotometricSystem>().is_ok());
    }

    #[test]
    fn metallicity_file_stem() {
        let z = Metallicity::new(MetallicityScale::Z, 0.0001);
        assert_eq!(z.file_stem(), "0_000100");
        let z = Metallicity::new(MetallicityScale::Z, 0.019);
        assert_eq!(z.file_stem(), "0_019000");
    }
}
