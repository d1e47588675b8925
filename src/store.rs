use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::{Metallicity, PhotometricSystem};
use crate::error::IsoError;

pub const DEFAULT_OUTPUT_DIR: &str = "isochrones";
pub const SIDECAR_FILE: &str = "filterslambdas.dat";

/// Output layout: `<root>/<system, lower-cased>/<Z>.dat` plus one side-car
/// per system directory.
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: Utf8PathBuf,
}

impl OutputStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn system_dir(&self, system: &PhotometricSystem) -> Utf8PathBuf {
        self.root.join(system.dir_name())
    }

    pub fn isochrone_path(
        &self,
        system: &PhotometricSystem,
        metallicity: &Metallicity,
    ) -> Utf8PathBuf {
        self.system_dir(system)
            .join(format!("{}.dat", metallicity.file_stem()))
    }

    pub fn sidecar_path(&self, system: &PhotometricSystem) -> Utf8PathBuf {
        self.system_dir(system).join(SIDECAR_FILE)
    }

    pub fn ensure_system_dir(&self, system: &PhotometricSystem) -> Result<Utf8PathBuf, IsoError> {
        let dir = self.system_dir(system);
        fs::create_dir_all(dir.as_std_path())
            .map_err(|err| IsoError::Filesystem(format!("create {dir}: {err}")))?;
        Ok(dir)
    }

    /// Writes through a temp file in the same directory, then renames it
    /// over `path`.
    pub fn write_text_atomic(path: &Utf8Path, content: &str) -> Result<(), IsoError> {
        let parent = path
            .parent()
            .ok_or_else(|| IsoError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| IsoError::Filesystem(err.to_string()))?;
        let mut temp = tempfile::Builder::new()
            .prefix("cmd-iso")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| IsoError::Filesystem(err.to_string()))?;
        temp.write_all(content.as_bytes())
            .map_err(|err| IsoError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| IsoError::Filesystem(format!("write {path}: {err}")))?;
        Ok(())
    }
}
