use crate::error::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Runtime configuration. Every field has a default, so the bot runs with
/// no config file at all; a JSON file overrides individual fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote path of the student tuition ledger.
    pub students_ledger: String,
    /// Remote path of the id → PIN ledger.
    pub pins_ledger: String,
    /// JSON file holding the guardian → students map.
    pub guardians_file: PathBuf,
    /// Local cache directory; defaults to a subdirectory of the system
    /// temp dir.
    pub cache_dir: Option<PathBuf>,
    pub school: SchoolInfo,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            students_ledger: "/datos_estudiantes.csv".to_string(),
            pins_ledger: "/relaciones.csv".to_string(),
            guardians_file: PathBuf::from("encargados.json"),
            cache_dir: None,
            school: SchoolInfo::default(),
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read(path)?;
                Ok(serde_json::from_slice(&raw)?)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("cuotabot_cache"))
    }
}

/// School contact details shown by the informational menu options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchoolInfo {
    pub nombre: String,
    pub direccion: String,
    pub telefono: String,
    pub email: String,
    pub horario: String,
    pub sitio_web: String,
}

impl Default for SchoolInfo {
    fn default() -> Self {
        Self {
            nombre: "Instituto Jose Cecilio Del Valle".to_string(),
            direccion: "Colonia Altos De Loarque ,al final de la calle".to_string(),
            telefono: "+504 2275-8510".to_string(),
            email: "info@centroejemplo.edu.hn".to_string(),
            horario: "Lunes a Viernes: 7:00 AM - 4:00 PM".to_string(),
            sitio_web: "www.JoseCecilio.edu.hn".to_string(),
        }
    }
}
