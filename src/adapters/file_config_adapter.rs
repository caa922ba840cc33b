//! INI configuration read with `configparser`.

use std::path::Path;

use configparser::ini::Ini;

use crate::domain::error::DashError;
use crate::ports::config_port::ConfigPort;

#[derive(Debug)]
pub struct FileConfigAdapter {
    ini: Ini,
}

impl FileConfigAdapter {
    /// Load `path`. A missing or unreadable file is a `ConfigParse` error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DashError> {
        let path = path.as_ref();
        let mut ini = Ini::new();
        ini.load(path).map_err(|reason| DashError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { ini })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut ini = Ini::new();
        ini.read(content.to_string())?;
        Ok(Self { ini })
    }

    /// No sections; every lookup falls back to its default.
    pub fn empty() -> Self {
        Self { ini: Ini::new() }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.ini.get(section, key)
    }

    /// Non-numeric values read as unset.
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        match self.ini.getint(section, key) {
            Ok(Some(v)) => v,
            _ => default,
        }
    }
}
