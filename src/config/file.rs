//! Reading and writing the solarscan TOML file.

use crate::config::Config;
use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::path::Path;

/// Leading comment block of a written config file.
const HEADER: &str = "\
# solarscan configuration
# The imagery API key is never stored here; set SOLAR_API_KEY instead.

";

/// Load settings from `path`, or defaults when the file is absent.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Config::default()),
        Err(e) => {
            return Err(Error::ConfigRead {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    toml::from_str(&contents).map_err(|e| Error::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Render settings as the TOML written by `config init` and shown by `config show`.
pub fn render_config(config: &Config) -> Result<String> {
    let body = toml::to_string_pretty(config).map_err(|e| Error::ConfigSerialize { source: e })?;
    Ok(format!("{HEADER}{body}"))
}

/// Write settings to `path`, creating missing parent directories.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let write_error = |source| Error::ConfigWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::write(path, render_config(config)?).map_err(write_error)
}
