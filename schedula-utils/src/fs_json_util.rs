use std::{fmt::Debug, path::Path};

use anyhow::Context;
use serde::de::DeserializeOwned;

fn read_with<T, E>(
    path: &Path,
    format: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> anyhow::Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let text = fs_err::read_to_string(path)?;
    parse(&text).with_context(|| {
        format!(
            "While trying to parse {path:?} as {format} {}",
            std::any::type_name::<T>()
        )
    })
}

/// Reads a JSON file, e.g. the credentials file.
pub fn read_json<P: AsRef<Path> + Debug, T: DeserializeOwned>(path: P) -> anyhow::Result<T> {
    read_with(path.as_ref(), "JSON", |text| serde_json::from_str(text))
}

/// Reads a TOML file, e.g. the tool configuration.
pub fn read_toml<P: AsRef<Path> + Debug, T: DeserializeOwned>(path: P) -> anyhow::Result<T> {
    read_with(path.as_ref(), "TOML", |text| toml::from_str(text))
}
