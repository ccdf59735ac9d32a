//! JSON and RON serialization of nets; the format follows the file extension.
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use ron::ser::PrettyConfig;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::net::core::Net;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ron error: {0}")]
    Ron(#[from] ron::Error),
    #[error("ron syntax error: {0}")]
    RonSyntax(#[from] ron::error::SpannedError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported net format '{0}', expected .json or .ron")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetFormat {
    Json,
    Ron,
}

impl NetFormat {
    pub fn from_path(path: &Path) -> Result<Self, IoError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "json" => Ok(NetFormat::Json),
            "ron" => Ok(NetFormat::Ron),
            _ => Err(IoError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

pub fn to_json_string<T: Serialize>(value: &T) -> Result<String, IoError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn from_json_str<T: DeserializeOwned>(s: &str) -> Result<T, IoError> {
    Ok(serde_json::from_str(s)?)
}

pub fn to_ron_string<T: Serialize>(value: &T) -> Result<String, IoError> {
    let pretty = PrettyConfig::default().new_line("\n".to_string());
    Ok(ron::ser::to_string_pretty(value, pretty)?)
}

pub fn from_ron_str<T: DeserializeOwned>(s: &str) -> Result<T, IoError> {
    Ok(ron::from_str(s)?)
}

fn read_to_string(path: &Path) -> Result<String, IoError> {
    let mut file = File::open(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

pub fn load_net<P: AsRef<Path>>(path: P) -> Result<Net, IoError> {
    let path = path.as_ref();
    let format = NetFormat::from_path(path)?;
    let content = read_to_string(path)?;
    let net: Net = match format {
        NetFormat::Json => from_json_str(&content)?,
        NetFormat::Ron => from_ron_str(&content)?,
    };
    log::debug!(
        "loaded net '{}' from {}: {} places, {} transitions, {} arcs",
        net.name,
        path.display(),
        net.places_len(),
        net.transitions_len(),
        net.arcs.len()
    );
    Ok(net)
}

pub fn save_net<P: AsRef<Path>>(path: P, net: &Net) -> Result<(), IoError> {
    let path = path.as_ref();
    let content = match NetFormat::from_path(path)? {
        NetFormat::Json => to_json_string(net)?,
        NetFormat::Ron => to_ron_string(net)?,
    };
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
