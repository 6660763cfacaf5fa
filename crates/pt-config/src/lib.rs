//! pt-config: car configuration file format and validation.

pub mod schema;
pub mod validate;

pub use schema::*;
pub use validate::{ValidationError, validate_car_file};

use std::path::Path;
use tracing::debug;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Simulation error: {0}")]
    Sim(#[from] pt_sim::SimError),
}

pub fn load_yaml(path: &Path) -> ConfigResult<CarFile> {
    let content = std::fs::read_to_string(path)?;
    let file: CarFile = serde_yaml::from_str(&content)?;
    validate_car_file(&file)?;
    debug!(path = %path.display(), name = %file.name, "loaded car file");
    Ok(file)
}

pub fn save_yaml(path: &Path, file: &CarFile) -> ConfigResult<()> {
    let content = to_yaml_string(file)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn to_yaml_string(file: &CarFile) -> ConfigResult<String> {
    validate_car_file(file)?;
    Ok(serde_yaml::to_string(file)?)
}

pub fn load_json(path: &Path) -> ConfigResult<CarFile> {
    let content = std::fs::read_to_string(path)?;
    let file: CarFile = serde_json::from_str(&content)?;
    validate_car_file(&file)?;
    debug!(path = %path.display(), name = %file.name, "loaded car file");
    Ok(file)
}

pub fn save_json(path: &Path, file: &CarFile) -> ConfigResult<()> {
    validate_car_file(file)?;
    let content = serde_json::to_string_pretty(file)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load a car file, choosing the format from the extension.
/// `.json` is read as JSON, anything else as YAML.
pub fn load(path: &Path) -> ConfigResult<CarFile> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => load_json(path),
        _ => load_yaml(path),
    }
}

/// Build a car and matching run options from a car file.
pub fn build(file: &CarFile) -> ConfigResult<(pt_sim::Car, pt_sim::SimOptions)> {
    let car = pt_sim::Car::new(&file.car, file.run.dt_s)?;
    Ok((car, file.run.sim_options()))
}
