//! `vrpc openapi` — Print the OpenAPI document.

use clap::ValueEnum;
use vrpc_core::schema::openapi::DocumentInfo;
use vrpc_core::Registry;

use super::write_output;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Yaml,
}

pub fn render(registry: &Registry, info: &DocumentInfo, format: Format) -> Result<String, String> {
    let doc = registry
        .openapi(info)
        .map_err(|e| format!("Failed to build OpenAPI document: {}", e))?;

    match format {
        Format::Json => serde_json::to_string_pretty(&doc)
            .map_err(|e| format!("Failed to serialize document: {}", e)),
        Format::Yaml => {
            serde_yaml::to_string(&doc).map_err(|e| format!("Failed to serialize document: {}", e))
        }
    }
}

pub fn run(
    registry: &Registry,
    info: &DocumentInfo,
    format: Format,
    output: Option<&str>,
) -> Result<(), String> {
    let content = render(registry, info, format)?;
    write_output(&content, output)
}
