//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level CLI command and works on the
//! registry returned by [`init_registry`].

pub mod call;
pub mod openapi;
pub mod paths;
pub mod serve;
pub mod typescript;

use vrpc_core::Registry;

/// Build the registry of every service this binary exposes.
pub fn init_registry() -> Result<Registry, String> {
    vrpc_hello::registry().map_err(|e| format!("Failed to register services: {}", e))
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

/// Write `content` to `output`, or to stdout when no file is given.
pub fn write_output(content: &str, output: Option<&str>) -> Result<(), String> {
    match output {
        Some(path) => {
            std::fs::write(path, content).map_err(|e| format!("Failed to write {}: {}", path, e))?;
            tracing::info!("Wrote {} bytes to {}", content.len(), path);
            Ok(())
        }
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}
