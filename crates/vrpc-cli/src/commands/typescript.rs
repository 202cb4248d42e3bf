//! `vrpc typescript` — Print the TypeScript client.

use vrpc_core::Registry;

use super::write_output;

pub fn run(registry: &Registry, output: Option<&str>) -> Result<(), String> {
    let code = registry
        .typescript()
        .map_err(|e| format!("Failed to build TypeScript client: {}", e))?;
    write_output(&code, output)
}
