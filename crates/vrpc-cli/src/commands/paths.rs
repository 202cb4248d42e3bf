//! `vrpc paths` — List registered method paths.

use vrpc_core::Registry;

/// One line per method: path, then its declared error codes.
pub fn render(registry: &Registry) -> Vec<String> {
    registry
        .descriptors()
        .iter()
        .map(|m| {
            if m.errors().is_empty() {
                m.path().to_string()
            } else {
                let codes: Vec<_> = m.errors().keys().map(String::as_str).collect();
                format!("{}  [{}]", m.path(), codes.join(", "))
            }
        })
        .collect()
}

pub fn run(registry: &Registry) -> Result<(), String> {
    for line in render(registry) {
        println!("{}", line);
    }
    Ok(())
}
