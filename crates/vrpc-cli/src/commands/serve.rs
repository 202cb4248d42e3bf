//! `vrpc serve` — Start the HTTP server.

use vrpc_server::ServerConfig;

use super::init_registry;

pub async fn run(config: ServerConfig) -> Result<(), String> {
    let registry = init_registry()?;

    println!("Starting vrpc server on {}:{}...", config.host, config.port);

    let docs = [
        ("OpenAPI document", config.openapi_path.clone()),
        ("TypeScript client", config.typescript_path.clone()),
    ];
    let addr = vrpc_server::start_server(config, registry).await?;
    println!("vrpc server listening on http://{}", addr);
    for (what, path) in docs {
        if let Some(path) = path {
            println!("  {}: http://{}{}", what, addr, path);
        }
    }

    // Keep the process running until interrupted
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("Failed to listen for Ctrl+C: {}", e))?;

    println!("\nShutting down...");
    Ok(())
}
