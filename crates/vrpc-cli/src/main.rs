//! vrpc CLI — serve, inspect and call versioned RPC methods.
//!
//! Uses the same registry (vrpc-core) and HTTP bootstrap (vrpc-server) for
//! every subcommand, so `call` behaves exactly like a POST to the server.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use vrpc_cli::commands;
use vrpc_cli::commands::call::FileArg;
use vrpc_cli::commands::openapi::Format;
use vrpc_core::schema::openapi::{DocumentInfo, Server};
use vrpc_server::{CorsConfig, ServerConfig, DEFAULT_MAX_MEMORY};

/// vrpc CLI — versioned HTTP/JSON RPC
#[derive(Parser)]
#[command(name = "vrpc", version, about = "vrpc CLI — versioned HTTP/JSON RPC")]
pub struct Cli {
    /// Buffer limit for multipart file parts; larger parts spill to disk
    #[arg(long, env = "VRPC_MAX_MEMORY", default_value_t = DEFAULT_MAX_MEMORY, global = true)]
    max_memory: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the vrpc HTTP server
    Serve {
        /// Host to bind to
        #[arg(long, env = "VRPC_HOST", default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(long, env = "VRPC_PORT", default_value_t = 8080)]
        port: u16,
        /// Comma-separated allowed CORS origins ("*" for any); CORS is off when unset
        #[arg(long, env = "VRPC_CORS_ORIGINS")]
        cors_origins: Option<String>,
        /// Never gzip responses
        #[arg(long)]
        no_gzip: bool,
        /// Directory for spooled uploads (defaults to the system temp directory)
        #[arg(long, env = "VRPC_SPOOL_DIR")]
        spool_dir: Option<PathBuf>,
        /// Per-request deadline in seconds
        #[arg(long, env = "VRPC_REQUEST_TIMEOUT")]
        request_timeout: Option<u64>,
        /// GET path serving the OpenAPI document
        #[arg(long, default_value = "/openapi.json")]
        openapi_path: String,
        /// GET path serving the TypeScript client
        #[arg(long, default_value = "/api.ts")]
        typescript_path: String,
        /// Do not serve the OpenAPI document or the TypeScript client
        #[arg(long)]
        no_docs: bool,
    },

    /// List registered method paths
    Paths,

    /// Call a method in-process and print its response
    Call {
        /// Method path, e.g. /hello/v1
        path: String,
        /// JSON request body
        #[arg(long, default_value = "{}")]
        body: String,
        /// Upload a file field: <field>=<path> (repeatable)
        #[arg(long = "file")]
        files: Vec<FileArg>,
    },

    /// Print the OpenAPI document
    Openapi {
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
        /// Document title
        #[arg(long)]
        title: Option<String>,
        /// Document version
        #[arg(long)]
        doc_version: Option<String>,
        /// Server URL listed in the document (repeatable)
        #[arg(long = "server")]
        servers: Vec<String>,
    },

    /// Print the TypeScript client
    Typescript {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vrpc_core=warn,vrpc_server=info,vrpc_cli=info".into()),
        )
        .init();

    let result = if let Some(command) = cli.command {
        match command {
            Commands::Serve {
                host,
                port,
                cors_origins,
                no_gzip,
                spool_dir,
                request_timeout,
                openapi_path,
                typescript_path,
                no_docs,
            } => {
                let config = ServerConfig {
                    host,
                    port,
                    max_memory: cli.max_memory,
                    spool_dir,
                    gzip: !no_gzip,
                    request_timeout: request_timeout.map(Duration::from_secs),
                    cors: cors_origins.as_deref().map(CorsConfig::with_origins),
                    openapi_path: (!no_docs).then_some(openapi_path),
                    typescript_path: (!no_docs).then_some(typescript_path),
                    document: DocumentInfo::default(),
                };
                commands::serve::run(config).await
            }

            Commands::Paths => {
                commands::init_registry().and_then(|registry| commands::paths::run(&registry))
            }

            Commands::Call { path, body, files } => match commands::init_registry() {
                Ok(registry) => {
                    commands::call::run(&registry, &path, &body, &files, cli.max_memory).await
                }
                Err(e) => Err(e),
            },

            Commands::Openapi {
                format,
                output,
                title,
                doc_version,
                servers,
            } => {
                let mut info = DocumentInfo::default();
                if let Some(title) = title {
                    info.title = title;
                }
                if let Some(version) = doc_version {
                    info.version = version;
                }
                info.servers = servers
                    .into_iter()
                    .map(|url| Server {
                        url,
                        description: String::new(),
                    })
                    .collect();

                commands::init_registry().and_then(|registry| {
                    commands::openapi::run(&registry, &info, format, output.as_deref())
                })
            }

            Commands::Typescript { output } => commands::init_registry()
                .and_then(|registry| commands::typescript::run(&registry, output.as_deref())),
        }
    } else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help().ok();
        println!();
        Ok(())
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
