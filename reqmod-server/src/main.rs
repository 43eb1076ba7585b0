use clap::Parser;
use reqmod_server::{logging, LoggingConfig, RuleServer, ServerConfig};
use reqmod_core::{DispatchConfig, FailurePolicy};

/// Reqmod Rule Server - Stores modification rules and evaluates requests against them
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// HTTP API port for rule management and evaluation
    #[arg(long, default_value_t = 7800)]
    http_port: u16,

    /// Database connection URL
    #[arg(long, default_value = "sqlite:./reqmod.db")]
    database_url: String,

    /// Keep dispatching when the store or block list fails
    #[arg(long, default_value_t = false)]
    fail_open: bool,

    /// Evaluate pre-send passes for cached and closing documents too
    #[arg(long, default_value_t = false)]
    ignore_document_lifecycle: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if !logging::levels::is_valid_level(&args.log_level) {
        eprintln!(
            "Invalid log level '{}', expected one of: {}",
            args.log_level,
            logging::levels::valid_levels().join(", ")
        );
        std::process::exit(1);
    }

    let logging_config = LoggingConfig {
        level: args.log_level.clone(),
        ..Default::default()
    };
    logging::init_logging(&logging_config)?;

    let config = ServerConfig {
        http_port: args.http_port,
        database_url: args.database_url.clone(),
        dispatch: DispatchConfig {
            failure_policy: if args.fail_open {
                FailurePolicy::FailOpen
            } else {
                FailurePolicy::FailClosed
            },
            honor_document_lifecycle: !args.ignore_document_lifecycle,
        },
        logging: logging_config,
    };

    let server = RuleServer::new(config);

    println!("🚀 Rule server starting...");
    println!(
        "🌐 HTTP API will be available at: http://127.0.0.1:{}",
        args.http_port
    );
    println!("💾 Database: {}", args.database_url);
    println!();
    println!("💡 Tip: Use --help to see all available options");
    println!();

    server.start().await?;

    Ok(())
}
