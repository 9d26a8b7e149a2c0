use crate::demo::demo_routes;
use crate::dispatcher::Dispatcher;
use crate::middleware::CorsPolicy;
use crate::router::RouteTable;
use crate::runtime_config::RuntimeConfig;
use crate::server::{AppService, HttpServer};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use tracing::info;

/// Command-line interface for the restroute demo service
#[derive(Parser, Debug)]
#[command(name = "restroute", version)]
#[command(about = "Template-based HTTP router demo service", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Serve the demo routes over HTTP
    Serve {
        /// Address and port to bind (default from FUNCTIONS_CUSTOMHANDLER_PORT
        /// and RESTROUTE_BIND_HOST)
        #[arg(long)]
        addr: Option<String>,

        /// Do not wrap the service in the allow-all CORS policy
        #[arg(long, default_value_t = false)]
        no_cors: bool,

        /// Coroutine stack size, decimal or 0x hex
        #[arg(long, env = "RESTROUTE_STACK_SIZE", value_parser = parse_stack_size)]
        stack_size: Option<usize>,
    },
    /// Print the demo route table in resolution order
    Routes,
}

fn parse_stack_size(value: &str) -> Result<usize, String> {
    crate::runtime_config::parse_size(value)
        .ok_or_else(|| format!("'{value}' is not a decimal or 0x-prefixed size"))
}

/// Write one line per (method, declared path) binding, in resolution order.
///
/// # Errors
///
/// Propagates write failures.
pub fn write_routes(routes: &RouteTable, out: &mut impl Write) -> io::Result<()> {
    for route in routes.routes() {
        for method in route.methods() {
            writeln!(
                out,
                "{:<8} {:<64} {}",
                method.as_str(),
                route.raw_pattern(),
                route.template().template()
            )?;
        }
    }
    Ok(())
}

fn serve(config: RuntimeConfig, addr: Option<String>, cors: bool) -> Result<()> {
    may::config().set_stack_size(config.stack_size);

    let routes = demo_routes().context("Failed to register demo routes")?;
    routes.dump_routes();
    let dispatcher = Dispatcher::with_config(routes, config.normalize_config());
    let mut service = AppService::new(dispatcher);
    if cors {
        service = service.with_cors(CorsPolicy::allow_all());
    }

    let addr = addr.unwrap_or_else(|| config.listen_addr());
    info!(
        addr = %addr,
        cors = cors,
        stack_size = config.stack_size,
        "Starting server"
    );
    let handle = HttpServer(service)
        .start(addr.as_str())
        .with_context(|| format!("Failed to bind {addr}"))?;
    handle
        .join()
        .map_err(|e| anyhow!("Server coroutine panicked: {e:?}"))
}

/// Run the parsed command.
///
/// # Errors
///
/// Startup failures: route registration, binding the listener, or a
/// panicked server coroutine.
pub fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve {
            addr,
            no_cors,
            stack_size,
        } => {
            let mut config = RuntimeConfig::from_env();
            if let Some(stack_size) = stack_size {
                config.stack_size = stack_size;
            }
            let cors = config.cors && !no_cors;
            serve(config, addr, cors)
        }
        Commands::Routes => {
            let routes = demo_routes().context("Failed to register demo routes")?;
            let stdout = io::stdout();
            write_routes(&routes, &mut stdout.lock()).context("Failed to write routes")
        }
    }
}
