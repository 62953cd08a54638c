//! Echo server entry point.
//!
//! Usage: `server <port>`

use line_echo::config::ServerConfig;
use line_echo::logging;
use line_echo::server::Server;
use line_echo::Error;
use tracing::{error, info};

/// Exit code for any fatal error.
const EXIT_ERROR: i32 = -1;

fn main() {
    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            fail(e);
        }
    };

    logging::init(&config.log_level);

    info!(
        bind = %config.bind,
        port = config.port,
        echo_mode = ?config.echo_mode,
        nonblocking = config.nonblocking,
        "Starting echo server"
    );

    let result = Server::bind(config).and_then(|server| server.run());
    if let Err(e) = result {
        fail(e);
    }

    info!("Execution finished with no errors");
}

fn fail(e: Error) -> ! {
    error!(error = %logging::error_chain(&e), "server: fatal error");
    std::process::exit(EXIT_ERROR);
}
