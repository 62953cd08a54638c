//! Interactive client entry point.
//!
//! Usage: `client <host name or IP> <port>`

use line_echo::client;
use line_echo::config::ClientConfig;
use line_echo::logging;
use line_echo::Error;
use tracing::{error, info};

/// Exit code for any fatal error.
const EXIT_ERROR: i32 = -1;

fn main() {
    let config = match ClientConfig::load() {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            fail(e);
        }
    };

    logging::init(&config.log_level);

    info!(
        host = %config.host,
        port = config.port,
        await_replies = config.await_replies,
        "Configured to connect to server"
    );

    match client::run(&config) {
        Ok(_) => info!("Exited normally"),
        Err(e) => fail(e),
    }
}

fn fail(e: Error) -> ! {
    error!(error = %logging::error_chain(&e), "client: fatal error");
    std::process::exit(EXIT_ERROR);
}
