//! camsnap-web
//!
//! Serves the most recent camera frame to authenticated HTTP clients.

use camsnap_web::WebConfig;
use camsnap_web::config::{DEFAULT_ADDR, DEFAULT_FRAME, DEFAULT_REALM};
use clap::Parser;
use std::path::PathBuf;

/// camsnap-web - view the latest camera frame over HTTP
#[derive(Parser, Debug)]
#[command(name = "camsnap-web")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Location of camera frame
    #[arg(long, default_value = DEFAULT_FRAME)]
    frame: PathBuf,

    /// Webserver listen address
    #[arg(long, default_value = DEFAULT_ADDR)]
    addr: String,

    /// Username required by Basic authentication
    #[arg(long, env = "CAMSNAP_WEB_USER")]
    user: String,

    /// Password required by Basic authentication
    #[arg(long, env = "CAMSNAP_WEB_PASSWORD", hide_env_values = true)]
    password: String,

    /// Realm shown in the browser's login dialog
    #[arg(long, default_value = DEFAULT_REALM)]
    realm: String,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.to_string().into()),
        )
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = WebConfig {
        frame: args.frame,
        addr: args.addr,
        user: args.user,
        password: args.password,
        realm: args.realm,
    };

    if let Err(e) = camsnap_web::run(&config) {
        tracing::error!("Error setting up webserver: {}", e);
        std::process::exit(1);
    }
}
