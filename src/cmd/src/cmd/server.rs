// SPDX-License-Identifier: GNU GENERAL PUBLIC LICENSE Version 3
//
// Copyleft (c) 2024 James Wong. This file is part of James Wong.
// is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the
// Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// James Wong is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with James Wong.  If not, see <https://www.gnu.org/licenses/>.
//
// IMPORTANT: Any software that fully or partially contains or uses materials
// covered by this license must also be released under the GNU GPL license.
// This includes modifications and derived works.

use crate::APP_NAME;
use anyhow::Context;
use clap::{Arg, Command};
use common_telemetry::init_global_logging;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use torwaf_server::{
    config::config::{self, AppConfig, MIN_UPDATE_INTERVAL_SECS},
    context::state::TorwafState,
    router::build_app_router,
};
use torwaf_utils::tokio_signal::tokio_graceful_shutdown_signal;

pub struct WebServer {}

impl WebServer {
    pub const COMMAND_NAME: &'static str = "serve";

    pub fn build() -> Command {
        Command::new(Self::COMMAND_NAME)
            .about("Run Torwaf exit node filtering Web Server.")
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .action(clap::ArgAction::SetTrue)
                    .help("Verbose output."),
            )
    }

    pub async fn run(config_path: Option<&str>, verbose: bool) -> anyhow::Result<()> {
        let config = config::load_config(config_path).context("Failed to load configuration")?;

        let _guards = init_global_logging(APP_NAME, &config.logging).context("Failed to initialize logging")?;

        Self::print_banner(&config, config_path, verbose);

        let app_state = TorwafState::new(&config)
            .await
            .context("Failed to initialize Tor exit blocking")?;
        let app_router = build_app_router(app_state);

        let bind_addr = config.server.get_bind_addr();
        tracing::info!("Starting web server on {}", bind_addr);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("Failed to bind to {}", bind_addr))?;
        tracing::info!("Web server is ready on {}", bind_addr);

        // Notice: The connect info carries the transport peer address the filter checks.
        axum::serve(listener, app_router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(tokio_graceful_shutdown_signal())
            .await
            .context("Error running web server")?;

        tracing::info!("Web server shut down gracefully");
        Ok(())
    }

    #[allow(clippy::print_stderr)]
    fn print_banner(config: &Arc<AppConfig>, config_path: Option<&str>, verbose: bool) {
        // http://www.network-science.de/ascii/#larry3d,graffiti,basic,drpepper,rounded,roman
        let ascii_name = r#"
 __                                            ___
/\ \__                                       /'___\
\ \ ,_\   ___   _ __  __  __  __     __     /\ \__/
 \ \ \/  / __`\/\`'__\/\ \/\ \/\ \  /'__`\  \ \ ,__\
  \ \ \_/\ \L\ \ \ \/ \ \ \_/ \_/ \/\ \L\.\_ \ \ \_/
   \ \__\ \____/\ \_\  \ \___x___/'\ \__/.\_\ \ \_\
    \/__/\/___/  \/_/   \/__//__/   \/__/\/_/  \/_/  (Torwaf)
 "#;
        eprintln!();
        eprintln!("{}", ascii_name);
        eprintln!("                Package Version: {:?}", env!("CARGO_PKG_VERSION"));
        eprintln!("        Configuration file path: {:?}", config_path.unwrap_or("none"));
        eprintln!(
            "            Web Serve listen on: \"{}://{}:{}\"",
            "http", &config.server.host, config.server.port
        );
        eprintln!("              Exit address list: {:?}", config.torblock.address_list_url);
        eprintln!(
            "                 Update every(s): {} (min {})",
            config.torblock.update_interval_seconds, MIN_UPDATE_INTERVAL_SECS
        );
        if let Some(upstream) = &config.forward.upstream_url {
            eprintln!("            Forward upstream to: {:?}", upstream);
        }
        if verbose {
            let config_json = serde_json::to_string(&config.inner).unwrap_or_default();
            eprintln!("Configuration loaded: {}", config_json);
        }
        eprintln!();
    }
}
