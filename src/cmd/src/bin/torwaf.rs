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

use torwaf_cmd::{build_cli, cmd::server::WebServer};

#[allow(clippy::print_stderr)]
#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some((WebServer::COMMAND_NAME, sub_matches)) => {
            let config_path = sub_matches.get_one::<String>("config").map(String::as_str);
            let verbose = sub_matches.get_flag("verbose");
            WebServer::run(config_path, verbose).await?;
        }
        Some((name, _)) => {
            eprintln!("Invalid subcommand: {}", name);
            std::process::exit(1);
        }
        None => {
            eprintln!("Use <command> --help for more information about a specific command.");
        }
    }

    Ok(())
}
