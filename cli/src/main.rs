// This file is part of regiond, a daemon which arbitrates exclusive access to reconfigurable FPGA regions and sequences their gating interfaces.
//
// Copyright 2025 Canonical Ltd.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// regiond is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// regiond is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

use clap::{Parser, Subcommand, arg, command};
use log::debug;

mod program;
mod proxies;
mod status;

#[derive(Parser, Debug)]
#[command(name = "region")]
#[command(bin_name = "region")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Program a region with a bitstream, quiescing its gating interfaces
    Program {
        #[arg(long = "region", help = "registry name of the region to program")]
        region: String,
        #[arg(
            long = "firmware",
            help = "bitstream path, relative to the firmware search prefix"
        )]
        firmware: String,
        #[arg(
            long = "interfaces",
            default_value = "",
            help = r#"comma-separated gating interface names, in enable order.
Empty means the region's own gating set as declared in the daemon config.
        "#
        )]
        interfaces: String,
    },
    /// Release the gating interfaces held since a successful program
    Release {
        #[arg(long = "region", help = "registry name of the region to release")]
        region: String,
    },
    /// Show registered regions and interfaces
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();
    debug!("parsed cli command with {cli:?}");
    match cli.command {
        Commands::Program {
            region,
            firmware,
            interfaces,
        } => {
            let message = program::call_program_region(&region, &firmware, &interfaces).await?;
            println!("{message}");
        }
        Commands::Release { region } => {
            let message = program::call_release_region_interfaces(&region).await?;
            println!("{message}");
        }
        Commands::Status => {
            let message = status::get_full_status_message().await?;
            println!("{message}");
        }
    }
    Ok(())
}
