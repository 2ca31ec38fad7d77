use clap::{Parser, Subcommand};
use relayway_core::cli;
use relayway_core::cli::fetch::FetchArgs;
use relayway_core::logging::{self, LogMode, init_logging};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "relayway",
    version,
    about = "Relayway: multi-endpoint resilient request router"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Configuration tooling
    Conf {
        #[command(subcommand)]
        cmd: cli::conf::ConfCmd,
    },

    /// Probe the configured discovery candidates once and print the result
    Discover {
        /// Path to config directory or relayway.hcl
        #[arg(default_value = "config")]
        path: PathBuf,
    },

    /// Send GET requests through the router
    Fetch {
        /// Path to config directory or relayway.hcl
        #[arg(default_value = "config")]
        path: PathBuf,

        /// Path appended to each endpoint's URL
        #[arg(long, default_value = "/")]
        target: String,

        #[arg(long, default_value_t = 1)]
        count: usize,

        #[arg(long, default_value_t = 0)]
        priority: i32,

        /// Submit all requests at once instead of one after another
        #[arg(long)]
        parallel: bool,

        #[arg(long, conflicts_with = "raw")]
        pretty: bool,

        #[arg(long)]
        raw: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Conf { cmd } => {
            if let Err(e) = cli::conf::run(cmd) {
                eprintln!("conf error: {e:#}");
                std::process::exit(1);
            }
        }

        Command::Discover { path } => {
            init_logging();

            if let Err(e) = block_on(cli::discover::discover(path)) {
                eprintln!("discover error: {e:#}");
                std::process::exit(1);
            }
        }

        Command::Fetch {
            path,
            target,
            count,
            priority,
            parallel,
            pretty,
            raw,
        } => {
            init_logging();

            let mode = if raw {
                LogMode::Raw
            } else if pretty {
                LogMode::Pretty
            } else {
                logging::default_log_mode()
            };

            let args = FetchArgs {
                path,
                target,
                count,
                priority,
                parallel,
                mode,
            };

            if let Err(e) = block_on(cli::fetch::fetch(args)) {
                eprintln!("fetch error: {e:#}");
                std::process::exit(1);
            }
        }
    }
}

fn block_on<F: Future<Output = anyhow::Result<()>>>(fut: F) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(fut)
}
