use clap::Parser;
use log::LevelFilter;

use seltrack_core::runtime::{self, Cli};

fn main() {
    let cli = Cli::parse();

    match runtime::resolve_config(&cli) {
        Ok(cfg) => {
            if let Err(error) = seltrack_core::logging::init(&cfg.logs_dir(), LevelFilter::Info) {
                eprintln!("[seltrack] logging disabled: {error}");
            }
        }
        Err(error) => {
            eprintln!("[seltrack] {error}");
            std::process::exit(2);
        }
    }

    let stdout = std::io::stdout();
    if let Err(error) = runtime::run(cli, &mut stdout.lock()) {
        log::error!("command failed: {error}");
        eprintln!("[seltrack] {error}");
        std::process::exit(1);
    }
}
