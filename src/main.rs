use clap::Parser;
use tsigoatd::cli::{Cli, Command};
use tsigoatd::{logging, server};

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Version(args) => {
            println!("{}", tsigoatd::version::build_info(args.short));
        }
        Command::Serve(args) => {
            logging::init_logger(args.log_format, args.log_level);
            let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("failed to start tokio runtime: {e}");
                    std::process::exit(1);
                }
            };
            if let Err(e) = runtime.block_on(server::run(args)) {
                log::error!("fatal: {e}");
                std::process::exit(1);
            }
        }
    }
}
