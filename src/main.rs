use clap::Parser;
use colored::Colorize;

use shortener::config::{Cli, StaticConfig};
use shortener::errors::ShortenerError;
use shortener::runtime::modes::run_server;
use shortener::system::logging::init_logging;

#[actix_web::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.generate_config {
        println!("{}", StaticConfig::generate_sample_config());
        return;
    }

    let mut config = match StaticConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "{}",
                ShortenerError::validation(format!("Failed to load configuration: {}", e))
                    .format_colored()
            );
            std::process::exit(1);
        }
    };
    if let Err(e) = cli.apply(&mut config) {
        eprintln!("{}", ShortenerError::validation(e).format_colored());
        std::process::exit(1);
    }

    // guard 必须存活到进程退出，否则文件日志会丢失
    let _log_guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} Failed to initialize logging: {}", "[ERROR]".red().bold(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run_server(&config).await {
        match e.downcast_ref::<ShortenerError>() {
            Some(err) => eprintln!("{}", err.format_colored()),
            None => eprintln!("{} {:#}", "[ERROR]".red().bold(), e),
        }
        std::process::exit(1);
    }
}
