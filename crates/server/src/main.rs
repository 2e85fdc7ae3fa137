use clap::Parser;
use tabwright::config::{Cli, ServerConfig};
use tabwright::{logging, server};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let config = match ServerConfig::from_cli(&cli) {
		Ok(config) => config,
		Err(message) => {
			eprintln!("error: {message}");
			std::process::exit(2);
		}
	};

	if let Err(err) = server::run(config).await {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}
