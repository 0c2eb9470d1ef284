use std::path::PathBuf;

use clap::{App, Arg};

use log::{error, info};

use agora::{new_instance, Config, Error, Result};

fn main() -> Result<()> {
    let matches = App::new("agora")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Community discussion server")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .takes_value(true)
                .help("Config file to use"),
        )
        .get_matches();

    let config_path = matches
        .value_of("config")
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);

    let config = Config::open(&config_path)?;

    agora::logging::init(&config)?;

    info!("Using config file {}", config_path.display());
    config.debug_log();

    let address = format!("{}:{}", config.address, config.port);
    let rocket = new_instance(config)?;

    info!("Listening on {}", address);

    // Only returns if the server couldn't start.
    let err = Error::from(rocket.launch());
    error!("{}", err);

    Err(err)
}
