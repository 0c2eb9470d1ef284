use std::fs::File;
use std::path::PathBuf;

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};

use agora::models::{Connection, Database, NewAccount};
use agora::validators::CreateUser;
use agora::{Config, Error, Result};

fn user_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("username")
        .short("u")
        .long("username")
        .value_name("NAME")
        .takes_value(true)
        .required(true)
        .help("The username of the user")
}

/// Get the value of an argument clap already made sure is there.
fn required<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches.value_of(name).unwrap_or_default()
}

fn find_user(db: &Connection, username: &str) -> Result<agora::models::User> {
    db.user_by_username(username)?.ok_or_else(|| Error::UserNotFound {
        user: username.to_string(),
    })
}

fn main_res() -> Result<()> {
    let matches = App::new("agoractl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Control an agora server")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .takes_value(true)
                .help("Config file to use"),
        )
        .arg(
            Arg::with_name("database-url")
                .short("d")
                .long("database-url")
                .value_name("URL")
                .takes_value(true)
                .help("URL to use to connect to the database"),
        )
        .subcommand(
            SubCommand::with_name("check-config").about("Check configuration file for errors"),
        )
        .subcommand(
            SubCommand::with_name("generate-config")
                .about("Write a configuration file with default values")
                .arg(
                    Arg::with_name("out")
                        .short("o")
                        .long("out")
                        .value_name("FILE")
                        .takes_value(true)
                        .help("Where to write the file, instead of stdout"),
                ),
        )
        .subcommand(
            SubCommand::with_name("add-user")
                .about("Register a new user")
                .arg(user_arg())
                .arg(
                    Arg::with_name("email")
                        .short("e")
                        .long("email")
                        .takes_value(true)
                        .required(true)
                        .help("The e-mail address of the user"),
                )
                .arg(
                    Arg::with_name("pass")
                        .short("p")
                        .long("pass")
                        .takes_value(true)
                        .required(true)
                        .help("The password for the user"),
                ),
        )
        .subcommand(
            SubCommand::with_name("remove-user")
                .about("Remove a user and everything they posted")
                .arg(user_arg()),
        )
        .subcommand(
            SubCommand::with_name("link-account")
                .about("Link an external sign-in account to a user")
                .arg(user_arg())
                .arg(
                    Arg::with_name("provider")
                        .long("provider")
                        .takes_value(true)
                        .required(true)
                        .help("The name of the provider, e.g. google"),
                )
                .arg(
                    Arg::with_name("account-id")
                        .long("account-id")
                        .takes_value(true)
                        .required(true)
                        .help("The ID of the user at the provider"),
                ),
        )
        .subcommand(
            SubCommand::with_name("delete-community")
                .about("Delete a community with all of its posts")
                .arg(
                    Arg::with_name("slug")
                        .required(true)
                        .index(1)
                        .help("The slug of the community"),
                ),
        )
        .subcommand(SubCommand::with_name("purge-sessions").about("Delete expired sessions"))
        .get_matches();

    if let Some(matches) = matches.subcommand_matches("generate-config") {
        match matches.value_of("out") {
            Some(path) => {
                let msg = format!("Couldn't create config file at {}", path);
                let file = File::create(path).map_err(|err| Error::from_io_error(err, msg))?;
                Config::generate(file)?;
                println!("Wrote default configuration to {}", path);
            }
            None => Config::generate(std::io::stdout())?,
        }

        return Ok(());
    }

    let conf_path = matches
        .value_of("config")
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);

    let mut config = Config::open(&conf_path)?;

    if matches.subcommand_matches("check-config").is_some() {
        // The config file has already been parsed at this point.
        config.session_length()?;
        config.log_level()?;

        println!("Configuration: {}", conf_path.display());
        println!("\nThe config file is good.");

        return Ok(());
    }

    if let Some(url) = matches.value_of("database-url") {
        config.database_url = url.to_string();
    }

    let db = Database::open(&config.database_url)?.get()?;

    if let Some(matches) = matches.subcommand_matches("add-user") {
        let pass = required(matches, "pass").to_string();

        let user = db.register_user(&CreateUser {
            username: required(matches, "username").to_string(),
            email: required(matches, "email").to_string(),
            confirm_password: pass.clone(),
            password: pass,
        })?;

        println!("Added user {} ({})", user.username, user.id);
    }

    if let Some(matches) = matches.subcommand_matches("remove-user") {
        let user = find_user(&db, required(matches, "username"))?;

        db.delete_user(user.id)?;

        println!("Removed user {}", user.username);
    }

    if let Some(matches) = matches.subcommand_matches("link-account") {
        let user = find_user(&db, required(matches, "username"))?;

        let account = db.link_account(NewAccount {
            user_id: user.id,
            provider: required(matches, "provider").to_string(),
            provider_account_id: required(matches, "account-id").to_string(),
        })?;

        println!(
            "Linked {} account {} to {}",
            account.provider, account.provider_account_id, user.username
        );

        for account in db.accounts_for_user(user.id)? {
            println!("  - {} {}", account.provider, account.provider_account_id);
        }
    }

    if let Some(matches) = matches.subcommand_matches("delete-community") {
        let slug = required(matches, "slug");

        db.delete_community(slug)?;

        println!("Deleted community {}", slug);
    }

    if matches.subcommand_matches("purge-sessions").is_some() {
        let count = db.delete_expired_sessions()?;

        println!("Deleted {} expired session(s)", count);
    }

    Ok(())
}

fn main() {
    if let Err(err) = main_res() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
