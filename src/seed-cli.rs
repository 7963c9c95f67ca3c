//! A CLI tool for filling the question collection from a JSON file.
//! Questions go through the same store as `POST /questions`, so each gets a
//! fresh ID and zeroed tallies.

use std::fs::File;
use std::io::BufReader;

use clap::{Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Root},
};
use rocket::serde::json::serde_json;

use wyr_backend::{
    config::{connect, DbConfig},
    model::{api::question::QuestionSpec, mongodb::ensure_indexes_exist},
    service::{seed_questions, SeedReport},
    store::Stores,
};

const PROGRAM_NAME: &str = "seed-questions";

const ABOUT_TEXT: &str = "Insert \"would you rather\" questions into the database.

Database settings are read from Rocket.toml and ROCKET_* environment
variables, and may be overridden with the options below.

EXIT CODES:
     0: Seeding ran (individual entries may have been skipped).
     1: The file could not be read or the database could not be reached.";

const QUESTIONS_PATH: &str = "QUESTIONS_PATH";
const DB_URI: &str = "db-uri";
const DB_NAME: &str = "db-name";

const QUESTIONS_PATH_HELP: &str = "The path to a JSON array of questions,\n\
each of the form {\"question\", \"optionA\", \"optionB\"}";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .arg(
            Arg::new(QUESTIONS_PATH)
                .help(QUESTIONS_PATH_HELP)
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(DB_URI)
                .long(DB_URI)
                .help("MongoDB connection string")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new(DB_NAME)
                .long(DB_NAME)
                .help("Name of the database to seed")
                .action(ArgAction::Set),
        )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode the questions file.
    Format(String),
    /// Missing or invalid database settings.
    Config(String),
    /// Could not talk to the database.
    Db(String),
}

/// Load the questions to insert.
fn load_questions(path: &str) -> Result<Vec<QuestionSpec>, Error> {
    let file = BufReader::new(File::open(path).map_err(|e| Error::IO(e.to_string()))?);
    serde_json::from_reader(file).map_err(|e| Error::Format(e.to_string()))
}

/// Resolve database settings, letting command line options win over the figment.
fn db_config(args: &ArgMatches) -> Result<DbConfig, Error> {
    let mut figment = rocket::Config::figment();
    if let Some(uri) = args.get_one::<String>(DB_URI) {
        figment = figment.merge(("db_uri", uri));
    }
    if let Some(name) = args.get_one::<String>(DB_NAME) {
        figment = figment.merge(("db_name", name));
    }
    figment
        .extract::<DbConfig>()
        .map_err(|e| Error::Config(e.to_string()))
}

/// Load, connect and insert.
async fn seed(args: &ArgMatches) -> Result<SeedReport, Error> {
    let path: &String = args.get_one(QUESTIONS_PATH).unwrap(); // Required argument is guaranteed to be present.
    let questions = load_questions(path)?;
    let config = db_config(args)?;

    let db = connect(&config.db_uri, &config.db_name)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;
    // First real round-trip, so unreachable servers are caught here.
    ensure_indexes_exist(&db)
        .await
        .map_err(|e| Error::Db(e.to_string()))?;

    let stores = Stores::mongo(&db);
    Ok(seed_questions(stores.questions.as_ref(), questions).await)
}

/// Run seeding, report the result, and return the exit code.
async fn run(args: &ArgMatches) -> u8 {
    match seed(args).await {
        Ok(report) => {
            println!(
                "Inserted {} question{}, skipped {}.",
                report.inserted,
                if report.inserted != 1 { "s" } else { "" },
                report.skipped
            );
            0
        }
        Err(Error::IO(msg)) => {
            println!("IO error: {}", msg);
            1
        }
        Err(Error::Format(msg)) => {
            println!("Invalid JSON: {}", msg);
            1
        }
        Err(Error::Config(msg)) => {
            println!("Invalid database settings: {}", msg);
            1
        }
        Err(Error::Db(msg)) => {
            println!("Database error: {}", msg);
            1
        }
    }
}

/// Send skipped-entry warnings from the library to stderr.
fn init_logging() {
    let stderr = ConsoleAppender::builder().target(Target::Stderr).build();
    let config = log4rs::Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Warn));
    match config {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                eprintln!("Failed to initialise logging: {e}");
            }
        }
        Err(e) => eprintln!("Invalid logging config: {e}"),
    }
}

#[rocket::main]
async fn main() {
    let args = cli().get_matches();
    init_logging();
    let exit_code = run(&args).await;
    std::process::exit(exit_code.into())
}
