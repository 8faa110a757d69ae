pub mod challenge;
pub mod config;
pub mod quiz;
pub mod run;
pub mod session;
pub mod stats;
pub mod timer;

use serde::Serialize;
use studybot_core::{Config, Database};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Open the data directory's config and database.
pub fn open() -> Result<(Config, Database), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    Ok((config, db))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
