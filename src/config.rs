/**
 * SimReco
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use std::path::PathBuf;

use getopts::{Matches, Options};

use crate::error::{Error, Result};
use crate::matrix::DuplicatePolicy;
use crate::recommend::{DEFAULT_NUM_RECOMMENDATIONS, MAX_RECOMMENDATIONS};

pub const DEFAULT_INTERACTIONS_PATH: &str = "data/processed/interactions.csv";
pub const DEFAULT_MODEL_DIR: &str = "models";

/// Settings shared by the binaries.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub interactions_path: PathBuf,
    pub model_dir: PathBuf,
    pub num_recommendations: usize,
    pub duplicate_policy: DuplicatePolicy,
    pub delimiter: u8,
    pub output_path: Option<String>,
    pub pool_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            interactions_path: PathBuf::from(DEFAULT_INTERACTIONS_PATH),
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            num_recommendations: DEFAULT_NUM_RECOMMENDATIONS,
            duplicate_policy: DuplicatePolicy::default(),
            delimiter: b',',
            output_path: None,
            pool_size: num_cpus::get(),
        }
    }
}

/// Command line options understood by all binaries, binaries may add their own on top.
pub fn options() -> Options {
    let mut opts = Options::new();
    opts.optopt("i", "inputfile", "Input file name (optional, defaults to \
        data/processed/interactions.csv). The input is a CSV file with a header line, which \
        must contain the columns visitorid, itemid and rating.", "PATH");
    opts.optopt("m", "modeldir", "Directory holding the trained similarity indices (optional, \
        defaults to models).", "PATH");
    opts.optopt("n", "num", "Number of items to recommend (optional, defaults to 5).", "NUMBER");
    opts.optopt("d", "duplicates", "How to combine repeated ratings of the same user and item, \
        'sum' or 'overwrite' (optional, defaults to sum).", "POLICY");
    opts.optopt("s", "separator", "Field separator of the input file (optional, defaults to \
        ',').", "CHAR");
    opts.optopt("o", "outputfile", "Output file name (optional, output will be written to stdout \
        by default).", "PATH");
    opts.optopt("t", "threads", "Number of threads for batch computations (optional, defaults \
        to the number of CPUs).", "NUMBER");
    opts.optflag("h", "help", "Print this help menu");
    opts
}

impl Config {

    pub fn from_matches(matches: &Matches) -> Result<Self> {
        let mut config = Config::default();

        if let Some(path) = matches.opt_str("i") {
            config.interactions_path = PathBuf::from(path);
        }
        if let Some(path) = matches.opt_str("m") {
            config.model_dir = PathBuf::from(path);
        }

        config.num_recommendations = matches.opt_get_default("n", config.num_recommendations)
            .map_err(|failure| Error::InvalidConfig(format!("Problem with option 'n': {}", failure)))?;

        config.pool_size = matches.opt_get_default("t", config.pool_size)
            .map_err(|failure| Error::InvalidConfig(format!("Problem with option 't': {}", failure)))?;

        if let Some(policy) = matches.opt_str("d") {
            config.duplicate_policy = policy.parse()?;
        }

        if let Some(separator) = matches.opt_str("s") {
            config.delimiter = parse_delimiter(&separator)?;
        }

        config.output_path = matches.opt_str("o");

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_recommendations == 0 || self.num_recommendations > MAX_RECOMMENDATIONS {
            return Err(Error::InvalidConfig(format!(
                "number of recommendations must be between 1 and {}", MAX_RECOMMENDATIONS)));
        }
        if self.pool_size == 0 {
            return Err(Error::InvalidConfig("at least one thread is required".to_owned()));
        }
        Ok(())
    }
}

fn parse_delimiter(separator: &str) -> Result<u8> {
    match separator {
        "\\t" | "tab" => Ok(b'\t'),
        _ if separator.len() == 1 => Ok(separator.as_bytes()[0]),
        _ => Err(Error::InvalidConfig(
            format!("separator must be a single byte, got '{}'", separator))),
    }
}


#[cfg(test)]
mod tests {

    use super::*;

    fn parse(args: &[&str]) -> Result<Config> {
        let matches = options().parse(args).unwrap();
        Config::from_matches(&matches)
    }

    #[test]
    fn defaults() {
        let config = parse(&[]).unwrap();

        assert_eq!(config.interactions_path, PathBuf::from(DEFAULT_INTERACTIONS_PATH));
        assert_eq!(config.model_dir, PathBuf::from(DEFAULT_MODEL_DIR));
        assert_eq!(config.num_recommendations, 5);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Sum);
        assert_eq!(config.delimiter, b',');
        assert_eq!(config.output_path, None);
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&["-i", "views.tsv", "--modeldir", "/tmp/m", "-n", "12",
            "--duplicates", "overwrite", "-s", "tab", "-t", "3", "-o", "out.json"]).unwrap();

        assert_eq!(config.interactions_path, PathBuf::from("views.tsv"));
        assert_eq!(config.model_dir, PathBuf::from("/tmp/m"));
        assert_eq!(config.num_recommendations, 12);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Overwrite);
        assert_eq!(config.delimiter, b'\t');
        assert_eq!(config.pool_size, 3);
        assert_eq!(config.output_path, Some("out.json".to_owned()));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(parse(&["-n", "0"]).is_err());
        assert!(parse(&["-n", "five"]).is_err());
        assert!(parse(&["-n", "100000"]).is_err());
        assert!(parse(&["-d", "max"]).is_err());
        assert!(parse(&["-s", ";;"]).is_err());
        assert!(parse(&["-t", "0"]).is_err());
    }
}
