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

use std::env;
use std::error::Error;

use getopts::Options;
use log::info;

use simreco::config::{self, Config};
use simreco::RecommenderContext;
use simreco::io;
use simreco::persist;

fn main() {

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = config::options();
    opts.optflag("k", "keep-positions", "Reuse the identifier registry of an existing model \
        directory, so that known users and items keep their positions.");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    if matches.opt_present("h") {
        return print_usage_and_exit(&program, opts, None);
    }

    let config = match Config::from_matches(&matches) {
        Ok(config) => config,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    if let Err(failure) = train(&config, matches.opt_present("k")) {
        eprintln!("Training failed: {}", failure);
        std::process::exit(1);
    }
}

fn print_usage_and_exit(
    program: &str,
    opts: Options,
    hint: Option<&str>
) {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    let brief = format!("Usage: {} [options]", program);
    eprint!("{}", opts.usage(&brief));
    std::process::exit(2);
}

fn train(config: &Config, keep_positions: bool) -> Result<(), Box<dyn Error>> {

    info!("Reading {} to build the interaction matrix", config.interactions_path.display());
    let interactions = io::read_interactions(&config.interactions_path, config.delimiter)?;

    let context = if keep_positions {
        let registry = persist::load_registry(config.model_dir.join(persist::REGISTRY_FILE))?;
        if registry.duplicate_policy != config.duplicate_policy {
            info!("Switching the duplicate policy from {} to {}", registry.duplicate_policy,
                config.duplicate_policy);
        }
        RecommenderContext::rebuild(registry.dictionary, &interactions, config.duplicate_policy)?
    } else {
        RecommenderContext::build(&interactions, config.duplicate_policy)?
    };

    info!(
        "Found {} interactions between {} users and {} items.",
        context.dictionary().num_interactions(),
        context.dictionary().num_users(),
        context.dictionary().num_items(),
    );

    context.save(&config.model_dir)?;

    Ok(())
}
