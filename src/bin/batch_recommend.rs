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
use simreco::io;
use simreco::recommend;
use simreco::RecommenderContext;

fn main() {

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = config::options();
    opts.optflag("", "items", "Compute similar items for every item instead of recommendations \
        for every user.");

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

    if let Err(failure) = batch_recommend(&config, matches.opt_present("items")) {
        eprintln!("Batch recommendation failed: {}", failure);
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

fn batch_recommend(config: &Config, for_items: bool) -> Result<(), Box<dyn Error>> {

    let context = RecommenderContext::load(
        &config.interactions_path,
        &config.model_dir,
        config.delimiter,
        config.duplicate_policy,
    )?;

    let output = config.output_path.as_deref();

    if for_items {
        info!("Computing {} similar items per item on {} threads", config.num_recommendations,
            config.pool_size);
        let similar = recommend::similar_items_for_all_items(
            &context, config.num_recommendations, config.pool_size)?;

        info!("Writing similar items for {} items", similar.len());
        io::write_similar_items(&similar, output)?;
    } else {
        info!("Computing {} recommendations per user on {} threads", config.num_recommendations,
            config.pool_size);
        let recommendations = recommend::recommend_for_all_users(
            &context, config.num_recommendations, config.pool_size)?;

        info!("Writing recommendations for {} users", recommendations.len());
        io::write_user_recommendations(&recommendations, output)?;
    }

    Ok(())
}
