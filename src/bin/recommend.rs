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
use std::io::{self, BufRead, Write};

use getopts::Options;
use log::info;

use simreco::config::{self, Config};
use simreco::recommend::{try_recommend_for_user, try_recommend_similar_items};
use simreco::{ContextHandle, QueryError, RecommenderContext};

fn main() {

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = config::options();
    opts.optopt("", "item", "Print the items most similar to this item and exit.", "ID");
    opts.optopt("", "user", "Print the items recommended to this user and exit.", "ID");

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

    let result = match (matches.opt_str("item"), matches.opt_str("user")) {
        (Some(item), None) => one_shot(&config, Mode::Item, &item),
        (None, Some(user)) => one_shot(&config, Mode::User, &user),
        (None, None) => interactive(&config),
        (Some(_), Some(_)) => {
            return print_usage_and_exit(
                &program,
                opts,
                Some("Please specify either --item or --user, not both."),
            );
        },
    };

    if let Err(failure) = result {
        eprintln!("{}", failure);
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

#[derive(Clone, Copy)]
enum Mode {
    Item,
    User,
}

fn load(config: &Config) -> simreco::Result<RecommenderContext> {
    info!("Loading interactions from {} and model from {}", config.interactions_path.display(),
        config.model_dir.display());

    RecommenderContext::load(
        &config.interactions_path,
        &config.model_dir,
        config.delimiter,
        config.duplicate_policy,
    )
}

fn one_shot(config: &Config, mode: Mode, id: &str) -> Result<(), Box<dyn Error>> {
    let context = load(config)?;
    println!("{}", answer(&context, mode, id, config.num_recommendations));
    Ok(())
}

fn interactive(config: &Config) -> Result<(), Box<dyn Error>> {
    let handle = ContextHandle::new(load(config)?);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("Choose recommendation type (item/user), 'reload' or 'quit': ");
        io::stdout().flush()?;

        let mode = match lines.next() {
            Some(line) => line?.trim().to_lowercase(),
            None => return Ok(()),
        };

        let mode = match mode.as_str() {
            "item" => Mode::Item,
            "user" => Mode::User,
            "reload" => {
                // A failed reload keeps serving the previous context
                match load(config) {
                    Ok(context) => {
                        handle.reload(context);
                        println!("Reloaded.");
                    },
                    Err(failure) => eprintln!("Reload failed: {}", failure),
                }
                continue;
            },
            "quit" | "exit" => return Ok(()),
            _ => {
                println!("Invalid mode. Choose either 'item' or 'user'.");
                continue;
            },
        };

        match mode {
            Mode::Item => print!("Enter the item ID to get similar items: "),
            Mode::User => print!("Enter the user ID to get recommended items: "),
        }
        io::stdout().flush()?;

        let id = match lines.next() {
            Some(line) => line?,
            None => return Ok(()),
        };

        let context = handle.current();
        println!("{}", answer(&context, mode, id.trim(), config.num_recommendations));
    }
}

fn answer(context: &RecommenderContext, mode: Mode, id: &str, n: usize) -> String {
    let id: u64 = match id.parse() {
        Ok(id) => id,
        Err(_) => return format!("Please enter a valid integer identifier, got '{}'.", id),
    };

    let (result, heading) = match mode {
        Mode::Item => (
            try_recommend_similar_items(context, id, n),
            format!("Recommended items similar to Item ID {}:", id),
        ),
        Mode::User => (
            try_recommend_for_user(context, id, n),
            format!("Recommended items for User ID {}:", id),
        ),
    };

    match result {
        Ok(ref items) if items.is_empty() => format!("No recommendations available for {}.", id),
        Ok(items) => format!("{}\n{:?}", heading, items),
        Err(QueryError::UnknownItem(_)) => "Item ID not found in dataset.".to_owned(),
        Err(QueryError::UnknownUser(_)) => "User ID not found in dataset.".to_owned(),
        Err(failure) => failure.to_string(),
    }
}
