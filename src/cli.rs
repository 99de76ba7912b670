// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use clap::Subcommand;
use memodeck_core::CardId;
use memodeck_core::DeckId;
use memodeck_core::error::Fallible;
use memodeck_core::error::fail;
use tokio::spawn;

use crate::cmd::decks;
use crate::cmd::drill::server::ServerConfig;
use crate::cmd::drill::server::start_server;
use crate::cmd::history::print_history;
use crate::cmd::serve::ApiConfig;
use crate::cmd::serve::start_api_server;
use crate::cmd::transfer::export_collection;
use crate::cmd::transfer::import_collection;
use crate::config::Config;
use crate::db::Database;
use crate::utils::wait_for_server;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file. By default, `memodeck.toml` in the working directory is used if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Path to the SQLite database. Overrides the config file.
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Review a deck through a web interface.
    Drill {
        /// The id of the deck to review.
        deck: String,
        /// The host address to bind to. Default is 127.0.0.1.
        #[arg(long)]
        host: Option<String>,
        /// The port to use for the web server. Default is 8000.
        #[arg(long)]
        port: Option<u16>,
        /// Whether to open the browser automatically. Default is true.
        #[arg(long)]
        open_browser: Option<bool>,
    },
    /// Serve the deck store as a JSON API.
    Serve {
        /// The host address to bind to. Default is 127.0.0.1.
        #[arg(long)]
        host: Option<String>,
        /// The port to listen on. Default is 8000.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Commands relating to decks.
    Decks {
        #[command(subcommand)]
        command: DeckCommand,
    },
    /// Commands relating to the cards in a deck.
    Cards {
        #[command(subcommand)]
        command: CardCommand,
    },
    /// Print a deck's study history.
    History {
        /// The id of the deck.
        deck: String,
    },
    /// Export a deck as JSON.
    Export {
        /// The id of the deck.
        deck: String,
        /// Output file or directory. By default, the output is printed to stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Import decks from JSON files or directories of them.
    Import {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[derive(Subcommand)]
enum DeckCommand {
    /// List all decks.
    List,
    /// Create a new, empty deck.
    Add {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Change a deck's title or description.
    Edit {
        deck: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a deck and its history.
    Delete { deck: String },
}

#[derive(Subcommand)]
enum CardCommand {
    /// List the cards in a deck.
    List { deck: String },
    /// Add a card to a deck.
    Add {
        deck: String,
        front: String,
        back: String,
    },
    /// Change a card's front or back.
    Edit {
        deck: String,
        card: String,
        #[arg(long)]
        front: Option<String>,
        #[arg(long)]
        back: Option<String>,
    },
    /// Remove a card from a deck.
    Delete { deck: String, card: String },
}

pub async fn entrypoint() -> Fallible<()> {
    let cli: Cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database = database;
    }
    match cli.command {
        Command::Drill {
            deck,
            host,
            port,
            open_browser,
        } => {
            let host = host.unwrap_or(config.host);
            let port = port.unwrap_or(config.port);
            if open_browser.unwrap_or(config.open_browser) {
                // Start a separate task to open the browser once the server is up.
                let browser_host = host.clone();
                spawn(async move {
                    match wait_for_server(&browser_host, port).await {
                        Ok(_) => {
                            let _ = open::that(format!("http://{browser_host}:{port}/"));
                        }
                        Err(e) => {
                            eprintln!("Failed to connect to server: {e}");
                            exit(-1)
                        }
                    }
                });
            }
            let config = ServerConfig {
                database: config.database,
                deck_id: DeckId::new(deck),
                host,
                port,
                seed: None,
            };
            start_server(config).await
        }
        Command::Serve { host, port } => {
            let config = ApiConfig {
                database: config.database,
                host: host.unwrap_or(config.host),
                port: port.unwrap_or(config.port),
            };
            start_api_server(config).await
        }
        Command::Decks { command } => {
            let mut db = Database::new(&config.database)?;
            match command {
                DeckCommand::List => print!("{}", decks::list_decks(&db)?),
                DeckCommand::Add { title, description } => {
                    println!("{}", decks::add_deck(&mut db, &title, &description)?)
                }
                DeckCommand::Edit {
                    deck,
                    title,
                    description,
                } => decks::edit_deck(&mut db, &DeckId::new(deck), title, description)?,
                DeckCommand::Delete { deck } => decks::delete_deck(&mut db, &DeckId::new(deck))?,
            }
            Ok(())
        }
        Command::Cards { command } => {
            let mut db = Database::new(&config.database)?;
            match command {
                CardCommand::List { deck } => {
                    print!("{}", decks::list_cards(&db, &DeckId::new(deck))?)
                }
                CardCommand::Add { deck, front, back } => {
                    println!(
                        "{}",
                        decks::add_card(&mut db, &DeckId::new(deck), &front, &back)?
                    )
                }
                CardCommand::Edit {
                    deck,
                    card,
                    front,
                    back,
                } => decks::edit_card(
                    &mut db,
                    &DeckId::new(deck),
                    &CardId::new(card),
                    front,
                    back,
                )?,
                CardCommand::Delete { deck, card } => {
                    decks::delete_card(&mut db, &DeckId::new(deck), &CardId::new(card))?
                }
            }
            Ok(())
        }
        Command::History { deck } => {
            let db = Database::new(&config.database)?;
            print!("{}", print_history(&db, &DeckId::new(deck))?);
            Ok(())
        }
        Command::Export { deck, output } => {
            let db = Database::new(&config.database)?;
            if let Some(json) = export_collection(&db, &DeckId::new(deck), output)? {
                println!("{json}");
            }
            Ok(())
        }
        Command::Import { paths } => {
            let mut db = Database::new(&config.database)?;
            let report = import_collection(&mut db, &paths)?;
            println!(
                "Imported {} deck(s), skipped {} already present.",
                report.imported, report.skipped
            );
            if report.failed.is_empty() {
                Ok(())
            } else {
                fail(format!("{} file(s) could not be imported.", report.failed.len()))
            }
        }
    }
}
