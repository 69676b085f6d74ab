use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use dictionary::Dictionary;
use storage::Storage;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/leseratte.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a local text file so the reader can open it.
    ImportText { path: PathBuf },
    /// Look a word up in the dictionary file, bypassing the server.
    Lookup {
        word: String,
        #[arg(long, default_value = "./data/dict/de-en.txt")]
        dictionary: String,
    },
    /// Print every vocabulary word with its review state.
    ListVocab,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::ImportText { path } => {
            let storage = Storage::new(&cli.database_url).await?;
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .context("path carries no usable filename")?;
            storage.upsert_text(name, &content, Utc::now()).await?;
            println!("stored text {name} ({} bytes)", content.len());
        }
        Command::Lookup { word, dictionary } => {
            let dictionary = Dictionary::load(&dictionary)?;
            let translations = dictionary.lookup(&word);
            if translations.is_empty() {
                println!("no translation found for {word}");
            } else {
                for translation in translations {
                    println!("{translation}");
                }
            }
        }
        Command::ListVocab => {
            let storage = Storage::new(&cli.database_url).await?;
            for entry in storage.all_vocab_entries().await? {
                println!(
                    "{} -> {} (ef {:.2}, interval {:.1}d, reps {}, next {})",
                    entry.word,
                    entry.translations.join("; "),
                    entry.easiness_factor,
                    entry.interval_days,
                    entry.repetition_count,
                    entry.next_review_date.format("%Y-%m-%d")
                );
            }
        }
    }

    Ok(())
}
