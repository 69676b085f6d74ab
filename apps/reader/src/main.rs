use std::{io::Write, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    DeletePrompt, ReaderClient, ReaderController, ReaderEvent, TranslationDisplay,
};
use shared::{
    domain::{LanguagePair, ReviewQuality},
    protocol::MutationOutcome,
};
use tokio::task;
use tracing::info;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:8077")]
    server_url: String,
    #[arg(long, default_value = "de-en")]
    language_pair: String,
    /// How long the pointer must rest on a word before a lookup fires.
    #[arg(long, default_value_t = 300)]
    hover_delay_ms: u64,
}

/// Asks on stdin before a vocabulary word is deleted.
struct StdinPrompt;

#[async_trait::async_trait]
impl DeletePrompt for StdinPrompt {
    async fn confirm(&self, word: &str) -> bool {
        let question = format!("Delete \"{word}\" from vocabulary? [y/N] ");
        matches!(
            read_line(&question).await,
            Ok(Some(answer)) if answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let pair: LanguagePair = args.language_pair.parse()?;
    let client = Arc::new(ReaderClient::with_pair(&args.server_url, pair)?);
    client.health().await.context("server unreachable")?;
    info!(server_url = %args.server_url, "connected");

    let controller = ReaderController::with_hover_delay(
        client.clone(),
        Arc::new(StdinPrompt),
        Duration::from_millis(args.hover_delay_ms),
    );
    spawn_event_printer(&controller);
    controller.refresh_vocab().await?;

    print_help();
    loop {
        let Some(line) = read_line("> ").await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }
        if let Err(error) = run_command(&client, &controller, line).await {
            println!("[error] {error:#}");
        }
    }
    Ok(())
}

async fn run_command(
    client: &ReaderClient,
    controller: &ReaderController,
    line: &str,
) -> Result<()> {
    let (command, rest) = match line.split_once(' ') {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };
    match command {
        "help" => print_help(),
        "texts" => {
            for name in client.list_texts().await? {
                println!("  {name}");
            }
        }
        "open" => {
            controller
                .open_text(require_arg(rest, "open <filename>")?)
                .await?;
        }
        "url" => {
            controller
                .import_url(require_arg(rest, "url <address>")?)
                .await?;
        }
        "upload" => {
            let path = PathBuf::from(require_arg(rest, "upload <path>")?);
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let filename = path
                .file_name()
                .and_then(|name| name.to_str())
                .context("path carries no usable filename")?;
            controller.upload_file(filename, &content).await;
            for name in client.list_texts().await? {
                println!("  {name}");
            }
        }
        "show" => {
            let view = controller.current_view().await;
            match view.filename() {
                Some(name) => {
                    println!("--- {name} ---");
                    println!("{}", view.render());
                }
                None => println!("no text loaded"),
            }
        }
        "words" => {
            let view = controller.current_view().await;
            for (index, token) in view.words().enumerate() {
                println!("  [{index}] {token}");
            }
        }
        "hover" => {
            let token = word_by_index(controller, rest).await?;
            controller.pointer_enter(&token).await;
        }
        "leave" => controller.pointer_leave().await,
        "click" => {
            let token = word_by_index(controller, rest).await?;
            controller.click_word(&token).await?;
        }
        "vocab" => {
            for word in controller.vocab().await {
                println!("  {word}");
            }
        }
        "delete" => {
            let word = require_arg(rest, "delete <word>")?;
            if !controller.remove_word(word).await? {
                println!("kept {word}");
            }
        }
        "all" => {
            for entry in client.all_vocab_entries().await? {
                println!(
                    "  {} -> {} (ef {:.2}, reps {})",
                    entry.word,
                    entry.translations.join("; "),
                    entry.easiness_factor,
                    entry.repetition_count
                );
            }
        }
        "due" => {
            for entry in client.due_reviews().await? {
                println!("  {} ({})", entry.word, entry.translations.join("; "));
            }
        }
        "practice" => {
            for entry in client.practice_words().await? {
                println!("  {} ({})", entry.word, entry.translations.join("; "));
            }
        }
        "review" => {
            let (word, quality) = rest
                .split_once(' ')
                .context("usage: review <word> <quality 0-5>")?;
            let quality: ReviewQuality = quality.trim().parse()?;
            let graded = client.submit_review(word.trim(), quality).await?;
            println!(
                "  {}: next review {} (interval {:.1} days, ef {:.2})",
                graded.word, graded.next_review_date, graded.interval_days, graded.easiness_factor
            );
        }
        "edit" => {
            let mut parts = rest.splitn(3, ' ');
            let (Some(old), Some(new), Some(translation)) =
                (parts.next(), parts.next(), parts.next())
            else {
                anyhow::bail!("usage: edit <old> <new> <translations>");
            };
            let status = client.edit_vocab_word(old, new, translation).await?;
            match status.status {
                MutationOutcome::Success => println!("updated {new}"),
                MutationOutcome::Error => println!(
                    "{}",
                    status.message.unwrap_or_else(|| "edit failed".to_string())
                ),
            }
        }
        "stats" => {
            let stats = client.review_stats().await?;
            println!(
                "  total {} | mastered {} | learning {} | due today {} | avg recall {:.1}",
                stats.total_words,
                stats.mastered_words,
                stats.learning_words,
                stats.words_due_today,
                stats.avg_recall
            );
        }
        other => println!("unknown command `{other}` (try `help`)"),
    }
    Ok(())
}

fn spawn_event_printer(controller: &ReaderController) {
    let mut events = controller.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            print_event(event);
        }
    });
}

fn print_event(event: ReaderEvent) {
    match event {
        ReaderEvent::TextLoaded {
            filename,
            word_count,
        } => println!("\n[text] {filename} loaded ({word_count} words)"),
        ReaderEvent::VocabUpdated { vocab } => {
            println!("\n[vocab] {} words: {}", vocab.len(), vocab.join(", "));
        }
        ReaderEvent::Translation(display) => print_display(display),
        ReaderEvent::Error(message) => println!("\n[error] {message}"),
    }
}

fn print_display(display: TranslationDisplay) {
    match display {
        TranslationDisplay::Prompt => {
            println!("\n[panel] Hover over a word to see translations");
        }
        TranslationDisplay::Loading { word } => println!("\n[panel] {word}: Loading..."),
        TranslationDisplay::Translations { word, translations } => {
            println!("\n[panel] {word}:");
            for translation in translations {
                println!("  - {translation}");
            }
        }
        TranslationDisplay::NoTranslation { word } => {
            println!("\n[panel] No translation found for '{word}'");
        }
    }
}

fn print_help() {
    println!("commands:");
    println!("  texts                       list stored texts");
    println!("  open <filename>             load a stored text");
    println!("  url <address>               import a text from the web");
    println!("  upload <path>               upload a local file");
    println!("  show | words                print the text / its word tokens");
    println!("  hover <index> | leave       rest the pointer on a word / move away");
    println!("  click <index>               add a word to the vocabulary");
    println!("  vocab | delete <word>       list vocabulary / remove a word");
    println!("  all | due | practice        vocabulary with review state");
    println!("  review <word> <quality>     grade a recall from 0 to 5");
    println!("  edit <old> <new> <trans>    rename a word and rewrite translations");
    println!("  stats                       review statistics");
    println!("  quit");
}

fn require_arg<'a>(rest: &'a str, usage: &str) -> Result<&'a str> {
    if rest.is_empty() {
        anyhow::bail!("usage: {usage}");
    }
    Ok(rest)
}

async fn word_by_index(controller: &ReaderController, rest: &str) -> Result<String> {
    let index: usize = rest.trim().parse().context("expected a word index")?;
    controller
        .word_token(index)
        .await
        .with_context(|| format!("no word at index {index}"))
}

async fn read_line(prompt: &str) -> Result<Option<String>> {
    {
        let mut stdout = std::io::stdout();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;
    }
    task::spawn_blocking(|| {
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(line.trim().to_string())),
            Err(error) => Err(error.into()),
        }
    })
    .await?
}
