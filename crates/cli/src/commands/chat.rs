//! `lingochat chat`: Interactive or single-message chat in the terminal.

use std::io::Write;
use std::sync::Arc;

use lingochat_agent::{ChatSession, SessionSettings, TurnOutcome};
use lingochat_config::AppConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

/// One line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Exit,
    NewChat,
    Language(&'a str),
    Help,
    Text(&'a str),
    Blank,
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    match line {
        "" => Input::Blank,
        "exit" | "quit" | "/exit" | "/quit" => Input::Exit,
        "/new" => Input::NewChat,
        "/help" => Input::Help,
        _ => match line.strip_prefix("/lang") {
            Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
                Input::Language(rest.trim())
            }
            _ => Input::Text(line),
        },
    }
}

/// Strip the `**bold**` markers the greeting uses for the page.
fn plain(text: &str) -> String {
    text.replace("**", "")
}

fn print_outcome(outcome: &TurnOutcome, bot_name: &str) {
    match outcome {
        TurnOutcome::Reply { content, .. } => {
            println!();
            for line in content.lines() {
                println!("  {bot_name} > {line}");
            }
            println!();
        }
        TurnOutcome::MemoryWiped { notice } => {
            println!();
            println!("  {bot_name} > {notice}");
            println!();
        }
        TurnOutcome::Failed { notice, detail } => {
            eprintln!();
            eprintln!("  [Error] {notice}");
            eprintln!("          {detail}");
            eprintln!();
        }
    }
}

fn print_help() {
    println!("  Commands:");
    println!("    /new          Start a new chat (wipes memory)");
    println!("    /lang <name>  Change the response language (starts a new chat)");
    println!("    /help         Show this help");
    println!("    exit          Quit");
    println!("  Type 'forget everything' to wipe the assistant's memory.");
}

pub async fn run(
    language: Option<String>,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if config.require_api_key().is_err() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    GROQ_API_KEY      = 'gsk_...'");
        eprintln!("    LINGOCHAT_API_KEY = '...'      (takes precedence)");
        eprintln!();
        eprintln!("  Or put GROQ_API_KEY=gsk_... in a .env file in this directory.");
        eprintln!();
        eprintln!("  Or add api_key to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = lingochat_providers::build_from_config(&config)?;
    let settings = Arc::new(SessionSettings::from_config(&config)?);
    let bot_name = settings.bot_name().to_string();

    let mut session = match language.as_deref() {
        Some(l) => ChatSession::with_language(provider, settings, l)?,
        None => ChatSession::new(provider, settings),
    };
    info!(session = %session.id(), language = %session.language(), "Terminal chat started");

    if let Some(msg) = message {
        // Single message mode
        let outcome = session.submit(&msg).await?;
        match outcome {
            TurnOutcome::Reply { content, .. } => println!("{content}"),
            TurnOutcome::MemoryWiped { notice } => println!("{notice}"),
            TurnOutcome::Failed { notice, detail } => {
                return Err(format!("{notice} ({detail})").into());
            }
        }
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  LingoChat: Interactive Mode");
    println!();
    println!("  Model:     {}", config.model);
    println!("  Session:   {}", session.id());
    println!("  Type /help for commands, 'exit' or Ctrl+D to quit.");
    println!();
    println!("  {bot_name} > {}", plain(&session.greeting()));
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_input(&line) {
            Input::Blank => continue,
            Input::Exit => break,
            Input::Help => print_help(),
            Input::NewChat => {
                debug!(old = %session.id(), "New chat requested");
                session.reset();
                println!("  New chat started ({})", session.id());
                println!("  {bot_name} > {}", plain(&session.greeting()));
            }
            Input::Language(name) => match session.set_language(name) {
                Ok(true) => {
                    println!("  New chat started ({})", session.id());
                    println!("  {bot_name} > {}", plain(&session.greeting()));
                }
                Ok(false) => println!("  Already responding in {}", session.language()),
                Err(e) => eprintln!("  [Error] {e}"),
            },
            Input::Text(text) => {
                eprint!("  ...");
                let result = session.submit(text).await;
                eprint!("\r     \r");
                match result {
                    Ok(outcome) => print_outcome(&outcome, &bot_name),
                    Err(e) => eprintln!("  [Error] {e}"),
                }
            }
        }
    }

    info!(session = %session.id(), "Terminal chat ended");
    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}
