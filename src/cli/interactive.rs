use super::convert::{ConvertArgs, RECORD_FLUSH_TIMEOUT, parse_amount};
use super::ui;
use crate::client::{ConverterSession, ConverterState, Phase};
use crate::core::config::AppConfig;
use crate::providers::BackendClient;
use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  amount <n>     set the amount
  from <CODE>    set the source currency (reloads rates)
  to <CODE>      set the target currency
  swap           exchange source and target
  convert, c     convert with the current rates
  list           show the available currencies
  help           show this help
  quit, q        exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Amount(f64),
    From(String),
    To(String),
    Swap,
    Convert,
    List,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let Some(keyword) = parts.next() else {
        return Err("Type 'help' for the list of commands".to_string());
    };
    let argument = parts.next();
    if parts.next().is_some() {
        return Err(format!("Too many arguments for '{keyword}'"));
    }

    match (keyword.to_lowercase().as_str(), argument) {
        ("amount", Some(value)) => parse_amount(value).map(Command::Amount),
        ("from", Some(code)) => Ok(Command::From(code.to_uppercase())),
        ("to", Some(code)) => Ok(Command::To(code.to_uppercase())),
        ("amount" | "from" | "to", None) => Err(format!("'{keyword}' needs a value")),
        ("swap", None) => Ok(Command::Swap),
        ("convert" | "c", None) => Ok(Command::Convert),
        ("list", None) => Ok(Command::List),
        ("help" | "?", None) => Ok(Command::Help),
        ("quit" | "q" | "exit", None) => Ok(Command::Quit),
        (_, Some(_)) if ["swap", "convert", "c", "list", "help", "quit", "q"]
            .contains(&keyword.to_lowercase().as_str()) =>
        {
            Err(format!("'{keyword}' takes no value"))
        }
        _ => Err(format!("Unknown command: {keyword}")),
    }
}

/// One-line summary of the current state.
pub fn status_line(state: &ConverterState) -> String {
    let selection = format!("{} {} -> {}", state.amount(), state.from(), state.to());
    let status = match state.phase() {
        Phase::Idle => ui::style_text("idle", ui::StyleType::Subtle),
        Phase::FetchingRates => ui::style_text("loading rates...", ui::StyleType::Subtle),
        Phase::RatesReady | Phase::ResultDisplayed => ui::style_text(
            &format!("{} currencies", state.rates().len()),
            ui::StyleType::Subtle,
        ),
        Phase::Error => ui::style_text(
            state.error().unwrap_or("error"),
            ui::StyleType::Error,
        ),
    };
    format!("[{selection}] {status}")
}

fn apply_command(session: &mut ConverterSession, command: Command) {
    match command {
        Command::Amount(amount) => session.set_amount(amount),
        Command::From(code) => session.select_source(&code),
        Command::To(code) => session.select_target(&code),
        Command::Swap => session.swap(),
        Command::Convert => match session.convert() {
            Some(outcome) => println!(
                "{}",
                ui::style_text(&outcome.to_string(), ui::StyleType::Result)
            ),
            None if session.state().is_fetching() => {
                println!("Rates are still loading");
            }
            None if !session.state().has_source_rates() => println!(
                "{}",
                ui::style_text(
                    &format!("No {} rates loaded", session.state().from()),
                    ui::StyleType::Error
                )
            ),
            None => println!(
                "{}",
                ui::style_text(
                    &format!("No rate for {} in the current table", session.state().to()),
                    ui::StyleType::Error
                )
            ),
        },
        Command::List => println!("{}", session.state().currencies().join(" ")),
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
}

/// Line-oriented front end over a [`ConverterSession`]. Rate fetches are
/// applied as they complete, interleaved with user input.
pub async fn run(config: &AppConfig, args: &ConvertArgs) -> Result<()> {
    let client = Arc::new(BackendClient::new(&config.client.server_url)?);
    let mut session = ConverterSession::new(args.initial_state(config), client.clone(), client);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", ui::style_text("Currency Converter", ui::StyleType::Title));
    println!("{HELP}");
    session.start();
    println!("{}", status_line(session.state()));

    loop {
        tokio::select! {
            applied = session.apply_next(), if session.has_pending_fetches() => {
                if applied {
                    println!("{}", status_line(session.state()));
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => {
                        apply_command(&mut session, command);
                        println!("{}", status_line(session.state()));
                    }
                    Err(message) => println!("{}", ui::style_text(&message, ui::StyleType::Error)),
                }
            }
        }
    }

    session.flush_records(RECORD_FLUSH_TIMEOUT).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("amount 12.5"), Ok(Command::Amount(12.5)));
        assert_eq!(parse_command("from eur"), Ok(Command::From("EUR".to_string())));
        assert_eq!(parse_command("  TO gbp "), Ok(Command::To("GBP".to_string())));
        assert_eq!(parse_command("swap"), Ok(Command::Swap));
        assert_eq!(parse_command("c"), Ok(Command::Convert));
        assert_eq!(parse_command("convert"), Ok(Command::Convert));
        assert_eq!(parse_command("list"), Ok(Command::List));
        assert_eq!(parse_command("q"), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("").is_err());
        assert!(parse_command("amount").is_err());
        assert!(parse_command("amount ten").is_err());
        assert!(parse_command("amount inf").is_err());
        assert!(parse_command("swap now").is_err());
        assert!(parse_command("from USD EUR").is_err());
        assert_eq!(
            parse_command("rates"),
            Err("Unknown command: rates".to_string())
        );
    }

    #[test]
    fn test_status_line() {
        console::set_colors_enabled(false);
        let state = ConverterState::new("USD", "INR", 10.0);
        assert_eq!(status_line(&state), "[10 USD -> INR] idle");

        let (state, ticket) = state.load();
        assert_eq!(status_line(&state), "[10 USD -> INR] loading rates...");

        let state = state.rates_failed(&ticket, "Failed to fetch exchange rates. Please try again.");
        assert_eq!(
            status_line(&state),
            "[10 USD -> INR] Failed to fetch exchange rates. Please try again."
        );
    }
}
