//! Output formatting utilities.

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::Mutex;

use colored::{ColoredString, Colorize};
use tabled::{settings::Style, Table, Tabled};

use crate::config::OutputFormat;
use crate::{CliError, CliResult};

/// Prints a success message.
pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Prints an error message.
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Prints a warning message.
pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Prints an info message.
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Colours an environment label: production red, staging yellow,
/// development green, anything else plain.
pub fn environment_label(environment: &str) -> ColoredString {
    match environment.to_ascii_lowercase().as_str() {
        "production" => environment.red().bold(),
        "staging" => environment.yellow().bold(),
        "development" => environment.green().bold(),
        _ => environment.normal(),
    }
}

/// Masks a secret for display.
pub fn mask(secret: Option<&str>) -> &'static str {
    if secret.is_some() {
        "********"
    } else {
        "NOT SET"
    }
}

/// Outputs data in the specified format.
pub fn output<T: Tabled + serde::Serialize>(data: &[T], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Table => {
            if data.is_empty() {
                info("No results found.");
            } else {
                let table = Table::new(data).with(Style::rounded()).to_string();
                println!("{table}");
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(data)?;
            println!("{json}");
        }
        OutputFormat::Yaml => {
            for item in data {
                let json = serde_json::to_value(item)?;
                print!("{}", render_yaml(&json));
                println!();
            }
        }
        OutputFormat::Quiet => {}
    }
    Ok(())
}

/// Outputs a single item.
pub fn output_single<T: serde::Serialize>(item: &T, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Table | OutputFormat::Yaml => {
            let json = serde_json::to_value(item)?;
            print!("{}", render_yaml(&json));
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(item)?;
            println!("{json}");
        }
        OutputFormat::Quiet => {}
    }
    Ok(())
}

/// Renders a JSON value as YAML-like text.
pub fn render_yaml(value: &serde_json::Value) -> String {
    let mut out = String::new();
    write_yaml(&mut out, value, 0);
    out
}

fn scalar(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => Some("null".to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn write_yaml(out: &mut String, value: &serde_json::Value, indent: usize) {
    let prefix = "  ".repeat(indent);

    match value {
        serde_json::Value::Array(arr) => {
            for item in arr {
                match scalar(item) {
                    Some(s) => out.push_str(&format!("{prefix}- {s}\n")),
                    None => {
                        out.push_str(&format!("{prefix}-\n"));
                        write_yaml(out, item, indent + 1);
                    }
                }
            }
        }
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                match scalar(val) {
                    Some(s) => out.push_str(&format!("{prefix}{key}: {s}\n")),
                    None => {
                        out.push_str(&format!("{prefix}{key}:\n"));
                        write_yaml(out, val, indent + 1);
                    }
                }
            }
        }
        other => {
            if let Some(s) = scalar(other) {
                out.push_str(&format!("{prefix}{s}\n"));
            }
        }
    }
}

/// Source of interactive answers.
pub trait Prompt {
    /// Asks a yes/no question; anything but `y`/`yes` is no.
    fn confirm(&self, message: &str) -> CliResult<bool>;

    /// Asks for a secret without echoing it.
    fn password(&self, message: &str) -> CliResult<String>;
}

fn is_yes(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

/// Prompts on the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn confirm(&self, message: &str) -> CliResult<bool> {
        print!("{message} [y/N]: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().lock().read_line(&mut input)?;

        Ok(is_yes(&input))
    }

    fn password(&self, message: &str) -> CliResult<String> {
        rpassword::prompt_password(message).map_err(CliError::Io)
    }
}

/// Replays canned answers; used by tests.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    /// Creates a prompt that answers in order.
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }

    fn next(&self, message: &str) -> CliResult<String> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(message.to_string());
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut a| a.pop_front())
            .ok_or_else(|| CliError::InvalidArgument(format!("no scripted answer for '{message}'")))
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&self, message: &str) -> CliResult<bool> {
        Ok(is_yes(&self.next(message)?))
    }

    fn password(&self, message: &str) -> CliResult<String> {
        self.next(message)
    }
}
