//! Interactive prompts for the backend location
//!
//! Used on first run, when no backend URL is configured yet, and whenever the
//! configured backend turns out to be unreachable or misconfigured.

use super::{TagviewConfig, validate_backend_url};
use colored::Colorize;
use config::ConfigError;
use dialoguer::{Input, theme::ColorfulTheme};

/// Suggested backend location when none is configured
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

fn ask_backend_url(default: &str) -> Result<String, ConfigError> {
    let url: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Backend URL")
        .default(default.to_string())
        .validate_with(|input: &String| {
            validate_backend_url(input)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()
        .map_err(|e| ConfigError::Message(format!("Failed to read input: {e}")))?;
    validate_backend_url(&url)
}

/// Interactive first-time setup - prompts for the backend URL
///
/// Other settings in `config` are kept; the result is saved.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - User input cannot be read
/// - The configuration cannot be saved
pub fn first_time_setup(mut config: TagviewConfig) -> Result<TagviewConfig, ConfigError> {
    println!("Welcome to tagview! Let's connect to your media backend.\n");

    config.backend_url = Some(ask_backend_url(DEFAULT_BACKEND_URL)?);
    config.save()?;

    println!("\nConfiguration saved successfully!");
    Ok(config)
}

/// Recovery flow after the backend failed
///
/// Shows `reason`, prompts for a new URL pre-filled with the current one,
/// and saves it.
///
/// # Errors
///
/// Returns `ConfigError` if user input cannot be read or the configuration
/// cannot be saved.
pub fn recover_backend(config: &mut TagviewConfig, reason: &str) -> Result<(), ConfigError> {
    eprintln!("{} {}", "❌".red(), reason.red());
    eprintln!("The backend may be down or misconfigured.\n");

    let current = config
        .backend_url
        .clone()
        .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
    config.backend_url = Some(ask_backend_url(&current)?);
    config.save()?;

    println!("{} Backend set to {}", "✓".green(), current_url(config));
    Ok(())
}

fn current_url(config: &TagviewConfig) -> &str {
    config.backend_url.as_deref().unwrap_or(DEFAULT_BACKEND_URL)
}
