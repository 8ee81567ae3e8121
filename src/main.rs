//! Tagview CLI application entry point
//!
//! Command-line front end for the tagview browsing engine. It connects to a
//! media backend, runs searches and prints the resulting window, and offers a
//! line-driven browse loop for stepping through media and tagging it.
//!
//! # Usage
//!
//! ```bash
//! # Browse all media (default command)
//! tagview
//! tagview browse -t vacation
//!
//! # Print the media carrying every given tag, grouped by day
//! tagview filter -t vacation -t beach
//!
//! # Print the best prompt matches, grouped by score band
//! tagview prompt "red car" -n 20
//!
//! # Manage tags
//! tagview tags list
//! tagview tags new sunset
//! tagview tags delete sunset
//!
//! # Quiet mode (only output results)
//! tagview -q filter -t vacation
//! ```
//!
//! # Configuration
//!
//! On first run, tagview prompts for the backend URL. Configuration is stored
//! in the user's config directory (`~/.config/tagview/config.toml` on Linux).
//! When a backend call fails, the URL can be corrected interactively.

use clap::CommandFactory;
use colored::Colorize;
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use tagview::{
    TagviewError,
    api::HttpBackend,
    cli::{
        BrowseAction, Cli, Commands, ConfigCommands, TagsCommands, date_to_timestamp,
        generate_completions,
    },
    config::{self, TagviewConfig},
    gallery::{Deletion, Gallery, GalleryError, Navigation, Panel},
    output,
};

type Result<T> = std::result::Result<T, TagviewError>;

/// First backend failure seen while running a command
type FailureSlot = Rc<RefCell<Option<String>>>;

/// Prompt user for yes/no confirmation
///
/// # Arguments
/// * `prompt` - Question to ask the user
/// * `quiet` - If true, auto-confirms without prompting
///
/// # Errors
/// Returns `TagviewError` if I/O operations fail.
fn confirm(prompt: &str, quiet: bool) -> Result<bool> {
    if quiet {
        return Ok(true);
    }

    print!("{prompt} [y/n]: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let response = input.trim().to_lowercase();

    Ok(matches!(response.as_str(), "y" | "yes"))
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn success(message: &str, quiet: bool) {
    if !quiet {
        println!("{} {message}", "✓".green());
    }
}

/// Print the rendered window with group separators
fn print_window(gallery: &Gallery<HttpBackend>, quiet: bool) {
    let window = gallery.window();
    if window.is_empty() {
        if !quiet {
            println!("No media found");
        }
        return;
    }
    let lines = output::window_lines(
        window.rendered(),
        &gallery.groups(),
        gallery.selection().current_id(),
        gallery.settings().max_name_length,
        quiet,
    );
    for line in lines {
        println!("{line}");
    }
}

fn print_current(gallery: &Gallery<HttpBackend>) {
    match gallery.current_view() {
        Some(view) => println!("\n{}\n", output::current_view(&view)),
        None => println!("\n{}\n", "No media to show".dimmed()),
    }
}

fn handle_config_command(command: &ConfigCommands, quiet: bool) -> Result<()> {
    let mut config = TagviewConfig::load()?;
    match command {
        ConfigCommands::Show => {
            if !quiet {
                println!("# {}", TagviewConfig::config_path()?.display());
            }
            let text = toml::to_string_pretty(&config).map_err(|e| {
                ::config::ConfigError::Message(format!("Failed to serialize config: {e}"))
            })?;
            print!("{text}");
        }
        ConfigCommands::SetBackend { url } => {
            config.set_backend_url(url)?;
            config.save()?;
            success(&format!("Backend set to {}", url.trim()), quiet);
        }
    }
    Ok(())
}

async fn handle_tags_command(
    gallery: &mut Gallery<HttpBackend>,
    command: TagsCommands,
    quiet: bool,
) -> Result<()> {
    if !gallery.refresh_tags().await {
        return Ok(());
    }
    match command {
        TagsCommands::List => {
            let entries = gallery.tags().entries(Panel::GlobalFilter);
            if entries.is_empty() && !quiet {
                println!("No tags found");
            }
            for entry in &entries {
                println!("{}", output::tag_line(entry, quiet));
            }
        }
        TagsCommands::New { name } => {
            if gallery.create_tag(&name).await? {
                success(&format!("Created tag '{}'", name.trim()), quiet);
            }
        }
        TagsCommands::Delete { name, yes } => {
            let tag = gallery
                .tags()
                .find_by_name(&name)
                .map(|tag| tag.id)
                .ok_or_else(|| GalleryError::UnknownTag(name.clone()))?;
            let confirmed = confirm(&format!("Delete tag '{name}' from all media?"), yes || quiet)?;
            if !confirmed {
                println!("Cancelled");
                return Ok(());
            }
            if gallery.delete_tag(tag, true).await? {
                success(&format!("Deleted tag '{name}'"), quiet);
            }
        }
    }
    Ok(())
}

fn browse_help() {
    println!("  n, <enter>  next item");
    println!("  p           previous item");
    println!("  t NAME      toggle tag NAME on the current item");
    println!("  d           delete the current item");
    println!("  q           quit");
}

async fn browse_loop(
    gallery: &mut Gallery<HttpBackend>,
    failure: &FailureSlot,
    quiet: bool,
) -> Result<()> {
    print_current(gallery);
    loop {
        if failure.borrow().is_some() {
            return Ok(());
        }

        print!("{} ", ">".cyan());
        io::stdout().flush()?;
        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            return Ok(());
        }

        let Some(action) = BrowseAction::parse(&line) else {
            eprintln!("{} Unknown command (? for help)", "❌".red());
            continue;
        };

        match action {
            BrowseAction::Next | BrowseAction::Prev => {
                let navigation = if action == BrowseAction::Next {
                    gallery.next().await
                } else {
                    gallery.prev().await
                };
                match navigation {
                    Navigation::Moved(_) => print_current(gallery),
                    Navigation::Exhausted | Navigation::Stayed => {
                        println!("{}", "No more items in this direction".dimmed());
                    }
                    Navigation::Empty => println!("{}", "No media to show".dimmed()),
                    Navigation::Failed => {}
                }
            }
            BrowseAction::Toggle(name) => match gallery.toggle_assignment_by_name(&name).await {
                Ok(Some(true)) => success(&format!("Tagged with '{name}'"), quiet),
                Ok(Some(false)) => success(&format!("Removed tag '{name}'"), quiet),
                Ok(None) => {}
                Err(e) => eprintln!("{} {e}", "❌".red()),
            },
            BrowseAction::Delete => {
                if gallery.selection().current().is_none() {
                    eprintln!("{} {}", "❌".red(), GalleryError::NoSelection);
                    continue;
                }
                let confirmed = confirm("Delete this item from the backend?", false)?;
                match gallery.delete_current(confirmed).await {
                    Ok(Deletion::Deleted { removed, .. }) => {
                        success(&format!("Deleted media {removed}"), quiet);
                        print_current(gallery);
                    }
                    Ok(Deletion::Failed) => {}
                    Err(e) => eprintln!("{} {e}", "❌".red()),
                }
            }
            BrowseAction::Help => browse_help(),
            BrowseAction::Quit => return Ok(()),
        }
    }
}

async fn handle_command(
    gallery: &mut Gallery<HttpBackend>,
    command: Commands,
    failure: &FailureSlot,
    quiet: bool,
) -> Result<()> {
    match command {
        Commands::Tags { command } => handle_tags_command(gallery, command, quiet).await?,
        Commands::Filter { tags } => {
            if gallery.refresh_tags().await {
                gallery.filter_by_names(&tags).await?;
                print_window(gallery, quiet);
            }
        }
        Commands::Prompt { text, .. } => {
            gallery.submit_prompt(&text).await?;
            print_window(gallery, quiet);
        }
        Commands::Date { date } => {
            let timestamp = date_to_timestamp(date)
                .ok_or_else(|| TagviewError::InvalidInput(format!("No local midnight on {date}")))?;
            if gallery.jump_to_date(timestamp).await.is_some() {
                print_window(gallery, quiet);
                if !quiet {
                    print_current(gallery);
                }
            } else if failure.borrow().is_none() && !quiet {
                println!("No media found");
            }
        }
        Commands::Sync => {
            if gallery.sync().await {
                success("Backend synchronized", quiet);
            }
        }
        Commands::Browse { tags, prompt } => {
            if gallery.refresh_tags().await {
                match prompt {
                    Some(text) => {
                        gallery.submit_prompt(&text).await?;
                    }
                    None => {
                        gallery.filter_by_names(&tags).await?;
                    }
                }
                browse_loop(gallery, failure, quiet).await?;
            }
        }
        Commands::Config { .. } | Commands::Completions { .. } => {}
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let command = cli.get_command();
    match &command {
        Commands::Completions { shell } => {
            generate_completions(*shell, &mut Cli::command(), &mut io::stdout());
            return Ok(());
        }
        Commands::Config { command } => return handle_config_command(command, cli.quiet),
        _ => {}
    }

    let mut config = match &cli.backend {
        Some(url) => {
            let mut config = TagviewConfig::load()?;
            config.set_backend_url(url)?;
            config
        }
        None => TagviewConfig::load_or_setup()?,
    };
    let quiet = cli.quiet || config.quiet;

    let mut settings = config.engine_settings();
    if let Commands::Prompt { limit: Some(limit), .. } = &command {
        settings.prompt_limit = (*limit).max(1);
    }

    let url = config
        .backend_url
        .clone()
        .ok_or_else(|| TagviewError::InvalidInput("No backend URL configured".to_string()))?;
    let backend = match HttpBackend::new(&url) {
        Ok(backend) => backend,
        Err(e) => {
            if !quiet {
                config::recover_backend(&mut config, &e.to_string())?;
            }
            return Err(e.into());
        }
    };

    let mut gallery = Gallery::new(backend, settings);
    let failure: FailureSlot = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&failure);
    gallery.set_failure_handler(move |e| {
        slot.borrow_mut().get_or_insert_with(|| e.to_string());
    });

    let result = handle_command(&mut gallery, command, &failure, quiet).await;

    let reason = failure.borrow_mut().take();
    if let Some(reason) = reason {
        if !quiet {
            config::recover_backend(&mut config, &reason)?;
        }
        return Err(TagviewError::BackendFailed(reason));
    }
    result
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {e}", "❌".red());
        std::process::exit(1);
    }
}
