use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::style::Color;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod explorer;
mod journal;
mod library;
mod profile;
mod settings;
mod store;
mod ui;

use journal::read_choice;
use settings::Settings;
use store::EntryStore;
use ui::Theme;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const SPLASH_ART: &[&str] = &[
    r"  ██████  ██    ██ ██ ██      ██      ",
    r" ██    ██ ██    ██ ██ ██      ██      ",
    r" ██    ██ ██    ██ ██ ██      ██      ",
    r" ██ ▄▄ ██ ██    ██ ██ ██      ██      ",
    r"  ██████   ██████  ██ ███████ ███████ ",
    r"     ▀▀                               ",
];

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--version" | "-v" => {
                println!("quill {}", APP_VERSION);
                return Ok(());
            }
            unknown => {
                eprintln!("unknown argument: {}", unknown);
                std::process::exit(2);
            }
        }
    }

    init_logging();

    let mut settings = Settings::load();
    ui::set_window_size(settings.window_width, settings.window_height);

    let store = EntryStore::open_default().context("open journal store")?;

    show_splash_and_login(&mut settings)?;

    loop {
        let theme = Theme::from_settings(&settings);
        ui::clear_screen();
        show_introduction(theme);

        match main_menu_choice(theme, &settings) {
            Some(1) => {
                ui::clear_screen();
                journal::run_journal_menu(&store, theme)?;
            }
            Some(2) => {
                ui::clear_screen();
                run_online_sourcing_menu(&mut settings, &store)?;
            }
            Some(3) => {
                ui::clear_screen();
                profile::run_profile_page(&mut settings, &store)?;
            }
            Some(4) => {
                ui::clear_screen();
                settings::run_settings_menu(&mut settings)?;
            }
            Some(5) => {
                ui::set_color(theme, Color::Magenta);
                ui::write_line_centered("\nThank you for using Quill!");
                ui::write_line_centered("Have a wonderful day!\n");
                ui::reset_color(theme);
                return Ok(());
            }
            _ => continue,
        }
    }
}

// Logs go to a file under the data directory; stdout belongs to the menus.
fn init_logging() {
    let dir = settings::data_dir();
    if fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("quill.log"))
    else {
        return;
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("info".parse().expect("valid directive")))
        .with(fmt::layer().with_writer(Arc::new(file)).with_ansi(false))
        .init();
}

fn show_splash_and_login(settings: &mut Settings) -> Result<()> {
    let theme = Theme::from_settings(settings);
    ui::clear_screen();
    ui::set_color(theme, Color::DarkYellow);
    println!();
    for line in SPLASH_ART {
        ui::write_line_centered(line);
    }
    ui::reset_color(theme);
    println!();

    if settings.has_account() {
        login(settings)?;
    } else {
        create_account(settings)?;
    }
    ui::clear_screen();
    Ok(())
}

fn create_account(settings: &mut Settings) -> Result<()> {
    loop {
        let username = ui::read_input_centered("Create a username: ");
        if !username.trim().is_empty() {
            settings.username = username.trim().to_string();
            settings.account_created_at = Some(Utc::now());
            break;
        }
        ui::write_line_centered("Username cannot be empty. Please try again.");
        ui::wait_any_key("")?;
    }

    loop {
        ui::write_centered("Create a password (5-11 characters): ");
        let password = ui::read_password()?;
        if !(5..=11).contains(&password.len()) {
            ui::write_line_centered("Password must be between 5 and 11 characters. Please try again.");
            ui::wait_any_key("")?;
            continue;
        }

        ui::write_centered("Confirm password: ");
        let confirmation = ui::read_password()?;
        if password == confirmation {
            settings.password_hash = settings::sha256_hex(&password);
            settings.save();
            ui::write_line_centered("Account created successfully. Press any key to continue...");
            ui::wait_any_key("")?;
            return Ok(());
        }
        ui::write_line_centered("Passwords do not match. Please try again.");
        ui::wait_any_key("")?;
    }
}

fn login(settings: &Settings) -> Result<()> {
    loop {
        ui::write_centered(&format!("Enter password for {}: ", settings.username));
        let password = ui::read_password()?;
        if settings::sha256_hex(&password) == settings.password_hash {
            ui::write_line_centered("Login successful. Press any key to continue...");
            ui::wait_any_key("")?;
            return Ok(());
        }
        ui::write_line_centered("Incorrect password. Please try again.");
        ui::wait_any_key("")?;
    }
}

fn show_introduction(theme: Theme) {
    ui::set_color(theme, Color::Cyan);
    ui::write_header(theme, "Welcome to Quill!");
    ui::reset_color(theme);
    ui::write_line_centered(
        "Your personal space to write, manage, and explore book entries and online libraries.",
    );
    ui::write_line_centered("Tip: Use the menu below to navigate. Entries are saved automatically.\n");
}

fn main_menu_choice(theme: Theme, settings: &Settings) -> Option<usize> {
    ui::set_color(theme, Color::Magenta);
    ui::write_header(theme, "Main Menu");
    ui::reset_color(theme);

    let items = [
        "Journal".to_string(),
        "Online Sourcing".to_string(),
        format!("{}'s Profile", settings.username),
        "Settings".to_string(),
        "Exit".to_string(),
    ];
    for (i, item) in items.iter().enumerate() {
        ui::write_line_centered(&format!("{}. {}", i + 1, item));
    }

    let input = ui::read_input_centered(&format!("\nEnter your choice (1-{}): ", items.len()));
    match input.trim().parse::<usize>() {
        Ok(choice) if (1..=items.len()).contains(&choice) => Some(choice),
        _ => {
            ui::write_error(theme, "Invalid choice, please try again.");
            let _ = ui::wait_any_key("Press any key to continue...");
            None
        }
    }
}

fn run_online_sourcing_menu(settings: &mut Settings, store: &EntryStore) -> Result<()> {
    loop {
        let theme = Theme::from_settings(settings);
        ui::clear_screen();
        ui::write_header(theme, "Online Sourcing");
        ui::write_line_centered("1. Online Library");
        ui::write_line_centered("2. AI Topic Explorer");
        ui::write_line_centered("3. Back to Main Menu");

        let choice = read_choice(1, 3, "\nEnter your choice: ");
        ui::clear_screen();
        match choice {
            1 => library::run_library_menu(settings)?,
            2 => explorer::run_topic_explorer(settings, store)?,
            3 => return Ok(()),
            _ => {}
        }
    }
}
