use anyhow::Result;
use chrono::Utc;
use crossterm::style::Color;

use crate::library;
use crate::settings::Settings;
use crate::store::EntryStore;
use crate::ui::{self, Theme};

pub(crate) const AVATARS: &[&[&str]] = &[
    // Wise Owl
    &[r" /\_/\  ", r" ( o.o ) ", r"  > ^ <  "],
    // Bookworm
    &[r"   / _  \ ", r" /- / \ -\", r"(o_/   \__)"],
    // Classic Scholar
    &[r"  .---.  ", r" (o)-(o) ", r" ( 'o' ) "],
    // Abstract Globe
    &[r"  ,--.   ", r" ( () )  ", r"  `--'   "],
    // Minimalist Sun
    &[r"   \|/   ", r"  --  --  ", r"   /|\   "],
];

pub(crate) fn run_profile_page(settings: &mut Settings, store: &EntryStore) -> Result<()> {
    loop {
        let theme = Theme::from_settings(settings);
        ui::clear_screen();
        render_profile(settings, store, theme);

        ui::write_line_centered("\nOptions: [U]pdate Username, [B]ack to Main Menu");
        let choice = ui::read_input_centered("> ").to_lowercase();
        match choice.trim() {
            "u" => update_username(settings)?,
            "b" => return Ok(()),
            _ => {}
        }
    }
}

fn render_profile(settings: &Settings, store: &EntryStore, theme: Theme) {
    ui::write_header(theme, &format!("{}'s Profile", settings.username));

    let avatar = AVATARS
        .get(settings.profile_picture_index)
        .unwrap_or(&AVATARS[0]);
    ui::write_line_centered("");
    for line in *avatar {
        ui::write_line_centered(line);
    }
    ui::write_line_centered("");

    let entry_count = store.count().unwrap_or(0);
    let bookmark_count = library::load_bookmarks().len();
    ui::write_line_centered(&format!("Journal Entries: {entry_count}"));
    ui::write_line_centered(&format!("Bookmarked Books: {bookmark_count}"));
    ui::write_line_centered(&format!(
        "Online Books Opened: {}",
        settings.online_books_opened
    ));

    if let Some(created) = settings.account_created_at {
        let age_days = (Utc::now() - created).num_days();
        ui::write_line_centered(&format!("\nAccount Age: {age_days} days"));
    }
    if let Some(last_read) = &settings.last_read_book_title {
        ui::write_line_centered(&format!("Last Read: {last_read}"));
    }

    ui::write_line_centered("\n--- Reading Habits ---");
    render_top_items(theme, "Genres", store.top_genres().unwrap_or_default());
    render_top_items(theme, "Authors", store.top_authors().unwrap_or_default());
}

fn render_top_items(theme: Theme, label: &str, items: Vec<(String, usize)>) {
    if items.is_empty() {
        return;
    }
    ui::set_color(theme, Color::Cyan);
    ui::write_line_centered(&format!("\nTop {label}:"));
    ui::reset_color(theme);
    for (name, count) in items {
        ui::write_line_centered(&format!("- {name} ({count} entries)"));
    }
}

fn update_username(settings: &mut Settings) -> Result<()> {
    let new_username = ui::read_input_centered("\nEnter new username: ");
    if new_username.trim().is_empty() {
        ui::write_line_centered("\nUsername cannot be empty.");
    } else {
        settings.username = new_username.trim().to_string();
        settings.save();
        ui::write_line_centered("\nUsername updated!");
    }
    ui::wait_any_key("Press any key to continue...")
}
