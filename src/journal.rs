use anyhow::Result;
use crossterm::style::Color;

use crate::explorer::wrap_to_width;
use crate::store::{EntryStore, EntrySummary, NewEntry};
use crate::ui::{self, Theme};

const MULTILINE_END_SENTINEL: &str = ">end";

const ENTRY_TYPES: &[&str] = &[
    "Book",
    "Novel",
    "Research",
    "Newspaper",
    "Magazine",
    "Article",
    "Essay",
    "Journal",
    "Scope",
];

const GENRES: &[&str] = &[
    "Fiction",
    "Non-Fiction",
    "Mystery",
    "Fantasy",
    "Science Fiction",
    "Biography",
    "Romance",
    "Thriller",
    "Historical",
    "Horror",
    "Poetry",
    "Drama",
    "Adventure",
    "Children",
];

pub(crate) fn run_journal_menu(store: &EntryStore, theme: Theme) -> Result<()> {
    loop {
        ui::clear_screen();
        ui::write_header(theme, "Journal Menu");
        ui::write_line_centered("1. Write a new book entry");
        ui::write_line_centered("2. Manage Book Entries");
        ui::write_line_centered("3. Read a Book Entry");
        ui::write_line_centered("4. Search Entries");
        ui::write_line_centered("5. Back to Main Menu");

        let choice = read_choice(1, 5, "\nEnter your choice: ");
        ui::clear_screen();
        match choice {
            1 => write_new_entry(store, theme)?,
            2 => manage_entries(store, theme)?,
            3 => read_entry(store, theme)?,
            4 => search_entries(store, theme)?,
            5 => return Ok(()),
            _ => {}
        }
    }
}

pub(crate) fn read_choice(min: usize, max: usize, prompt: &str) -> usize {
    loop {
        let input = ui::read_input(prompt);
        match input.trim().parse::<usize>() {
            Ok(choice) if (min..=max).contains(&choice) => return choice,
            _ => println!("\nInvalid choice, please try again."),
        }
    }
}

fn write_new_entry(store: &EntryStore, theme: Theme) -> Result<()> {
    ui::write_header(theme, "Journal Menu");
    ui::set_color(theme, Color::Cyan);
    ui::write_line_centered("\nLet's create a new book entry!");
    ui::reset_color(theme);

    let title = ui::read_input_centered("\nWhat is the title of your book? ");
    let kind = prompt_entry_type(theme);
    let (description, author, genre) = prompt_optional_info(theme);

    ui::set_color(theme, Color::Cyan);
    ui::write_line_centered(&format!("\nBook Title: {}", title.trim()));
    ui::reset_color(theme);

    let mut body =
        capture_multiline("Start typing your book entry. Type '>end' on a new line to finish.\n");
    body = confirm_and_possibly_edit(body, theme);

    let entry = NewEntry {
        title: title.trim(),
        kind: &kind,
        description: non_empty(&description),
        author: non_empty(&author),
        genre: non_empty(&genre),
        body: &body,
    };
    match store.add_entry(&entry) {
        Ok(_) => {
            ui::set_color(theme, Color::Green);
            ui::write_line_centered("\nEntry saved!\n");
            ui::reset_color(theme);
        }
        Err(err) => {
            tracing::warn!("entry save failed: {err}");
            ui::write_error(theme, "Could not save the entry.");
        }
    }
    wait_return()
}

fn prompt_entry_type(theme: Theme) -> String {
    loop {
        ui::set_color(theme, Color::Yellow);
        ui::write_line_centered("\nSelect entry type:");
        ui::reset_color(theme);
        ui::write_line_centered("1. Book   2. Novel   3. Research   4. Newspaper   5. Magazine");
        ui::write_line_centered("6. Article   7. Essay   8. Journal   9. Scope   10. Other");

        let opt = ui::read_input_centered("Enter your choice (1-10): ");
        match opt.trim().parse::<usize>() {
            Ok(n) if (1..=ENTRY_TYPES.len()).contains(&n) => {
                return ENTRY_TYPES[n - 1].to_string()
            }
            Ok(10) => return ui::read_input_centered("Enter custom type: "),
            _ => {
                ui::write_error(theme, "Invalid choice. Try again.");
            }
        }
    }
}

fn prompt_optional_info(theme: Theme) -> (String, String, String) {
    let mut description = String::new();
    let mut author = String::new();
    let mut genre = String::new();

    loop {
        ui::set_color(theme, Color::Yellow);
        ui::write_line_centered("\nWould you like to add optional information?");
        ui::reset_color(theme);
        ui::write_line_centered(
            "1. Add/Edit Description   2. Add/Edit Author   3. Add/Edit Genre   4. Continue to entry",
        );

        let opt = ui::read_input_centered("Enter your choice (1-4): ");
        match opt.trim() {
            "1" => description = ui::read_input_centered("\nEnter description: "),
            "2" => author = ui::read_input_centered("\nEnter author: "),
            "3" => genre = prompt_genre(theme),
            "4" => return (description, author, genre),
            _ => {
                ui::write_error(theme, "Invalid choice. Try again.");
            }
        }
    }
}

fn prompt_genre(theme: Theme) -> String {
    loop {
        ui::set_color(theme, Color::Yellow);
        ui::write_line_centered("\nSelect genre:");
        ui::reset_color(theme);
        ui::write_line_centered("1. Fiction   2. Non-Fiction   3. Mystery   4. Fantasy   5. Science Fiction");
        ui::write_line_centered("6. Biography   7. Romance   8. Thriller   9. Historical   10. Horror");
        ui::write_line_centered("11. Poetry   12. Drama   13. Adventure   14. Children   15. Other");

        let opt = ui::read_input_centered("Enter your choice (1-15): ");
        match opt.trim().parse::<usize>() {
            Ok(n) if (1..=GENRES.len()).contains(&n) => return GENRES[n - 1].to_string(),
            Ok(15) => return ui::read_input_centered("Enter custom genre: "),
            _ => {
                ui::write_error(theme, "Invalid choice. Try again.");
            }
        }
    }
}

fn capture_multiline(intro: &str) -> String {
    if !intro.is_empty() {
        ui::write_line_centered(intro);
    }
    let mut lines = Vec::new();
    loop {
        let line = ui::read_line();
        if line.trim() == MULTILINE_END_SENTINEL {
            break;
        }
        lines.push(line);
    }
    lines.join("\n")
}

fn confirm_and_possibly_edit(mut body: String, theme: Theme) -> String {
    loop {
        ui::set_color(theme, Color::Yellow);
        ui::write_line_centered("\nIs this your entry? (Yes or No)");
        ui::reset_color(theme);

        let confirmation = ui::read_line();
        if confirmation.eq_ignore_ascii_case("yes") {
            return body;
        }
        if confirmation.eq_ignore_ascii_case("no") {
            ui::write_line_centered("\nHere is your current entry:\n");
            ui::set_color(theme, Color::Yellow);
            ui::write_line_centered(&body);
            ui::reset_color(theme);
            ui::write_line_centered("\nEdit your entry below (type '>end' to finish):\n");
            body = capture_multiline("");
        } else {
            ui::write_error(theme, "Invalid response. Please enter 'Yes' or 'No'.");
        }
    }
}

fn manage_entries(store: &EntryStore, theme: Theme) -> Result<()> {
    ui::write_header(theme, "Journal Menu");
    let entries = match store.list() {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!("entry list failed: {err}");
            ui::write_error(theme, "Could not load entries.");
            return wait_return();
        }
    };
    if entries.is_empty() {
        ui::write_error(theme, "No entries to manage.");
        return wait_return();
    }

    display_entry_titles(&entries, theme);

    let action = ui::read_input_centered("Would you like to edit or delete an entry? (edit/delete/cancel) ");
    if action.trim().eq_ignore_ascii_case("edit") {
        edit_entry(store, &entries, theme)?;
    } else if action.trim().eq_ignore_ascii_case("delete") {
        delete_entries(store, &entries, theme)?;
    } else {
        ui::write_line_centered("\nCancelled.\n");
    }
    wait_return()
}

fn display_entry_titles(entries: &[EntrySummary], theme: Theme) {
    ui::set_color(theme, Color::Cyan);
    ui::write_line_centered("\nYour journal entries:");
    ui::reset_color(theme);
    for (i, entry) in entries.iter().enumerate() {
        ui::write_line_centered(&format!("{}. {} ({})", i + 1, entry.title, entry.kind));
    }
    println!();
}

fn edit_entry(store: &EntryStore, entries: &[EntrySummary], theme: Theme) -> Result<()> {
    let choice = read_choice(1, entries.len(), "\nWhich entry would you like to edit? ");
    let target = &entries[choice - 1];

    ui::write_line_centered(&format!("\nRewriting \"{}\".", target.title));
    let body = capture_multiline("Type the new entry text. Type '>end' on a new line to finish.\n");
    match store.update_body(target.id, &body) {
        Ok(()) => ui::write_line_centered("\nEntry updated.\n"),
        Err(err) => {
            tracing::warn!("entry update failed: {err}");
            ui::write_error(theme, "Could not update the entry.");
        }
    }
    Ok(())
}

fn delete_entries(store: &EntryStore, entries: &[EntrySummary], theme: Theme) -> Result<()> {
    let input = ui::read_input_centered("\nEnter the entry numbers to delete (e.g. 1,3 5): ");
    let indices = parse_indices(&input, entries.len());
    if indices.is_empty() {
        ui::write_line_centered("\nNothing selected.\n");
        return Ok(());
    }

    let ids: Vec<i64> = indices.iter().map(|&i| entries[i - 1].id).collect();
    match store.delete(&ids) {
        Ok(removed) => ui::write_line_centered(&format!("\nDeleted {removed} entries.\n")),
        Err(err) => {
            tracing::warn!("entry delete failed: {err}");
            ui::write_error(theme, "Could not delete the selected entries.");
        }
    }
    Ok(())
}

/// Parses a comma/space separated list of 1-based indices, deduplicated and
/// bounded by `max`.
pub(crate) fn parse_indices(input: &str, max: usize) -> Vec<usize> {
    let mut out = Vec::new();
    for token in input.split(|c: char| c == ',' || c.is_whitespace()) {
        if let Ok(idx) = token.trim().parse::<usize>() {
            if (1..=max).contains(&idx) && !out.contains(&idx) {
                out.push(idx);
            }
        }
    }
    out
}

fn read_entry(store: &EntryStore, theme: Theme) -> Result<()> {
    ui::write_header(theme, "Journal Menu");
    let entries = match store.list() {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!("entry list failed: {err}");
            ui::write_error(theme, "Could not load entries.");
            return wait_return();
        }
    };
    if entries.is_empty() {
        ui::write_error(theme, "No previous entries found.");
        return wait_return();
    }

    display_entry_titles(&entries, theme);
    let choice = read_choice(1, entries.len(), "\nWhich entry would you like to read? ");
    let Some(entry) = store.get(entries[choice - 1].id)? else {
        ui::write_error(theme, "That entry no longer exists.");
        return wait_return();
    };

    ui::clear_screen();
    ui::set_color(theme, Color::Cyan);
    println!("{} ({})", entry.title, entry.kind);
    ui::reset_color(theme);
    if let Some(author) = &entry.author {
        println!("Author: {author}");
    }
    if let Some(genre) = &entry.genre {
        println!("Genre: {genre}");
    }
    if let Some(description) = &entry.description {
        println!("Description: {description}");
    }
    println!();
    let width = ui::term_width().saturating_sub(1).max(40);
    for line in wrap_to_width(&entry.body, width) {
        println!("{line}");
    }
    wait_return()
}

fn search_entries(store: &EntryStore, theme: Theme) -> Result<()> {
    ui::write_header(theme, "Journal Menu");
    let query = ui::read_input_centered("\nSearch your entries for: ");
    if query.trim().is_empty() {
        return Ok(());
    }

    let hits = match store.search(&query) {
        Ok(hits) => hits,
        Err(err) => {
            tracing::warn!("entry search failed: {err}");
            ui::write_error(theme, "Search failed.");
            return wait_return();
        }
    };
    if hits.is_empty() {
        ui::write_line_centered("\nNo matching entries.\n");
        return wait_return();
    }

    display_entry_titles(&hits, theme);
    wait_return()
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn wait_return() -> Result<()> {
    ui::wait_any_key("\nPress any key to return...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_indices_accepts_commas_and_spaces() {
        assert_eq!(parse_indices("1,3 5", 6), vec![1, 3, 5]);
    }

    #[test]
    fn parse_indices_drops_out_of_range_and_duplicates() {
        assert_eq!(parse_indices("0, 2, 2, 9", 5), vec![2]);
    }

    #[test]
    fn parse_indices_ignores_garbage_tokens() {
        assert_eq!(parse_indices("a, 1x, 4", 5), vec![4]);
    }
}
