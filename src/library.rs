use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::KeyCode;
use crossterm::style::Color;
use rand::seq::SliceRandom;
use serde_json::Value;

use crate::settings::{self, Settings};
use crate::ui::{self, Theme};

const VOLUMES_URL: &str = "https://www.googleapis.com/books/v1/volumes";
const SEARCH_TIMEOUT_SECS: u64 = 30;
const SEARCH_RESULT_LIMIT: usize = 10;
const RECOMMENDED_FETCH_LIMIT: usize = 40;
const RECOMMENDED_PAGE_SIZE: usize = 5;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct BookResult {
    pub(crate) title: String,
    pub(crate) url: String,
}

pub(crate) fn run_library_menu(settings: &mut Settings) -> Result<()> {
    if !recommended_file().exists() {
        if let Err(err) = generate_recommended_file() {
            tracing::warn!("initial recommendations fetch failed: {err}");
        }
    }

    loop {
        let theme = Theme::from_settings(settings);
        ui::clear_screen();
        ui::write_header(theme, "Welcome to the Online Library");
        println!("Navigate the online book features below:");
        println!("1. Search for Books");
        println!("2. View Recommended Books");
        println!("3. View Bookmarked Books");
        println!("4. Back to Main Menu");

        let input = ui::read_input("\nSelect an option (1-4): ");
        match input.trim() {
            "1" => {
                ui::clear_screen();
                browse_and_bookmark(settings, theme)?;
            }
            "2" => show_recommended(theme)?,
            "3" => show_bookmarks(theme)?,
            "4" => return Ok(()),
            _ => {
                println!("Invalid option. Please select 1-4.");
            }
        }
    }
}

fn browse_and_bookmark(settings: &mut Settings, theme: Theme) -> Result<()> {
    let query = ui::read_input("Enter search query: ");
    if query.trim().is_empty() {
        return Ok(());
    }
    let sort = ui::read_input("Sort by (1 for Relevance, 2 for Newest): ");
    let order_by = if sort.trim() == "2" {
        "newest"
    } else {
        "relevance"
    };

    let results = match search_books(query.trim(), order_by) {
        Ok(results) => results,
        Err(err) => {
            tracing::warn!("book search failed: {err}");
            ui::write_error(theme, "Online search failed.");
            return ui::wait_any_key("\nPress any key to return...");
        }
    };
    if results.is_empty() {
        println!("No online books found.");
        return ui::wait_any_key("\nPress any key to return...");
    }

    ui::set_color(theme, Color::Green);
    println!("Online Library Results:");
    for (i, book) in results.iter().enumerate() {
        println!("{}. {}", i + 1, book.title);
    }
    ui::reset_color(theme);
    println!("\nSelect a book by number, ESC to exit.");

    loop {
        let key = ui::read_key()?;
        match key.code {
            KeyCode::Esc => return Ok(()),
            KeyCode::Char(ch) if ch.is_ascii_digit() => {
                let idx = (ch as usize).wrapping_sub('1' as usize);
                if let Some(book) = results.get(idx) {
                    show_book_actions(book, settings, theme)?;
                    return Ok(());
                }
            }
            _ => {}
        }
    }
}

fn show_book_actions(book: &BookResult, settings: &mut Settings, theme: Theme) -> Result<()> {
    ui::clear_screen();
    println!("Title: {}", book.title);
    println!("URL: {}", book.url);
    println!("\nPress 'B' to Bookmark, 'Enter' to Read, or 'ESC' to go back.");

    loop {
        let key = ui::read_key()?;
        match key.code {
            KeyCode::Char('b') | KeyCode::Char('B') => {
                bookmark_book(book, theme);
                break;
            }
            KeyCode::Enter => {
                settings.online_books_opened += 1;
                settings.last_read_book_title = Some(book.title.clone());
                settings.save();
                open_in_browser(&book.url);
                break;
            }
            KeyCode::Esc => break,
            _ => {}
        }
    }
    ui::wait_any_key("\nPress any key to return to the library...")
}

pub(crate) fn search_books(query: &str, order_by: &str) -> Result<Vec<BookResult>> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
        .build()
        .context("build search client")?;
    let response = client
        .get(VOLUMES_URL)
        .query(&[
            ("q", query),
            ("maxResults", &SEARCH_RESULT_LIMIT.to_string()),
            ("orderBy", order_by),
        ])
        .send()
        .context("request book volumes")?;
    let body: Value = response.json().context("parse volumes response")?;
    Ok(parse_volumes(&body))
}

/// Pulls titles and preview links out of a volumes response; items without
/// a title fall back to a placeholder, matching the web UI's behavior.
pub(crate) fn parse_volumes(body: &Value) -> Vec<BookResult> {
    let Some(items) = body.get("items").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| {
            let info = item.get("volumeInfo");
            BookResult {
                title: info
                    .and_then(|v| v.get("title"))
                    .and_then(Value::as_str)
                    .unwrap_or("No Title")
                    .to_string(),
                url: info
                    .and_then(|v| v.get("previewLink"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }
        })
        .collect()
}

fn bookmark_book(book: &BookResult, theme: Theme) {
    let line = format!("{}|{}\n", book.title, book.url);
    let path = bookmarks_file();
    let write_result = (|| -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
        use std::io::Write;
        file.write_all(line.as_bytes())
    })();

    match write_result {
        Ok(()) => {
            ui::set_color(theme, Color::Green);
            println!("\nBookmarked!\n");
            ui::reset_color(theme);
        }
        Err(err) => {
            tracing::warn!("bookmark write failed: {err}");
            ui::write_error(theme, "Could not save the bookmark.");
        }
    }
}

pub(crate) fn load_bookmarks() -> Vec<BookResult> {
    load_piped_file(&bookmarks_file())
}

pub(crate) fn clear_bookmarks() {
    let _ = fs::write(bookmarks_file(), "");
}

/// Refreshes the recommendations file from a broad fiction query. Returns
/// the number of titles written.
pub(crate) fn generate_recommended_file() -> Result<usize> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
        .build()
        .context("build recommendations client")?;
    let response = client
        .get(VOLUMES_URL)
        .query(&[
            ("q", "subject:fiction"),
            ("maxResults", &RECOMMENDED_FETCH_LIMIT.to_string()),
        ])
        .send()
        .context("request recommended volumes")?;
    let body: Value = response.json().context("parse recommended response")?;
    let books = parse_volumes(&body);

    let path = recommended_file();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create data dir")?;
    }
    let serialized: String = books
        .iter()
        .map(|b| format!("{}|{}\n", b.title, b.url))
        .collect();
    fs::write(&path, serialized).context("write recommendations file")?;
    Ok(books.len())
}

fn show_recommended(theme: Theme) -> Result<()> {
    ui::clear_screen();
    let all = load_piped_file(&recommended_file());
    if all.is_empty() {
        println!("No recommended books found.");
        return ui::wait_any_key("\nPress any key to return...");
    }

    ui::write_header(theme, "Recommended Books");
    let mut shuffled = all;
    shuffled.shuffle(&mut rand::thread_rng());
    for (i, book) in shuffled.iter().take(RECOMMENDED_PAGE_SIZE).enumerate() {
        ui::set_color(theme, Color::Cyan);
        println!("{}. {}", i + 1, book.title);
        ui::set_color(theme, Color::Green);
        println!("   {}", book.url);
    }
    ui::reset_color(theme);
    ui::wait_any_key("\nPress any key to return...")
}

fn show_bookmarks(theme: Theme) -> Result<()> {
    ui::clear_screen();
    let bookmarks = load_bookmarks();
    if bookmarks.is_empty() {
        println!("No bookmarked books yet.");
        return ui::wait_any_key("\nPress any key to return...");
    }

    ui::write_header(theme, "Bookmarked Books");
    for (i, book) in bookmarks.iter().enumerate() {
        ui::set_color(theme, Color::Cyan);
        println!("{}. {}", i + 1, book.title);
        ui::set_color(theme, Color::Green);
        println!("   {}", book.url);
    }
    ui::reset_color(theme);
    ui::wait_any_key("\nPress any key to return...")
}

/// Reads a `title|url` per-line file, skipping malformed lines.
fn load_piped_file(path: &PathBuf) -> Vec<BookResult> {
    let Ok(raw) = fs::read_to_string(path) else {
        return Vec::new();
    };
    raw.lines()
        .filter_map(|line| {
            let (title, url) = line.split_once('|')?;
            Some(BookResult {
                title: title.to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}

fn bookmarks_file() -> PathBuf {
    settings::data_dir().join("bookmarks.txt")
}

fn recommended_file() -> PathBuf {
    settings::data_dir().join("recommended.txt")
}

fn open_in_browser(url: &str) {
    if url.is_empty() {
        return;
    }
    let opener = if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    let _ = Command::new(opener)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_volumes_extracts_title_and_preview_link() {
        let body = json!({
            "items": [
                { "volumeInfo": { "title": "Dune", "previewLink": "http://example.com/dune" } },
                { "volumeInfo": { "previewLink": "http://example.com/untitled" } },
            ]
        });

        let books = parse_volumes(&body);
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].title, "Dune");
        assert_eq!(books[0].url, "http://example.com/dune");
        assert_eq!(books[1].title, "No Title");
    }

    #[test]
    fn parse_volumes_without_items_is_empty() {
        assert!(parse_volumes(&json!({"kind": "books#volumes"})).is_empty());
    }

    #[test]
    fn piped_file_lines_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bookmarks.txt");
        fs::write(&path, "Dune|http://example.com/dune\nbroken line\nOther|u\n")
            .expect("write file");

        let books = load_piped_file(&path);
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].title, "Dune");
        assert_eq!(books[1].url, "u");
    }
}
