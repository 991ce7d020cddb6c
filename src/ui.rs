use std::io::{self, Write};

use anyhow::{Context, Result};
use crossterm::cursor::MoveTo;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::style::{Color, ResetColor, SetForegroundColor};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType, SetSize};
use unicode_width::UnicodeWidthStr;

use crate::settings::Settings;

const HEADER_INNER_WIDTH: usize = 46;

/// Presentation toggles snapshotted from the settings at screen entry.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Theme {
    pub(crate) colors: bool,
    pub(crate) ascii: bool,
}

impl Theme {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self {
            colors: settings.use_colors,
            ascii: settings.use_ascii_ui,
        }
    }
}

pub(crate) fn term_width() -> usize {
    crossterm::terminal::size()
        .map(|(w, _)| w as usize)
        .unwrap_or(80)
}

pub(crate) fn term_height() -> usize {
    crossterm::terminal::size()
        .map(|(_, h)| h as usize)
        .unwrap_or(24)
}

pub(crate) fn set_window_size(width: u16, height: u16) {
    let _ = crossterm::execute!(io::stdout(), SetSize(width.max(1), height.max(1)));
}

pub(crate) fn clear_screen() {
    let _ = crossterm::execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0));
}

pub(crate) fn set_color(theme: Theme, color: Color) {
    if theme.colors {
        let _ = crossterm::execute!(io::stdout(), SetForegroundColor(color));
    }
}

pub(crate) fn reset_color(theme: Theme) {
    if theme.colors {
        let _ = crossterm::execute!(io::stdout(), ResetColor);
    }
}

/// Writes each line of `text` horizontally centered, without a trailing newline
/// on the final line.
pub(crate) fn write_centered(text: &str) {
    let width = term_width();
    let mut first = true;
    for line in text.split('\n') {
        if !first {
            println!();
        }
        first = false;
        print!("{}{}", " ".repeat(center_pad(line, width)), line);
    }
    let _ = io::stdout().flush();
}

pub(crate) fn write_line_centered(text: &str) {
    if text.is_empty() {
        println!();
        return;
    }
    let width = term_width();
    for line in text.split('\n') {
        println!("{}{}", " ".repeat(center_pad(line, width)), line);
    }
}

fn center_pad(line: &str, width: usize) -> usize {
    let line_width = UnicodeWidthStr::width(line);
    width.saturating_sub(line_width) / 2
}

/// Boxed section header, with a plain-ASCII variant for terminals that cannot
/// render the box-drawing glyphs.
pub(crate) fn write_header(theme: Theme, title: &str) {
    let (top, mid, bot) = if theme.ascii {
        (
            format!("+{}+", "-".repeat(HEADER_INNER_WIDTH)),
            format!("|{}|", center_text(title, HEADER_INNER_WIDTH)),
            format!("+{}+", "-".repeat(HEADER_INNER_WIDTH)),
        )
    } else {
        (
            format!("╔{}╗", "═".repeat(HEADER_INNER_WIDTH)),
            format!("║{}║", center_text(title, HEADER_INNER_WIDTH)),
            format!("╚{}╝", "═".repeat(HEADER_INNER_WIDTH)),
        )
    };

    set_color(theme, Color::Cyan);
    write_line_centered(&top);
    write_line_centered(&mid);
    write_line_centered(&bot);
    reset_color(theme);
}

fn center_text(text: &str, width: usize) -> String {
    let truncated: String = text.chars().take(width).collect();
    let used = UnicodeWidthStr::width(truncated.as_str());
    let left = width.saturating_sub(used) / 2;
    let right = width.saturating_sub(used + left);
    format!("{}{}{}", " ".repeat(left), truncated, " ".repeat(right))
}

pub(crate) fn read_line() -> String {
    let mut buf = String::new();
    if io::stdin().read_line(&mut buf).is_err() {
        return String::new();
    }
    buf.trim_end_matches(['\r', '\n']).to_string()
}

pub(crate) fn read_input(prompt: &str) -> String {
    print!("{prompt}");
    let _ = io::stdout().flush();
    read_line()
}

pub(crate) fn read_input_centered(prompt: &str) -> String {
    write_centered(prompt);
    read_line()
}

/// Blocks for the next key press; raw mode is held only for the duration of
/// the wait so surrounding line-oriented I/O keeps normal cooked semantics.
pub(crate) fn read_key() -> Result<KeyEvent> {
    enable_raw_mode().context("enable raw mode")?;
    let result = wait_for_key();
    let restored = disable_raw_mode();
    let key = result?;
    restored.context("disable raw mode")?;
    Ok(key)
}

fn wait_for_key() -> Result<KeyEvent> {
    loop {
        if let Event::Key(key) = event::read().context("read key event")? {
            if !matches!(key.kind, KeyEventKind::Release) {
                return Ok(key);
            }
        }
    }
}

pub(crate) fn wait_any_key(message: &str) -> Result<()> {
    if !message.is_empty() {
        println!("{message}");
    }
    read_key()?;
    Ok(())
}

/// Masked password prompt: echoes `*` per character, backspace edits.
pub(crate) fn read_password() -> Result<String> {
    enable_raw_mode().context("enable raw mode")?;
    let result = collect_password();
    let restored = disable_raw_mode();
    let password = result?;
    restored.context("disable raw mode")?;
    println!();
    Ok(password)
}

fn collect_password() -> Result<String> {
    let mut password = String::new();
    loop {
        let key = wait_for_key()?;
        match key.code {
            KeyCode::Enter => break,
            KeyCode::Backspace => {
                if password.pop().is_some() {
                    print!("\u{8} \u{8}");
                    let _ = io::stdout().flush();
                }
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                password.push(ch);
                print!("*");
                let _ = io::stdout().flush();
            }
            _ => {}
        }
    }
    Ok(password)
}

pub(crate) fn write_error(theme: Theme, message: &str) {
    set_color(theme, Color::Red);
    println!("\n{message}");
    reset_color(theme);
}
