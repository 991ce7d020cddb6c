use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use crossterm::style::Color;

use crate::explorer::fallback;
use crate::explorer::session::ChatSession;
use crate::explorer::transport;
use crate::explorer::wrap::wrap_to_width;
use crate::store::{EntryStore, NewEntry};
use crate::ui::{self, Theme};

const MIN_VIEW_WIDTH: usize = 40;
const MIN_VIEW_HEIGHT: usize = 10;
// Rows consumed by header, line indicator, two rules, and the legend.
const CHROME_ROWS: usize = 6;

const VIEWER_TITLE: &str = "AI Result (Ollama)";
const CONTROLS_LEGEND: &str = "Controls: q=Up, e=Down, B=Save to Journal, T=Ask follow-up, Esc=Exit";
const AI_TITLE_TAG: &str = "[AI generated]";
const AI_ENTRY_KIND: &str = "AI Topic Explorer";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PagerAction {
    ScrollUp,
    ScrollDown,
    Save,
    Continue,
    Exit,
}

pub(crate) fn action_for_key(key: &KeyEvent) -> Option<PagerAction> {
    match key.code {
        KeyCode::Esc => Some(PagerAction::Exit),
        KeyCode::Up => Some(PagerAction::ScrollUp),
        KeyCode::Down => Some(PagerAction::ScrollDown),
        KeyCode::Char(ch) => match ch.to_ascii_lowercase() {
            'q' => Some(PagerAction::ScrollUp),
            'e' => Some(PagerAction::ScrollDown),
            'b' => Some(PagerAction::Save),
            't' => Some(PagerAction::Continue),
            _ => None,
        },
        _ => None,
    }
}

/// Scroll window over wrapped content.
///
/// Invariant: `top <= max_top()` at all times; the line list is recomputed
/// wholesale whenever the underlying content changes.
pub(crate) struct Viewport {
    lines: Vec<String>,
    top: usize,
    width: usize,
    height: usize,
}

impl Viewport {
    pub(crate) fn new(content: &str, width: usize, height: usize) -> Self {
        let width = width.max(1);
        Self {
            lines: wrap_to_width(content, width),
            top: 0,
            width,
            height: height.max(1),
        }
    }

    #[cfg(test)]
    pub(super) fn top(&self) -> usize {
        self.top
    }

    #[cfg(test)]
    pub(super) fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub(crate) fn max_top(&self) -> usize {
        self.lines.len().saturating_sub(self.height)
    }

    pub(crate) fn scroll_up(&mut self) {
        self.top = self.top.saturating_sub(1);
    }

    pub(crate) fn scroll_down(&mut self) {
        self.top = (self.top + 1).min(self.max_top());
    }

    pub(crate) fn jump_to_bottom(&mut self) {
        self.top = self.max_top();
    }

    /// Swaps in new content, re-wraps, and scrolls so the newest text is
    /// immediately visible.
    pub(crate) fn replace_content(&mut self, content: &str) {
        self.lines = wrap_to_width(content, self.width);
        self.jump_to_bottom();
    }

    /// The full redraw as plain rows: title, "Lines X-Y of Z", rule, the
    /// visible slice padded to `height` so the frame never shrinks, rule,
    /// legend. Pure with respect to the viewport state.
    pub(crate) fn render_rows(&self) -> Vec<String> {
        let total = self.lines.len();
        let first = total.min(self.top + 1);
        let last = total.min(self.top + self.height);
        let rule = "-".repeat(self.width.max(10));

        let mut rows = Vec::with_capacity(self.height + CHROME_ROWS);
        rows.push(VIEWER_TITLE.to_string());
        rows.push(format!("Lines {first}-{last} of {total}"));
        rows.push(rule.clone());
        for i in 0..self.height {
            rows.push(self.lines.get(self.top + i).cloned().unwrap_or_default());
        }
        rows.push(rule);
        rows.push(CONTROLS_LEGEND.to_string());
        rows
    }

    fn draw(&self, theme: Theme) -> Result<()> {
        ui::clear_screen();
        let rows = self.render_rows();
        let mut out = io::stdout().lock();
        for (i, row) in rows.iter().enumerate() {
            if i == 0 {
                ui::set_color(theme, Color::Yellow);
                writeln!(out, "{row}")?;
                out.flush()?;
                ui::reset_color(theme);
            } else {
                writeln!(out, "{row}")?;
            }
        }
        out.flush()?;
        Ok(())
    }
}

fn viewport_size() -> (usize, usize) {
    let width = ui::term_width().saturating_sub(1).max(MIN_VIEW_WIDTH);
    let height = ui::term_height()
        .saturating_sub(CHROME_ROWS)
        .max(MIN_VIEW_HEIGHT);
    (width, height)
}

/// Scrolling loop over the generated text. Save and follow-up are modal:
/// they borrow the console, then scrolling resumes. Exit hands control back
/// to the explorer flow.
pub(crate) fn run(
    initial_content: &str,
    session: &mut ChatSession,
    store: &EntryStore,
    theme: Theme,
) -> Result<()> {
    let (width, height) = viewport_size();
    let mut content = initial_content.to_string();
    let mut view = Viewport::new(&content, width, height);

    loop {
        view.draw(theme)?;
        let key = ui::read_key()?;
        match action_for_key(&key) {
            Some(PagerAction::ScrollUp) => view.scroll_up(),
            Some(PagerAction::ScrollDown) => view.scroll_down(),
            Some(PagerAction::Save) => save_to_journal(&content, store, theme)?,
            Some(PagerAction::Continue) => {
                if let Some(updated) = continue_conversation(&content, session, theme)? {
                    content = updated;
                    view.replace_content(&content);
                }
            }
            Some(PagerAction::Exit) => break,
            None => {}
        }
    }
    Ok(())
}

fn save_to_journal(content: &str, store: &EntryStore, theme: Theme) -> Result<()> {
    let title = ui::read_input("\nEnter a title for your new journal entry: ");
    let tagged = format!("{} {AI_TITLE_TAG}", title.trim());
    let entry = NewEntry {
        title: &tagged,
        kind: AI_ENTRY_KIND,
        description: None,
        author: None,
        genre: None,
        body: content,
    };
    match store.add_entry(&entry) {
        Ok(_) => {
            ui::set_color(theme, Color::Green);
            println!("\nSaved to your journal entries.");
            ui::reset_color(theme);
        }
        Err(err) => {
            // The journal store is fire-and-forget from the viewer's side.
            tracing::warn!("journal save failed: {err}");
        }
    }
    std::thread::sleep(Duration::from_millis(600));
    Ok(())
}

/// Asks for a follow-up and continues the conversation. Returns the updated
/// display content, or `None` when the viewer should resume unchanged
/// (blank input, empty reply, or an exhausted generation).
fn continue_conversation(
    content: &str,
    session: &mut ChatSession,
    theme: Theme,
) -> Result<Option<String>> {
    let follow_up = ui::read_input("\nEnter your follow-up question (blank to cancel): ");
    let follow_up = follow_up.trim().to_string();
    if follow_up.is_empty() {
        return Ok(None);
    }

    session.add_user(follow_up.clone());
    println!("\nContinuing the conversation (streaming)...\n");
    let result = fallback::resolve(
        || {
            transport::chat_stream(session, &mut |token| {
                print!("{token}");
                let _ = io::stdout().flush();
            })
        },
        || transport::chat(session),
    );
    println!();

    let reply = match result {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            transient_notice(theme, "No content returned from Ollama.")?;
            return Ok(None);
        }
        Err(err) => {
            tracing::warn!("conversation continuation failed: {err}");
            transient_notice(theme, &format!("Follow-up failed: {err}"))?;
            return Ok(None);
        }
    };

    session.add_assistant(reply.clone());
    Ok(Some(format!(
        "{content}\n\n---\nUser: {follow_up}\n\nAssistant:\n{reply}"
    )))
}

fn transient_notice(theme: Theme, message: &str) -> Result<()> {
    ui::write_error(theme, message);
    ui::wait_any_key("Press any key to resume reading...")
}
