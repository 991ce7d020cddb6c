//! Console AI topic explorer backed by a local Ollama server.
//!
//! Single-turn and chat flows with live streaming, automatic fallback to
//! buffered requests, and a scrollable viewer over the generated text.

use std::io::{self, Write};

use anyhow::Result;
use crossterm::style::Color;

use crate::settings::Settings;
use crate::store::EntryStore;
use crate::ui::{self, Theme};

mod fallback;
mod pager;
mod session;
#[cfg(test)]
mod tests;
mod transport;
mod wrap;

use session::ChatSession;
use transport::BackendConfig;

pub(crate) use wrap::wrap_to_width;

const SYSTEM_PROMPT: &str = "You are a domain expert. Produce a long-form, highly informative explanation (roughly 1200-2000 words). \
Focus on clear, well-structured paragraphs and optional short subheadings only where needed. \
Do not include decorative headers or a 'Fun facts' section. \
Cover definitions, core concepts, mechanisms, step-by-step reasoning, practical examples, trade-offs, \
common pitfalls with mitigations, and concise takeaways. \
Prioritize factual accuracy, clarity, and depth. Use bullet lists sparingly and only to improve readability. \
Provide information, pros and cons, about what the user will find out with a topic and what they should not expect to find out about the topic. \
Provide other similar topics, goals, roadmaps, and exercises for the user to consider based off of the topic.";

fn build_user_prompt(topic: &str) -> String {
    format!(
        "Write an in-depth, informative exposition about \"{topic}\". \
Emphasize practical details, real-world considerations, and precise explanations without fluff."
    )
}

// The generate endpoint takes one flat prompt, so the first turn folds the
// system instructions and the topic request together.
fn build_combined_prompt(topic: &str) -> String {
    format!(
        "{SYSTEM_PROMPT}\n\nTopic: \"{topic}\"\n\n{}",
        build_user_prompt(topic)
    )
}

pub(crate) fn run_topic_explorer(settings: &Settings, store: &EntryStore) -> Result<()> {
    let theme = Theme::from_settings(settings);

    ui::set_color(theme, Color::Cyan);
    println!("\nAI Topic Explorer (Ollama)");
    ui::reset_color(theme);

    let topic = ui::read_input("\nEnter a topic: ");
    let topic = topic.trim().to_string();
    if topic.is_empty() {
        return ui::wait_any_key("\nNo topic entered. Press any key to return...");
    }

    let config = BackendConfig::resolve(settings);
    println!("\nProvider: Ollama");
    println!("Model: {}", config.model);
    println!(
        "num_predict: {}, top_p: {}, temperature: {}",
        config.options.num_predict, config.options.top_p, config.options.temperature
    );
    println!("Connecting to Ollama and streaming output...\n");

    let prompt = build_combined_prompt(&topic);
    let result = fallback::resolve(
        || {
            transport::complete_stream(&config, &prompt, &mut |token| {
                print!("{token}");
                let _ = io::stdout().flush();
            })
        },
        || transport::complete(&config, &prompt),
    );
    println!();

    let content = match result {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            ui::write_error(theme, "No content returned from Ollama.");
            return ui::wait_any_key("\nPress any key to return...");
        }
        Err(err) => {
            tracing::warn!("topic generation failed: {err}");
            ui::write_error(theme, &format!("AI request failed: {err}"));
            println!(
                "Tip: Ensure Ollama is running (e.g. 'ollama serve') and the base URL is reachable."
            );
            return ui::wait_any_key("\nPress any key to return...");
        }
    };

    // Seed a chat session mirroring the first exchange so follow-ups carry
    // the full conversation.
    let mut session = ChatSession::new(config);
    session.add_system(SYSTEM_PROMPT);
    session.add_user(build_user_prompt(&topic));
    session.add_assistant(content.clone());

    pager::run(&content, &mut session, store, theme)
}
