use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::library;
use crate::profile;
use crate::ui::{self, Theme};

pub(crate) const DEFAULT_WINDOW_WIDTH: u16 = 100;
pub(crate) const DEFAULT_WINDOW_HEIGHT: u16 = 30;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) username: String,
    pub(crate) password_hash: String,
    pub(crate) account_created_at: Option<DateTime<Utc>>,
    pub(crate) profile_picture_index: usize,
    pub(crate) online_books_opened: u64,
    pub(crate) last_read_book_title: Option<String>,
    pub(crate) use_colors: bool,
    pub(crate) use_ascii_ui: bool,
    pub(crate) window_width: u16,
    pub(crate) window_height: u16,
    pub(crate) backend: BackendOverrides,
}

/// Optional backend values from the settings file; environment variables
/// override these, and built-in defaults fill whatever remains unset.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct BackendOverrides {
    pub(crate) base_url: Option<String>,
    pub(crate) model: Option<String>,
    pub(crate) temperature: Option<f64>,
    pub(crate) top_p: Option<f64>,
    pub(crate) num_predict: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            username: String::new(),
            password_hash: String::new(),
            account_created_at: None,
            profile_picture_index: 0,
            online_books_opened: 0,
            last_read_book_title: None,
            use_colors: true,
            use_ascii_ui: false,
            window_width: DEFAULT_WINDOW_WIDTH,
            window_height: DEFAULT_WINDOW_HEIGHT,
            backend: BackendOverrides::default(),
        }
    }
}

impl Settings {
    pub(crate) fn load() -> Self {
        let path = settings_file_path();
        let Ok(raw) = fs::read_to_string(path) else {
            return Self::default();
        };
        let Ok(settings) = serde_json::from_str::<Settings>(&raw) else {
            return Self::default();
        };
        settings
    }

    pub(crate) fn save(&self) {
        let path = settings_file_path();
        if let Some(parent) = path.parent() {
            if fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        let Ok(serialized) = serde_json::to_string_pretty(self) else {
            return;
        };
        if let Err(err) = fs::write(&path, serialized) {
            tracing::warn!("settings write failed: {err}");
        }
    }

    pub(crate) fn reset_to_defaults() -> Self {
        let _ = fs::remove_file(settings_file_path());
        Self::default()
    }

    pub(crate) fn has_account(&self) -> bool {
        !self.password_hash.is_empty()
    }
}

pub(crate) fn data_dir() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".quill")
    } else {
        PathBuf::from(".quill")
    }
}

fn settings_file_path() -> PathBuf {
    data_dir().join("settings.json")
}

pub(crate) fn sha256_hex(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

pub(crate) fn run_settings_menu(settings: &mut Settings) -> Result<()> {
    loop {
        let theme = Theme::from_settings(settings);
        ui::clear_screen();
        ui::write_header(theme, "Settings");
        ui::write_line_centered("1. Change Profile Picture");
        ui::write_line_centered(&format!(
            "2. Toggle Color Mode (currently: {})",
            on_off(settings.use_colors)
        ));
        ui::write_line_centered(&format!(
            "3. Toggle ASCII UI (currently: {})",
            on_off(settings.use_ascii_ui)
        ));
        ui::write_line_centered(&format!(
            "4. Set Console Window Size (currently: {} x {})",
            settings.window_width, settings.window_height
        ));
        ui::write_line_centered("5. Clear All Bookmarks");
        ui::write_line_centered("6. Regenerate Recommended Books");
        ui::write_line_centered("7. Reset All Settings to Defaults");
        ui::write_line_centered("8. Back to Main Menu");

        let input = ui::read_input_centered("\nSelect an option (1-8): ");
        match input.trim() {
            "1" => change_profile_picture(settings, theme)?,
            "2" => {
                settings.use_colors = !settings.use_colors;
                settings.save();
                ui::write_line_centered(&format!(
                    "\nColor mode set to: {}",
                    on_off(settings.use_colors)
                ));
                pause()?;
            }
            "3" => {
                settings.use_ascii_ui = !settings.use_ascii_ui;
                settings.save();
                ui::write_line_centered(&format!(
                    "\nASCII UI set to: {}",
                    on_off(settings.use_ascii_ui)
                ));
                pause()?;
            }
            "4" => {
                set_window_size(settings);
                settings.save();
                pause()?;
            }
            "5" => {
                library::clear_bookmarks();
                ui::write_line_centered("\nAll bookmarks cleared.");
                pause()?;
            }
            "6" => {
                match library::generate_recommended_file() {
                    Ok(count) => ui::write_line_centered(&format!(
                        "\nRecommended books regenerated ({count} titles)."
                    )),
                    Err(err) => {
                        tracing::warn!("recommended refresh failed: {err}");
                        ui::write_line_centered("\nCould not refresh recommendations.");
                    }
                }
                pause()?;
            }
            "7" => {
                *settings = Settings::reset_to_defaults();
                settings.save();
                ui::write_line_centered("\nSettings reset to defaults.");
                pause()?;
            }
            "8" => return Ok(()),
            _ => {
                ui::write_line_centered("\nInvalid option. Please select 1-8.");
                pause()?;
            }
        }
    }
}

fn change_profile_picture(settings: &mut Settings, theme: Theme) -> Result<()> {
    ui::clear_screen();
    ui::write_header(theme, "Change Profile Picture");
    for (i, art) in profile::AVATARS.iter().enumerate() {
        println!("\n--- Option {} ---", i + 1);
        for line in *art {
            println!("{line}");
        }
    }

    let input = ui::read_input(&format!("\nEnter your choice (1-{}): ", profile::AVATARS.len()));
    match input.trim().parse::<usize>() {
        Ok(choice) if (1..=profile::AVATARS.len()).contains(&choice) => {
            settings.profile_picture_index = choice - 1;
            settings.save();
            println!("\nProfile picture updated!");
        }
        _ => println!("\nInvalid choice."),
    }
    pause()
}

fn set_window_size(settings: &mut Settings) {
    let w = ui::read_input(&format!(
        "Enter new window width (current: {}): ",
        settings.window_width
    ));
    let h = ui::read_input(&format!(
        "Enter new window height (current: {}): ",
        settings.window_height
    ));
    match (w.trim().parse::<u16>(), h.trim().parse::<u16>()) {
        (Ok(width), Ok(height)) if width > 0 && height > 0 => {
            settings.window_width = width;
            settings.window_height = height;
            ui::set_window_size(width, height);
            println!("\nWindow size updated.");
        }
        _ => println!("\nInvalid size input."),
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "On"
    } else {
        "Off"
    }
}

fn pause() -> Result<()> {
    ui::wait_any_key("\nPress any key to continue...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_matches_known_digest() {
        // echo -n "password" | sha256sum
        assert_eq!(
            sha256_hex("password"),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
    }

    #[test]
    fn default_settings_have_colors_on_and_no_account() {
        let settings = Settings::default();
        assert!(settings.use_colors);
        assert!(!settings.use_ascii_ui);
        assert!(!settings.has_account());
    }

    #[test]
    fn settings_round_trip_through_json() {
        let mut settings = Settings::default();
        settings.username = "reader".to_string();
        settings.password_hash = sha256_hex("secret");
        settings.backend.model = Some("llama3:70b".to_string());

        let serialized = serde_json::to_string(&settings).expect("serialize settings");
        let restored: Settings = serde_json::from_str(&serialized).expect("parse settings");

        assert_eq!(restored.username, "reader");
        assert!(restored.has_account());
        assert_eq!(restored.backend.model.as_deref(), Some("llama3:70b"));
    }

    #[test]
    fn unknown_fields_in_settings_file_are_tolerated() {
        let raw = r#"{"username":"reader","legacy_field":42}"#;
        let restored: Settings = serde_json::from_str(raw).expect("parse settings");
        assert_eq!(restored.username, "reader");
        assert_eq!(restored.window_width, DEFAULT_WINDOW_WIDTH);
    }
}
