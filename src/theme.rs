//! Palette for the converter screen
//! Follows the desktop terminal theme when a kitty.conf is found
//! (~/.config/omarchy/current/theme/kitty.conf, then ~/.config/kitty/kitty.conf)

use ratatui::style::Color;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: Color,      // Focused borders, key hints
    pub danger: Color,      // Error panel, counter over the limit
    pub success: Color,     // Success toasts, converted text border
    pub warning: Color,     // Busy placeholder
    pub text: Color,
    pub text_dim: Color,
    pub inactive: Color,    // Unfocused borders, disabled actions
    pub header: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Rgb(137, 180, 250),
            danger: Color::Rgb(243, 139, 168),
            success: Color::Rgb(166, 218, 149),
            warning: Color::Rgb(250, 179, 135),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            inactive: Color::Rgb(88, 91, 112),
            header: Color::Rgb(203, 166, 247),
        }
    }
}

impl Theme {
    pub fn load() -> Self {
        Self::candidate_paths()
            .into_iter()
            .find_map(|path| fs::read_to_string(path).ok())
            .and_then(|content| Self::from_kitty_conf(&content))
            .unwrap_or_default()
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config/omarchy/current/theme/kitty.conf"));
        }
        if let Some(config) = dirs::config_dir() {
            paths.push(config.join("kitty/kitty.conf"));
        }
        paths
    }

    /// Map kitty's 16-colour palette onto our roles; None if it has no colours
    fn from_kitty_conf(content: &str) -> Option<Self> {
        let colors = Self::parse_kitty_conf(content);
        if colors.is_empty() {
            return None;
        }

        let fallback = Self::default();
        let pick = |keys: &[&str], default: Color| {
            keys.iter()
                .find_map(|k| colors.get(*k).copied())
                .unwrap_or(default)
        };

        Some(Self {
            accent: pick(&["color4", "color12"], fallback.accent),
            danger: pick(&["color1", "color9"], fallback.danger),
            success: pick(&["color2", "color10"], fallback.success),
            warning: pick(&["color3", "color11"], fallback.warning),
            text: pick(&["foreground"], fallback.text),
            text_dim: pick(&["color8"], fallback.text_dim),
            inactive: pick(&["inactive_border_color", "color8"], fallback.inactive),
            header: pick(&["color5", "color13"], fallback.header),
        })
    }

    /// Parse kitty.conf format: `key value` or `key #hexcolor`
    fn parse_kitty_conf(content: &str) -> HashMap<String, Color> {
        let mut colors = HashMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once(char::is_whitespace) {
                if let Some(color) = Self::parse_hex_color(value) {
                    colors.insert(key.trim().to_string(), color);
                }
            }
        }

        colors
    }

    /// Parse a hex color string (#RRGGBB or #RGB)
    fn parse_hex_color(s: &str) -> Option<Color> {
        let s = s.trim().trim_start_matches('#');
        if !s.is_ascii() {
            return None;
        }

        match s.len() {
            6 => {
                let r = u8::from_str_radix(&s[0..2], 16).ok()?;
                let g = u8::from_str_radix(&s[2..4], 16).ok()?;
                let b = u8::from_str_radix(&s[4..6], 16).ok()?;
                Some(Color::Rgb(r, g, b))
            }
            3 => {
                let r = u8::from_str_radix(&s[0..1], 16).ok()? * 17;
                let g = u8::from_str_radix(&s[1..2], 16).ok()? * 17;
                let b = u8::from_str_radix(&s[2..3], 16).ok()? * 17;
                Some(Color::Rgb(r, g, b))
            }
            _ => None,
        }
    }
}
