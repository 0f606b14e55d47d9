//! Node color lookup
//!
//! Colors come from a `ThemeProvider` (the `[theme.light]`/`[theme.dark]`
//! config tables by default). Unmapped labels fall back to a deterministic
//! palette pick so a node keeps its color across restarts and field-pair
//! changes.

use crate::catalog::UNKNOWN_LABEL;
use flowviz_common::config::ThemeTables;
use sha2::{Digest, Sha256};

/// Palette for light backgrounds
pub const LIGHT_PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Palette for dark backgrounds (brighter tints)
pub const DARK_PALETTE: [&str; 10] = [
    "#4e9fe0", "#ffa54f", "#5fd35f", "#f0605f", "#b99ae0", "#c08f84", "#f5a6dc", "#b0b0b0",
    "#e0e052", "#4fdcea",
];

const UNKNOWN_LIGHT: &str = "#9e9e9e";
const UNKNOWN_DARK: &str = "#616161";

/// Opaque color lookup: `getColor(fieldName, label, isDarkMode)`
pub trait ThemeProvider: Send + Sync {
    /// Configured color token, None when unmapped
    fn color(&self, field: &str, label: &str, dark_mode: bool) -> Option<String>;
}

/// Theme backed by the config file's color tables
#[derive(Debug, Clone, Default)]
pub struct ConfiguredTheme {
    tables: ThemeTables,
}

impl ConfiguredTheme {
    pub fn new(tables: ThemeTables) -> Self {
        Self { tables }
    }
}

impl ThemeProvider for ConfiguredTheme {
    fn color(&self, field: &str, label: &str, dark_mode: bool) -> Option<String> {
        let table = if dark_mode {
            &self.tables.dark
        } else {
            &self.tables.light
        };
        table.get(field)?.get(label).cloned()
    }
}

/// Deterministic palette pick from a SHA-256 digest of `field/label`
pub fn fallback_color(field: &str, label: &str, dark_mode: bool) -> &'static str {
    if label == UNKNOWN_LABEL {
        return if dark_mode { UNKNOWN_DARK } else { UNKNOWN_LIGHT };
    }

    let mut hasher = Sha256::new();
    hasher.update(field.as_bytes());
    hasher.update(b"/");
    hasher.update(label.as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let palette = if dark_mode { &DARK_PALETTE } else { &LIGHT_PALETTE };
    palette[(u64::from_be_bytes(prefix) % palette.len() as u64) as usize]
}

/// Provider color, or the fallback palette pick
pub fn resolve_color(provider: &dyn ThemeProvider, field: &str, label: &str, dark_mode: bool) -> String {
    provider
        .color(field, label, dark_mode)
        .unwrap_or_else(|| fallback_color(field, label, dark_mode).to_string())
}

/// Provider bound to a light/dark mode, as handed to the layout engine
#[derive(Clone, Copy)]
pub struct NodeColors<'a> {
    provider: &'a dyn ThemeProvider,
    dark_mode: bool,
}

impl<'a> NodeColors<'a> {
    pub fn new(provider: &'a dyn ThemeProvider, dark_mode: bool) -> Self {
        Self {
            provider,
            dark_mode,
        }
    }

    pub fn color(&self, field: &str, label: &str) -> String {
        resolve_color(self.provider, field, label, self.dark_mode)
    }
}
