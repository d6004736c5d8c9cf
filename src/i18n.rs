//! Localized message catalog.
//!
//! Each `<lang>.json` file in the locales directory is a flat map of message
//! key → template. Templates use `{{name}}` placeholders. The catalog is
//! loaded once at startup and read-only afterwards.
//!
//! Lookup falls back: requested language → default language → the raw key.

use color_eyre::eyre::{Result, WrapErr};
use std::collections::HashMap;
use std::path::Path;

pub struct Catalog {
    default_lang: String,
    tables: HashMap<String, HashMap<String, String>>,
}

impl Catalog {
    /// Load every `*.json` file in `dir` as a language table.
    pub fn load(dir: &Path, default_lang: &str) -> Result<Self> {
        let entries = std::fs::read_dir(dir)
            .wrap_err_with(|| format!("failed to read locales directory {}", dir.display()))?;

        let mut tables = HashMap::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(lang) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = std::fs::read_to_string(&path)
                .wrap_err_with(|| format!("failed to read {}", path.display()))?;
            let table: HashMap<String, String> = serde_json::from_str(&content)
                .wrap_err_with(|| format!("failed to parse {}", path.display()))?;
            eprintln!("[i18n] Loaded {} messages for language {lang}", table.len());
            tables.insert(lang.to_owned(), table);
        }

        if !tables.contains_key(default_lang) {
            color_eyre::eyre::bail!(
                "no locale file for default language {default_lang:?} in {}",
                dir.display()
            );
        }

        Ok(Self {
            default_lang: default_lang.to_owned(),
            tables,
        })
    }

    /// Build a catalog directly from in-memory tables. Used by tests.
    pub fn from_tables(
        default_lang: &str,
        tables: HashMap<String, HashMap<String, String>>,
    ) -> Self {
        Self {
            default_lang: default_lang.to_owned(),
            tables,
        }
    }

    pub fn default_lang(&self) -> &str {
        &self.default_lang
    }

    /// Render `key` in `lang`, substituting `{{name}}` placeholders from `vars`.
    pub fn render(&self, lang: &str, key: &str, vars: &[(&str, &str)]) -> String {
        let template = self
            .tables
            .get(lang)
            .and_then(|t| t.get(key))
            .or_else(|| self.tables.get(&self.default_lang).and_then(|t| t.get(key)));

        let Some(template) = template else {
            return key.to_owned();
        };

        let mut text = template.clone();
        for (name, value) in vars {
            text = text.replace(&format!("{{{{{name}}}}}"), value);
        }
        text
    }
}
