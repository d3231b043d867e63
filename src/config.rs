use crate::error::RustyDishError;
use crate::export::ExportOptions;
use crate::export::Locale;
use crate::extract::ExtractRequest;
use crate::footer::FooterConfig;
use crate::footer::MatchMode;
use crate::pipeline::Job;
use crate::spreadsheet::DEFAULT_PREVIEW_ROWS;
use std::env;
use thiserror::Error;

pub const ENV_FOOTER_KEYWORDS: &str = "RUSTY_DISH_FOOTER_KEYWORDS";
pub const ENV_FOOTER_MATCH: &str = "RUSTY_DISH_FOOTER_MATCH";
pub const ENV_PREVIEW_ROWS: &str = "RUSTY_DISH_PREVIEW_ROWS";
pub const ENV_LOCALE: &str = "RUSTY_DISH_LOCALE";
pub const ENV_KEEP_RANK: &str = "RUSTY_DISH_KEEP_RANK";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {name}")]
    InvalidValue { name: &'static str, value: String },
}

/// Host-level defaults, overridable through environment variables.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// `RUSTY_DISH_FOOTER_KEYWORDS` (`|`-separated) and `RUSTY_DISH_FOOTER_MATCH` (`contains` or `equals`)
    pub footer: FooterConfig,
    /// `RUSTY_DISH_PREVIEW_ROWS`
    pub preview_rows: usize,
    /// `RUSTY_DISH_LOCALE` (`zh` or `en`) and `RUSTY_DISH_KEEP_RANK`
    pub export: ExportOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            footer: FooterConfig::default(),
            preview_rows: DEFAULT_PREVIEW_ROWS,
            export: ExportOptions::default(),
        }
    }
}

impl Settings {
    /// Loads settings from the process environment. Unset variables keep their defaults.
    pub fn load() -> Result<Self, RustyDishError> {
        Settings::from_lookup(|name| env::var(name).ok())
    }

    /// Loads settings through `lookup`, which returns the value of a variable if set.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, RustyDishError> {
        let mut settings = Settings::default();
        if let Some(value) = lookup(ENV_FOOTER_KEYWORDS) {
            settings.footer.keywords = value
                .split('|')
                .map(str::trim)
                .filter(|keyword| !keyword.is_empty())
                .map(str::to_owned)
                .collect();
        }
        if let Some(value) = lookup(ENV_FOOTER_MATCH) {
            settings.footer.mode = match value.trim().to_ascii_lowercase().as_str() {
                "contains" => MatchMode::Contains,
                "equals" => MatchMode::Equals,
                _ => Err(invalid(ENV_FOOTER_MATCH, value))?,
            };
        }
        if let Some(value) = lookup(ENV_PREVIEW_ROWS) {
            settings.preview_rows = value
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|rows| *rows > 0)
                .ok_or_else(|| invalid(ENV_PREVIEW_ROWS, value))?;
        }
        if let Some(value) = lookup(ENV_LOCALE) {
            settings.export.locale = match value.trim().to_ascii_lowercase().as_str() {
                "zh" | "zh-cn" | "zh_cn" | "chinese" => Locale::Chinese,
                "en" | "en-us" | "en_us" | "english" => Locale::English,
                _ => Err(invalid(ENV_LOCALE, value))?,
            };
        }
        if let Some(value) = lookup(ENV_KEEP_RANK) {
            settings.export.keep_rank = match value.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => Err(invalid(ENV_KEEP_RANK, value))?,
            };
        }
        Ok(settings)
    }

    /// A job for `request` using these footer settings and default read options.
    pub fn job(&self, request: ExtractRequest) -> Job {
        Job {
            footer: self.footer.clone(),
            ..Job::new(request)
        }
    }
}

fn invalid(name: &'static str, value: String) -> ConfigError {
    ConfigError::InvalidValue { name, value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashMap;

    fn load(variables: &[(&str, &str)]) -> Result<Settings, RustyDishError> {
        let variables = variables
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        Settings::from_lookup(|name| variables.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let settings = load(&[]).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.footer.keywords, vec!["Total", "应用的筛选器", "总计", "合计", "汇总"]);
        assert_eq!(settings.preview_rows, 5);
        assert_eq!(settings.export.locale, Locale::Chinese);
    }

    #[test]
    fn overrides() {
        let settings = load(&[
            (ENV_FOOTER_KEYWORDS, "Grand Total| 小计 ||"),
            (ENV_FOOTER_MATCH, "Equals"),
            (ENV_PREVIEW_ROWS, "10"),
            (ENV_LOCALE, "en"),
            (ENV_KEEP_RANK, "yes"),
        ])
        .unwrap();
        assert_eq!(settings.footer.keywords, vec!["Grand Total", "小计"]);
        assert_eq!(settings.footer.mode, MatchMode::Equals);
        assert_eq!(settings.preview_rows, 10);
        assert_eq!(settings.export, ExportOptions { locale: Locale::English, keep_rank: true });

        let job = settings.job(ExtractRequest::new("flavor", "score", ["奶茶"], 3));
        assert_eq!(job.footer, settings.footer);
    }

    #[test]
    fn invalid_values() {
        for (name, value) in [(ENV_FOOTER_MATCH, "regex"), (ENV_PREVIEW_ROWS, "0"), (ENV_LOCALE, "fr"), (ENV_KEEP_RANK, "maybe")] {
            let error = load(&[(name, value)]).unwrap_err();
            assert_eq!(error.kind(), ErrorKind::Unexpected);
            assert!(matches!(
                error,
                RustyDishError::ConfigError(ConfigError::InvalidValue { name: invalid, .. }) if invalid == name
            ));
        }
    }
}
