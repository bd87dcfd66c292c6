use anyhow::{Context, Result, anyhow};
use clap::ValueEnum;
use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::clip::MediaOrigin;
use crate::constants::constants;
use crate::display::DisplayMode;
use crate::graphql::{ClipField, ClipFilter};
use crate::theme::theme_index;

fn project_dirs() -> Option<ProjectDirs> {
  ProjectDirs::from("", "", "clipterm")
}

/// Where the rolling log files go.
pub fn log_dir() -> Option<PathBuf> {
  project_dirs().map(|d| d.data_local_dir().join("logs"))
}

/// Which clip field the search box matches against.
#[derive(Serialize, Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
  #[default]
  Word,
  Filename,
  /// Word, filename or sentence.
  Any,
}

impl SearchField {
  pub fn label(self) -> &'static str {
    match self {
      SearchField::Word => "word",
      SearchField::Filename => "filename",
      SearchField::Any => "any field",
    }
  }

  /// `<field>Contains: term` predicate for a committed search term.
  pub fn filter_for(self, term: &str) -> ClipFilter {
    match self {
      SearchField::Word => ClipFilter::new().contains(ClipField::Word, term),
      SearchField::Filename => ClipFilter::new().contains(ClipField::Filename, term),
      SearchField::Any => [ClipField::Word, ClipField::Filename, ClipField::Sentence]
        .into_iter()
        .fold(ClipFilter::new(), |filter, field| filter.or(ClipFilter::new().contains(field, term))),
    }
  }
}

/// User preferences persisted as `prefs.toml`.
#[derive(Serialize, Deserialize, Default, Debug, PartialEq)]
pub struct Prefs {
  pub theme_name: Option<String>,
  pub endpoint: Option<String>,
  pub media_origin: Option<String>,
  pub page_size: Option<usize>,
  pub search_field: Option<SearchField>,
}

impl Prefs {
  pub fn load() -> Self {
    if let Some(proj_dirs) = project_dirs() {
      let config_file = proj_dirs.config_dir().join("prefs.toml");
      if let Ok(content) = std::fs::read_to_string(config_file) {
        return Self::parse(&content);
      }
    }
    Self::default()
  }

  /// Malformed files are ignored rather than refusing to start.
  fn parse(content: &str) -> Self {
    match toml::from_str(content) {
      Ok(prefs) => prefs,
      Err(e) => {
        tracing::warn!(err = %e, "config: ignoring malformed prefs.toml");
        Self::default()
      }
    }
  }

  pub fn save(&self) -> Result<()> {
    let proj_dirs = project_dirs().context("No home directory for preferences")?;
    let config_dir = proj_dirs.config_dir();
    std::fs::create_dir_all(config_dir).with_context(|| format!("Failed to create {}", config_dir.display()))?;
    let content = toml::to_string(self).context("Failed to serialize preferences")?;
    std::fs::write(config_dir.join("prefs.toml"), content).context("Failed to write prefs.toml")?;
    Ok(())
  }
}

/// Command-line values that take precedence over preferences.
#[derive(Debug, Default)]
pub struct Overrides {
  pub endpoint: Option<String>,
  pub media_origin: Option<String>,
  pub page_size: Option<usize>,
  pub search_field: Option<SearchField>,
}

/// Fully resolved runtime configuration handed to `App`.
#[derive(Debug, Clone)]
pub struct Settings {
  pub endpoint: Url,
  pub media_origin: MediaOrigin,
  pub page_size: usize,
  pub search_field: SearchField,
  pub theme_index: usize,
  pub display_mode: DisplayMode,
  pub request_timeout: Duration,
}

impl Settings {
  /// Merge CLI overrides over preferences over built-in constants.
  pub fn resolve(cli: Overrides, prefs: &Prefs, display_mode: DisplayMode) -> Result<Self> {
    let c = constants();
    let endpoint_raw = cli.endpoint.or_else(|| prefs.endpoint.clone()).unwrap_or_else(|| c.default_endpoint.clone());
    let endpoint = Url::parse(&endpoint_raw).with_context(|| format!("Invalid GraphQL endpoint '{}'", endpoint_raw))?;
    if !matches!(endpoint.scheme(), "http" | "https") {
      return Err(anyhow!("GraphQL endpoint must be http(s), got '{}'", endpoint_raw));
    }
    let origin_raw =
      cli.media_origin.or_else(|| prefs.media_origin.clone()).unwrap_or_else(|| c.default_media_origin.clone());
    let media_origin = MediaOrigin::parse(&origin_raw)?;
    let page_size = cli.page_size.or(prefs.page_size).unwrap_or(c.page_size);
    if page_size == 0 {
      return Err(anyhow!("page size must be at least 1"));
    }
    Ok(Self {
      endpoint,
      media_origin,
      page_size,
      search_field: cli.search_field.or(prefs.search_field).unwrap_or_default(),
      theme_index: theme_index(prefs.theme_name.as_deref()),
      display_mode,
      request_timeout: Duration::from_secs(c.request_timeout_secs),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_come_from_constants() {
    let s = Settings::resolve(Overrides::default(), &Prefs::default(), DisplayMode::Ascii).unwrap();
    assert_eq!(s.endpoint.as_str(), constants().default_endpoint);
    assert_eq!(s.media_origin.as_str(), constants().default_media_origin);
    assert_eq!(s.page_size, 5);
    assert_eq!(s.search_field, SearchField::Word);
    assert_eq!(s.theme_index, 0);
  }

  #[test]
  fn cli_beats_prefs() {
    let prefs = Prefs {
      endpoint: Some("http://prefs.example/query".into()),
      page_size: Some(8),
      search_field: Some(SearchField::Filename),
      theme_name: Some("Paper".into()),
      ..Prefs::default()
    };
    let cli = Overrides { endpoint: Some("https://cli.example/graphql".into()), ..Overrides::default() };
    let s = Settings::resolve(cli, &prefs, DisplayMode::Direct).unwrap();
    assert_eq!(s.endpoint.as_str(), "https://cli.example/graphql");
    assert_eq!(s.page_size, 8);
    assert_eq!(s.search_field, SearchField::Filename);
    assert_eq!(s.theme_index, 1);
  }

  #[test]
  fn invalid_values_are_rejected() {
    let bad_endpoint = Overrides { endpoint: Some("not a url".into()), ..Overrides::default() };
    assert!(Settings::resolve(bad_endpoint, &Prefs::default(), DisplayMode::Ascii).is_err());
    let ftp = Overrides { endpoint: Some("ftp://host/query".into()), ..Overrides::default() };
    assert!(Settings::resolve(ftp, &Prefs::default(), DisplayMode::Ascii).is_err());
    let zero = Overrides { page_size: Some(0), ..Overrides::default() };
    assert!(Settings::resolve(zero, &Prefs::default(), DisplayMode::Ascii).is_err());
  }

  #[test]
  fn prefs_round_trip_through_toml() {
    let prefs = Prefs { theme_name: Some("Pastel".into()), search_field: Some(SearchField::Filename), ..Prefs::default() };
    let text = toml::to_string(&prefs).unwrap();
    assert!(text.contains("search_field = \"filename\""));
    assert_eq!(Prefs::parse(&text), prefs);
  }

  #[test]
  fn malformed_prefs_fall_back_to_defaults() {
    assert_eq!(Prefs::parse("page_size = \"many\""), Prefs::default());
  }

  #[test]
  fn search_field_builds_contains_filter() {
    let input = SearchField::Filename.filter_for("cat").to_where_input().unwrap();
    assert_eq!(input, serde_json::json!({ "filenameContains": "cat" }));
    let input = SearchField::Word.filter_for("cat").to_where_input().unwrap();
    assert_eq!(input, serde_json::json!({ "wordContains": "cat" }));
  }

  #[test]
  fn any_field_ors_the_text_fields() {
    let input = SearchField::Any.filter_for("cat").to_where_input().unwrap();
    assert_eq!(
      input,
      serde_json::json!({ "or": [
        { "wordContains": "cat" },
        { "filenameContains": "cat" },
        { "sentenceContains": "cat" }
      ] })
    );
  }
}
