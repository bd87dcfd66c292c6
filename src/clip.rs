use anyhow::{Context, Result, anyhow};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque backend identifier of a clip record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipId(pub String);

impl fmt::Display for ClipId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Opaque pagination token. Only meaningful when handed back to the query that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub String);

/// A single video clip record as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
  pub id: ClipId,
  pub filename: String,
  #[serde(rename = "fileURL")]
  pub file_url: String,
  pub file_size: u64,
  /// Seconds, possibly fractional.
  pub duration: f64,
  pub format: String,
  #[serde(default)]
  pub word: Option<String>,
  #[serde(default)]
  pub sentence: Option<String>,
  #[serde(default)]
  pub thumbnail: Option<String>,
}

impl Clip {
  pub fn has_thumbnail(&self) -> bool {
    self.thumbnail.as_deref().is_some_and(|t| !t.trim().is_empty())
  }

  /// Word shown as the card title, falling back to the filename.
  pub fn title(&self) -> &str {
    self.word.as_deref().filter(|w| !w.is_empty()).unwrap_or(&self.filename)
  }

  pub fn format_tag(&self) -> String {
    self.format.to_uppercase()
  }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
  #[serde(default)]
  pub has_next_page: bool,
  #[serde(default)]
  pub has_previous_page: bool,
  #[serde(default)]
  pub start_cursor: Option<Cursor>,
  #[serde(default)]
  pub end_cursor: Option<Cursor>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClipEdge {
  #[serde(default)]
  pub cursor: Option<Cursor>,
  pub node: Option<Clip>,
}

/// One page of a clip connection.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipConnection {
  #[serde(default)]
  pub total_count: usize,
  #[serde(default)]
  pub edges: Vec<ClipEdge>,
  #[serde(default)]
  pub page_info: PageInfo,
}

impl ClipConnection {
  /// Non-null nodes in edge order.
  pub fn into_clips(self) -> Vec<Clip> {
    self.edges.into_iter().filter_map(|e| e.node).collect()
  }
}

// --- Derived display fields ---

/// `M:SS` for a minute or more, otherwise seconds with one decimal (`5.3s`).
pub fn format_duration(seconds: f64) -> String {
  let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
  if seconds < 60.0 {
    return format!("{:.1}s", seconds);
  }
  let whole = seconds.floor() as u64;
  format!("{}:{:02}", whole / 60, whole % 60)
}

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Bytes in the largest fitting unit up to GB, one decimal place above bytes.
pub fn format_file_size(bytes: u64) -> String {
  if bytes < 1024 {
    return format!("{} B", bytes);
  }
  let mut value = bytes as f64;
  let mut unit = 0;
  while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
    value /= 1024.0;
    unit += 1;
  }
  format!("{:.1} {}", value, SIZE_UNITS[unit])
}

// --- Media locators ---

/// Base URL that relative media and thumbnail locators are resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaOrigin(Url);

impl MediaOrigin {
  pub fn parse(raw: &str) -> Result<Self> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
      return Err(anyhow!("media origin is empty"));
    }
    // Without a trailing slash `Url::join` would replace the last path segment.
    let normalized = if trimmed.ends_with('/') { trimmed.to_string() } else { format!("{}/", trimmed) };
    let url = Url::parse(&normalized).with_context(|| format!("Invalid media origin '{}'", raw))?;
    if url.cannot_be_a_base() {
      return Err(anyhow!("media origin '{}' cannot be used as a base URL", raw));
    }
    Ok(Self(url))
  }

  pub fn as_str(&self) -> &str {
    self.0.as_str()
  }

  /// Resolve a backend locator such as `clips/a b.mp4` into an absolute, percent-encoded URL.
  pub fn resolve(&self, locator: &str) -> Result<Url> {
    let relative = locator.trim().trim_start_matches('/');
    if relative.is_empty() {
      return Err(anyhow!("empty media locator"));
    }
    self.0.join(relative).with_context(|| format!("Failed to resolve media locator '{}'", locator))
  }
}

impl fmt::Display for MediaOrigin {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.0.as_str())
  }
}
