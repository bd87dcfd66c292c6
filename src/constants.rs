//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!`, so nothing is read from disk at
//! runtime. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  // Backend
  pub default_endpoint: String,
  pub default_media_origin: String,
  pub request_timeout_secs: u64,

  // Search
  pub debounce_ms: u64,
  pub page_size: usize,
  pub load_more_threshold: f32,
  pub suggested_tags: Vec<String>,

  // Offset grids
  pub offset_page_size: usize,
  pub page_strip_len: usize,

  pub notice_secs: u64,

  pub mpv_binary: String,
}

impl Constants {
  pub fn debounce_window(&self) -> Duration {
    Duration::from_millis(self.debounce_ms)
  }

  pub fn notice_lifetime(&self) -> Duration {
    Duration::from_secs(self.notice_secs)
  }
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time asset error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn embedded_constants_parse() {
    let c = constants();
    assert_eq!(c.debounce_ms, 300);
    assert_eq!(c.page_size, 5);
    assert!(c.load_more_threshold > 0.0 && c.load_more_threshold < 1.0);
    assert!(c.default_media_origin.ends_with('/'));
  }

  #[test]
  fn durations_follow_millis_and_secs() {
    let c = constants();
    assert_eq!(c.debounce_window(), Duration::from_millis(300));
    assert_eq!(c.notice_lifetime(), Duration::from_secs(5));
  }
}
