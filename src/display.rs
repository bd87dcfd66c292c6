use clap::ValueEnum;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliDisplayMode {
  Auto,
  Direct,
  Ascii,
}

/// How thumbnails are drawn into terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
  Ascii,
  /// True-colour half-block cells, two pixels per cell.
  Direct,
}

impl DisplayMode {
  pub fn label(self) -> &'static str {
    match self {
      DisplayMode::Ascii => "ASCII",
      DisplayMode::Direct => "Half-block",
    }
  }

  /// Image pixel rows drawn per terminal row.
  pub fn rows_per_cell(self) -> u32 {
    match self {
      DisplayMode::Ascii => 1,
      DisplayMode::Direct => 2,
    }
  }
}

/// Pick half-block rendering when the terminal advertises true colour.
pub fn detect_display_mode() -> DisplayMode {
  let colorterm = std::env::var("COLORTERM").unwrap_or_default().to_lowercase();
  let term_program = std::env::var("TERM_PROGRAM").unwrap_or_default().to_lowercase();
  if colorterm == "truecolor"
    || colorterm == "24bit"
    || matches!(term_program.as_str(), "kitty" | "wezterm" | "ghostty" | "iterm.app")
  {
    return DisplayMode::Direct;
  }
  DisplayMode::Ascii
}

pub fn resolve_display_mode(cli: CliDisplayMode) -> DisplayMode {
  match cli {
    CliDisplayMode::Auto => detect_display_mode(),
    CliDisplayMode::Direct => DisplayMode::Direct,
    CliDisplayMode::Ascii => DisplayMode::Ascii,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn explicit_modes_bypass_detection() {
    assert_eq!(resolve_display_mode(CliDisplayMode::Ascii), DisplayMode::Ascii);
    assert_eq!(resolve_display_mode(CliDisplayMode::Direct), DisplayMode::Direct);
  }

  #[test]
  fn half_block_packs_two_rows() {
    assert_eq!(DisplayMode::Direct.rows_per_cell(), 2);
    assert_eq!(DisplayMode::Ascii.rows_per_cell(), 1);
    assert_eq!(DisplayMode::Direct.label(), "Half-block");
  }
}
