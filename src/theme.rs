use ratatui::style::Color;

/// A named colour palette. Cycled with `^t` and remembered in prefs.
#[derive(Debug)]
pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub status: Color,
  pub error: Color,
  pub success: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub static THEMES: [Theme; 3] = [
  Theme {
    name: "Pastel",
    bg: Color::Rgb(30, 30, 46),
    fg: Color::Rgb(205, 214, 244),
    accent: Color::Rgb(245, 194, 231),
    muted: Color::Rgb(127, 132, 156),
    border: Color::Rgb(88, 91, 112),
    highlight_fg: Color::Rgb(30, 30, 46),
    highlight_bg: Color::Rgb(203, 166, 247),
    stripe_bg: Color::Rgb(36, 36, 54),
    status: Color::Rgb(137, 220, 235),
    error: Color::Rgb(243, 139, 168),
    success: Color::Rgb(166, 227, 161),
    key_fg: Color::Rgb(30, 30, 46),
    key_bg: Color::Rgb(180, 190, 254),
  },
  Theme {
    name: "Paper",
    bg: Color::Rgb(250, 248, 240),
    fg: Color::Rgb(60, 56, 54),
    accent: Color::Rgb(214, 93, 14),
    muted: Color::Rgb(146, 131, 116),
    border: Color::Rgb(189, 174, 147),
    highlight_fg: Color::Rgb(250, 248, 240),
    highlight_bg: Color::Rgb(69, 133, 136),
    stripe_bg: Color::Rgb(242, 238, 225),
    status: Color::Rgb(7, 102, 120),
    error: Color::Rgb(157, 0, 6),
    success: Color::Rgb(121, 116, 14),
    key_fg: Color::Rgb(250, 248, 240),
    key_bg: Color::Rgb(102, 92, 84),
  },
  Theme {
    name: "Terminal",
    bg: Color::Reset,
    fg: Color::White,
    accent: Color::Cyan,
    muted: Color::DarkGray,
    border: Color::Gray,
    highlight_fg: Color::Black,
    highlight_bg: Color::Cyan,
    stripe_bg: Color::Reset,
    status: Color::Yellow,
    error: Color::Red,
    success: Color::Green,
    key_fg: Color::Black,
    key_bg: Color::Gray,
  },
];

/// Index of the theme called `name`, case-insensitively. Unknown names fall back to the first theme.
pub fn theme_index(name: Option<&str>) -> usize {
  name.and_then(|n| THEMES.iter().position(|t| t.name.eq_ignore_ascii_case(n))).unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn theme_lookup_ignores_case() {
    assert_eq!(theme_index(Some("paper")), 1);
    assert_eq!(theme_index(Some("TERMINAL")), 2);
  }

  #[test]
  fn unknown_theme_falls_back_to_first() {
    assert_eq!(theme_index(Some("neon")), 0);
    assert_eq!(theme_index(None), 0);
  }
}
