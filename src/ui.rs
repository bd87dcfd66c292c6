use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Color, Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, Clear, Gauge, List, ListItem, Padding, Paragraph, Wrap},
};

use crate::app::{App, AppMode, FittedThumbnail, NoticeKind, ResultsView, Screen};
use crate::card::{ClipCard, PlaybackPhase, ThumbnailStatus};
use crate::clip::{Clip, format_duration, format_file_size};
use crate::constants::constants;
use crate::content::content;
use crate::fetcher::PaginatedFetcher;
use crate::graphics::{ThumbnailView, fit_to_area};
use crate::theme::Theme;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

/// Text progress bar, e.g. `██████░░░░` for 0.6 at width 10.
fn progress_bar(ratio: f64, width: usize) -> String {
  let filled = ((ratio.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
  format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn rounded(theme: &Theme) -> Block<'static> {
  Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border))
}

/// A `width` x `height` rectangle centred in `area`, clipped to it.
fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
  let w = width.min(area.width);
  let h = height.min(area.height);
  Rect { x: area.x + (area.width - w) / 2, y: area.y + (area.height - h) / 2, width: w, height: h }
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();
  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let input_height = if app.screen == Screen::Search { 3 } else { 0 };
  let [header_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(input_height),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  match app.screen {
    Screen::Search => render_search(frame, app, main_area),
    Screen::Daily => render_daily(frame, theme, main_area),
    Screen::Learn => render_learn(frame, app, main_area),
  }
  render_status(frame, app, status_area);
  if app.screen == Screen::Search {
    render_input(frame, app, input_area);
  }
  render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let mut spans = vec![Span::styled(" ▶ clipterm ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))];
  for screen in Screen::ALL {
    let style = if screen == app.screen {
      Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(theme.muted)
    };
    spans.push(Span::raw(" "));
    spans.push(Span::styled(format!(" {} ", screen.label()), style));
  }
  frame.render_widget(Line::from(spans), area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

// --- Search screen ---

fn render_search(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  match app.results_view() {
    ResultsView::Empty => render_welcome(frame, app, area),
    ResultsView::Loading => {
      let text = vec![
        Line::from(""),
        Line::from(Span::styled(
          format!("Searching '{}'…", app.query.committed().trim()),
          Style::default().fg(theme.status),
        )),
      ];
      frame.render_widget(Paragraph::new(text).alignment(Alignment::Center).block(rounded(theme)), area);
    }
    ResultsView::Failed(msg) => {
      let text = vec![
        Line::from(""),
        Line::from(Span::styled("⚠  Search failed", Style::default().fg(theme.error).add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from(Span::styled(msg.to_string(), Style::default().fg(theme.fg))),
        Line::from(""),
        Line::from(Span::styled("Press ^r to try again.", Style::default().fg(theme.muted))),
      ];
      let paragraph =
        Paragraph::new(text).alignment(Alignment::Center).wrap(Wrap { trim: true }).block(rounded(theme));
      frame.render_widget(paragraph, area);
    }
    ResultsView::Results(_) => {
      let [list_area, card_area] =
        Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)]).areas(area);
      render_clip_list(frame, app, list_area);
      render_card(frame, app, card_area);
      if app.clips.menu_is_open() {
        let labels: Vec<&str> = app.clips.actions().iter().map(|a| a.label).collect();
        render_menu(frame, theme, list_area, &labels, app.clips.menu_selection());
      }
    }
  }
}

fn render_welcome(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let focused = app.mode == AppMode::Results;
  let mut tags = vec![Span::styled("Try: ", Style::default().fg(theme.muted))];
  for (i, tag) in constants().suggested_tags.iter().enumerate() {
    let style = if focused && i == app.suggestion {
      Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(theme.key_fg).bg(theme.key_bg)
    };
    tags.push(Span::styled(format!(" #{} ", tag), style));
    tags.push(Span::raw(" "));
  }
  let text = vec![
    Line::from(""),
    Line::from(Span::styled("▶  Find the clip for any word", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled(
      format!("Type below to search clips by {}.", app.settings.search_field.label()),
      Style::default().fg(theme.fg),
    )),
    Line::from(""),
    Line::from(tags),
    Line::from(""),
    Line::from(Span::styled("↓ to pick a suggestion, Enter to search.", Style::default().fg(theme.muted))),
  ];
  frame.render_widget(Paragraph::new(text).alignment(Alignment::Center).block(rounded(theme)), area);
}

fn clip_line(clip: &Clip, inner_w: usize, fg: Color, muted: Color) -> Line<'static> {
  let right = format!("{}  {}  {}", format_duration(clip.duration), format_file_size(clip.file_size), clip.format_tag());
  let right_w = right.chars().count();
  let title = truncate_str(clip.title(), inner_w.saturating_sub(right_w + 2));
  let gap = inner_w.saturating_sub(title.chars().count() + right_w);
  Line::from(vec![Span::styled(title, Style::default().fg(fg)), Span::raw(" ".repeat(gap)), Span::styled(right, Style::default().fg(muted))])
}

fn list_title(fetcher: &PaginatedFetcher, term: &str) -> String {
  let n = fetcher.total_count();
  let noun = if n == 1 { "clip" } else { "clips" };
  let mut title = format!(" {} {} for '{}' ", n, noun, term.trim());
  if fetcher.is_loading() {
    title.push_str("(refreshing…) ");
  } else if fetcher.is_loading_previous() {
    title.push_str("(loading earlier…) ");
  } else if fetcher.is_loading_next() {
    title.push_str("(loading more…) ");
  }
  title
}

fn render_clip_list(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("▶ ")
  let inner_w = area.width.saturating_sub(4) as usize;
  app.clips.set_viewport_rows(area.height.saturating_sub(2) as usize);

  let Some(ref fetcher) = app.fetcher else { return };
  let title = list_title(fetcher, app.query.committed());
  let items = fetcher.items();
  let footer = app.clips.range_label(items.len());
  let selected = app.clips.list_state.selected();

  let block = rounded(theme)
    .title(title)
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .title_bottom(Line::from(Span::styled(format!(" {} ", footer), Style::default().fg(theme.muted))));

  if items.is_empty() {
    let text = vec![Line::from(""), Line::from(Span::styled(app.clips.empty_message.clone(), Style::default().fg(theme.muted)))];
    frame.render_widget(Paragraph::new(text).alignment(Alignment::Center).block(block), area);
    return;
  }

  let rows: Vec<ListItem> = app
    .clips
    .visible(items)
    .iter()
    .enumerate()
    .map(|(i, clip)| {
      let is_selected = Some(i) == selected;
      let fg = if is_selected { theme.highlight_fg } else { theme.fg };
      let bg = if is_selected {
        theme.highlight_bg
      } else if i % 2 == 1 {
        theme.stripe_bg
      } else {
        theme.bg
      };
      let mut line = clip_line(clip, inner_w.saturating_sub(2), fg, theme.muted);
      let marker = if app.clips.menu_open_for(clip) { "⋯ " } else { "  " };
      line.spans.insert(0, Span::styled(marker, Style::default().fg(theme.accent)));
      ListItem::new(line).bg(bg)
    })
    .collect();

  let list = List::new(rows)
    .block(block)
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));
  frame.render_stateful_widget(list, area, &mut app.clips.list_state);
}

fn phase_style(theme: &Theme, card: &ClipCard) -> Style {
  match card.phase() {
    PlaybackPhase::Playing => Style::default().fg(theme.success),
    PlaybackPhase::Error { .. } => Style::default().fg(theme.error),
    PlaybackPhase::Loading => Style::default().fg(theme.status),
    _ => Style::default().fg(theme.muted),
  }
}

fn render_card(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let Some(clip) = app.selected_clip().cloned() else {
    frame.render_widget(rounded(theme), area);
    return;
  };
  let block = rounded(theme)
    .title(Span::styled(format!(" {} ", clip.title()), Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)))
    .title_bottom(Line::from(Span::styled(
      format!(" [{}] ", app.settings.display_mode.label().to_lowercase()),
      Style::default().fg(theme.muted),
    )))
    .padding(Padding::horizontal(1));
  let inner = block.inner(area);
  frame.render_widget(block, area);

  let thumb_h = ((u32::from(inner.width) * 9 / 32) as u16).clamp(3, inner.height.saturating_sub(6).max(3));
  let [thumb_area, info_area] = Layout::vertical([Constraint::Length(thumb_h), Constraint::Min(0)]).areas(inner);

  let card = app.cards.get(&clip.id).cloned();
  render_thumbnail(frame, app, &clip, card, thumb_area);

  let inner_w = info_area.width as usize;
  let mut lines = vec![Line::from("")];
  if let Some(ref sentence) = clip.sentence {
    lines.push(Line::from(Span::styled(format!("“{}”", sentence), Style::default().fg(theme.fg).add_modifier(Modifier::ITALIC))));
    lines.push(Line::from(""));
  }
  for (label, value) in [
    ("File      ", truncate_str(&clip.filename, inner_w.saturating_sub(10))),
    ("Duration  ", format_duration(clip.duration)),
    ("Size      ", format_file_size(clip.file_size)),
    ("Format    ", clip.format_tag()),
  ] {
    lines.push(Line::from(vec![
      Span::styled(label, Style::default().fg(theme.muted)),
      Span::styled(value, Style::default().fg(theme.fg)),
    ]));
  }
  lines.push(Line::from(""));
  if let Some(card) = app.cards.get(&clip.id) {
    let mut phase = vec![Span::styled(card.phase_label().to_string(), phase_style(theme, card))];
    if card.is_revealed() {
      let sound = if card.is_muted() { "muted" } else { "sound on" };
      phase.push(Span::styled(format!("  ·  {}", sound), Style::default().fg(theme.muted)));
    }
    lines.push(Line::from(phase));
    if let PlaybackPhase::Error { message } = card.phase() {
      lines.push(Line::from(Span::styled(truncate_str(message, inner_w), Style::default().fg(theme.error))));
    }
    if card.is_playing()
      && app.player.current_clip() == Some(&clip.id)
      && let Some(status) = app.player.last_status()
    {
      lines.push(Line::from(Span::styled(format!("♪ {}", truncate_str(status, inner_w.saturating_sub(2))), Style::default().fg(theme.status))));
    }
  }
  frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), info_area);
}

fn render_thumbnail(frame: &mut Frame, app: &mut App, clip: &Clip, card: Option<ClipCard>, area: Rect) {
  let theme = app.theme();
  let placeholder = Style::default().fg(theme.muted);
  let status = card.as_ref().and_then(|c| c.thumbnail);

  if status == Some(ThumbnailStatus::Loaded)
    && let Some((url, image)) = app.thumbnail_for(clip)
  {
    let stale = app.fitted.as_ref().is_none_or(|f| f.url != url || f.area != area);
    let refit = stale.then(|| fit_to_area(image, area, app.settings.display_mode));
    if let Some(image) = refit {
      app.fitted = Some(FittedThumbnail { url, area, image });
    }
    if let Some(ref fitted) = app.fitted {
      frame.render_widget(ThumbnailView::Image { image: &fitted.image, mode: app.settings.display_mode }, area);
    }
    return;
  }

  let caption = match (status, card.as_ref().map(|c| c.phase())) {
    (Some(ThumbnailStatus::Loading), _) => "loading thumbnail…",
    (Some(ThumbnailStatus::Failed), _) => "thumbnail unavailable",
    (_, Some(PlaybackPhase::Playing)) => "playing in mpv",
    (_, Some(PlaybackPhase::Loading)) => "loading video…",
    (_, Some(PlaybackPhase::Error { .. })) => "video failed to load",
    _ => "no thumbnail",
  };
  frame.render_widget(ThumbnailView::Placeholder { caption, style: placeholder }, area);
}

fn render_menu(frame: &mut Frame, theme: &Theme, area: Rect, labels: &[&str], selected: Option<usize>) {
  let width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 8;
  let popup = popup_area(area, width, labels.len() as u16 + 2);
  let items: Vec<ListItem> = labels
    .iter()
    .enumerate()
    .map(|(i, label)| {
      let style = if Some(i) == selected {
        Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD)
      } else {
        Style::default().fg(theme.fg)
      };
      ListItem::new(Line::from(Span::styled(format!(" {} ", label), style)))
    })
    .collect();
  let block = rounded(theme)
    .title(" Actions ")
    .title_style(Style::default().fg(theme.accent))
    .border_style(Style::default().fg(theme.accent))
    .style(Style::default().bg(theme.bg));
  frame.render_widget(Clear, popup);
  frame.render_widget(List::new(items).block(block), popup);
}

// --- Daily screen ---

fn render_daily(frame: &mut Frame, theme: &Theme, area: Rect) {
  let daily = &content().daily;
  let today = chrono::Local::now().format("%A, %B %-d, %Y").to_string();
  let badge = |text: &str| Span::styled(format!(" {} ", text), Style::default().fg(theme.key_fg).bg(theme.key_bg));

  let mut lines = vec![
    Line::from(Span::styled(today, Style::default().fg(theme.muted))),
    Line::from(""),
    Line::from(Span::styled(daily.word.clone(), Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
    Line::from(vec![badge(&daily.part_of_speech), Span::raw(" "), badge(&daily.level)]),
    Line::from(""),
    Line::from(Span::styled("Meaning", Style::default().fg(theme.muted).add_modifier(Modifier::BOLD))),
    Line::from(Span::styled(daily.meaning.clone(), Style::default().fg(theme.fg))),
    Line::from(Span::styled(daily.translation.clone(), Style::default().fg(theme.muted))),
    Line::from(""),
    Line::from(Span::styled("Examples", Style::default().fg(theme.muted).add_modifier(Modifier::BOLD))),
  ];
  for example in &daily.examples {
    lines.push(Line::from(Span::styled(format!("• {}", example.text), Style::default().fg(theme.fg))));
    lines.push(Line::from(Span::styled(format!("  {}", example.translation), Style::default().fg(theme.muted))));
  }
  lines.push(Line::from(""));
  lines.push(Line::from(vec![
    Span::styled(" Enter ", Style::default().fg(theme.key_fg).bg(theme.key_bg)),
    Span::styled(format!(" find clips for '{}'", daily.word), Style::default().fg(theme.muted)),
  ]));

  let block = rounded(theme)
    .title(" Word of the day ")
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .padding(Padding::new(2, 2, 1, 0));
  frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }).block(block), area);
}

// --- Learn screen ---

fn render_learn(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let learning = &content().learning;
  let [summary_area, courses_area] = Layout::vertical([Constraint::Length(5), Constraint::Min(3)]).areas(area);
  let [goal_area, stats_area] =
    Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(summary_area);

  let goal = &learning.daily_goal;
  let gauge = Gauge::default()
    .block(rounded(theme).title(" Daily goal ").title_style(Style::default().fg(theme.accent)))
    .gauge_style(Style::default().fg(theme.accent).bg(theme.stripe_bg))
    .ratio(goal.ratio())
    .label(format!("{} / {} {}", goal.current, goal.target, goal.unit));
  frame.render_widget(gauge, goal_area);

  let stats = vec![
    Line::from(Span::styled(
      format!("🔥 {} day streak", learning.streak_days),
      Style::default().fg(theme.status).add_modifier(Modifier::BOLD),
    )),
    Line::from(vec![
      Span::styled(format!("{}", learning.stats.words_learned), Style::default().fg(theme.fg).add_modifier(Modifier::BOLD)),
      Span::styled(" words learned   ", Style::default().fg(theme.muted)),
      Span::styled(format!("{}", learning.stats.videos_completed), Style::default().fg(theme.fg).add_modifier(Modifier::BOLD)),
      Span::styled(" videos completed", Style::default().fg(theme.muted)),
    ]),
  ];
  frame.render_widget(
    Paragraph::new(stats).block(rounded(theme).title(" Progress ").title_style(Style::default().fg(theme.accent)).padding(Padding::horizontal(1))),
    stats_area,
  );

  render_courses(frame, app, courses_area);
}

fn render_courses(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let courses = &content().learning.recent_courses;
  let grid = &app.courses;
  let inner_w = area.width.saturating_sub(4) as usize;

  let strip: Vec<Span> = grid
    .page_strip(courses.len(), constants().page_strip_len)
    .into_iter()
    .flat_map(|page| {
      let style = if Some(page) == grid.current_page() {
        Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD)
      } else {
        Style::default().fg(theme.muted)
      };
      [Span::styled(format!(" {} ", page), style), Span::raw(" ")]
    })
    .collect();
  let mut bottom = vec![Span::styled(format!(" {}  ", grid.range_label(courses.len())), Style::default().fg(theme.muted))];
  bottom.push(Span::styled("‹ ", Style::default().fg(theme.muted)));
  bottom.extend(strip);
  bottom.push(Span::styled("› ", Style::default().fg(theme.muted)));

  let block = rounded(theme)
    .title(format!(" {} ", grid.title))
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .title_bottom(Line::from(bottom));

  let visible = grid.visible(courses);
  if visible.is_empty() {
    let text = Line::from(Span::styled(grid.empty_message.clone(), Style::default().fg(theme.muted)));
    frame.render_widget(Paragraph::new(text).alignment(Alignment::Center).block(block), area);
    return;
  }

  let bar_w = 12;
  let items: Vec<ListItem> = visible
    .iter()
    .map(|course| {
      let pct = format!("{:>3}%", course.progress.clamp(0, 100));
      let right = format!("{} {}", progress_bar(course.progress_ratio(), bar_w), pct);
      let title = truncate_str(&course.title, inner_w.saturating_sub(right.chars().count() + 2));
      let gap = inner_w.saturating_sub(title.chars().count() + right.chars().count());
      ListItem::new(vec![
        Line::from(vec![
          Span::styled(title, Style::default().fg(theme.fg).add_modifier(Modifier::BOLD)),
          Span::raw(" ".repeat(gap)),
          Span::styled(right, Style::default().fg(theme.accent)),
        ]),
        Line::from(Span::styled(format!("{} · {}", course.category, course.last_seen), Style::default().fg(theme.muted))),
      ])
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().bg(theme.stripe_bg));
  let labels: Vec<&str> = app.courses.actions().iter().map(|a| a.label).collect();
  let menu_selection = app.courses.menu_selection();
  let menu_open = app.courses.menu_is_open();
  frame.render_stateful_widget(list, area, &mut app.courses.list_state);
  if menu_open {
    render_menu(frame, theme, area, &labels, menu_selection);
  }
}

// --- Status, input, footer ---

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(msg) = &app.status_message {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(notice) = &app.notice {
    match notice.kind {
      NoticeKind::Error => (format!(" ⚠  {}  (x to dismiss)", notice.text), Style::default().fg(theme.error)),
      NoticeKind::Info => (format!(" ✓ {}", notice.text), Style::default().fg(theme.success)),
    }
  } else if let Some(status) = app.player.last_status() {
    (format!(" ♪ {}", status), Style::default().fg(theme.status))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let border_color = if app.mode == AppMode::Input { theme.accent } else { theme.border };
  let pending = if app.query.has_pending() { " · typing…" } else { "" };
  let input_block = Block::bordered()
    .title(format!(" Search clips by {}{} ", app.settings.search_field.label(), pending))
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let draft = app.query.draft();
  let cursor_col = display_width(draft, app.cursor_position);

  if cursor_col < app.input_scroll {
    app.input_scroll = cursor_col;
  } else if cursor_col >= app.input_scroll + inner_w {
    app.input_scroll = cursor_col.saturating_sub(inner_w) + 1;
  }
  let scroll = app.input_scroll;

  let visible: String = draft
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= scroll)
    .take_while(|(start, _, _)| *start < scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if app.mode == AppMode::Input {
    let cursor_x = area.x + 2 + (cursor_col - scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

fn footer_keys(app: &App) -> Vec<(&'static str, &'static str)> {
  let is_playing = app.player.current_clip().is_some();
  let mut keys = match (app.screen, app.mode) {
    (_, AppMode::Menu) => vec![("j/k", "Choose"), ("Enter", "Run"), ("Esc", "Close")],
    (Screen::Search, AppMode::Input) => vec![("Enter", "Search"), ("↓", "Results"), ("Esc", "Clear")],
    (Screen::Search, AppMode::Results) => match app.results_view() {
      ResultsView::Empty => vec![("j/k", "Suggestion"), ("Enter", "Search"), ("Esc", "Edit")],
      _ => vec![("Space", "Play/Pause"), ("j/k", "Navigate"), ("m", "Actions"), ("r", "Retry"), ("^r", "Refetch"), ("Esc", "Edit")],
    },
    (Screen::Daily, _) => vec![("Enter", "Find clips"), ("Esc", "Quit")],
    (Screen::Learn, _) => vec![("j/k", "Navigate"), ("h/l", "Page"), ("1-9", "Go to page"), ("Enter", "Actions")],
  };
  if is_playing {
    keys.push(("^s", "Stop"));
  }
  keys.push(("Tab", "Screen"));
  keys.push(("^t", "Theme"));
  keys
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let keys = footer_keys(app);
  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw(" "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}
