use anyhow::{Context, Result};
use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use std::time::Instant;

use crate::app::{App, AppMode, ResultsView, Screen};
use crate::constants::constants;
use crate::content::content;

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

// --- Event Handling ---

pub async fn handle_key_event(app: &mut App, key: event::KeyEvent) -> Result<()> {
  let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
  if ctrl && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return Ok(());
  }

  if ctrl && key.code == KeyCode::Char('t') {
    app.next_theme();
    return Ok(());
  }

  if ctrl && key.code == KeyCode::Char('s') {
    app.stop_playback().await;
    return Ok(());
  }

  if ctrl && key.code == KeyCode::Char('r') {
    app.refetch();
    return Ok(());
  }

  if key.code == KeyCode::Tab {
    app.clips.close_menu();
    app.courses.close_menu();
    app.next_screen();
    return Ok(());
  }

  match (app.screen, app.mode) {
    (_, AppMode::Menu) => handle_menu_key(app, key).await,
    (Screen::Search, AppMode::Input) => handle_input_key(app, key).await,
    (Screen::Search, AppMode::Results) => {
      handle_results_key(app, key).await.context("Failed to handle results key event")?
    }
    (Screen::Daily, _) => handle_daily_key(app, key).await,
    (Screen::Learn, _) => handle_learn_key(app, key),
  }
  Ok(())
}

async fn handle_input_key(app: &mut App, key: event::KeyEvent) {
  let mut text = app.query.draft().to_string();
  match key.code {
    KeyCode::Enter => {
      app.submit_search().await;
      return;
    }
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&text, app.cursor_position);
      text.insert(byte_idx, c);
      app.cursor_position += 1;
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&text, app.cursor_position);
        text.remove(byte_idx);
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < text.chars().count() {
        let byte_idx = char_to_byte_index(&text, app.cursor_position);
        text.remove(byte_idx);
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < text.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = text.chars().count();
    }
    KeyCode::Esc => {
      if !text.is_empty() {
        app.clear_search().await;
      } else {
        app.should_quit = true;
      }
      return;
    }
    KeyCode::Down => {
      app.mode = AppMode::Results;
      return;
    }
    _ => return,
  }
  if text != app.query.draft() {
    app.set_draft(text, Instant::now());
  }
}

async fn handle_results_key(app: &mut App, key: event::KeyEvent) -> Result<()> {
  if matches!(app.results_view(), ResultsView::Empty) {
    handle_suggestion_key(app, key).await;
    return Ok(());
  }
  match key.code {
    KeyCode::Enter | KeyCode::Char(' ') => {
      app.activate_selected().await;
    }
    KeyCode::Down | KeyCode::Char('j') => {
      app.select_next_clip();
    }
    KeyCode::Up | KeyCode::Char('k') => {
      app.select_previous_clip();
    }
    KeyCode::Char('r') => {
      app.retry_selected();
    }
    KeyCode::Char('m') => {
      let items = app.fetcher.as_ref().map(|f| f.items()).unwrap_or(&[]);
      app.clips.toggle_menu(items);
      if app.clips.menu_is_open() {
        app.mode = AppMode::Menu;
      }
    }
    KeyCode::Char('x') => {
      app.clear_error();
    }
    KeyCode::Esc | KeyCode::Char('/') => {
      app.mode = AppMode::Input;
    }
    _ => {}
  }
  Ok(())
}

async fn handle_suggestion_key(app: &mut App, key: event::KeyEvent) {
  let tags = &constants().suggested_tags;
  match key.code {
    KeyCode::Down | KeyCode::Char('j') | KeyCode::Right | KeyCode::Char('l') => {
      if !tags.is_empty() {
        app.suggestion = (app.suggestion + 1) % tags.len();
      }
    }
    KeyCode::Up | KeyCode::Char('k') | KeyCode::Left | KeyCode::Char('h') => {
      if !tags.is_empty() {
        app.suggestion = (app.suggestion + tags.len() - 1) % tags.len();
      }
    }
    KeyCode::Enter => {
      if let Some(tag) = tags.get(app.suggestion) {
        app.search_for(tag).await;
      }
    }
    KeyCode::Char('x') => {
      app.clear_error();
    }
    KeyCode::Esc | KeyCode::Char('/') => {
      app.mode = AppMode::Input;
    }
    _ => {}
  }
}

async fn handle_menu_key(app: &mut App, key: event::KeyEvent) {
  let on_learn = app.screen == Screen::Learn;
  match key.code {
    KeyCode::Down | KeyCode::Char('j') => {
      if on_learn { app.courses.menu_move(1) } else { app.clips.menu_move(1) }
    }
    KeyCode::Up | KeyCode::Char('k') => {
      if on_learn { app.courses.menu_move(-1) } else { app.clips.menu_move(-1) }
    }
    KeyCode::Enter => {
      app.mode = AppMode::Results;
      if on_learn {
        if let Some(term) = app.courses.activate_menu(&content().learning.recent_courses) {
          app.search_for(&term).await;
        }
      } else {
        let items = app.fetcher.as_ref().map(|f| f.items()).unwrap_or(&[]);
        if let Some(action) = app.clips.activate_menu(items) {
          app.run_clip_action(action);
        }
      }
    }
    KeyCode::Esc | KeyCode::Char('m') => {
      app.clips.close_menu();
      app.courses.close_menu();
      app.mode = AppMode::Results;
    }
    _ => {}
  }
}

async fn handle_daily_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter | KeyCode::Char('f') => {
      let word = content().daily.word.clone();
      app.search_for(&word).await;
    }
    KeyCode::Char('x') => app.clear_error(),
    KeyCode::Esc => app.should_quit = true,
    _ => {}
  }
}

fn handle_learn_key(app: &mut App, key: event::KeyEvent) {
  let courses = &content().learning.recent_courses;
  match key.code {
    KeyCode::Down | KeyCode::Char('j') => {
      app.courses.select_next(courses);
    }
    KeyCode::Up | KeyCode::Char('k') => {
      app.courses.select_previous(courses);
    }
    KeyCode::Right | KeyCode::Char('l') => {
      app.courses.next_page(courses.len());
    }
    KeyCode::Left | KeyCode::Char('h') => {
      app.courses.previous_page(courses.len());
    }
    KeyCode::Char(c @ '1'..='9') => {
      if let Some(page) = c.to_digit(10) {
        app.courses.go_to_page(page as usize, courses.len());
      }
    }
    KeyCode::Enter | KeyCode::Char('m') => {
      app.courses.toggle_menu(courses);
      if app.courses.menu_is_open() {
        app.mode = AppMode::Menu;
      }
    }
    KeyCode::Char('x') => app.clear_error(),
    KeyCode::Esc => app.should_quit = true,
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // --- char_to_byte_index ---

  #[test]
  fn char_to_byte_ascii() {
    assert_eq!(char_to_byte_index("hello", 0), 0);
    assert_eq!(char_to_byte_index("hello", 3), 3);
    assert_eq!(char_to_byte_index("hello", 5), 5); // past end
  }

  #[test]
  fn char_to_byte_multibyte() {
    let s = "aé日"; // a=1 byte, é=2 bytes, 日=3 bytes
    assert_eq!(char_to_byte_index(s, 0), 0);
    assert_eq!(char_to_byte_index(s, 1), 1);
    assert_eq!(char_to_byte_index(s, 2), 3);
    assert_eq!(char_to_byte_index(s, 3), 6);
  }

  #[test]
  fn char_to_byte_empty() {
    assert_eq!(char_to_byte_index("", 0), 0);
    assert_eq!(char_to_byte_index("", 5), 0);
  }
}
