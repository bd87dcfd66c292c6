//! Generic result list state: selection, pagination mode and per-item action menus.
//!
//! The grid does not draw anything itself; `ui.rs` renders the visible slice
//! through a caller-supplied item renderer.

use ratatui::widgets::ListState;
use serde::Serialize;

/// How the grid pages through its data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pagination {
  /// Data is already a server page; ask for more when the selection nears the end.
  Cursor {
    /// Fraction of the viewport height that counts as "near the end".
    threshold: f32,
  },
  /// Data is fully in memory and sliced into fixed windows.
  Offset { per_page: usize, current_page: usize },
}

/// What a cursor-mode grid wants its caller to do after a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridRequest {
  LoadNext,
  LoadPrevious,
}

/// A labelled action offered in an item's action menu.
pub struct GridAction<T, C> {
  pub label: &'static str,
  pub run: fn(&T) -> C,
}

impl<T, C> Clone for GridAction<T, C> {
  fn clone(&self) -> Self {
    Self { label: self.label, run: self.run }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OpenMenu {
  key: String,
  selected: usize,
}

/// Default item key: the item's structural JSON serialization.
pub fn structural_key<T: Serialize>(item: &T) -> String {
  serde_json::to_string(item).unwrap_or_default()
}

pub struct ResultGrid<T, C> {
  pub title: String,
  pub pagination: Pagination,
  pub list_state: ListState,
  pub empty_message: String,
  key_fn: fn(&T) -> String,
  actions: Vec<GridAction<T, C>>,
  menu: Option<OpenMenu>,
  viewport_rows: usize,
}

impl<T: Serialize, C> ResultGrid<T, C> {
  pub fn new(title: impl Into<String>, pagination: Pagination) -> Self {
    Self::with_key(title, pagination, structural_key::<T>)
  }
}

impl<T, C> ResultGrid<T, C> {
  pub fn with_key(title: impl Into<String>, pagination: Pagination, key_fn: fn(&T) -> String) -> Self {
    Self {
      title: title.into(),
      pagination,
      list_state: ListState::default(),
      empty_message: "No data available".to_string(),
      key_fn,
      actions: Vec::new(),
      menu: None,
      viewport_rows: 0,
    }
  }

  pub fn with_actions(mut self, actions: Vec<GridAction<T, C>>) -> Self {
    self.actions = actions;
    self
  }

  pub fn with_empty_message(mut self, message: impl Into<String>) -> Self {
    self.empty_message = message.into();
    self
  }

  pub fn key_of(&self, item: &T) -> String {
    (self.key_fn)(item)
  }

  pub fn actions(&self) -> &[GridAction<T, C>] {
    &self.actions
  }

  /// Remember how many rows the list had on the last draw.
  pub fn set_viewport_rows(&mut self, rows: usize) {
    self.viewport_rows = rows;
  }

  // --- Visible window ---

  /// The items currently on screen: everything in cursor mode, one window in offset mode.
  pub fn visible<'a>(&self, data: &'a [T]) -> &'a [T] {
    match self.pagination {
      Pagination::Cursor { .. } => data,
      Pagination::Offset { per_page, current_page } => {
        let per_page = per_page.max(1);
        let start = current_page.saturating_sub(1).saturating_mul(per_page).min(data.len());
        let end = start.saturating_add(per_page).min(data.len());
        &data[start..end]
      }
    }
  }

  pub fn total_pages(&self, len: usize) -> usize {
    match self.pagination {
      Pagination::Cursor { .. } => 0,
      Pagination::Offset { per_page, .. } => len.div_ceil(per_page.max(1)),
    }
  }

  pub fn current_page(&self) -> Option<usize> {
    match self.pagination {
      Pagination::Offset { current_page, .. } => Some(current_page),
      Pagination::Cursor { .. } => None,
    }
  }

  /// "Showing 5 to 8 of 10 items" for offset grids.
  pub fn range_label(&self, len: usize) -> String {
    match self.pagination {
      Pagination::Cursor { .. } => format!("Showing {} items", len),
      Pagination::Offset { per_page, current_page } => {
        if len == 0 {
          return "Showing 0 items".to_string();
        }
        let first = current_page.saturating_sub(1) * per_page + 1;
        let last = (current_page * per_page).min(len);
        format!("Showing {} to {} of {} items", first, last, len)
      }
    }
  }

  /// Page numbers to offer, at most `max_len`, keeping the current page inside the strip.
  pub fn page_strip(&self, len: usize, max_len: usize) -> Vec<usize> {
    let Some(current) = self.current_page() else { return Vec::new() };
    let total = self.total_pages(len);
    if total <= max_len {
      return (1..=total).collect();
    }
    let half = max_len / 2;
    let start = current.saturating_sub(half).clamp(1, total + 1 - max_len);
    (start..start + max_len).collect()
  }

  // --- Offset navigation ---

  pub fn go_to_page(&mut self, page: usize, len: usize) {
    let total = self.total_pages(len).max(1);
    if let Pagination::Offset { ref mut current_page, .. } = self.pagination {
      *current_page = page.clamp(1, total);
      self.list_state.select(if len == 0 { None } else { Some(0) });
      self.menu = None;
    }
  }

  pub fn next_page(&mut self, len: usize) {
    if let Some(current) = self.current_page() {
      self.go_to_page(current + 1, len);
    }
  }

  pub fn previous_page(&mut self, len: usize) {
    if let Some(current) = self.current_page() {
      self.go_to_page(current.saturating_sub(1), len);
    }
  }

  // --- Selection ---

  /// Move the selection by one row within the visible window.
  ///
  /// In cursor mode this reports `LoadNext` once the selection comes within
  /// the threshold of the end of the loaded data.
  pub fn select_next(&mut self, data: &[T]) -> Option<GridRequest> {
    let count = self.visible(data).len();
    if count == 0 {
      self.list_state.select(None);
      return None;
    }
    let i = self.list_state.selected().map_or(0, |i| (i + 1).min(count - 1));
    self.list_state.select(Some(i));
    self.menu = None;
    self.near_end_request(count)
  }

  pub fn select_previous(&mut self, data: &[T]) -> Option<GridRequest> {
    let count = self.visible(data).len();
    if count == 0 {
      self.list_state.select(None);
      return None;
    }
    let i = self.list_state.selected().map_or(0, |i| i.saturating_sub(1));
    self.list_state.select(Some(i));
    self.menu = None;
    if i == 0 && matches!(self.pagination, Pagination::Cursor { .. }) {
      return Some(GridRequest::LoadPrevious);
    }
    None
  }

  /// Keep the selection valid after the data changed underneath it.
  pub fn clamp_selection(&mut self, data: &[T]) -> Option<GridRequest> {
    let count = self.visible(data).len();
    match (count, self.list_state.selected()) {
      (0, _) => {
        self.list_state.select(None);
        None
      }
      (_, None) => {
        self.list_state.select(Some(0));
        self.near_end_request(count)
      }
      (_, Some(i)) => {
        self.list_state.select(Some(i.min(count - 1)));
        self.near_end_request(count)
      }
    }
  }

  pub fn selected<'a>(&self, data: &'a [T]) -> Option<&'a T> {
    self.list_state.selected().and_then(|i| self.visible(data).get(i))
  }

  /// Reset selection, page and menu, e.g. when the underlying query changes.
  pub fn reset(&mut self) {
    self.list_state = ListState::default();
    self.menu = None;
    if let Pagination::Offset { ref mut current_page, .. } = self.pagination {
      *current_page = 1;
    }
  }

  fn near_end_request(&self, count: usize) -> Option<GridRequest> {
    let Pagination::Cursor { threshold } = self.pagination else { return None };
    let selected = self.list_state.selected()?;
    let remaining = count.saturating_sub(selected + 1);
    let rows = self.viewport_rows.max(1) as f32;
    let window = (rows * threshold).ceil() as usize;
    (remaining <= window).then_some(GridRequest::LoadNext)
  }

  // --- Action menu ---

  pub fn menu_open_for(&self, item: &T) -> bool {
    self.menu.as_ref().is_some_and(|m| m.key == self.key_of(item))
  }

  pub fn menu_is_open(&self) -> bool {
    self.menu.is_some()
  }

  pub fn menu_selection(&self) -> Option<usize> {
    self.menu.as_ref().map(|m| m.selected)
  }

  /// Open the action menu for the selected item, or close it if it is already open.
  pub fn toggle_menu(&mut self, data: &[T]) {
    if self.actions.is_empty() {
      return;
    }
    let Some(item) = self.selected(data) else { return };
    let key = self.key_of(item);
    if self.menu.as_ref().is_some_and(|m| m.key == key) {
      self.menu = None;
    } else {
      self.menu = Some(OpenMenu { key, selected: 0 });
    }
  }

  pub fn close_menu(&mut self) {
    self.menu = None;
  }

  pub fn menu_move(&mut self, delta: isize) {
    let len = self.actions.len();
    if let Some(ref mut menu) = self.menu
      && len > 0
    {
      menu.selected = (menu.selected as isize + delta).rem_euclid(len as isize) as usize;
    }
  }

  /// Run the highlighted action against the item the menu was opened for, closing the menu.
  pub fn activate_menu(&mut self, data: &[T]) -> Option<C> {
    let menu = self.menu.take()?;
    let item = data.iter().find(|item| self.key_of(item) == menu.key)?;
    let action = self.actions.get(menu.selected)?;
    Some((action.run)(item))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, Serialize, PartialEq)]
  struct Row {
    name: &'static str,
    n: u32,
  }

  #[derive(Debug, PartialEq)]
  enum Cmd {
    Open(&'static str),
    Count(u32),
  }

  fn rows(n: u32) -> Vec<Row> {
    (1..=n).map(|n| Row { name: "row", n }).collect()
  }

  fn offset_grid(per_page: usize) -> ResultGrid<Row, Cmd> {
    ResultGrid::new("Rows", Pagination::Offset { per_page, current_page: 1 })
  }

  #[test]
  fn offset_mode_slices_windows() {
    let data = rows(10);
    let mut grid = offset_grid(4);
    assert_eq!(grid.visible(&data).len(), 4);
    assert_eq!(grid.total_pages(data.len()), 3);
    grid.next_page(data.len());
    grid.next_page(data.len());
    assert_eq!(grid.visible(&data).iter().map(|r| r.n).collect::<Vec<_>>(), [9, 10]);
    assert_eq!(grid.range_label(data.len()), "Showing 9 to 10 of 10 items");
    grid.next_page(data.len());
    assert_eq!(grid.current_page(), Some(3));
    grid.go_to_page(0, data.len());
    assert_eq!(grid.current_page(), Some(1));
  }

  #[test]
  fn offset_selection_stays_in_window() {
    let data = rows(6);
    let mut grid = offset_grid(4);
    for _ in 0..10 {
      assert_eq!(grid.select_next(&data), None);
    }
    assert_eq!(grid.list_state.selected(), Some(3));
    assert_eq!(grid.selected(&data).map(|r| r.n), Some(4));
  }

  #[test]
  fn cursor_mode_renders_everything() {
    let data = rows(12);
    let grid: ResultGrid<Row, Cmd> = ResultGrid::new("Rows", Pagination::Cursor { threshold: 0.3 });
    assert_eq!(grid.visible(&data).len(), 12);
    assert_eq!(grid.total_pages(data.len()), 0);
    assert_eq!(grid.range_label(12), "Showing 12 items");
  }

  #[test]
  fn cursor_mode_requests_more_near_end() {
    let data = rows(20);
    let mut grid: ResultGrid<Row, Cmd> = ResultGrid::new("Rows", Pagination::Cursor { threshold: 0.3 });
    grid.set_viewport_rows(10);
    // threshold window = ceil(10 * 0.3) = 3 rows
    let mut requests = Vec::new();
    for _ in 0..19 {
      requests.push(grid.select_next(&data));
    }
    let first = requests.iter().position(|r| *r == Some(GridRequest::LoadNext)).unwrap();
    // selected index 16 leaves 3 rows below
    assert_eq!(first, 16);
  }

  #[test]
  fn short_lists_request_more_immediately() {
    let data = rows(3);
    let mut grid: ResultGrid<Row, Cmd> = ResultGrid::new("Rows", Pagination::Cursor { threshold: 0.3 });
    grid.set_viewport_rows(20);
    assert_eq!(grid.clamp_selection(&data), Some(GridRequest::LoadNext));
  }

  #[test]
  fn top_of_cursor_list_requests_previous() {
    let data = rows(3);
    let mut grid: ResultGrid<Row, Cmd> = ResultGrid::new("Rows", Pagination::Cursor { threshold: 0.3 });
    grid.list_state.select(Some(1));
    assert_eq!(grid.select_previous(&data), Some(GridRequest::LoadPrevious));
  }

  #[test]
  fn page_strip_keeps_current_page_visible() {
    let data = rows(40);
    let mut grid = offset_grid(4);
    assert_eq!(grid.page_strip(data.len(), 5), [1, 2, 3, 4, 5]);
    grid.go_to_page(6, data.len());
    assert_eq!(grid.page_strip(data.len(), 5), [4, 5, 6, 7, 8]);
    grid.go_to_page(10, data.len());
    assert_eq!(grid.page_strip(data.len(), 5), [6, 7, 8, 9, 10]);
    assert_eq!(grid.page_strip(8, 5), [1, 2]);
  }

  #[test]
  fn structural_key_is_default() {
    let grid = offset_grid(4);
    assert_eq!(grid.key_of(&Row { name: "a", n: 1 }), r#"{"name":"a","n":1}"#);
  }

  #[test]
  fn action_menu_runs_against_its_item() {
    let data = rows(3);
    let mut grid = offset_grid(4).with_actions(vec![
      GridAction { label: "Open", run: |_| Cmd::Open("x") },
      GridAction { label: "Count", run: |r: &Row| Cmd::Count(r.n) },
    ]);
    grid.select_next(&data);
    grid.select_next(&data);
    grid.toggle_menu(&data);
    assert!(grid.menu_open_for(&data[1]));
    assert!(!grid.menu_open_for(&data[0]));
    grid.menu_move(1);
    assert_eq!(grid.activate_menu(&data), Some(Cmd::Count(2)));
    assert!(!grid.menu_is_open());
  }

  #[test]
  fn toggling_menu_twice_closes_it() {
    let data = rows(2);
    let mut grid = offset_grid(4).with_actions(vec![GridAction { label: "Open", run: |_| Cmd::Open("x") }]);
    grid.select_next(&data);
    grid.toggle_menu(&data);
    grid.toggle_menu(&data);
    assert!(!grid.menu_is_open());
    grid.menu_move(-1);
    assert_eq!(grid.menu_selection(), None);
  }

  #[test]
  fn menu_without_actions_never_opens() {
    let data = rows(2);
    let mut grid = offset_grid(4);
    grid.select_next(&data);
    grid.toggle_menu(&data);
    assert!(!grid.menu_is_open());
  }

  #[test]
  fn empty_data_clears_selection() {
    let data: Vec<Row> = Vec::new();
    let mut grid = offset_grid(4).with_empty_message("Nothing here");
    assert_eq!(grid.select_next(&data), None);
    assert_eq!(grid.list_state.selected(), None);
    assert_eq!(grid.empty_message, "Nothing here");
    assert_eq!(grid.range_label(0), "Showing 0 items");
  }
}
