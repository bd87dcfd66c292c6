//! Debounced search input.
//!
//! Every keystroke updates `draft` immediately; `committed` only follows after
//! the input has been quiet for the debounce window. Time is passed in by the
//! caller so the run loop and tests share one clock.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingCommit {
  value: String,
  due: Instant,
}

#[derive(Debug, Clone)]
pub struct DebouncedQuery {
  draft: String,
  committed: String,
  window: Duration,
  pending: Option<PendingCommit>,
}

impl DebouncedQuery {
  pub fn new(window: Duration) -> Self {
    Self { draft: String::new(), committed: String::new(), window, pending: None }
  }

  /// The text currently shown in the input field.
  pub fn draft(&self) -> &str {
    &self.draft
  }

  /// The value downstream consumers search with.
  pub fn committed(&self) -> &str {
    &self.committed
  }

  pub fn has_pending(&self) -> bool {
    self.pending.is_some()
  }

  /// Record a keystroke. Replaces any pending commit with one due `window` from `now`.
  pub fn on_change(&mut self, raw: &str, now: Instant) {
    self.draft = raw.to_string();
    self.pending = Some(PendingCommit { value: raw.to_string(), due: now + self.window });
  }

  /// Reset both phases to empty without waiting.
  pub fn on_clear(&mut self) {
    self.draft.clear();
    self.committed.clear();
    self.pending = None;
  }

  /// Commit the draft right away. Returns the new committed value if it changed.
  pub fn flush(&mut self) -> Option<String> {
    self.pending = None;
    self.commit(self.draft.clone())
  }

  /// Fire the pending commit once its deadline has passed.
  ///
  /// Returns `Some` exactly once per quiet period, and only when the committed
  /// value actually changes.
  pub fn poll(&mut self, now: Instant) -> Option<String> {
    let due = self.pending.as_ref()?.due;
    if now < due {
      return None;
    }
    let pending = self.pending.take()?;
    self.commit(pending.value)
  }

  /// Time left until the pending commit fires.
  pub fn time_until_commit(&self, now: Instant) -> Option<Duration> {
    self.pending.as_ref().map(|p| p.due.saturating_duration_since(now))
  }

  fn commit(&mut self, value: String) -> Option<String> {
    if value == self.committed {
      return None;
    }
    self.committed = value;
    Some(self.committed.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const WINDOW: Duration = Duration::from_millis(300);

  fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
  }

  #[test]
  fn draft_updates_synchronously() {
    let t0 = Instant::now();
    let mut q = DebouncedQuery::new(WINDOW);
    q.on_change("h", t0);
    assert_eq!(q.draft(), "h");
    assert_eq!(q.committed(), "");
    assert!(q.has_pending());
  }

  #[test]
  fn rapid_typing_commits_last_value_once() {
    let t0 = Instant::now();
    let mut q = DebouncedQuery::new(WINDOW);
    q.on_change("h", t0);
    q.on_change("he", t0 + ms(100));
    q.on_change("hel", t0 + ms(250));
    q.on_change("hell", t0 + ms(400));
    q.on_change("hello", t0 + ms(550));

    // 300ms after "h" but only 150ms after the last keystroke.
    assert_eq!(q.poll(t0 + ms(700)), None);
    assert_eq!(q.committed(), "");

    assert_eq!(q.poll(t0 + ms(850)), Some("hello".to_string()));
    assert_eq!(q.committed(), "hello");
    assert_eq!(q.poll(t0 + ms(2000)), None);
  }

  #[test]
  fn commit_waits_for_full_window() {
    let t0 = Instant::now();
    let mut q = DebouncedQuery::new(WINDOW);
    q.on_change("cat", t0);
    assert_eq!(q.poll(t0 + ms(299)), None);
    assert_eq!(q.time_until_commit(t0 + ms(299)), Some(ms(1)));
    assert_eq!(q.poll(t0 + ms(300)), Some("cat".to_string()));
    assert_eq!(q.time_until_commit(t0 + ms(301)), None);
  }

  #[test]
  fn clear_is_immediate_and_cancels_pending() {
    let t0 = Instant::now();
    let mut q = DebouncedQuery::new(WINDOW);
    q.on_change("dog", t0);
    assert_eq!(q.poll(t0 + ms(300)), Some("dog".to_string()));
    q.on_change("dogs", t0 + ms(400));
    q.on_clear();
    assert_eq!(q.draft(), "");
    assert_eq!(q.committed(), "");
    assert!(!q.has_pending());
    assert_eq!(q.poll(t0 + ms(5000)), None);
  }

  #[test]
  fn retyping_the_committed_value_is_not_a_new_commit() {
    let t0 = Instant::now();
    let mut q = DebouncedQuery::new(WINDOW);
    q.on_change("sun", t0);
    q.poll(t0 + ms(300));
    q.on_change("su", t0 + ms(400));
    q.on_change("sun", t0 + ms(450));
    assert_eq!(q.poll(t0 + ms(800)), None);
    assert_eq!(q.committed(), "sun");
  }

  #[test]
  fn flush_commits_without_waiting() {
    let t0 = Instant::now();
    let mut q = DebouncedQuery::new(WINDOW);
    q.on_change("moon", t0);
    assert_eq!(q.flush(), Some("moon".to_string()));
    assert!(!q.has_pending());
    assert_eq!(q.flush(), None);
  }

  #[test]
  fn clearing_by_typing_commits_empty_after_window() {
    let t0 = Instant::now();
    let mut q = DebouncedQuery::new(WINDOW);
    q.on_change("a", t0);
    q.poll(t0 + ms(300));
    q.on_change("", t0 + ms(400));
    assert_eq!(q.poll(t0 + ms(700)), Some(String::new()));
  }
}
