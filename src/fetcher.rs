//! Cursor-paginated clip fetcher.
//!
//! The fetcher never performs I/O itself: it hands out `FetchRequest`s, the
//! caller runs them, and the results come back through `resolve`. Each request
//! carries a `Ticket` whose sequence number is unique across all fetchers, and a
//! result is only applied when its ticket is the one the fetcher is still
//! waiting for in that slot. Superseded and unmounted requests are dropped.

use anyhow::{Error, Result};
use std::collections::HashSet;
use tracing::debug;

use crate::clip::{Clip, ClipConnection, PageInfo};
use crate::graphql::{ClipFilter, PageWindow};

/// Issues monotonically increasing request sequence numbers.
#[derive(Debug, Default)]
pub struct TicketIssuer {
  last: u64,
}

impl TicketIssuer {
  fn issue(&mut self, direction: Direction) -> Ticket {
    self.last += 1;
    Ticket { seq: self.last, direction }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Initial,
  Next,
  Previous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
  pub seq: u64,
  pub direction: Direction,
}

/// A query the caller should execute and report back with `resolve`.
#[derive(Debug, Clone)]
pub struct FetchRequest {
  pub ticket: Ticket,
  pub filter: ClipFilter,
  pub window: PageWindow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchStatus {
  Loading,
  Loaded,
  Failed(String),
}

/// What `resolve` did with a result.
#[derive(Debug)]
pub enum Resolution {
  Applied { added: usize },
  /// The ticket was superseded; the result was discarded.
  Stale,
  Failed(Error),
}

#[derive(Debug)]
pub struct PaginatedFetcher {
  filter: ClipFilter,
  page_size: usize,
  items: Vec<Clip>,
  total_count: usize,
  page_info: PageInfo,
  status: FetchStatus,
  initial: Option<u64>,
  next: Option<u64>,
  previous: Option<u64>,
}

impl PaginatedFetcher {
  /// Create a fetcher for `filter` together with its first-page request.
  pub fn mount(filter: ClipFilter, page_size: usize, tickets: &mut TicketIssuer) -> (Self, FetchRequest) {
    let mut fetcher = Self {
      filter,
      page_size: page_size.max(1),
      items: Vec::new(),
      total_count: 0,
      page_info: PageInfo::default(),
      status: FetchStatus::Loading,
      initial: None,
      next: None,
      previous: None,
    };
    let request = fetcher.refetch(None, tickets);
    (fetcher, request)
  }

  pub fn items(&self) -> &[Clip] {
    &self.items
  }

  pub fn total_count(&self) -> usize {
    self.total_count
  }

  pub fn page_info(&self) -> &PageInfo {
    &self.page_info
  }

  pub fn status(&self) -> &FetchStatus {
    &self.status
  }

  pub fn has_next(&self) -> bool {
    self.page_info.has_next_page
  }

  pub fn has_previous(&self) -> bool {
    self.page_info.has_previous_page
  }

  pub fn is_loading(&self) -> bool {
    self.initial.is_some()
  }

  pub fn is_loading_next(&self) -> bool {
    self.next.is_some()
  }

  pub fn is_loading_previous(&self) -> bool {
    self.previous.is_some()
  }

  /// Request the page after the last loaded item.
  ///
  /// No-op while a forward load is in flight, before the first page has
  /// arrived, or when the backend reported no further pages.
  pub fn load_next(&mut self, count: usize, tickets: &mut TicketIssuer) -> Option<FetchRequest> {
    if self.is_loading_next() || self.is_loading() || !self.has_next() {
      return None;
    }
    let after = self.page_info.end_cursor.clone()?;
    let ticket = tickets.issue(Direction::Next);
    self.next = Some(ticket.seq);
    debug!(seq = ticket.seq, count, "fetcher: load next");
    Some(FetchRequest {
      ticket,
      filter: self.filter.clone(),
      window: PageWindow::Forward { count: count.max(1), after: Some(after) },
    })
  }

  /// Request the page before the first loaded item.
  pub fn load_previous(&mut self, count: usize, tickets: &mut TicketIssuer) -> Option<FetchRequest> {
    if self.is_loading_previous() || self.is_loading() || !self.has_previous() {
      return None;
    }
    let before = self.page_info.start_cursor.clone()?;
    let ticket = tickets.issue(Direction::Previous);
    self.previous = Some(ticket.seq);
    debug!(seq = ticket.seq, count, "fetcher: load previous");
    Some(FetchRequest { ticket, filter: self.filter.clone(), window: PageWindow::Backward { count: count.max(1), before } })
  }

  /// Re-issue the first page, optionally with a new filter.
  ///
  /// Any in-flight page loads are abandoned. Current items stay visible until
  /// the new first page replaces them.
  pub fn refetch(&mut self, filter: Option<ClipFilter>, tickets: &mut TicketIssuer) -> FetchRequest {
    if let Some(filter) = filter {
      self.filter = filter;
    }
    let ticket = tickets.issue(Direction::Initial);
    self.initial = Some(ticket.seq);
    self.next = None;
    self.previous = None;
    self.status = FetchStatus::Loading;
    debug!(seq = ticket.seq, "fetcher: initial page");
    FetchRequest {
      ticket,
      filter: self.filter.clone(),
      window: PageWindow::Forward { count: self.page_size, after: None },
    }
  }

  /// Apply the result of a request previously handed out by this fetcher.
  pub fn resolve(&mut self, ticket: Ticket, result: Result<ClipConnection>) -> Resolution {
    let slot = match ticket.direction {
      Direction::Initial => &mut self.initial,
      Direction::Next => &mut self.next,
      Direction::Previous => &mut self.previous,
    };
    if *slot != Some(ticket.seq) {
      debug!(seq = ticket.seq, direction = ?ticket.direction, "fetcher: dropping stale result");
      return Resolution::Stale;
    }
    *slot = None;

    let page = match result {
      Ok(page) => page,
      Err(e) => {
        if ticket.direction == Direction::Initial {
          self.items.clear();
          self.page_info = PageInfo::default();
          self.total_count = 0;
          self.status = FetchStatus::Failed(format!("{:#}", e));
        }
        return Resolution::Failed(e);
      }
    };

    let total_count = page.total_count;
    let info = page.page_info.clone();
    let clips = page.into_clips();
    let added = match ticket.direction {
      Direction::Initial => {
        self.items = clips;
        self.page_info = info;
        self.items.len()
      }
      Direction::Next => {
        let fresh = self.dedup(clips);
        let n = fresh.len();
        self.items.extend(fresh);
        self.page_info.has_next_page = info.has_next_page;
        if info.end_cursor.is_some() {
          self.page_info.end_cursor = info.end_cursor;
        }
        n
      }
      Direction::Previous => {
        let fresh = self.dedup(clips);
        let n = fresh.len();
        self.items.splice(0..0, fresh);
        self.page_info.has_previous_page = info.has_previous_page;
        if info.start_cursor.is_some() {
          self.page_info.start_cursor = info.start_cursor;
        }
        n
      }
    };
    self.total_count = total_count;
    self.status = FetchStatus::Loaded;
    Resolution::Applied { added }
  }

  fn dedup(&self, incoming: Vec<Clip>) -> Vec<Clip> {
    let seen: HashSet<&str> = self.items.iter().map(|c| c.id.0.as_str()).collect();
    incoming.into_iter().filter(|c| !seen.contains(c.id.0.as_str())).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::clip::{ClipEdge, ClipId, Cursor};
  use crate::graphql::ClipField;
  use anyhow::anyhow;

  fn clip(id: &str) -> Clip {
    Clip {
      id: ClipId(id.to_string()),
      filename: format!("{}.mp4", id),
      file_url: format!("clips/{}.mp4", id),
      file_size: 1024,
      duration: 2.0,
      format: "mp4".to_string(),
      word: Some(id.to_string()),
      sentence: None,
      thumbnail: None,
    }
  }

  fn page(ids: &[&str], has_next: bool, has_previous: bool) -> ClipConnection {
    ClipConnection {
      total_count: 20,
      edges: ids.iter().map(|id| ClipEdge { cursor: Some(Cursor(format!("c-{}", id))), node: Some(clip(id)) }).collect(),
      page_info: PageInfo {
        has_next_page: has_next,
        has_previous_page: has_previous,
        start_cursor: ids.first().map(|id| Cursor(format!("c-{}", id))),
        end_cursor: ids.last().map(|id| Cursor(format!("c-{}", id))),
      },
    }
  }

  fn ids(f: &PaginatedFetcher) -> Vec<&str> {
    f.items().iter().map(|c| c.id.0.as_str()).collect()
  }

  fn mounted(tickets: &mut TicketIssuer) -> (PaginatedFetcher, FetchRequest) {
    PaginatedFetcher::mount(ClipFilter::new().contains(ClipField::Word, "a"), 5, tickets)
  }

  #[test]
  fn mount_requests_first_page_with_page_size() {
    let mut tickets = TicketIssuer::default();
    let (f, req) = mounted(&mut tickets);
    assert_eq!(req.ticket.direction, Direction::Initial);
    assert_eq!(req.window, PageWindow::Forward { count: 5, after: None });
    assert!(f.is_loading());
    assert_eq!(f.status(), &FetchStatus::Loading);
  }

  #[test]
  fn first_page_populates_items() {
    let mut tickets = TicketIssuer::default();
    let (mut f, req) = mounted(&mut tickets);
    let r = f.resolve(req.ticket, Ok(page(&["1", "2"], true, false)));
    assert!(matches!(r, Resolution::Applied { added: 2 }));
    assert_eq!(ids(&f), ["1", "2"]);
    assert_eq!(f.total_count(), 20);
    assert!(f.has_next());
    assert_eq!(f.status(), &FetchStatus::Loaded);
  }

  #[test]
  fn load_next_is_guarded_while_in_flight() {
    let mut tickets = TicketIssuer::default();
    let (mut f, req) = mounted(&mut tickets);
    f.resolve(req.ticket, Ok(page(&["1", "2"], true, false)));

    let first = f.load_next(5, &mut tickets).expect("first load_next issues a request");
    assert_eq!(first.window, PageWindow::Forward { count: 5, after: Some(Cursor("c-2".into())) });
    for _ in 0..10 {
      assert!(f.load_next(5, &mut tickets).is_none());
    }
    assert!(f.is_loading_next());

    f.resolve(first.ticket, Ok(page(&["3", "4"], false, true)));
    assert_eq!(ids(&f), ["1", "2", "3", "4"]);
    assert!(!f.is_loading_next());
    assert!(f.load_next(5, &mut tickets).is_none(), "no request once has_next is false");
  }

  #[test]
  fn load_next_waits_for_first_page() {
    let mut tickets = TicketIssuer::default();
    let (mut f, _req) = mounted(&mut tickets);
    assert!(f.load_next(5, &mut tickets).is_none());
  }

  #[test]
  fn load_previous_prepends() {
    let mut tickets = TicketIssuer::default();
    let (mut f, req) = mounted(&mut tickets);
    f.resolve(req.ticket, Ok(page(&["5", "6"], false, true)));
    let prev = f.load_previous(2, &mut tickets).unwrap();
    assert_eq!(prev.window, PageWindow::Backward { count: 2, before: Cursor("c-5".into()) });
    assert!(f.load_previous(2, &mut tickets).is_none());
    f.resolve(prev.ticket, Ok(page(&["3", "4"], true, false)));
    assert_eq!(ids(&f), ["3", "4", "5", "6"]);
    assert!(!f.has_previous());
    assert_eq!(f.page_info().start_cursor, Some(Cursor("c-3".into())));
  }

  #[test]
  fn overlapping_pages_are_deduplicated() {
    let mut tickets = TicketIssuer::default();
    let (mut f, req) = mounted(&mut tickets);
    f.resolve(req.ticket, Ok(page(&["1", "2"], true, false)));
    let next = f.load_next(5, &mut tickets).unwrap();
    let r = f.resolve(next.ticket, Ok(page(&["2", "3"], false, true)));
    assert!(matches!(r, Resolution::Applied { added: 1 }));
    assert_eq!(ids(&f), ["1", "2", "3"]);
  }

  #[test]
  fn refetch_abandons_in_flight_pages() {
    let mut tickets = TicketIssuer::default();
    let (mut f, req) = mounted(&mut tickets);
    f.resolve(req.ticket, Ok(page(&["1"], true, false)));
    let next = f.load_next(5, &mut tickets).unwrap();

    let again = f.refetch(Some(ClipFilter::new().contains(ClipField::Word, "b")), &mut tickets);
    assert!(matches!(f.resolve(next.ticket, Ok(page(&["old"], false, false))), Resolution::Stale));
    assert_eq!(ids(&f), ["1"], "old items stay until the new first page arrives");

    f.resolve(again.ticket, Ok(page(&["b1", "b2"], false, false)));
    assert_eq!(ids(&f), ["b1", "b2"]);
  }

  #[test]
  fn only_latest_initial_request_applies() {
    let mut tickets = TicketIssuer::default();
    let (mut f, first) = mounted(&mut tickets);
    let second = f.refetch(None, &mut tickets);
    assert!(second.ticket.seq > first.ticket.seq);

    // The newer response arrives first, then the older one.
    f.resolve(second.ticket, Ok(page(&["new"], false, false)));
    assert!(matches!(f.resolve(first.ticket, Ok(page(&["old"], false, false))), Resolution::Stale));
    assert_eq!(ids(&f), ["new"]);
  }

  #[test]
  fn tickets_from_another_fetcher_are_stale() {
    let mut tickets = TicketIssuer::default();
    let (_old, old_req) = mounted(&mut tickets);
    let (mut current, req) = mounted(&mut tickets);
    assert!(matches!(current.resolve(old_req.ticket, Ok(page(&["x"], false, false))), Resolution::Stale));
    assert!(current.is_loading());
    current.resolve(req.ticket, Ok(page(&["y"], false, false)));
    assert_eq!(ids(&current), ["y"]);
  }

  #[test]
  fn initial_failure_marks_fetcher_failed() {
    let mut tickets = TicketIssuer::default();
    let (mut f, req) = mounted(&mut tickets);
    let r = f.resolve(req.ticket, Err(anyhow!("connection refused")));
    assert!(matches!(r, Resolution::Failed(_)));
    assert_eq!(f.status(), &FetchStatus::Failed("connection refused".to_string()));
    assert!(!f.is_loading());
  }

  #[test]
  fn next_page_failure_keeps_items_and_allows_retry() {
    let mut tickets = TicketIssuer::default();
    let (mut f, req) = mounted(&mut tickets);
    f.resolve(req.ticket, Ok(page(&["1"], true, false)));
    let next = f.load_next(5, &mut tickets).unwrap();
    assert!(matches!(f.resolve(next.ticket, Err(anyhow!("timeout"))), Resolution::Failed(_)));
    assert_eq!(ids(&f), ["1"]);
    assert_eq!(f.status(), &FetchStatus::Loaded);
    assert!(f.load_next(5, &mut tickets).is_some());
  }

  #[test]
  fn duplicate_delivery_of_same_ticket_is_stale() {
    let mut tickets = TicketIssuer::default();
    let (mut f, req) = mounted(&mut tickets);
    f.resolve(req.ticket, Ok(page(&["1"], false, false)));
    assert!(matches!(f.resolve(req.ticket, Ok(page(&["2"], false, false))), Resolution::Stale));
  }
}
