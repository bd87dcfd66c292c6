use anyhow::Result;
use image::DynamicImage;
use ratatui::layout::Rect;
use reqwest::Url;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::actions::{self, ClipAction};
use crate::card::{ClipCard, MediaCommand, ThumbnailStatus};
use crate::clip::{Clip, ClipConnection, ClipId, MediaOrigin};
use crate::config::{Prefs, Settings};
use crate::constants::constants;
use crate::content::Course;
use crate::fetcher::{Direction, FetchRequest, FetchStatus, PaginatedFetcher, Resolution, Ticket, TicketIssuer};
use crate::graphics::fetch_thumbnail;
use crate::graphql::ClipClient;
use crate::grid::{GridAction, GridRequest, Pagination, ResultGrid};
use crate::player::{ClipPlayer, PlayerEvent, probe_media};
use crate::search::DebouncedQuery;
use crate::theme::THEMES;

// --- Types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
  Search,
  Daily,
  Learn,
}

impl Screen {
  pub const ALL: [Screen; 3] = [Screen::Search, Screen::Daily, Screen::Learn];

  pub fn label(self) -> &'static str {
    match self {
      Screen::Search => "Search",
      Screen::Daily => "Daily",
      Screen::Learn => "Learn",
    }
  }

  fn next(self) -> Self {
    let idx = Screen::ALL.iter().position(|s| *s == self).unwrap_or(0);
    Screen::ALL[(idx + 1) % Screen::ALL.len()]
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  Input,
  Results,
  /// An item's action menu has focus.
  Menu,
}

/// What the results pane should show for the committed term.
#[derive(Debug)]
pub enum ResultsView<'a> {
  /// Nothing committed yet: welcome text and suggested tags.
  Empty,
  /// First page in flight with nothing to show yet.
  Loading,
  Failed(&'a str),
  Results(&'a PaginatedFetcher),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
  Info,
  Error,
}

/// Transient message in the status line. Expires after `notice_secs`.
#[derive(Debug, Clone)]
pub struct Notice {
  pub kind: NoticeKind,
  pub text: String,
  created: Instant,
}

type FetchRx = oneshot::Receiver<Result<ClipConnection>>;

/// In-flight background task receivers.
#[derive(Default)]
pub(crate) struct AsyncTasks {
  pub(crate) fetches: Vec<(Ticket, FetchRx)>,
  pub(crate) probes: HashMap<ClipId, oneshot::Receiver<Result<()>>>,
  pub(crate) thumbnails: HashMap<ClipId, (Url, oneshot::Receiver<Result<DynamicImage>>)>,
  pub(crate) saves: Vec<(String, oneshot::Receiver<Result<PathBuf>>)>,
}

enum Polled<T> {
  Pending,
  Ready(T),
  Dropped,
}

fn poll_receiver<T>(rx: &mut oneshot::Receiver<T>) -> Polled<T> {
  match rx.try_recv() {
    Ok(value) => Polled::Ready(value),
    Err(oneshot::error::TryRecvError::Empty) => Polled::Pending,
    Err(oneshot::error::TryRecvError::Closed) => Polled::Dropped,
  }
}

/// Thumbnail already scaled for the card pane, keyed by image URL and area.
pub struct FittedThumbnail {
  pub url: Url,
  pub area: Rect,
  pub image: DynamicImage,
}

pub struct App {
  pub settings: Settings,
  prefs: Prefs,
  pub screen: Screen,
  pub mode: AppMode,
  pub theme_index: usize,
  pub query: DebouncedQuery,
  pub cursor_position: usize,
  pub input_scroll: usize,
  /// Highlighted suggested tag in the empty state.
  pub suggestion: usize,
  /// `None` while the committed term is empty.
  pub fetcher: Option<PaginatedFetcher>,
  tickets: TicketIssuer,
  pub clips: ResultGrid<Clip, ClipAction>,
  pub courses: ResultGrid<Course, String>,
  pub cards: HashMap<ClipId, ClipCard>,
  /// Decoded thumbnails of the loaded clips, keyed by resolved URL.
  pub thumbnails: HashMap<Url, DynamicImage>,
  pub fitted: Option<FittedThumbnail>,
  pub player: ClipPlayer,
  client: ClipClient,
  pub status_message: Option<String>,
  pub notice: Option<Notice>,
  pub should_quit: bool,
  pub(crate) tasks: AsyncTasks,
}

impl App {
  pub fn new(settings: Settings, prefs: Prefs) -> Result<Self> {
    let c = constants();
    let client = ClipClient::new(settings.endpoint.clone(), settings.request_timeout)?;
    let clips = ResultGrid::with_key("Clips", Pagination::Cursor { threshold: c.load_more_threshold }, |clip: &Clip| {
      clip.id.0.clone()
    })
    .with_actions(vec![
      GridAction { label: "Open link", run: |clip: &Clip| ClipAction::OpenLink { locator: clip.file_url.clone() } },
      GridAction {
        label: "Save file",
        run: |clip: &Clip| ClipAction::SaveFile { locator: clip.file_url.clone(), filename: clip.filename.clone() },
      },
    ])
    .with_empty_message("No clips match this search.");
    let courses = ResultGrid::new("Recent courses", Pagination::Offset { per_page: c.offset_page_size, current_page: 1 })
      .with_actions(vec![GridAction { label: "Find clips", run: |course: &Course| course.title.clone() }])
      .with_empty_message("No courses yet.");

    Ok(Self {
      theme_index: settings.theme_index,
      settings,
      prefs,
      screen: Screen::Search,
      mode: AppMode::Input,
      query: DebouncedQuery::new(c.debounce_window()),
      cursor_position: 0,
      input_scroll: 0,
      suggestion: 0,
      fetcher: None,
      tickets: TicketIssuer::default(),
      clips,
      courses,
      cards: HashMap::new(),
      thumbnails: HashMap::new(),
      fitted: None,
      player: ClipPlayer::new(c.mpv_binary.clone()),
      client,
      status_message: None,
      notice: None,
      should_quit: false,
      tasks: AsyncTasks::default(),
    })
  }

  pub fn theme(&self) -> &'static crate::theme::Theme {
    &THEMES[self.theme_index % THEMES.len()]
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.prefs.theme_name = Some(self.theme().name.to_string());
    if let Err(e) = self.prefs.save() {
      warn!(err = %e, "config: failed to save preferences");
    }
  }

  pub fn next_screen(&mut self) {
    self.screen = self.screen.next();
    self.mode = if self.screen == Screen::Search { AppMode::Input } else { AppMode::Results };
  }

  pub fn media_origin(&self) -> &MediaOrigin {
    &self.settings.media_origin
  }

  // --- Notices ---

  pub fn set_error(&mut self, msg: String) {
    warn!(msg = %msg, "notice: error");
    self.notice = Some(Notice { kind: NoticeKind::Error, text: msg, created: Instant::now() });
  }

  pub fn set_info(&mut self, msg: String) {
    self.notice = Some(Notice { kind: NoticeKind::Info, text: msg, created: Instant::now() });
  }

  pub fn clear_error(&mut self) {
    self.notice = None;
  }

  /// Drop the notice once it has been on screen for the notice lifetime.
  pub fn expire_error(&mut self, now: Instant) {
    if let Some(ref notice) = self.notice
      && now.saturating_duration_since(notice.created) >= constants().notice_lifetime()
    {
      self.notice = None;
    }
  }

  // --- Search ---

  pub fn results_view(&self) -> ResultsView<'_> {
    let Some(ref fetcher) = self.fetcher else { return ResultsView::Empty };
    match fetcher.status() {
      FetchStatus::Failed(msg) => ResultsView::Failed(msg),
      FetchStatus::Loading if fetcher.items().is_empty() => ResultsView::Loading,
      _ => ResultsView::Results(fetcher),
    }
  }

  /// Clips currently loaded for the committed term.
  pub fn clip_items(&self) -> &[Clip] {
    self.fetcher.as_ref().map(|f| f.items()).unwrap_or(&[])
  }

  pub fn selected_clip(&self) -> Option<&Clip> {
    self.clips.selected(self.clip_items())
  }

  /// Replace the draft after an edit. The commit follows once typing pauses.
  pub fn set_draft(&mut self, text: String, now: Instant) {
    self.query.on_change(&text, now);
  }

  pub async fn clear_search(&mut self) {
    self.query.on_clear();
    self.cursor_position = 0;
    self.input_scroll = 0;
    self.stop_player("clear").await;
    self.unmount_results();
  }

  /// Commit the draft without waiting for the debounce window.
  pub async fn submit_search(&mut self) {
    if let Some(term) = self.query.flush() {
      self.on_committed(term).await;
    }
    if self.fetcher.is_some() {
      self.mode = AppMode::Results;
    }
  }

  /// Fill the search box with `term` and search for it straight away.
  pub async fn search_for(&mut self, term: &str) {
    self.screen = Screen::Search;
    self.set_draft(term.to_string(), Instant::now());
    self.cursor_position = term.chars().count();
    self.submit_search().await;
  }

  /// Mount a fresh fetcher for a committed term. An empty term unmounts and issues nothing.
  pub fn commit_term(&mut self, term: &str) -> Option<FetchRequest> {
    self.unmount_results();
    let term = term.trim();
    if term.is_empty() {
      debug!("search: empty term, showing empty state");
      return None;
    }
    info!(term = %term, field = self.settings.search_field.label(), "search: term committed");
    let filter = self.settings.search_field.filter_for(term);
    let (fetcher, request) = PaginatedFetcher::mount(filter, self.settings.page_size, &mut self.tickets);
    self.fetcher = Some(fetcher);
    Some(request)
  }

  async fn on_committed(&mut self, term: String) {
    self.stop_player("new search").await;
    if let Some(request) = self.commit_term(&term) {
      self.dispatch_fetch(request);
    }
  }

  /// Stop the player when the results it belongs to go away.
  async fn stop_player(&mut self, reason: &str) {
    if self.player.current_clip().is_some()
      && let Err(e) = self.player.stop().await
    {
      warn!(err = %e, reason, "player: failed to stop");
    }
  }

  fn unmount_results(&mut self) {
    self.fetcher = None;
    self.status_message = None;
    self.clips.reset();
    self.cards.clear();
    self.thumbnails.clear();
    self.fitted = None;
    self.tasks.probes.clear();
    self.tasks.thumbnails.clear();
  }

  /// Re-issue the first page for the current term.
  pub fn refetch(&mut self) {
    let Some(ref mut fetcher) = self.fetcher else { return };
    let request = fetcher.refetch(None, &mut self.tickets);
    self.dispatch_fetch(request);
  }

  fn dispatch_fetch(&mut self, request: FetchRequest) {
    let client = self.client.clone();
    let ticket = request.ticket;
    if ticket.direction == Direction::Initial {
      self.status_message = Some(format!("Searching '{}'…", self.query.committed().trim()));
    }
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(client.fetch_page(&request.filter, &request.window).await);
    });
    self.tasks.fetches.push((ticket, rx));
  }

  /// Apply a finished page request. Returns a follow-up request when the list
  /// still needs more rows to reach its load-more threshold.
  pub fn apply_fetch(&mut self, ticket: Ticket, result: Result<ClipConnection>) -> Option<FetchRequest> {
    let Some(ref mut fetcher) = self.fetcher else {
      debug!(seq = ticket.seq, "search: no results mounted, dropping page");
      return None;
    };
    let resolution = fetcher.resolve(ticket, result);
    if ticket.direction == Direction::Initial && !matches!(resolution, Resolution::Stale) {
      self.status_message = None;
    }
    match resolution {
      Resolution::Stale => None,
      Resolution::Failed(e) => {
        self.set_error(format!("Search failed: {:#}", e));
        None
      }
      Resolution::Applied { added } => {
        debug!(seq = ticket.seq, direction = ?ticket.direction, added, "search: page applied");
        if ticket.direction == Direction::Previous
          && let Some(sel) = self.clips.list_state.selected()
        {
          self.clips.list_state.select(Some(sel + added));
        }
        self.sync_cards();
        let request = self.clips.clamp_selection(self.fetcher.as_ref().map(|f| f.items()).unwrap_or(&[]));
        self.mount_selected();
        match request {
          Some(GridRequest::LoadNext) => self.next_page_request(),
          _ => None,
        }
      }
    }
  }

  fn next_page_request(&mut self) -> Option<FetchRequest> {
    let count = self.settings.page_size;
    self.fetcher.as_mut()?.load_next(count, &mut self.tickets)
  }

  fn previous_page_request(&mut self) -> Option<FetchRequest> {
    let count = self.settings.page_size;
    self.fetcher.as_mut()?.load_previous(count, &mut self.tickets)
  }

  pub fn select_next_clip(&mut self) {
    let items = self.fetcher.as_ref().map(|f| f.items()).unwrap_or(&[]);
    let request = self.clips.select_next(items);
    self.after_navigation(request);
  }

  pub fn select_previous_clip(&mut self) {
    let items = self.fetcher.as_ref().map(|f| f.items()).unwrap_or(&[]);
    let request = self.clips.select_previous(items);
    self.after_navigation(request);
  }

  fn after_navigation(&mut self, request: Option<GridRequest>) {
    let follow_up = match request {
      Some(GridRequest::LoadNext) => self.next_page_request(),
      Some(GridRequest::LoadPrevious) => self.previous_page_request(),
      None => None,
    };
    if let Some(req) = follow_up {
      self.dispatch_fetch(req);
    }
    self.mount_selected();
  }

  /// Keep one card per loaded clip; cards for clips that left the list are dropped.
  fn sync_cards(&mut self) {
    let Some(ref fetcher) = self.fetcher else {
      self.cards.clear();
      return;
    };
    let live: HashSet<&ClipId> = fetcher.items().iter().map(|c| &c.id).collect();
    self.cards.retain(|id, _| live.contains(id));
    self.tasks.thumbnails.retain(|id, _| live.contains(id));
    let origin = &self.settings.media_origin;
    let live_thumbs: HashSet<Url> =
      fetcher.items().iter().filter_map(|c| origin.resolve(c.thumbnail.as_deref()?).ok()).collect();
    self.thumbnails.retain(|url, _| live_thumbs.contains(url));
    for clip in fetcher.items() {
      self
        .cards
        .entry(clip.id.clone())
        .and_modify(|card| {
          card.set_locator(&clip.file_url, clip.has_thumbnail());
        })
        .or_insert_with(|| ClipCard::new(clip.file_url.clone(), clip.has_thumbnail()));
    }
  }

  /// Put the selected clip's card on screen, starting its thumbnail or media load.
  fn mount_selected(&mut self) {
    let Some(clip) = self.selected_clip().cloned() else { return };
    let Some(card) = self.cards.get_mut(&clip.id) else { return };
    let command = card.mount();
    if card.thumbnail == Some(ThumbnailStatus::Loading) {
      let cached = Self::thumbnail_url_in(&self.settings.media_origin, &clip)
        .is_some_and(|url| self.thumbnails.contains_key(&url));
      if cached {
        card.thumbnail_loaded(true);
      } else {
        self.trigger_thumbnail(&clip);
      }
    }
    if command == Some(MediaCommand::Load) {
      self.trigger_probe(&clip.id, &clip.file_url);
    }
  }

  fn thumbnail_url_in(origin: &MediaOrigin, clip: &Clip) -> Option<Url> {
    origin.resolve(clip.thumbnail.as_deref()?).ok()
  }

  /// Decoded thumbnail for `clip`, if it has been fetched for its current locator.
  pub fn thumbnail_for(&self, clip: &Clip) -> Option<(Url, &DynamicImage)> {
    let url = Self::thumbnail_url_in(self.media_origin(), clip)?;
    let image = self.thumbnails.get(&url)?;
    Some((url, image))
  }

  fn trigger_thumbnail(&mut self, clip: &Clip) {
    if self.tasks.thumbnails.contains_key(&clip.id) {
      return;
    }
    let Some(locator) = clip.thumbnail.as_deref() else { return };
    let url = match self.media_origin().resolve(locator) {
      Ok(url) => url,
      Err(e) => {
        debug!(clip = %clip.id, err = %e, "thumbnail: unresolvable locator");
        if let Some(card) = self.cards.get_mut(&clip.id) {
          card.thumbnail_loaded(false);
        }
        return;
      }
    };
    let http = self.client.http().clone();
    let (tx, rx) = oneshot::channel();
    let target = url.clone();
    tokio::spawn(async move {
      let _ = tx.send(fetch_thumbnail(&http, target).await);
    });
    self.tasks.thumbnails.insert(clip.id.clone(), (url, rx));
  }

  fn trigger_probe(&mut self, clip: &ClipId, locator: &str) {
    let url = match self.media_origin().resolve(locator) {
      Ok(url) => url,
      Err(e) => {
        if let Some(card) = self.cards.get_mut(clip) {
          card.media_error(format!("{:#}", e));
        }
        return;
      }
    };
    let http = self.client.http().clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(probe_media(&http, url).await);
    });
    self.tasks.probes.insert(clip.clone(), rx);
  }

  // --- Card controls ---

  /// Play/pause the selected clip.
  pub async fn activate_selected(&mut self) {
    let Some(clip) = self.selected_clip().map(|c| c.id.clone()) else { return };
    let Some(command) = self.cards.get_mut(&clip).and_then(|card| card.activate()) else { return };
    self.run_media_command(&clip, command).await;
  }

  pub fn retry_selected(&mut self) {
    let Some(clip) = self.selected_clip().cloned() else { return };
    if let Some(card) = self.cards.get_mut(&clip.id)
      && card.retry() == Some(MediaCommand::Load)
    {
      info!(clip = %clip.id, "card: retrying media load");
      self.trigger_probe(&clip.id, &clip.file_url);
    }
  }

  pub async fn stop_playback(&mut self) {
    let Some(current) = self.player.current_clip().cloned() else { return };
    if let Err(e) = self.player.stop().await {
      self.set_error(format!("Failed to stop playback: {:#}", e));
    }
    if let Some(card) = self.cards.get_mut(&current) {
      card.media_stopped();
    }
  }

  async fn run_media_command(&mut self, clip: &ClipId, command: MediaCommand) {
    match command {
      MediaCommand::Load => {
        let Some(locator) = self.cards.get(clip).map(|c| c.locator().to_string()) else { return };
        self.trigger_probe(clip, &locator);
      }
      MediaCommand::Play => {
        let Some(locator) = self.cards.get(clip).map(|c| c.locator().to_string()) else { return };
        if let Some(previous) = self.player.current_clip().cloned()
          && &previous != clip
          && let Some(card) = self.cards.get_mut(&previous)
        {
          card.media_stopped();
        }
        let url = self.media_origin().resolve(&locator);
        let result = match url {
          Ok(url) => self.player.play(clip, &url).await,
          Err(e) => Err(e),
        };
        if let Err(e) = result {
          let msg = format!("{:#}", e);
          if let Some(card) = self.cards.get_mut(clip) {
            card.media_error(msg.clone());
          }
          self.set_error(format!("Playback error: {}", msg));
        }
      }
      MediaCommand::Pause => {
        if let Err(e) = self.player.pause().await {
          if let Some(card) = self.cards.get_mut(clip) {
            card.pause_failed();
          }
          self.set_error(format!("Pause error: {:#}", e));
        }
      }
    }
  }

  // --- Action menus ---

  pub fn run_clip_action(&mut self, action: ClipAction) {
    match action {
      ClipAction::OpenLink { locator } => {
        let result = self.media_origin().resolve(&locator).and_then(|url| actions::open_external(&url));
        match result {
          Ok(()) => self.set_info("Opened link in the default handler.".to_string()),
          Err(e) => self.set_error(format!("Failed to open link: {:#}", e)),
        }
      }
      ClipAction::SaveFile { locator, filename } => {
        let target = self.media_origin().resolve(&locator).and_then(|url| Ok((url, actions::download_dir()?)));
        let (url, dir) = match target {
          Ok(t) => t,
          Err(e) => {
            self.set_error(format!("Save failed: {:#}", e));
            return;
          }
        };
        let http = self.client.http().clone();
        let name = filename.clone();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
          let _ = tx.send(actions::save_clip(&http, url, &dir, &name).await);
        });
        self.set_info(format!("Saving {}…", filename));
        self.tasks.saves.push((filename, rx));
      }
    }
  }

  // --- Background polling ---

  /// Advance time-driven state: the debounced commit and notice expiry.
  pub async fn tick(&mut self, now: Instant) {
    if let Some(term) = self.query.poll(now) {
      self.on_committed(term).await;
    }
    self.expire_error(now);
  }

  /// How long the run loop may block waiting for input.
  pub fn poll_timeout(&self, now: Instant) -> Duration {
    let idle = Duration::from_millis(100);
    self.query.time_until_commit(now).map_or(idle, |d| d.min(idle))
  }

  pub async fn check_pending(&mut self) -> Result<()> {
    let mut finished = Vec::new();
    for (ticket, mut rx) in std::mem::take(&mut self.tasks.fetches) {
      match poll_receiver(&mut rx) {
        Polled::Pending => self.tasks.fetches.push((ticket, rx)),
        Polled::Ready(result) => finished.push((ticket, result)),
        Polled::Dropped => finished.push((ticket, Err(anyhow::anyhow!("search task failed")))),
      }
    }
    for (ticket, result) in finished {
      if let Some(request) = self.apply_fetch(ticket, result) {
        self.dispatch_fetch(request);
      }
    }

    let mut probed = Vec::new();
    self.tasks.probes.retain(|clip, rx| match poll_receiver(rx) {
      Polled::Pending => true,
      Polled::Ready(result) => {
        probed.push((clip.clone(), result));
        false
      }
      Polled::Dropped => {
        probed.push((clip.clone(), Err(anyhow::anyhow!("media probe task failed"))));
        false
      }
    });
    for (clip, result) in probed {
      let Some(card) = self.cards.get_mut(&clip) else { continue };
      match result {
        Ok(()) => {
          if let Some(command) = card.media_ready() {
            self.run_media_command(&clip, command).await;
          }
        }
        Err(e) => {
          warn!(clip = %clip, err = %e, "card: media load failed");
          card.media_error(format!("{:#}", e));
        }
      }
    }

    let mut thumbs = Vec::new();
    self.tasks.thumbnails.retain(|clip, (url, rx)| match poll_receiver(rx) {
      Polled::Pending => true,
      Polled::Ready(result) => {
        thumbs.push((clip.clone(), url.clone(), result.ok()));
        false
      }
      Polled::Dropped => {
        thumbs.push((clip.clone(), url.clone(), None));
        false
      }
    });
    for (clip, url, image) in thumbs {
      let ok = image.is_some();
      if let Some(image) = image {
        self.thumbnails.insert(url, image);
      }
      if let Some(card) = self.cards.get_mut(&clip) {
        card.thumbnail_loaded(ok);
      }
    }

    for (name, mut rx) in std::mem::take(&mut self.tasks.saves) {
      match poll_receiver(&mut rx) {
        Polled::Pending => self.tasks.saves.push((name, rx)),
        Polled::Ready(Ok(path)) => self.set_info(format!("Saved {}", path.display())),
        Polled::Ready(Err(e)) => self.set_error(format!("Save failed: {:#}", e)),
        Polled::Dropped => self.set_error(format!("Saving {} was interrupted.", name)),
      }
    }

    for event in self.player.poll() {
      match event {
        PlayerEvent::Started(clip) => debug!(clip = %clip, "player: playback started"),
        PlayerEvent::Exited { clip, success } => {
          let Some(card) = self.cards.get_mut(&clip) else { continue };
          if success {
            card.media_stopped();
          } else {
            card.media_error("mpv could not play this clip");
          }
        }
      }
    }
    Ok(())
  }
}
