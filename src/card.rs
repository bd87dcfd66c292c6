//! Per-clip playback state for the video card.
//!
//! One enumerated phase replaces the loose "started / ready / playing" flags so
//! combinations like "playing but not ready" cannot be represented. Every
//! transition is guarded: an event that does not apply to the current phase is
//! rejected and leaves the card untouched.

use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackPhase {
  /// Freshly created, not yet mounted.
  Idle,
  /// Only the thumbnail is on screen; media has not been requested.
  ThumbnailShown,
  /// Media requested, waiting for the backend to report it is playable.
  Loading,
  /// Playable and paused.
  Ready,
  Playing,
  Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailStatus {
  Loading,
  Loaded,
  Failed,
}

/// What the caller must do with the media backend after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCommand {
  /// Start (or restart) loading the card's locator.
  Load,
  Play,
  Pause,
}

#[derive(Debug, Clone)]
pub struct ClipCard {
  locator: String,
  has_thumbnail: bool,
  phase: PlaybackPhase,
  muted: bool,
  revealed: bool,
  /// Set when the user pressed play before the media was ready.
  play_requested: bool,
  pub thumbnail: Option<ThumbnailStatus>,
}

impl ClipCard {
  pub fn new(locator: impl Into<String>, has_thumbnail: bool) -> Self {
    Self {
      locator: locator.into(),
      has_thumbnail,
      phase: PlaybackPhase::Idle,
      muted: true,
      revealed: false,
      play_requested: false,
      thumbnail: None,
    }
  }

  pub fn locator(&self) -> &str {
    &self.locator
  }

  pub fn phase(&self) -> &PlaybackPhase {
    &self.phase
  }

  pub fn is_muted(&self) -> bool {
    self.muted
  }

  /// Whether the video element (rather than the thumbnail) is on screen.
  pub fn is_revealed(&self) -> bool {
    self.revealed
  }

  pub fn is_playing(&self) -> bool {
    self.phase == PlaybackPhase::Playing
  }

  pub fn has_started(&self) -> bool {
    !self.muted
  }

  /// Put the card on screen. With a thumbnail it waits for the user; without
  /// one the video element is revealed and starts loading straight away.
  pub fn mount(&mut self) -> Option<MediaCommand> {
    if self.phase != PlaybackPhase::Idle {
      return None;
    }
    if self.has_thumbnail {
      self.phase = PlaybackPhase::ThumbnailShown;
      self.thumbnail = Some(ThumbnailStatus::Loading);
      None
    } else {
      self.revealed = true;
      self.phase = PlaybackPhase::Loading;
      Some(MediaCommand::Load)
    }
  }

  /// The play/pause control (or the thumbnail) was activated.
  pub fn activate(&mut self) -> Option<MediaCommand> {
    // First activation reveals the video and unmutes it.
    let first = self.muted;
    if !matches!(self.phase, PlaybackPhase::Idle | PlaybackPhase::Error { .. }) && first {
      self.muted = false;
      self.revealed = true;
    }
    let command = match self.phase {
      PlaybackPhase::ThumbnailShown => {
        self.phase = PlaybackPhase::Loading;
        self.play_requested = true;
        Some(MediaCommand::Load)
      }
      PlaybackPhase::Loading => {
        self.play_requested = true;
        None
      }
      PlaybackPhase::Ready => {
        self.phase = PlaybackPhase::Playing;
        Some(MediaCommand::Play)
      }
      PlaybackPhase::Playing => {
        self.phase = PlaybackPhase::Ready;
        Some(MediaCommand::Pause)
      }
      PlaybackPhase::Idle | PlaybackPhase::Error { .. } => None,
    };
    debug!(locator = %self.locator, phase = ?self.phase, "card: activate");
    command
  }

  /// The media backend finished loading. Plays immediately if the user already asked to.
  pub fn media_ready(&mut self) -> Option<MediaCommand> {
    if self.phase != PlaybackPhase::Loading {
      return None;
    }
    if std::mem::take(&mut self.play_requested) {
      self.phase = PlaybackPhase::Playing;
      Some(MediaCommand::Play)
    } else {
      self.phase = PlaybackPhase::Ready;
      None
    }
  }

  /// The backend refused the pause, so the media is still running.
  pub fn pause_failed(&mut self) -> bool {
    if self.phase != PlaybackPhase::Ready {
      return false;
    }
    self.phase = PlaybackPhase::Playing;
    true
  }

  /// Playback reached the end or was stopped externally.
  pub fn media_stopped(&mut self) -> bool {
    if self.phase != PlaybackPhase::Playing {
      return false;
    }
    self.phase = PlaybackPhase::Ready;
    true
  }

  pub fn media_error(&mut self, message: impl Into<String>) -> bool {
    if !matches!(self.phase, PlaybackPhase::Loading | PlaybackPhase::Ready | PlaybackPhase::Playing) {
      return false;
    }
    self.play_requested = false;
    self.phase = PlaybackPhase::Error { message: message.into() };
    true
  }

  /// Re-issue the load from the same locator after an error.
  pub fn retry(&mut self) -> Option<MediaCommand> {
    if !matches!(self.phase, PlaybackPhase::Error { .. }) {
      return None;
    }
    self.phase = PlaybackPhase::Loading;
    self.revealed = true;
    self.play_requested = self.has_started();
    Some(MediaCommand::Load)
  }

  /// Point the card at a different locator, resetting all playback state.
  pub fn set_locator(&mut self, locator: &str, has_thumbnail: bool) -> bool {
    if self.locator == locator && self.has_thumbnail == has_thumbnail {
      return false;
    }
    *self = ClipCard::new(locator, has_thumbnail);
    true
  }

  pub fn thumbnail_loaded(&mut self, ok: bool) {
    if self.thumbnail == Some(ThumbnailStatus::Loading) {
      self.thumbnail = Some(if ok { ThumbnailStatus::Loaded } else { ThumbnailStatus::Failed });
    }
  }

  /// Short label for the status column of the card.
  pub fn phase_label(&self) -> &str {
    match &self.phase {
      PlaybackPhase::Idle => "",
      PlaybackPhase::ThumbnailShown => "press space to play",
      PlaybackPhase::Loading => "loading video…",
      PlaybackPhase::Ready => "paused",
      PlaybackPhase::Playing => "playing",
      PlaybackPhase::Error { .. } => "load failed, press r to retry",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn thumbnail_card_waits_for_activation() {
    let mut card = ClipCard::new("clips/a.mp4", true);
    assert_eq!(card.mount(), None);
    assert_eq!(card.phase(), &PlaybackPhase::ThumbnailShown);
    assert!(card.is_muted());
    assert!(!card.is_revealed());
    assert_eq!(card.thumbnail, Some(ThumbnailStatus::Loading));
  }

  #[test]
  fn card_without_thumbnail_skips_straight_to_loading() {
    let mut card = ClipCard::new("clips/a.mp4", false);
    assert_eq!(card.mount(), Some(MediaCommand::Load));
    assert_eq!(card.phase(), &PlaybackPhase::Loading);
    assert!(card.is_revealed());
    assert_eq!(card.thumbnail, None);
    assert_eq!(card.media_ready(), None);
    assert_eq!(card.phase(), &PlaybackPhase::Ready);
  }

  #[test]
  fn first_activation_reveals_unmutes_and_plays_when_ready() {
    let mut card = ClipCard::new("clips/a.mp4", true);
    card.mount();
    assert_eq!(card.activate(), Some(MediaCommand::Load));
    assert_eq!(card.phase(), &PlaybackPhase::Loading);
    assert!(!card.is_muted());
    assert!(card.is_revealed());
    assert_eq!(card.media_ready(), Some(MediaCommand::Play));
    assert!(card.is_playing());
  }

  #[test]
  fn play_pause_toggles_between_ready_and_playing() {
    let mut card = ClipCard::new("a.mp4", false);
    card.mount();
    card.media_ready();
    assert_eq!(card.activate(), Some(MediaCommand::Play));
    assert_eq!(card.phase(), &PlaybackPhase::Playing);
    assert_eq!(card.activate(), Some(MediaCommand::Pause));
    assert_eq!(card.phase(), &PlaybackPhase::Ready);
    assert_eq!(card.activate(), Some(MediaCommand::Play));
  }

  #[test]
  fn failed_pause_keeps_the_card_playing() {
    let mut card = ClipCard::new("a.mp4", false);
    card.mount();
    card.media_ready();
    card.activate();
    assert_eq!(card.activate(), Some(MediaCommand::Pause));
    assert!(card.pause_failed());
    assert!(card.is_playing());
    assert!(!card.pause_failed(), "a playing card has nothing to revert");
  }

  #[test]
  fn pressing_play_while_loading_defers_until_ready() {
    let mut card = ClipCard::new("a.mp4", false);
    card.mount();
    assert_eq!(card.activate(), None);
    assert_eq!(card.phase(), &PlaybackPhase::Loading);
    assert_eq!(card.media_ready(), Some(MediaCommand::Play));
  }

  #[test]
  fn error_and_retry() {
    let mut card = ClipCard::new("a.mp4", true);
    card.mount();
    card.activate();
    assert!(card.media_error("404"));
    assert_eq!(card.phase(), &PlaybackPhase::Error { message: "404".to_string() });
    assert_eq!(card.activate(), None, "play does nothing in the error state");
    assert_eq!(card.retry(), Some(MediaCommand::Load));
    assert_eq!(card.phase(), &PlaybackPhase::Loading);
    assert_eq!(card.media_ready(), Some(MediaCommand::Play), "retry keeps the user's intent to play");
  }

  #[test]
  fn invalid_transitions_are_rejected() {
    let mut card = ClipCard::new("a.mp4", true);
    assert_eq!(card.media_ready(), None);
    assert!(!card.media_error("x"));
    assert_eq!(card.retry(), None);
    card.mount();
    assert!(!card.media_error("x"), "no media requested yet");
    assert_eq!(card.media_ready(), None);
    assert_eq!(card.phase(), &PlaybackPhase::ThumbnailShown);
    assert_eq!(card.mount(), None, "mounting twice is a no-op");
  }

  #[test]
  fn stopped_media_returns_to_ready() {
    let mut card = ClipCard::new("a.mp4", false);
    card.mount();
    card.media_ready();
    card.activate();
    assert!(card.media_stopped());
    assert_eq!(card.phase(), &PlaybackPhase::Ready);
    assert!(!card.media_stopped());
  }

  #[test]
  fn new_locator_resets_state() {
    let mut card = ClipCard::new("a.mp4", false);
    card.mount();
    card.media_ready();
    card.activate();
    assert!(!card.set_locator("a.mp4", false));
    assert!(card.is_playing());
    assert!(card.set_locator("b.mp4", true));
    assert_eq!(card.phase(), &PlaybackPhase::Idle);
    assert!(card.is_muted());
    assert_eq!(card.locator(), "b.mp4");
  }

  #[test]
  fn thumbnail_failure_keeps_playback_available() {
    let mut card = ClipCard::new("a.mp4", true);
    card.mount();
    card.thumbnail_loaded(false);
    assert_eq!(card.thumbnail, Some(ThumbnailStatus::Failed));
    assert_eq!(card.activate(), Some(MediaCommand::Load));
  }
}
