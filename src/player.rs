use anyhow::{Context, Result, anyhow};
use reqwest::{Client, StatusCode, Url, header};
use std::process::Stdio;
use tokio::{
  io::{AsyncBufReadExt, BufReader as TokioBufReader},
  process::{Child as TokioChild, Command},
  sync::mpsc,
  task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::clip::ClipId;

/// Check that a media locator is reachable before handing it to the player.
///
/// Uses `HEAD`, falling back to a one-byte ranged `GET` for servers that do
/// not implement `HEAD` for static files.
pub async fn probe_media(client: &Client, url: Url) -> Result<()> {
  let response = client.head(url.clone()).send().await.with_context(|| format!("Failed to reach {}", url))?;
  let status = if response.status() == StatusCode::METHOD_NOT_ALLOWED {
    client
      .get(url.clone())
      .header(header::RANGE, "bytes=0-0")
      .send()
      .await
      .with_context(|| format!("Failed to reach {}", url))?
      .status()
  } else {
    response.status()
  };
  if !status.is_success() {
    return Err(anyhow!("media server answered {}", status));
  }
  Ok(())
}

/// Lifecycle notifications from the external player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
  /// mpv printed its first status line for this clip.
  Started(ClipId),
  /// The mpv process ended. `success` is false when mpv could not play the file.
  Exited { clip: ClipId, success: bool },
}

struct Session {
  clip: ClipId,
  child: TokioChild,
  monitor: JoinHandle<()>,
  status_rx: mpsc::Receiver<String>,
  ipc_socket_path: String,
  started: bool,
}

/// Plays one clip at a time in an external `mpv` window.
pub struct ClipPlayer {
  binary: String,
  session: Option<Session>,
  last_status: Option<String>,
}

impl ClipPlayer {
  pub fn new(binary: impl Into<String>) -> Self {
    Self { binary: binary.into(), session: None, last_status: None }
  }

  pub fn current_clip(&self) -> Option<&ClipId> {
    self.session.as_ref().map(|s| &s.clip)
  }

  pub fn last_status(&self) -> Option<&str> {
    self.last_status.as_deref()
  }

  /// Drain status lines and detect process exit.
  pub fn poll(&mut self) -> Vec<PlayerEvent> {
    let mut events = Vec::new();
    let Some(session) = self.session.as_mut() else { return events };

    while let Ok(line) = session.status_rx.try_recv() {
      if !session.started {
        session.started = true;
        events.push(PlayerEvent::Started(session.clip.clone()));
      }
      self.last_status = Some(line);
    }

    match session.child.try_wait() {
      Ok(Some(status)) => {
        let success = status.success();
        info!(clip = %session.clip, ?status, "player: mpv exited");
        events.push(PlayerEvent::Exited { clip: session.clip.clone(), success });
        self.cleanup();
      }
      Ok(None) => {}
      Err(e) => {
        warn!(err = %e, "player: failed to query mpv status");
      }
    }
    events
  }

  /// Start `clip`, or resume it if it is already the active session.
  pub async fn play(&mut self, clip: &ClipId, url: &Url) -> Result<()> {
    if self.session.as_ref().is_some_and(|s| &s.clip == clip) {
      return self.set_paused(false).await;
    }
    self.stop().await.context("Failed to stop previous playback")?;

    let socket_path = std::env::temp_dir().join(format!("clipterm-mpv-{}.sock", std::process::id()));
    let socket_path_str = socket_path.to_str().context("Temp dir path is not valid UTF-8")?.to_string();
    // Remove stale socket if it exists from a previous crash.
    let _ = std::fs::remove_file(&socket_path);

    let mut cmd = Command::new(&self.binary);
    cmd.args([
      "--force-window=yes",
      "--keep-open=no",
      "--term-status-msg=Time: ${time-pos/full} / ${duration/full} | ${media-title} | ${pause}",
      &format!("--input-ipc-server={}", socket_path_str),
      "--",
      url.as_str(),
    ]);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    // Send stderr to null: if piped but never drained, the pipe buffer fills and mpv blocks.
    cmd.stderr(Stdio::null());

    let mut child = cmd.spawn().map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        anyhow!("mpv not found. Install it with: brew install mpv (macOS) or apt install mpv (Linux)")
      } else {
        anyhow!(e).context("Failed to spawn mpv process")
      }
    })?;

    let stdout = child.stdout.take().context("Failed to get mpv stdout")?;
    let (tx, rx) = mpsc::channel::<String>(10);
    let monitor = tokio::spawn(async move {
      let reader = TokioBufReader::new(stdout);
      let mut lines = reader.lines();
      while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).await.is_err() {
          break;
        }
      }
    });

    info!(clip = %clip, url = %url, "player: mpv started");
    self.session = Some(Session {
      clip: clip.clone(),
      child,
      monitor,
      status_rx: rx,
      ipc_socket_path: socket_path_str,
      started: false,
    });
    Ok(())
  }

  pub async fn pause(&mut self) -> Result<()> {
    self.set_paused(true).await
  }

  async fn set_paused(&mut self, paused: bool) -> Result<()> {
    let Some(ref session) = self.session else {
      return Ok(());
    };
    let stream = tokio::net::UnixStream::connect(&session.ipc_socket_path)
      .await
      .context("Failed to connect to mpv IPC socket")?;
    stream.writable().await.context("mpv IPC socket not writable")?;
    let cmd = format!("{{\"command\":[\"set_property\",\"pause\",{}]}}\n", paused);
    let written = stream.try_write(cmd.as_bytes()).context("Failed to send pause command to mpv")?;
    if written < cmd.len() {
      return Err(anyhow!("Partial write to mpv IPC socket: wrote {} of {} bytes", written, cmd.len()));
    }
    debug!(paused, "player: pause state sent");
    Ok(())
  }

  pub async fn stop(&mut self) -> Result<()> {
    let Some(mut session) = self.session.take() else {
      return Ok(());
    };
    session.monitor.abort();
    let _ = session.monitor.await;
    session.child.kill().await.context("Failed to kill mpv process")?;
    let _ = session.child.wait().await;
    let _ = std::fs::remove_file(&session.ipc_socket_path);
    self.last_status = None;
    Ok(())
  }

  fn cleanup(&mut self) {
    if let Some(session) = self.session.take() {
      session.monitor.abort();
      let _ = std::fs::remove_file(&session.ipc_socket_path);
    }
    self.last_status = None;
  }
}
