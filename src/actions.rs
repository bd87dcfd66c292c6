//! Fire-and-forget card actions: open the clip in the system handler, save it to disk.

use anyhow::{Context, Result, anyhow};
use directories::UserDirs;
use futures::{Stream, StreamExt};
use reqwest::{Client, Url};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// What the user picked from a clip's action menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipAction {
  OpenLink { locator: String },
  SaveFile { locator: String, filename: String },
}

#[cfg(target_os = "macos")]
const OPENER: &str = "open";
#[cfg(not(target_os = "macos"))]
const OPENER: &str = "xdg-open";

/// Hand a URL to the platform opener. Returns once the opener has been spawned.
pub fn open_external(url: &Url) -> Result<()> {
  let mut child = tokio::process::Command::new(OPENER)
    .arg(url.as_str())
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .spawn()
    .with_context(|| format!("Failed to launch {}", OPENER))?;
  // Reap the opener so it does not linger as a zombie.
  tokio::spawn(async move {
    if let Ok(status) = child.wait().await
      && !status.success()
    {
      warn!(?status, opener = OPENER, "actions: opener exited with failure");
    }
  });
  info!(url = %url, "actions: opened link");
  Ok(())
}

/// The user's download directory, falling back to the home directory.
pub fn download_dir() -> Result<PathBuf> {
  let dirs = UserDirs::new().context("Could not determine the home directory")?;
  Ok(dirs.download_dir().unwrap_or_else(|| dirs.home_dir()).to_path_buf())
}

/// Reduce a backend filename to a single safe path component.
fn safe_file_name(filename: &str) -> Result<String> {
  let name = filename.rsplit(['/', '\\']).next().unwrap_or_default().trim();
  if name.is_empty() || name == "." || name == ".." {
    return Err(anyhow!("clip has no usable filename ('{}')", filename));
  }
  Ok(name.to_string())
}

const RESERVE_ATTEMPTS: usize = 16;

/// The in-progress name for a download into `target`.
fn part_path(target: &Path) -> PathBuf {
  let mut name = target.file_name().unwrap_or_default().to_os_string();
  name.push(".part");
  target.with_file_name(name)
}

/// First path in `dir` for `name` that is neither saved nor being saved: `a.mp4`, `a (1).mp4`, ...
fn unique_path(dir: &Path, name: &str) -> PathBuf {
  let free = |p: &PathBuf| !p.exists() && !part_path(p).exists();
  let candidate = dir.join(name);
  if free(&candidate) {
    return candidate;
  }
  let (stem, ext) = match name.rsplit_once('.') {
    Some((stem, ext)) if !stem.is_empty() => (stem, format!(".{}", ext)),
    _ => (name, String::new()),
  };
  (1..).map(|n| dir.join(format!("{} ({}){}", stem, n, ext))).find(free).unwrap_or(candidate)
}

/// Claim a target by creating its `.part` file exclusively. Concurrent saves of
/// the same clip end up with distinct targets.
async fn reserve_target(dir: &Path, name: &str) -> Result<(PathBuf, PathBuf, File)> {
  for _ in 0..RESERVE_ATTEMPTS {
    let target = unique_path(dir, name);
    let tmp_path = part_path(&target);
    match OpenOptions::new().write(true).create_new(true).open(&tmp_path).await {
      Ok(file) => return Ok((target, tmp_path, file)),
      Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
      Err(e) => return Err(e).context("Failed to create download file"),
    }
  }
  Err(anyhow!("could not find a free file name for '{}' in {}", name, dir.display()))
}

async fn write_chunks<S, B, E>(stream: S, file: &mut File) -> Result<u64>
where
  S: Stream<Item = std::result::Result<B, E>>,
  B: AsRef<[u8]>,
  E: std::error::Error + Send + Sync + 'static,
{
  let mut stream = std::pin::pin!(stream);
  let mut written: u64 = 0;
  while let Some(chunk) = stream.next().await {
    let chunk = chunk.context("Error downloading clip chunk")?;
    file.write_all(chunk.as_ref()).await.context("Error writing clip file")?;
    written += chunk.as_ref().len() as u64;
  }
  file.flush().await.context("Error flushing clip file")?;
  Ok(written)
}

/// Write `stream` into the reserved `.part` file and move it into place.
/// The `.part` file is removed on any failure.
async fn finish_download<S, B, E>(stream: S, mut file: File, tmp_path: &Path, target: &Path) -> Result<u64>
where
  S: Stream<Item = std::result::Result<B, E>>,
  B: AsRef<[u8]>,
  E: std::error::Error + Send + Sync + 'static,
{
  let result = async {
    let written = write_chunks(stream, &mut file).await?;
    drop(file);
    tokio::fs::rename(tmp_path, target).await.context("Failed to finalize clip file")?;
    Ok::<u64, anyhow::Error>(written)
  }
  .await;
  if result.is_err()
    && let Err(e) = tokio::fs::remove_file(tmp_path).await
  {
    warn!(path = %tmp_path.display(), err = %e, "actions: failed to remove partial download");
  }
  result
}

/// Stream a clip into `dir`, writing to a `.part` file first and renaming when complete.
pub async fn save_clip(client: &Client, url: Url, dir: &Path, filename: &str) -> Result<PathBuf> {
  let name = safe_file_name(filename)?;
  let response = client.get(url.clone()).send().await.with_context(|| format!("Failed to download {}", url))?;
  if !response.status().is_success() {
    return Err(anyhow!("download of {} returned {}", url, response.status()));
  }

  tokio::fs::create_dir_all(dir).await.with_context(|| format!("Failed to create {}", dir.display()))?;
  let (target, tmp_path, file) = reserve_target(dir, &name).await?;
  let written = finish_download(response.bytes_stream(), file, &tmp_path, &target).await?;
  info!(path = %target.display(), bytes = written, "actions: clip saved");
  Ok(target)
}
