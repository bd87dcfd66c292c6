use anyhow::{Context, Result, anyhow};
use image::{DynamicImage, imageops::FilterType};
use ratatui::{
  buffer::Buffer,
  layout::Rect,
  style::{Color, Style},
  widgets::Widget,
};
use reqwest::{Client, Url};

use crate::display::DisplayMode;

/// Download and decode a thumbnail image.
pub async fn fetch_thumbnail(client: &Client, url: Url) -> Result<DynamicImage> {
  let response = client.get(url.clone()).send().await.with_context(|| format!("Failed to fetch thumbnail {}", url))?;
  if !response.status().is_success() {
    return Err(anyhow!("thumbnail request for {} returned {}", url, response.status()));
  }
  let bytes = response.bytes().await.with_context(|| format!("Failed to read image bytes from {}", url))?;
  image::load_from_memory(&bytes).with_context(|| format!("Failed to decode image from memory (URL: {})", url))
}

/// Scale an image to cover a cell area, accounting for how many pixel rows a cell holds.
pub fn fit_to_area(image: &DynamicImage, area: Rect, mode: DisplayMode) -> DynamicImage {
  let w = u32::from(area.width).max(1);
  let h = (u32::from(area.height) * mode.rows_per_cell()).max(1);
  image.resize_to_fill(w, h, FilterType::Triangle)
}

/// What the thumbnail slot of a card currently holds.
pub enum ThumbnailView<'a> {
  /// An image already scaled with `fit_to_area`.
  Image { image: &'a DynamicImage, mode: DisplayMode },
  /// Placeholder with a play glyph and a caption ("loading thumbnail…", "no thumbnail").
  Placeholder { caption: &'a str, style: Style },
}

const ASCII_RAMP: [&str; 10] = [" ", ".", ":", "-", "=", "+", "*", "#", "%", "@"];
const PLAY_GLYPH: &str = "▶";

impl Widget for ThumbnailView<'_> {
  fn render(self, area: Rect, buf: &mut Buffer) {
    if area.is_empty() {
      return;
    }
    match self {
      ThumbnailView::Image { image, mode: DisplayMode::Direct } => render_half_blocks(image, area, buf),
      ThumbnailView::Image { image, mode: DisplayMode::Ascii } => render_ramp(image, area, buf),
      ThumbnailView::Placeholder { caption, style } => render_placeholder(caption, style, area, buf),
    }
  }
}

fn render_half_blocks(image: &DynamicImage, area: Rect, buf: &mut Buffer) {
  let rgb = image.to_rgb8();
  let cols = rgb.width().min(u32::from(area.width));
  let rows = rgb.height().div_ceil(2).min(u32::from(area.height));
  for row in 0..rows {
    for col in 0..cols {
      let top = rgb.get_pixel(col, row * 2);
      let bottom = if row * 2 + 1 < rgb.height() {
        let p = rgb.get_pixel(col, row * 2 + 1);
        Color::Rgb(p[0], p[1], p[2])
      } else {
        Color::Reset
      };
      let x = area.x + col as u16;
      let y = area.y + row as u16;
      buf.set_string(x, y, "▀", Style::default().fg(Color::Rgb(top[0], top[1], top[2])).bg(bottom));
    }
  }
}

fn render_ramp(image: &DynamicImage, area: Rect, buf: &mut Buffer) {
  let luma = image.to_luma8();
  let cols = luma.width().min(u32::from(area.width));
  let rows = luma.height().min(u32::from(area.height));
  let steps = (ASCII_RAMP.len() - 1) as f32;
  for row in 0..rows {
    for col in 0..cols {
      let level = luma.get_pixel(col, row)[0] as f32 / 255.0;
      let idx = ((level * steps).round() as usize).min(ASCII_RAMP.len() - 1);
      buf.set_string(area.x + col as u16, area.y + row as u16, ASCII_RAMP[idx], Style::default());
    }
  }
}

fn render_placeholder(caption: &str, style: Style, area: Rect, buf: &mut Buffer) {
  let mid = area.y + area.height.saturating_sub(1) / 2;
  let center = |text: &str| {
    let w = unicode_width::UnicodeWidthStr::width(text) as u16;
    area.x + area.width.saturating_sub(w) / 2
  };
  if area.height >= 2 {
    buf.set_string(center(PLAY_GLYPH), mid.saturating_sub(1).max(area.y), PLAY_GLYPH, style);
    buf.set_stringn(center(caption), mid + 1, caption, area.width as usize, style);
  } else {
    buf.set_stringn(center(caption), mid, caption, area.width as usize, style);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  fn solid(w: u32, h: u32, px: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(px)))
  }

  #[test]
  fn fit_accounts_for_half_blocks() {
    let img = solid(160, 90, [10, 20, 30]);
    let area = Rect::new(0, 0, 16, 5);
    let fitted = fit_to_area(&img, area, DisplayMode::Direct);
    assert_eq!((fitted.width(), fitted.height()), (16, 10));
    let fitted = fit_to_area(&img, area, DisplayMode::Ascii);
    assert_eq!((fitted.width(), fitted.height()), (16, 5));
  }

  #[test]
  fn half_blocks_carry_both_pixel_rows() {
    let img = solid(2, 2, [255, 0, 0]);
    let area = Rect::new(0, 0, 2, 1);
    let mut buf = Buffer::empty(area);
    ThumbnailView::Image { image: &img, mode: DisplayMode::Direct }.render(area, &mut buf);
    let cell = &buf[(0, 0)];
    assert_eq!(cell.symbol(), "▀");
    assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
    assert_eq!(cell.bg, Color::Rgb(255, 0, 0));
  }

  #[test]
  fn ascii_ramp_maps_brightness() {
    let area = Rect::new(0, 0, 1, 1);
    let mut buf = Buffer::empty(area);
    ThumbnailView::Image { image: &solid(1, 1, [255, 255, 255]), mode: DisplayMode::Ascii }.render(area, &mut buf);
    assert_eq!(buf[(0, 0)].symbol(), "@");
    ThumbnailView::Image { image: &solid(1, 1, [0, 0, 0]), mode: DisplayMode::Ascii }.render(area, &mut buf);
    assert_eq!(buf[(0, 0)].symbol(), " ");
  }

  #[test]
  fn placeholder_shows_icon_and_caption() {
    let area = Rect::new(0, 0, 20, 4);
    let mut buf = Buffer::empty(area);
    ThumbnailView::Placeholder { caption: "no thumbnail", style: Style::default() }.render(area, &mut buf);
    let rows: Vec<String> =
      (0..4).map(|y| (0..20).map(|x| buf[(x, y)].symbol().to_string()).collect::<String>()).collect();
    assert!(rows.iter().any(|r| r.contains('▶')));
    assert!(rows.iter().any(|r| r.contains("no thumbnail")));
  }
}
