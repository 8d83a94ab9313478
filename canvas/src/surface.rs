use crate::color::Color;
use pictor_geom::DeviceSize;
use serde::{Deserialize, Serialize};

/// Pixel storage formats a [`Bitmap`] marshals to and from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
  #[default]
  Rgba8,
  Bgra8,
  /// Luma plus alpha, two bytes per pixel.
  GrayAlpha8,
  /// Four `f32` channels, native byte order.
  Rgbaf32,
}

impl PixelFormat {
  #[inline]
  pub fn bytes_per_pixel(self) -> usize {
    match self {
      PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
      PixelFormat::GrayAlpha8 => 2,
      PixelFormat::Rgbaf32 => 16,
    }
  }
}

/// A drawing destination the canvas reads and writes one scanline
/// fragment at a time.
///
/// Spans are exchanged as straight (unpremultiplied) `f32` RGBA in the
/// storage gamma space; the canvas owns linearization and
/// premultiplication. Implementations only convert between their storage
/// format and `[Color]`.
pub trait Surface {
  fn size(&self) -> DeviceSize;

  /// Fill `span` with the pixels starting at `(x, y)`. The caller keeps
  /// `x + span.len()` within the surface width.
  fn read_span(&self, x: u32, y: u32, span: &mut [Color]);

  /// Store `span` at `(x, y)`.
  fn write_span(&mut self, x: u32, y: u32, span: &[Color]);
}

/// An owned row-major pixel buffer.
pub struct Bitmap {
  size: DeviceSize,
  format: PixelFormat,
  stride: usize,
  data: Vec<u8>,
}

impl Bitmap {
  /// Create a zeroed (transparent black) bitmap. Dimensions are clamped
  /// to the supported `1..=32768` range.
  pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
    let width = width.clamp(1, 32_768);
    let height = height.clamp(1, 32_768);
    let stride = width as usize * format.bytes_per_pixel();
    Self {
      size: DeviceSize::new(width, height),
      format,
      stride,
      data: vec![0; stride * height as usize],
    }
  }

  /// Wrap existing pixel bytes. Returns `None` when `data` is smaller
  /// than `stride * height`.
  pub fn from_bytes(
    width: u32,
    height: u32,
    format: PixelFormat,
    stride: usize,
    data: Vec<u8>,
  ) -> Option<Self> {
    if width == 0 || height == 0 || width > 32_768 || height > 32_768 {
      return None;
    }
    if stride < width as usize * format.bytes_per_pixel() || data.len() < stride * height as usize {
      return None;
    }
    Some(Self { size: DeviceSize::new(width, height), format, stride, data })
  }

  #[inline]
  pub fn format(&self) -> PixelFormat { self.format }

  #[inline]
  pub fn stride(&self) -> usize { self.stride }

  #[inline]
  pub fn bytes(&self) -> &[u8] { &self.data }

  #[inline]
  pub fn bytes_mut(&mut self) -> &mut [u8] { &mut self.data }

  /// Read back a single pixel as straight gamma-space RGBA.
  pub fn pixel(&self, x: u32, y: u32) -> Color {
    let mut span = [Color::TRANSPARENT];
    self.read_span(x, y, &mut span);
    span[0]
  }

  /// PNG-encode the whole bitmap as 8-bit RGBA into `writer`.
  pub fn png_encode<W: std::io::Write>(&self, writer: W) -> Result<(), png::EncodingError> {
    let DeviceSize { width, height, .. } = self.size;
    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut png_writer = encoder.write_header()?;

    let mut span = vec![Color::TRANSPARENT; width as usize];
    let mut image = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
      self.read_span(0, y, &mut span);
      for c in &span {
        let c = c.clamp_unit();
        image.extend_from_slice(&[
          (c.r * 255. + 0.5) as u8,
          (c.g * 255. + 0.5) as u8,
          (c.b * 255. + 0.5) as u8,
          (c.a * 255. + 0.5) as u8,
        ]);
      }
    }
    png_writer.write_image_data(&image)
  }

  #[inline]
  fn offset(&self, x: u32, y: u32) -> usize {
    y as usize * self.stride + x as usize * self.format.bytes_per_pixel()
  }
}

impl Surface for Bitmap {
  #[inline]
  fn size(&self) -> DeviceSize { self.size }

  fn read_span(&self, x: u32, y: u32, span: &mut [Color]) {
    debug_assert!(x as usize + span.len() <= self.size.width as usize && y < self.size.height);
    let mut at = self.offset(x, y);
    let bpp = self.format.bytes_per_pixel();
    for c in span.iter_mut() {
      let px = &self.data[at..at + bpp];
      *c = match self.format {
        PixelFormat::Rgba8 => Color::from_rgba8(px[0], px[1], px[2], px[3]),
        PixelFormat::Bgra8 => Color::from_rgba8(px[2], px[1], px[0], px[3]),
        PixelFormat::GrayAlpha8 => {
          let l = px[0] as f32 / 255.;
          Color::new(l, l, l, px[1] as f32 / 255.)
        }
        PixelFormat::Rgbaf32 => {
          let mut ch = [0f32; 4];
          for (i, v) in ch.iter_mut().enumerate() {
            *v = f32::from_ne_bytes(px[i * 4..i * 4 + 4].try_into().unwrap());
          }
          Color::new(ch[0], ch[1], ch[2], ch[3])
        }
      };
      at += bpp;
    }
  }

  fn write_span(&mut self, x: u32, y: u32, span: &[Color]) {
    debug_assert!(x as usize + span.len() <= self.size.width as usize && y < self.size.height);
    let bpp = self.format.bytes_per_pixel();
    let mut at = self.offset(x, y);
    for c in span {
      let px = &mut self.data[at..at + bpp];
      let q = c.clamp_unit();
      match self.format {
        PixelFormat::Rgba8 => {
          px.copy_from_slice(&[
            (q.r * 255. + 0.5) as u8,
            (q.g * 255. + 0.5) as u8,
            (q.b * 255. + 0.5) as u8,
            (q.a * 255. + 0.5) as u8,
          ]);
        }
        PixelFormat::Bgra8 => {
          px.copy_from_slice(&[
            (q.b * 255. + 0.5) as u8,
            (q.g * 255. + 0.5) as u8,
            (q.r * 255. + 0.5) as u8,
            (q.a * 255. + 0.5) as u8,
          ]);
        }
        PixelFormat::GrayAlpha8 => {
          let l = 0.2126 * q.r + 0.7152 * q.g + 0.0722 * q.b;
          px.copy_from_slice(&[(l * 255. + 0.5) as u8, (q.a * 255. + 0.5) as u8]);
        }
        PixelFormat::Rgbaf32 => {
          px[0..4].copy_from_slice(&c.r.to_ne_bytes());
          px[4..8].copy_from_slice(&c.g.to_ne_bytes());
          px[8..12].copy_from_slice(&c.b.to_ne_bytes());
          px[12..16].copy_from_slice(&c.a.to_ne_bytes());
        }
      }
      at += bpp;
    }
  }
}
