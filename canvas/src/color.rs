use serde::{Deserialize, Serialize};

/// Alpha below this threshold carries less than one representable bit of
/// color information; unpremultiplying such a pixel collapses it to
/// transparent black.
pub(crate) const ALPHA_CUTOFF: f32 = 1. / 8160.;

/// A straight (unpremultiplied) RGBA color with `f32` channels.
///
/// Values handed to the canvas are in gamma space; the rendering core
/// converts them to linearized, premultiplied form on entry and back on
/// the way out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Color {
  pub r: f32,
  pub g: f32,
  pub b: f32,
  pub a: f32,
}

/// The gamma curve a canvas applies when converting between storage and
/// linear color, chosen at canvas creation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gamma {
  /// Storage values are already linear.
  None,
  /// Square to linearize, square root to store. A cheap approximation of
  /// the sRGB curve.
  Pow2,
  /// The standard piecewise sRGB transfer curve.
  #[default]
  Srgb,
}

impl Color {
  pub const BLACK: Color = Color::new(0., 0., 0., 1.);
  pub const RED: Color = Color::new(1., 0., 0., 1.);
  pub const TRANSPARENT: Color = Color::new(0., 0., 0., 0.);
  pub const WHITE: Color = Color::new(1., 1., 1., 1.);
  pub const YELLOW: Color = Color::new(1., 1., 0., 1.);

  #[inline]
  pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self { Self { r, g, b, a } }

  /// Build a color from 8-bit channels, the CSS `rgba()` way.
  #[inline]
  pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
    Self::new(r as f32 / 255., g as f32 / 255., b as f32 / 255., a as f32 / 255.)
  }

  #[inline]
  pub fn with_alpha(mut self, a: f32) -> Self {
    self.a = a;
    self
  }

  /// Multiply the color channels by the alpha channel.
  #[inline]
  pub(crate) fn premultiply(self) -> Self {
    Self::new(self.r * self.a, self.g * self.a, self.b * self.a, self.a)
  }

  /// Divide the color channels by the alpha channel. Pixels with less
  /// alpha than [`ALPHA_CUTOFF`] become transparent black.
  pub(crate) fn unpremultiply(self) -> Self {
    if self.a < ALPHA_CUTOFF {
      Self::TRANSPARENT
    } else {
      Self::new(self.r / self.a, self.g / self.a, self.b / self.a, self.a)
    }
  }

  #[inline]
  pub(crate) fn scale(self, s: f32) -> Self {
    Self::new(self.r * s, self.g * s, self.b * s, self.a * s)
  }

  #[inline]
  pub(crate) fn add(self, o: Self) -> Self {
    Self::new(self.r + o.r, self.g + o.g, self.b + o.b, self.a + o.a)
  }

  #[inline]
  pub(crate) fn lerp(self, o: Self, t: f32) -> Self { self.scale(1. - t).add(o.scale(t)) }

  #[inline]
  pub(crate) fn clamp_unit(self) -> Self {
    Self::new(
      self.r.clamp(0., 1.),
      self.g.clamp(0., 1.),
      self.b.clamp(0., 1.),
      self.a.clamp(0., 1.),
    )
  }
}

impl Gamma {
  /// Convert a straight gamma-space color into linear space. Alpha is
  /// never curved.
  pub(crate) fn linearize(self, c: Color) -> Color {
    match self {
      Gamma::None => c,
      Gamma::Pow2 => Color::new(c.r * c.r, c.g * c.g, c.b * c.b, c.a),
      Gamma::Srgb => Color::new(srgb_to_linear(c.r), srgb_to_linear(c.g), srgb_to_linear(c.b), c.a),
    }
  }

  /// Convert a straight linear color back into gamma space.
  pub(crate) fn delinearize(self, c: Color) -> Color {
    match self {
      Gamma::None => c,
      Gamma::Pow2 => Color::new(c.r.max(0.).sqrt(), c.g.max(0.).sqrt(), c.b.max(0.).sqrt(), c.a),
      Gamma::Srgb => Color::new(linear_to_srgb(c.r), linear_to_srgb(c.g), linear_to_srgb(c.b), c.a),
    }
  }

  /// The form every brush and scanline pixel takes inside the renderer.
  #[inline]
  pub(crate) fn to_premultiplied_linear(self, c: Color) -> Color {
    self.linearize(c).premultiply()
  }

  #[inline]
  pub(crate) fn from_premultiplied_linear(self, c: Color) -> Color {
    self.delinearize(c.unpremultiply())
  }
}

fn srgb_to_linear(c: f32) -> f32 {
  if c < 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
}

fn linear_to_srgb(c: f32) -> f32 {
  let c = c.max(0.);
  if c < 0.003_130_8 { c * 12.92 } else { 1.055 * c.powf(1. / 2.4) - 0.055 }
}
