use crate::color::{Color, Gamma, ALPHA_CUTOFF};
use pictor_geom::{Point, Vector};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// How a pattern tiles outside its own pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Repetition {
  #[default]
  Repeat,
  RepeatX,
  RepeatY,
  NoRepeat,
}

/// A color ramp between two points (or two circles, when used
/// radially). Stops keep strictly increasing offsets in `[0, 1]`;
/// adding a stop at an existing offset replaces it, and offsets outside
/// the range are ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
  pub(crate) start: Point,
  pub(crate) end: Point,
  pub(crate) start_radius: f32,
  pub(crate) end_radius: f32,
  pub(crate) stops: SmallVec<[GradientStop; 4]>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
  pub offset: f32,
  pub color: Color,
}

impl Gradient {
  pub fn linear(start: Point, end: Point) -> Self {
    Self { start, end, ..Default::default() }
  }

  pub fn radial(start: Point, start_radius: f32, end: Point, end_radius: f32) -> Self {
    if start_radius < 0. || end_radius < 0. {
      log::warn!("negative gradient radius clamped to zero");
    }
    Self {
      start,
      end,
      start_radius: start_radius.max(0.),
      end_radius: end_radius.max(0.),
      stops: SmallVec::new(),
    }
  }

  /// Insert a color stop, keeping the offsets strictly sorted.
  pub fn add_stop(&mut self, offset: f32, color: Color) -> &mut Self {
    if !(0. ..=1.).contains(&offset) {
      log::warn!("gradient stop at {offset} ignored: outside [0, 1]");
      return self;
    }
    match self.stops.binary_search_by(|s| s.offset.total_cmp(&offset)) {
      Ok(at) => self.stops[at].color = color,
      Err(at) => self.stops.insert(at, GradientStop { offset, color }),
    }
    self
  }

  pub fn with_stop(mut self, offset: f32, color: Color) -> Self {
    self.add_stop(offset, color);
    self
  }
}

/// Owned pattern pixels sampled with bicubic filtering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
  pub(crate) pixels: Vec<Color>,
  pub(crate) width: u32,
  pub(crate) height: u32,
  pub(crate) repetition: Repetition,
}

impl Pattern {
  /// Copy straight RGBA bytes, row major, into a pattern. Returns `None`
  /// when the byte count does not match the dimensions.
  pub fn new(rgba: &[u8], width: u32, height: u32, repetition: Repetition) -> Option<Self> {
    if width == 0 || height == 0 || rgba.len() != (width * height * 4) as usize {
      log::warn!("pattern ignored: {} bytes for {width}x{height}", rgba.len());
      return None;
    }
    let pixels = rgba
      .chunks_exact(4)
      .map(|px| Color::from_rgba8(px[0], px[1], px[2], px[3]))
      .collect();
    Some(Self { pixels, width, height, repetition })
  }
}

/// What to draw with: the canvas keeps one for filling and one for
/// stroking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FillStyle {
  Color(Color),
  Linear(Gradient),
  Radial(Gradient),
  Pattern(Pattern),
}

impl From<Color> for FillStyle {
  fn from(color: Color) -> Self { FillStyle::Color(color) }
}

impl From<Pattern> for FillStyle {
  fn from(pattern: Pattern) -> Self { FillStyle::Pattern(pattern) }
}

/// The renderer-side form of a [`FillStyle`]: gradient palettes
/// linearized, colors and pattern pixels premultiplied in linear space.
#[derive(Clone, Debug)]
pub(crate) enum PaintBrush {
  Color(Color),
  Gradient {
    radial: bool,
    start: Point,
    end: Point,
    start_radius: f32,
    end_radius: f32,
    offsets: SmallVec<[f32; 4]>,
    // Kept unpremultiplied so interpolation happens the way gradient
    // ramps are defined; premultiplied after the mix.
    colors: SmallVec<[Color; 4]>,
  },
  Pattern {
    pixels: Vec<Color>,
    width: i32,
    height: i32,
    repetition: Repetition,
  },
}

impl PaintBrush {
  pub fn new(style: &FillStyle, gamma: Gamma) -> Self {
    match style {
      FillStyle::Color(c) => PaintBrush::Color(gamma.to_premultiplied_linear(*c)),
      FillStyle::Linear(g) => Self::gradient(g, false, gamma),
      FillStyle::Radial(g) => Self::gradient(g, true, gamma),
      FillStyle::Pattern(p) => PaintBrush::Pattern {
        pixels: p
          .pixels
          .iter()
          .map(|&c| gamma.to_premultiplied_linear(c))
          .collect(),
        width: p.width as i32,
        height: p.height as i32,
        repetition: p.repetition,
      },
    }
  }

  fn gradient(g: &Gradient, radial: bool, gamma: Gamma) -> Self {
    PaintBrush::Gradient {
      radial,
      start: g.start,
      end: g.end,
      start_radius: g.start_radius,
      end_radius: g.end_radius,
      offsets: g.stops.iter().map(|s| s.offset).collect(),
      colors: g.stops.iter().map(|s| gamma.linearize(s.color)).collect(),
    }
  }

  /// A brush that paints the same color everywhere can skip per-pixel
  /// sampling.
  pub fn constant(&self) -> Option<Color> {
    match self {
      PaintBrush::Color(c) => Some(*c),
      _ => None,
    }
  }

  /// Sample the brush at the user-space point `p` (an
  /// inverse-transformed pixel center), returning premultiplied linear
  /// color. `footprint` is the user-space extent of one device pixel,
  /// used to widen the pattern kernel under minification.
  pub fn sample(&self, p: Point, footprint: Vector) -> Color {
    match self {
      PaintBrush::Color(c) => *c,
      PaintBrush::Gradient { radial: false, start, end, offsets, colors, .. } => {
        let axis = *end - *start;
        let len2 = axis.square_length();
        if len2 == 0. || offsets.is_empty() {
          return Color::TRANSPARENT;
        }
        let t = (p - *start).dot(axis) / len2;
        ramp(offsets, colors, t)
      }
      PaintBrush::Gradient {
        radial: true,
        start,
        end,
        start_radius,
        end_radius,
        offsets,
        colors,
      } => {
        if offsets.is_empty() {
          return Color::TRANSPARENT;
        }
        let delta = *end - *start;
        let delta_r = end_radius - start_radius;
        let from = p - *start;
        let a = delta.square_length() - delta_r * delta_r;
        let b = -2. * (from.dot(delta) + start_radius * delta_r);
        let c = from.square_length() - start_radius * start_radius;
        let t = if a.abs() < 1e-6 {
          if b == 0. {
            return Color::TRANSPARENT;
          }
          -c / b
        } else {
          let discriminant = b * b - 4. * a * c;
          if discriminant < 0. {
            return Color::TRANSPARENT;
          }
          let root = discriminant.sqrt();
          let t1 = (-b + root) / (2. * a);
          let t2 = (-b - root) / (2. * a);
          let (hi, lo) = if t1 >= t2 { (t1, t2) } else { (t2, t1) };
          if start_radius + hi * delta_r >= 0. {
            hi
          } else if start_radius + lo * delta_r >= 0. {
            lo
          } else {
            return Color::TRANSPARENT;
          }
        };
        if start_radius + t * delta_r < 0. {
          return Color::TRANSPARENT;
        }
        ramp(offsets, colors, t)
      }
      PaintBrush::Pattern { pixels, width, height, repetition } => {
        sample_pattern(pixels, *width, *height, *repetition, p, footprint)
      }
    }
  }
}

/// Clamped gradient lookup with linear interpolation between stops.
fn ramp(offsets: &[f32], colors: &[Color], t: f32) -> Color {
  let t = t.clamp(0., 1.);
  let index = offsets.partition_point(|&o| o < t);
  let mixed = if index == 0 {
    colors[0]
  } else if index == offsets.len() {
    colors[offsets.len() - 1]
  } else {
    let span = offsets[index] - offsets[index - 1];
    let local = if span > 0. { (t - offsets[index - 1]) / span } else { 1. };
    colors[index - 1].lerp(colors[index], local)
  };
  mixed.premultiply()
}

/// Keys bicubic kernel, the Catmull-Rom member of the family.
fn keys(t: f32) -> f32 {
  let t = t.abs();
  if t < 1. {
    (1.5 * t - 2.5) * t * t + 1.
  } else if t < 2. {
    ((-0.5 * t + 2.5) * t - 4.) * t + 2.
  } else {
    0.
  }
}

fn sample_pattern(
  pixels: &[Color],
  width: i32,
  height: i32,
  repetition: Repetition,
  p: Point,
  footprint: Vector,
) -> Color {
  // Kernel footprint per axis: at least one source pixel, widened under
  // minification and clamped to four source spans.
  let scale_x = footprint.x.abs().max(1.).min(4. * width as f32);
  let scale_y = footprint.y.abs().max(1.).min(4. * height as f32);
  let wrap_x = matches!(repetition, Repetition::Repeat | Repetition::RepeatX);
  let wrap_y = matches!(repetition, Repetition::Repeat | Repetition::RepeatY);

  let base_x = (p.x - 0.5).floor();
  let base_y = (p.y - 0.5).floor();
  let mut total = Color::TRANSPARENT;
  let mut weight_sum = 0.;
  for j in -1..=2 {
    let ty = base_y + j as f32;
    let wy = keys((p.y - 0.5 - ty) / scale_y);
    if wy == 0. {
      continue;
    }
    let row = wrap_coordinate(ty as i32, height, wrap_y);
    for i in -1..=2 {
      let tx = base_x + i as f32;
      let wx = keys((p.x - 0.5 - tx) / scale_x);
      if wx == 0. {
        continue;
      }
      let weight = wx * wy;
      weight_sum += weight;
      let column = wrap_coordinate(tx as i32, width, wrap_x);
      if let (Some(x), Some(y)) = (column, row) {
        total = total.add(pixels[(y * width + x) as usize].scale(weight));
      }
    }
  }
  if weight_sum <= ALPHA_CUTOFF {
    return Color::TRANSPARENT;
  }
  total.scale(1. / weight_sum)
}

/// Map a tap coordinate into the source image, wrapping or rejecting it.
fn wrap_coordinate(at: i32, limit: i32, wrap: bool) -> Option<i32> {
  if wrap {
    Some(at.rem_euclid(limit))
  } else if (0..limit).contains(&at) {
    Some(at)
  } else {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample(brush: &PaintBrush, x: f32, y: f32) -> Color {
    brush.sample(Point::new(x, y), Vector::new(1., 1.))
  }

  #[test]
  fn linear_gradient_interpolates_between_stops() {
    let style = FillStyle::Linear(
      Gradient::linear(Point::new(0., 0.), Point::new(10., 0.))
        .with_stop(0., Color::new(1., 0., 0., 1.))
        .with_stop(1., Color::new(0., 0., 1., 1.)),
    );
    let brush = PaintBrush::new(&style, Gamma::None);
    let mid = sample(&brush, 5., 3.);
    assert!((mid.r - 0.5).abs() < 1e-5);
    assert!((mid.b - 0.5).abs() < 1e-5);
    // Clamped beyond the ends.
    assert_eq!(sample(&brush, -10., 0.), Color::new(1., 0., 0., 1.));
    assert_eq!(sample(&brush, 25., 0.), Color::new(0., 0., 1., 1.));
  }

  #[test]
  fn gradient_stops_stay_strictly_sorted() {
    let mut g = Gradient::linear(Point::new(0., 0.), Point::new(1., 0.));
    g.add_stop(0.5, Color::RED);
    g.add_stop(0.25, Color::WHITE);
    g.add_stop(0.5, Color::BLACK);
    g.add_stop(1.5, Color::YELLOW);
    let offsets: Vec<f32> = g.stops.iter().map(|s| s.offset).collect();
    assert_eq!(offsets, vec![0.25, 0.5]);
    assert_eq!(g.stops[1].color, Color::BLACK);
  }

  #[test]
  fn gradient_interpolation_is_unpremultiplied() {
    // Transparent red to opaque red must stay pure red throughout.
    let style = FillStyle::Linear(
      Gradient::linear(Point::new(0., 0.), Point::new(10., 0.))
        .with_stop(0., Color::new(1., 0., 0., 0.))
        .with_stop(1., Color::new(1., 0., 0., 1.)),
    );
    let brush = PaintBrush::new(&style, Gamma::None);
    let mid = sample(&brush, 5., 0.);
    assert!((mid.a - 0.5).abs() < 1e-5);
    assert!((mid.r - 0.5).abs() < 1e-5, "premultiplied red {}", mid.r);
  }

  #[test]
  fn radial_gradient_picks_the_outer_root() {
    let style = FillStyle::Radial(
      Gradient::radial(Point::new(0., 0.), 0., Point::new(0., 0.), 10.)
        .with_stop(0., Color::WHITE)
        .with_stop(1., Color::BLACK),
    );
    let brush = PaintBrush::new(&style, Gamma::None);
    let center = sample(&brush, 0., 0.);
    let ring = sample(&brush, 5., 0.);
    let rim = sample(&brush, 10., 0.);
    assert!(center.r > 0.99);
    assert!((ring.r - 0.5).abs() < 1e-4);
    assert!(rim.r < 0.01);
  }

  #[test]
  fn pattern_repeats_only_where_asked() {
    // 2x2 checker: white at (0,0) and (1,1).
    let rgba = [
      255, 255, 255, 255, 0, 0, 0, 255, //
      0, 0, 0, 255, 255, 255, 255, 255,
    ];
    let tiled = PaintBrush::new(
      &FillStyle::Pattern(Pattern::new(&rgba, 2, 2, Repetition::Repeat).unwrap()),
      Gamma::None,
    );
    let bounded = PaintBrush::new(
      &FillStyle::Pattern(Pattern::new(&rgba, 2, 2, Repetition::NoRepeat).unwrap()),
      Gamma::None,
    );
    // Pixel centers resolve to the underlying texels.
    assert!(sample(&tiled, 0.5, 0.5).r > 0.9);
    assert!(sample(&tiled, 2.5, 2.5).r > 0.9);
    assert!(sample(&tiled, 1.5, 0.5).r < 0.1);
    assert!(sample(&bounded, 8.5, 0.5).a < 0.05);
  }

  #[test]
  fn degenerate_gradients_paint_nothing() {
    let point_gradient = PaintBrush::new(
      &FillStyle::Linear(
        Gradient::linear(Point::new(3., 3.), Point::new(3., 3.)).with_stop(0., Color::RED),
      ),
      Gamma::None,
    );
    assert_eq!(sample(&point_gradient, 1., 1.), Color::TRANSPARENT);

    let no_stops =
      PaintBrush::new(&FillStyle::Linear(Gradient::linear(Point::new(0., 0.), Point::new(1., 0.))), Gamma::None);
    assert_eq!(sample(&no_stops, 0.5, 0.), Color::TRANSPARENT);
  }
}
