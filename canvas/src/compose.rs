use crate::{
  brush::PaintBrush,
  color::{Color, Gamma, ALPHA_CUTOFF},
  raster::Run,
  surface::Surface,
};
use pictor_geom::{DevicePoint, DeviceVector, InverseTransform, Vector};

bitflags::bitflags! {
  /// A composite operation packed as two 2-bit blend-factor selectors.
  ///
  /// The low pair picks the source factor, the high pair the
  /// destination factor; within a pair, the `ONE` bit alone means a
  /// constant 1, the `ALPHA` bit means the other pixel's alpha, and
  /// both together its complement.
  #[derive(Clone, Copy, Debug, PartialEq, Eq)]
  pub struct CompositeOp: u8 {
    const FORE_ONE = 0b0001;
    const FORE_ALPHA = 0b0010;
    const BACK_ONE = 0b0100;
    const BACK_ALPHA = 0b1000;

    const SOURCE_IN = Self::FORE_ALPHA.bits();
    const SOURCE_COPY = Self::FORE_ONE.bits();
    const SOURCE_OUT = Self::FORE_ONE.bits() | Self::FORE_ALPHA.bits();
    const DESTINATION_IN = Self::BACK_ALPHA.bits();
    const DESTINATION_ATOP = Self::SOURCE_OUT.bits() | Self::DESTINATION_IN.bits();
    const LIGHTER = Self::FORE_ONE.bits() | Self::BACK_ONE.bits();
    const DESTINATION_OVER = Self::SOURCE_OUT.bits() | Self::BACK_ONE.bits();
    const DESTINATION_OUT = Self::BACK_ONE.bits() | Self::BACK_ALPHA.bits();
    const SOURCE_ATOP = Self::FORE_ALPHA.bits() | Self::DESTINATION_OUT.bits();
    const SOURCE_OVER = Self::FORE_ONE.bits() | Self::DESTINATION_OUT.bits();
    const XOR = Self::SOURCE_OUT.bits() | Self::DESTINATION_OUT.bits();
  }
}

impl Default for CompositeOp {
  fn default() -> Self { CompositeOp::SOURCE_OVER }
}

#[inline]
fn factor(one: bool, alpha: bool, other_alpha: f32) -> f32 {
  match (alpha, one) {
    (false, false) => 0.,
    (false, true) => 1.,
    (true, false) => other_alpha,
    (true, true) => 1. - other_alpha,
  }
}

impl CompositeOp {
  /// Blend premultiplied linear source and destination pixels. The
  /// result alpha is clamped so `lighter` cannot overflow it.
  pub(crate) fn blend(self, fore: Color, back: Color) -> Color {
    let mix_fore = factor(self.contains(Self::FORE_ONE), self.contains(Self::FORE_ALPHA), back.a);
    let mix_back = factor(self.contains(Self::BACK_ONE), self.contains(Self::BACK_ALPHA), fore.a);
    let mut out = fore.scale(mix_fore).add(back.scale(mix_back));
    out.a = out.a.min(1.);
    out
  }

  /// Whether the operation rewrites pixels the path does not cover
  /// (inside the clip). True exactly when the destination keeps less
  /// than all of itself at zero source alpha.
  pub(crate) fn affects_uncovered(self) -> bool { !self.contains(Self::BACK_ONE) }
}

/// Mix the blended color back toward the destination by the clip
/// visibility.
#[inline]
pub(crate) fn composite_pixel(op: CompositeOp, fore: Color, back: Color, visibility: f32) -> Color {
  let blended = op.blend(fore, back);
  blended.scale(visibility).add(back.scale(1. - visibility))
}

/// The user-space extent of one device pixel, which widens the pattern
/// sampling kernel under minification.
pub(crate) fn pixel_footprint(inverse: &InverseTransform) -> Vector {
  Vector::new(
    inverse.transform_vector(DeviceVector::new(1., 0.)).length(),
    inverse.transform_vector(DeviceVector::new(0., 1.)).length(),
  )
}

/// Composite one pass of path coverage through the clip mask.
///
/// The path and mask run streams are merged in `(y, x)` order; between
/// two neighboring keys both winding sums are constant, so a whole span
/// blends with one coverage and one visibility. Pixels are read from
/// the surface, converted to premultiplied linear, blended, and written
/// back in storage gamma.
#[allow(clippy::too_many_arguments)]
pub(crate) fn render_main<S: Surface>(
  surface: &mut S,
  gamma: Gamma,
  path_runs: &[Run],
  mask: &[Run],
  brush: &PaintBrush,
  global_alpha: f32,
  op: CompositeOp,
  inverse: &InverseTransform,
  span: &mut Vec<Color>,
) {
  let size = surface.size();
  let footprint = pixel_footprint(inverse);

  let mut path_at = 0;
  let mut mask_at = 0;
  let mut row = u16::MAX;
  let mut x = 0u16;
  let mut path_sum: f32 = 0.;
  let mut clip_sum: f32 = 0.;

  while path_at < path_runs.len() || mask_at < mask.len() {
    let from_path = match (path_runs.get(path_at), mask.get(mask_at)) {
      (Some(p), Some(m)) => (p.y, p.x) <= (m.y, m.x),
      (Some(_), None) => true,
      _ => false,
    };
    let run = if from_path {
      path_at += 1;
      path_runs[path_at - 1]
    } else {
      mask_at += 1;
      mask[mask_at - 1]
    };

    if run.y != row {
      row = run.y;
      path_sum = 0.;
      clip_sum = 0.;
    } else if run.x > x {
      let coverage = path_sum.abs().min(1.);
      let visibility = clip_sum.abs().min(1.);
      if visibility >= ALPHA_CUTOFF
        && (coverage >= ALPHA_CUTOFF || op.affects_uncovered())
        && (row as u32) < size.height
      {
        let start = (x as u32).min(size.width);
        let end = (run.x as u32).min(size.width);
        if end > start {
          let len = (end - start) as usize;
          span.resize(len, Color::TRANSPARENT);
          surface.read_span(start, row as u32, span);
          let constant = brush
            .constant()
            .map(|c| c.scale(coverage * global_alpha));
          for (index, pixel) in span.iter_mut().enumerate() {
            let back = gamma.to_premultiplied_linear(*pixel);
            let fore = match constant {
              Some(c) => c,
              None => {
                let center =
                  DevicePoint::new((start + index as u32) as f32 + 0.5, row as f32 + 0.5);
                brush
                  .sample(inverse.transform_point(center), footprint)
                  .scale(coverage * global_alpha)
              }
            };
            *pixel = gamma.from_premultiplied_linear(composite_pixel(op, fore, back, visibility));
          }
          surface.write_span(start, row as u32, span);
        }
      }
    }
    x = run.x;

    if from_path {
      path_sum += run.delta;
    } else {
      clip_sum += run.delta;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const OPS: [(CompositeOp, [f32; 2]); 11] = [
    (CompositeOp::SOURCE_IN, [0., 0.]),
    (CompositeOp::SOURCE_COPY, [1., 0.]),
    (CompositeOp::SOURCE_OUT, [1., 0.]),
    (CompositeOp::DESTINATION_IN, [0., 0.]),
    (CompositeOp::DESTINATION_ATOP, [1., 0.]),
    (CompositeOp::LIGHTER, [1., 1.]),
    (CompositeOp::DESTINATION_OVER, [1., 1.]),
    (CompositeOp::DESTINATION_OUT, [0., 1.]),
    (CompositeOp::SOURCE_ATOP, [0., 1.]),
    (CompositeOp::SOURCE_OVER, [1., 1.]),
    (CompositeOp::XOR, [1., 1.]),
  ];

  #[test]
  fn factors_against_a_transparent_destination() {
    // With back.a = 0 the factor table in each op's definition
    // degenerates to the listed (mix_fore, mix_back) pair.
    let fore = Color::new(0.5, 0.25, 0., 1.);
    let back = Color::TRANSPARENT;
    for (op, [mix_fore, mix_back]) in OPS {
      let out = op.blend(fore, back);
      let expect = fore.scale(mix_fore).add(back.scale(mix_back));
      assert_eq!(out, expect, "{op:?}");
    }
  }

  #[test]
  fn source_over_on_opaque_backdrop() {
    let fore = Color::new(0.5, 0., 0., 0.5);
    let back = Color::new(0., 0., 1., 1.);
    let out = CompositeOp::SOURCE_OVER.blend(fore, back);
    assert!((out.r - 0.5).abs() < 1e-6);
    assert!((out.b - 0.5).abs() < 1e-6);
    assert!((out.a - 1.).abs() < 1e-6);
  }

  #[test]
  fn xor_of_two_opaque_pixels_is_transparent() {
    let out = CompositeOp::XOR.blend(Color::RED.premultiply(), Color::WHITE.premultiply());
    assert_eq!(out.a, 0.);
  }

  #[test]
  fn lighter_clamps_alpha_only() {
    let half = Color::new(1., 1., 0., 0.75).premultiply();
    let out = CompositeOp::LIGHTER.blend(half, half);
    assert_eq!(out.a, 1.);
    assert!((out.r - 1.5).abs() < 1e-6);
  }

  #[test]
  fn uncovered_pixels_matter_exactly_for_destination_eating_ops() {
    let eaters = [
      CompositeOp::SOURCE_IN,
      CompositeOp::SOURCE_COPY,
      CompositeOp::SOURCE_OUT,
      CompositeOp::DESTINATION_IN,
      CompositeOp::DESTINATION_ATOP,
    ];
    for (op, _) in OPS {
      assert_eq!(op.affects_uncovered(), eaters.contains(&op), "{op:?}");
    }
  }

  #[test]
  fn visibility_interpolates_toward_the_backdrop() {
    let fore = Color::RED.premultiply();
    let back = Color::WHITE.premultiply();
    let half = composite_pixel(CompositeOp::SOURCE_OVER, fore, back, 0.5);
    assert!((half.r - 1.).abs() < 1e-6);
    assert!((half.g - 0.5).abs() < 1e-6);
  }
}
