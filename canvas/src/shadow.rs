use crate::{
  color::{Color, Gamma, ALPHA_CUTOFF},
  compose::{composite_pixel, CompositeOp},
  raster::Run,
  surface::Surface,
};
use pictor_geom::DeviceSize;

/// The blur geometry derived from a `shadow_blur` setting: the extended
/// box radius approximating a Gaussian of `sigma = blur / 2` over three
/// passes, and the grid border that keeps every pass in bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct BlurKernel {
  pub radius: usize,
  pub border: usize,
  pub weight_edge: f32,
  pub weight_inner: f32,
}

impl BlurKernel {
  pub fn new(blur: f32) -> Self {
    let sigma2 = 0.25 * blur * blur;
    let radius = (0.5 * (4. * sigma2 + 1.).sqrt() - 0.5).floor().max(0.) as usize;
    let r = radius as f32;
    let alpha = if sigma2 > 0. {
      (2. * r + 1.) * (r * (r + 1.) - sigma2) / (2. * sigma2 - 6. * (r + 1.) * (r + 1.))
    } else {
      0.
    };
    let divisor = 2. * (alpha + r) + 1.;
    Self {
      radius,
      border: 3 * (radius + 1),
      weight_edge: alpha / divisor,
      weight_inner: (1. - alpha) / divisor,
    }
  }
}

/// Rasterized shadow alpha: a padded dense grid the blur runs over.
#[derive(Default)]
pub(crate) struct ShadowGrid {
  pub width: usize,
  pub height: usize,
  pub alpha: Vec<f32>,
  scratch: Vec<f32>,
  blurred: Vec<f32>,
  // Dirty rectangle, half-open, tracking where coverage landed.
  pub min_x: usize,
  pub max_x: usize,
  pub min_y: usize,
  pub max_y: usize,
}

impl ShadowGrid {
  /// Fill the grid from sorted, coalesced coverage runs.
  pub fn accumulate(&mut self, size: DeviceSize, border: usize, runs: &[Run]) {
    self.width = size.width as usize + 2 * border;
    self.height = size.height as usize + 2 * border;
    self.alpha.clear();
    self.alpha.resize(self.width * self.height, 0.);
    self.min_x = self.width;
    self.min_y = self.height;
    self.max_x = 0;
    self.max_y = 0;

    let mut at = 0;
    while at < runs.len() {
      let y = runs[at].y as usize;
      let row_start = at;
      while at < runs.len() && runs[at].y as usize == y {
        at += 1;
      }
      if y >= self.height {
        continue;
      }
      let row = &mut self.alpha[y * self.width..(y + 1) * self.width];
      let mut sum = 0.;
      for pair in runs[row_start..at].windows(2) {
        sum += pair[0].delta;
        let coverage = sum.abs().min(1.);
        if coverage > 0. {
          let from = (pair[0].x as usize).min(self.width);
          let to = (pair[1].x as usize).min(self.width);
          row[from..to].fill(coverage);
          self.min_x = self.min_x.min(from);
          self.max_x = self.max_x.max(to);
          self.min_y = self.min_y.min(y);
          self.max_y = self.max_y.max(y + 1);
        }
      }
    }
  }

  /// Three separable extended-box passes per axis turn the hard
  /// coverage into the Gaussian-shaped shadow falloff.
  pub fn blur(&mut self, kernel: &BlurKernel) {
    if self.max_x <= self.min_x || self.max_y <= self.min_y {
      return;
    }
    if kernel.radius == 0 && kernel.weight_edge == 0. && (kernel.weight_inner - 1.).abs() < 1e-6 {
      // Identity kernel; nothing to spread.
      return;
    }
    let reach = kernel.border;
    let x0 = self.min_x.saturating_sub(reach);
    let x1 = (self.max_x + reach).min(self.width);
    let y0 = self.min_y.saturating_sub(reach);
    let y1 = (self.max_y + reach).min(self.height);

    let line = self.width.max(self.height);
    self.scratch.clear();
    self.scratch.resize(line, 0.);
    self.blurred.clear();
    self.blurred.resize(line, 0.);

    for y in y0..y1 {
      let row = &mut self.alpha[y * self.width..(y + 1) * self.width];
      for _ in 0..3 {
        self.scratch[..row.len()].copy_from_slice(row);
        blur_line(&self.scratch[x0..x1], &mut row[x0..x1], kernel);
      }
    }
    for x in x0..x1 {
      for _ in 0..3 {
        for y in y0..y1 {
          self.scratch[y] = self.alpha[y * self.width + x];
        }
        blur_line(&self.scratch[y0..y1], &mut self.blurred[..y1 - y0], kernel);
        for y in y0..y1 {
          self.alpha[y * self.width + x] = self.blurred[y - y0];
        }
      }
    }

    self.min_x = x0;
    self.max_x = x1;
    self.min_y = y0;
    self.max_y = y1;
  }

  #[inline]
  pub fn sample(&self, x: usize, y: usize) -> f32 {
    if x < self.width && y < self.height { self.alpha[y * self.width + x] } else { 0. }
  }
}

/// One incremental extended-box pass over a contiguous line.
fn blur_line(src: &[f32], dst: &mut [f32], kernel: &BlurKernel) {
  let r = kernel.radius;
  let at = |i: isize| {
    if i >= 0 && (i as usize) < src.len() { src[i as usize] } else { 0. }
  };
  let inner = kernel.weight_edge + kernel.weight_inner;

  // Running weighted window sum for position 0.
  let mut sum = kernel.weight_edge * at(r as isize + 1);
  for j in -(r as isize)..=(r as isize) {
    sum += inner * at(j);
  }
  for (i, out) in dst.iter_mut().enumerate() {
    *out = sum;
    let i = i as isize;
    sum += kernel.weight_edge * (at(i + r as isize + 2) - at(i - (r as isize) - 1));
    sum += kernel.weight_inner * (at(i + r as isize + 1) - at(i - (r as isize)));
  }
}

/// Composite the blurred shadow through the clip mask, before the main
/// pass paints over it.
#[allow(clippy::too_many_arguments)]
pub(crate) fn render_shadow<S: Surface>(
  surface: &mut S,
  gamma: Gamma,
  grid: &ShadowGrid,
  border: usize,
  mask: &[Run],
  shadow_color: Color,
  global_alpha: f32,
  op: CompositeOp,
  span: &mut Vec<Color>,
) {
  let size = surface.size();
  let color = gamma.to_premultiplied_linear(shadow_color);

  let mut row = u16::MAX;
  let mut x = 0u16;
  let mut clip_sum: f32 = 0.;
  for run in mask.iter() {
    if run.y != row {
      row = run.y;
      clip_sum = 0.;
    } else if run.x > x {
      let visibility = clip_sum.abs().min(1.);
      if visibility >= ALPHA_CUTOFF && (row as u32) < size.height {
        let start = (x as u32).min(size.width);
        let end = (run.x as u32).min(size.width);
        if end > start {
          let len = (end - start) as usize;
          span.resize(len, Color::TRANSPARENT);
          surface.read_span(start, row as u32, span);
          for (offset, pixel) in span.iter_mut().enumerate() {
            let alpha = grid.sample(start as usize + offset + border, row as usize + border);
            if alpha < ALPHA_CUTOFF && !op.affects_uncovered() {
              continue;
            }
            let back = gamma.to_premultiplied_linear(*pixel);
            let fore = color.scale(alpha.min(1.) * global_alpha);
            *pixel = gamma.from_premultiplied_linear(composite_pixel(op, fore, back, visibility));
          }
          surface.write_span(start, row as u32, span);
        }
      }
    }
    x = run.x;
    clip_sum += run.delta;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blur_spec_matches_the_gaussian_radius() {
    let kernel = BlurKernel::new(0.);
    assert_eq!(kernel.radius, 0);
    assert_eq!(kernel.border, 3);
    assert!(kernel.weight_edge.abs() < 1e-6);
    assert!((kernel.weight_inner - 1.).abs() < 1e-6);

    let kernel = BlurKernel::new(8.);
    // sigma = 4, sigma^2 = 16, radius = floor(sqrt(65)/2 - 0.5) = 3.
    assert_eq!(kernel.radius, 3);
    assert_eq!(kernel.border, 12);
    assert!(kernel.weight_edge > 0. && kernel.weight_edge < kernel.weight_inner);
  }

  #[test]
  fn blur_preserves_total_alpha() {
    let kernel = BlurKernel::new(6.);
    let mut grid = ShadowGrid::default();
    let runs = vec![
      Run { x: 20, y: 20, delta: 1. },
      Run { x: 24, y: 20, delta: -1. },
      Run { x: 20, y: 21, delta: 1. },
      Run { x: 24, y: 21, delta: -1. },
    ];
    grid.accumulate(DeviceSize::new(16, 16), kernel.border, &runs);
    let before: f32 = grid.alpha.iter().sum();
    grid.blur(&kernel);
    let after: f32 = grid.alpha.iter().sum();
    assert!((before - 8.).abs() < 1e-4);
    assert!((after - before).abs() < 0.01, "mass drifted {before} -> {after}");
  }

  #[test]
  fn blur_spreads_but_keeps_the_peak_centered() {
    let kernel = BlurKernel::new(4.);
    let mut grid = ShadowGrid::default();
    let runs = vec![Run { x: 30, y: 30, delta: 1. }, Run { x: 31, y: 30, delta: -1. }];
    grid.accumulate(DeviceSize::new(32, 32), kernel.border, &runs);
    grid.blur(&kernel);
    let center = grid.sample(30, 30);
    assert!(center > 0. && center < 1.);
    assert!(grid.sample(30 + kernel.radius + 1, 30) > 0.);
    assert!(grid.sample(30, 30 + kernel.radius + 1) > 0.);
    assert!(center >= grid.sample(31, 30) - 1e-6);
  }
}
