use crate::{canvas::Canvas, surface::Surface};
use pictor_geom::{DevicePoint, Point, Rect, Vector};

/// One subpath record: how many points of the owning path belong to it
/// and whether it was closed.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Subpath {
  pub count: usize,
  pub closed: bool,
}

/// Point storage shared by the Bézier path and the flattened line path.
///
/// A Bézier subpath holds `1 + 3k` points (start plus `k` cubic
/// segments); a line subpath holds plain polyline vertices. A subpath
/// with exactly one point is a pending `move_to` and renders nothing.
#[derive(Clone, Debug, Default)]
pub(crate) struct PathData {
  pub points: Vec<DevicePoint>,
  pub subpaths: Vec<Subpath>,
}

impl PathData {
  pub fn clear(&mut self) {
    self.points.clear();
    self.subpaths.clear();
  }

  pub fn is_empty(&self) -> bool { self.subpaths.is_empty() }

  /// Start a new subpath at `p`.
  pub fn begin(&mut self, p: DevicePoint) {
    self.subpaths.push(Subpath { count: 1, closed: false });
    self.points.push(p);
  }

  /// Append `p` to the current subpath.
  pub fn push(&mut self, p: DevicePoint) {
    debug_assert!(!self.subpaths.is_empty());
    self.points.push(p);
    self.subpaths.last_mut().unwrap().count += 1;
  }

  pub fn last_point(&self) -> Option<DevicePoint> { self.points.last().copied() }

  /// Visit every subpath as a point slice plus its `closed` flag.
  pub fn iter(&self) -> impl Iterator<Item = (&[DevicePoint], bool)> + '_ {
    let mut at = 0;
    self.subpaths.iter().map(move |sub| {
      let slice = &self.points[at..at + sub.count];
      at += sub.count;
      (slice, sub.closed)
    })
  }
}

impl<S: Surface> Canvas<S> {
  /// Starts a new path by emptying the list of sub-paths. Call this
  /// method when you want to create a new path.
  #[inline]
  pub fn begin_path(&mut self) { self.path.clear(); }

  /// Begins a new sub-path at the point specified by `p`.
  pub fn move_to(&mut self, p: Point) {
    let p = self.state.matrix.transform_point(p);
    if self.path.subpaths.last().is_some_and(|sub| sub.count == 1) {
      // A pending move is silently replaced.
      *self.path.points.last_mut().unwrap() = p;
    } else {
      self.path.begin(p);
    }
  }

  /// Connects the last point in the current sub-path to `p` with a
  /// straight line.
  pub fn line_to(&mut self, p: Point) {
    if self.path.is_empty() {
      self.move_to(p);
      return;
    }
    let p = self.state.matrix.transform_point(p);
    let prev = self.path.last_point().unwrap();
    if p == prev {
      return;
    }
    // Stored as a degenerate cubic so the path is uniformly cubics.
    self.path.push(prev);
    self.path.push(p);
    self.path.push(p);
  }

  /// Adds a quadratic Bézier curve to the current path, lifted to the
  /// cubic the path stores.
  pub fn quadratic_curve_to(&mut self, ctrl: Point, to: Point) {
    if self.path.is_empty() {
      self.move_to(ctrl);
    }
    let ctrl = self.state.matrix.transform_point(ctrl);
    let to = self.state.matrix.transform_point(to);
    let from = self.path.last_point().unwrap();
    self.path.push(from.lerp(ctrl, 2. / 3.));
    self.path.push(to.lerp(ctrl, 2. / 3.));
    self.path.push(to);
  }

  /// Adds a cubic Bézier curve to the current path.
  pub fn bezier_curve_to(&mut self, ctrl1: Point, ctrl2: Point, to: Point) {
    if self.path.is_empty() {
      self.move_to(ctrl1);
    }
    self.path.push(self.state.matrix.transform_point(ctrl1));
    self.path.push(self.state.matrix.transform_point(ctrl2));
    self.path.push(self.state.matrix.transform_point(to));
  }

  /// Causes the point of the pen to move back to the start of the
  /// current sub-path, closing it, and begins a new sub-path there.
  pub fn close_path(&mut self) {
    let Some(sub) = self.path.subpaths.last_mut() else { return };
    if sub.count < 2 {
      return;
    }
    sub.closed = true;
    let first = self.path.points[self.path.points.len() - sub.count];
    self.path.begin(first);
  }

  /// Adds a circular arc about `center` between `start_angle` and
  /// `end_angle` (radians), clockwise unless `counter_clockwise`. The
  /// arc is connected to the current point with a straight line.
  pub fn arc(
    &mut self,
    center: Point,
    radius: f32,
    start_angle: f32,
    end_angle: f32,
    counter_clockwise: bool,
  ) {
    if radius < 0. {
      log::warn!("arc ignored: negative radius {radius}");
      return;
    }
    const TAU: f32 = std::f32::consts::TAU;
    let sweep = end_angle - start_angle;
    let span = if !counter_clockwise {
      if sweep >= TAU { TAU } else { sweep.rem_euclid(TAU) }
    } else if -sweep >= TAU {
      -TAU
    } else {
      -(-sweep).rem_euclid(TAU)
    };

    let at = |angle: f32| center + Vector::new(angle.cos(), angle.sin()) * radius;
    self.line_to(at(start_angle));
    if span == 0. {
      return;
    }

    let steps = (16. * span.abs() / TAU).ceil().max(1.);
    let step = span / steps;
    let tangent = radius * (4. / 3.) * (step / 4.).tan();
    for i in 0..steps as u32 {
      let a1 = start_angle + i as f32 * step;
      let a2 = a1 + step;
      let from = at(a1);
      let to = at(a2);
      let ctrl1 = from + Vector::new(-a1.sin(), a1.cos()) * tangent;
      let ctrl2 = to - Vector::new(-a2.sin(), a2.cos()) * tangent;
      self.bezier_curve_to(ctrl1, ctrl2, to);
    }
  }

  /// Adds an arc of the given radius tangent to the two edges running
  /// from the current point to `v` and from `v` to `to`.
  pub fn arc_to(&mut self, v: Point, to: Point, radius: f32) {
    if radius < 0. {
      log::warn!("arc_to ignored: negative radius {radius}");
      return;
    }
    if self.path.is_empty() {
      self.move_to(v);
      return;
    }
    let current = self.state.inverse.transform_point(self.path.last_point().unwrap());
    let (Some(dir_in), Some(dir_out)) =
      ((current - v).try_normalize(), (to - v).try_normalize())
    else {
      self.line_to(v);
      return;
    };
    let sin = dir_in.cross(dir_out);
    if sin.abs() < 1e-4 {
      self.line_to(v);
      return;
    }

    let center = v + (dir_in + dir_out) * (radius / sin.abs());
    let tangent_len = (1. + dir_in.dot(dir_out)) * radius / sin.abs();
    let start = v + dir_in * tangent_len;
    let end = v + dir_out * tangent_len;
    self.line_to(start);

    let a1 = (start.y - center.y).atan2(start.x - center.x);
    let a2 = (end.y - center.y).atan2(end.x - center.x);
    let mut delta = a2 - a1;
    if delta > std::f32::consts::PI {
      delta -= std::f32::consts::TAU;
    } else if delta < -std::f32::consts::PI {
      delta += std::f32::consts::TAU;
    }
    self.arc(center, radius, a1, a1 + delta, delta < 0.);
  }

  /// Adds a sub-path containing a rectangle, closed, and leaves the pen
  /// at its origin.
  pub fn rect(&mut self, rect: &Rect) {
    self.move_to(rect.min());
    self.line_to(Point::new(rect.max_x(), rect.min_y()));
    self.line_to(rect.max());
    self.line_to(Point::new(rect.min_x(), rect.max_y()));
    self.close_path();
  }

  /// Adds a closed sub-path containing a rectangle with rounded
  /// corners. Radii overlapping along a side give way evenly.
  pub fn round_rect(&mut self, rect: &Rect, radius: &BorderRadius) {
    use std::f32::consts::PI;

    let mut radii = radius
      .corners()
      .map(|r| Vector::new(r.x.abs().min(rect.width()), r.y.abs().min(rect.height())));
    // Settle each side: the two corners it connects split any overlap
    // of their radii beyond the side length.
    for (a, b, vertical) in [(0, 1, false), (3, 2, false), (0, 3, true), (1, 2, true)] {
      let overlap = if vertical {
        radii[a].y + radii[b].y - rect.height()
      } else {
        radii[a].x + radii[b].x - rect.width()
      };
      if overlap > 0. {
        if vertical {
          radii[a].y -= overlap / 2.;
          radii[b].y -= overlap / 2.;
        } else {
          radii[a].x -= overlap / 2.;
          radii[b].x -= overlap / 2.;
        }
      }
    }

    let corners = [
      rect.min(),
      Point::new(rect.max_x(), rect.min_y()),
      rect.max(),
      Point::new(rect.min_x(), rect.max_y()),
    ];
    // Unit steps from each corner toward the middle of the rectangle.
    let inward = [
      Vector::new(1., 1.),
      Vector::new(-1., 1.),
      Vector::new(-1., -1.),
      Vector::new(1., -1.),
    ];
    for (index, corner) in corners.into_iter().enumerate() {
      let r = radii[index];
      if r.x > 0. && r.y > 0. {
        let center = corner + inward[index].component_mul(r);
        let begin = PI + index as f32 * 0.5 * PI;
        let entry = center + Vector::new(r.x * begin.cos(), r.y * begin.sin());
        if index == 0 {
          self.move_to(entry);
        } else {
          self.line_to(entry);
        }
        self.ellipse_arc(center, r, begin, begin + 0.5 * PI);
      } else if index == 0 {
        self.move_to(corner);
      } else {
        self.line_to(corner);
      }
    }
    self.close_path();
  }

  /// Adds a closed sub-path containing an axis-aligned ellipse.
  pub fn ellipse(&mut self, center: Point, radius: Vector) {
    use std::f32::consts::PI;
    self.move_to(center + Vector::new(radius.x, 0.));
    self.ellipse_arc(center, radius, 0., 0.5 * PI);
    self.ellipse_arc(center, radius, 0.5 * PI, PI);
    self.ellipse_arc(center, radius, PI, 1.5 * PI);
    self.ellipse_arc(center, radius, 1.5 * PI, 2. * PI);
    self.close_path();
  }

  /// Adds a closed sub-path containing a circle.
  #[inline]
  pub fn circle(&mut self, center: Point, radius: f32) {
    self.ellipse(center, Vector::new(radius, radius));
  }

  /// One elliptical arc segment of at most a quarter turn, appended as a
  /// single cubic. The sub-path must already be at the arc start.
  fn ellipse_arc(&mut self, center: Point, radius: Vector, a1: f32, a2: f32) {
    let alpha = (4. / 3.) * ((a2 - a1) / 4.).tan();
    let at = |a: f32| center + Vector::new(radius.x * a.cos(), radius.y * a.sin());
    let tangent = |a: f32| Vector::new(-radius.x * a.sin(), radius.y * a.cos());
    let from = at(a1);
    let to = at(a2);
    self.bezier_curve_to(from + tangent(a1) * alpha, to - tangent(a2) * alpha, to);
  }
}

/// Per-corner radii for [`Canvas::round_rect`].
#[derive(Debug, Default, Clone)]
pub struct BorderRadius {
  pub top_left: Vector,
  pub top_right: Vector,
  pub bottom_right: Vector,
  pub bottom_left: Vector,
}

impl BorderRadius {
  pub fn new(
    top_left: Vector,
    top_right: Vector,
    bottom_right: Vector,
    bottom_left: Vector,
  ) -> Self {
    Self { top_left, top_right, bottom_right, bottom_left }
  }

  /// The same radius on every corner.
  #[inline]
  pub fn all(radius: Vector) -> Self { Self::new(radius, radius, radius, radius) }

  /// The radii in drawing order: top-left, top-right, bottom-right,
  /// bottom-left.
  fn corners(&self) -> [Vector; 4] {
    [self.top_left, self.top_right, self.bottom_right, self.bottom_left]
  }
}
