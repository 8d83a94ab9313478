use crate::{
  path::PathData,
  state::{LineCap, LineJoin},
  tess,
};
use pictor_geom::{InverseTransform, Point, Transform, Vector};

#[inline]
fn perp(v: Vector) -> Vector { Vector::new(-v.y, v.x) }

pub(crate) struct StrokeStyle {
  pub width: f32,
  pub cap: LineCap,
  pub join: LineJoin,
  pub miter_limit: f32,
}

/// Expand every polyline subpath of `lines` into the closed outline
/// polygons of its stroke, appended to `out`.
///
/// The outline is traced as two half-strokes, one per side. Open
/// subpaths join the halves with caps into a single closed loop; closed
/// subpaths close each half as its own ring, and the winding difference
/// between the rings keeps the middle hollow.
///
/// Offsets, joins and caps are computed in user space so the line width
/// is unaffected by the canvas transform; every emitted point goes back
/// through the forward matrix.
pub(crate) fn stroke_lines(
  lines: &PathData,
  style: &StrokeStyle,
  matrix: &Transform,
  inverse: &InverseTransform,
  scratch: &mut Vec<Point>,
  out: &mut PathData,
) {
  out.clear();
  let half = 0.5 * style.width;
  let miter2 = style.miter_limit * style.miter_limit * half * half;

  for (points, closed) in lines.iter() {
    scratch.clear();
    for &p in points {
      let p = inverse.transform_point(p);
      if scratch.last() != Some(&p) {
        scratch.push(p);
      }
    }
    if closed && scratch.len() > 1 && scratch.first() == scratch.last() {
      scratch.pop();
    }
    if scratch.len() < 2 {
      // A zero-length subpath draws nothing.
      continue;
    }

    let mut half_stroke = HalfStroke { out: &mut *out, style, matrix, half, miter2 };
    if closed {
      half_stroke.trace_closed(scratch, false);
      half_stroke.trace_closed(scratch, true);
    } else {
      half_stroke.trace_open(scratch);
    }
  }
}

struct HalfStroke<'a> {
  out: &'a mut PathData,
  style: &'a StrokeStyle,
  matrix: &'a Transform,
  half: f32,
  miter2: f32,
}

impl HalfStroke<'_> {
  fn emit(&mut self, p: Point) {
    let p = self.matrix.transform_point(p);
    if self.out.last_point() != Some(p) {
      self.out.push(p);
    }
  }

  /// One closed ring: the left-hand offsets of `points` traversed in one
  /// direction, joined at every vertex including the seam.
  fn trace_closed(&mut self, points: &[Point], reversed: bool) {
    let n = points.len();
    let at = |i: usize| if reversed { points[n - 1 - i] } else { points[i] };

    let first_dir = (at(1) - at(0)).normalize();
    self
      .out
      .begin(self.matrix.transform_point(at(0) + perp(first_dir) * self.half));
    let mut in_dir = first_dir;
    let mut in_len = (at(1) - at(0)).length();
    for i in 1..=n {
      let v = at(i % n);
      let next = at((i + 1) % n);
      let out_seg = next - v;
      let out_len = out_seg.length();
      let out_dir = out_seg / out_len;
      self.join(v, in_dir, out_dir, in_len, out_len);
      in_dir = out_dir;
      in_len = out_len;
    }
    self.out.subpaths.last_mut().unwrap().closed = true;
  }

  /// The full outline of an open subpath: forward side, end cap, return
  /// side, start cap, as one closed loop.
  fn trace_open(&mut self, points: &[Point]) {
    let n = points.len();
    let first_dir = (points[1] - points[0]).normalize();
    self
      .out
      .begin(self.matrix.transform_point(points[0] + perp(first_dir) * self.half));
    self.trace_side(points, false);
    let end_dir = (points[n - 1] - points[n - 2]).normalize();
    self.cap(points[n - 1], end_dir);
    self.trace_side(points, true);
    self.cap(points[0], -first_dir);
    self.out.subpaths.last_mut().unwrap().closed = true;
  }

  /// Left-hand offsets from the first to the last point of one traversal
  /// direction, with joins at interior vertices.
  fn trace_side(&mut self, points: &[Point], reversed: bool) {
    let n = points.len();
    let at = |i: usize| if reversed { points[n - 1 - i] } else { points[i] };

    let mut in_dir = (at(1) - at(0)).normalize();
    let mut in_len = (at(1) - at(0)).length();
    for i in 1..n - 1 {
      let v = at(i);
      let out_seg = at(i + 1) - v;
      let out_len = out_seg.length();
      let out_dir = out_seg / out_len;
      self.join(v, in_dir, out_dir, in_len, out_len);
      in_dir = out_dir;
      in_len = out_len;
    }
    self.emit(at(n - 1) + perp(in_dir) * self.half);
  }

  /// Join the incoming and outgoing offset edges at vertex `v`.
  fn join(&mut self, v: Point, in_dir: Vector, out_dir: Vector, in_len: f32, out_len: f32) {
    let half = self.half;
    let turn = in_dir.cross(out_dir);
    let dot = in_dir.dot(out_dir);
    let offset_in = perp(in_dir) * half;
    let offset_out = perp(out_dir) * half;

    if turn == 0. && dot >= 0. {
      // Straight through.
      self.emit(v + offset_out);
      return;
    }

    // This trace passes the vertex on its inner side when the turn curls
    // toward the offset. A turn tighter than both adjacent segments
    // would cancel coverage of the opposite side, so wind an extra loop
    // through the vertex before joining across (Nehab 2020, fig. 10).
    let tight = if turn != 0. {
      let intersect = (out_dir - in_dir) * (half / turn);
      turn > 0. && -intersect.dot(in_dir) > in_len && intersect.dot(out_dir) > out_len
    } else {
      // Full reversal behaves like the tightest possible turn.
      true
    };

    if tight {
      self.emit(v + offset_in);
      self.emit(v - offset_in);
      self.emit(v);
      self.emit(v - offset_out);
      match self.style.join {
        LineJoin::Round if turn == 0. => {
          // A reversal rounds off like a cap, bulging along the travel
          // direction.
          self.arc(v, offset_in, in_dir * half);
          self.arc(v, in_dir * half, offset_out);
        }
        LineJoin::Round => {
          self.arc(v, -offset_out, offset_in);
          self.arc(v, offset_in, offset_out);
        }
        LineJoin::Miter | LineJoin::Bevel => self.emit(v + offset_out),
      }
      return;
    }

    match self.style.join {
      LineJoin::Miter => {
        let miter = (offset_in + offset_out) / (1. + dot);
        if miter.dot(miter) <= self.miter2 {
          self.emit(v + miter);
          return;
        }
        // Past the limit the miter falls back to a bevel.
        self.emit(v + offset_in);
        self.emit(v + offset_out);
      }
      LineJoin::Bevel => {
        self.emit(v + offset_in);
        self.emit(v + offset_out);
      }
      LineJoin::Round => {
        self.emit(v + offset_in);
        self.arc(v, offset_in, offset_out);
      }
    }
  }

  /// Close an open end from its left offset across to its right offset.
  /// The loop back to the other side (or the subpath close) supplies the
  /// final edge, so `butt` has nothing to add.
  fn cap(&mut self, p: Point, dir: Vector) {
    let offset = perp(dir) * self.half;
    self.emit(p + offset);
    match self.style.cap {
      LineCap::Butt => {}
      LineCap::Square => {
        let shift = dir * self.half;
        self.emit(p + offset + shift);
        self.emit(p - offset + shift);
      }
      LineCap::Circle => {
        self.arc(p, offset, dir * self.half);
        self.arc(p, dir * self.half, -offset);
      }
    }
    self.emit(p - offset);
  }

  /// One cubic arc on the circle about `center` from offset `a` to
  /// offset `b` (both of half-width length), flattened into the outline.
  fn arc(&mut self, center: Point, a: Vector, b: Vector) {
    let sweep = a.cross(b).atan2(a.dot(b));
    if sweep == 0. {
      return;
    }
    let alpha = (4. / 3.) * (sweep.abs() / 4.).tan();
    let tangent = alpha * sweep.signum();
    let from = center + a;
    let to = center + b;
    let ctrl1 = from + perp(a) * tangent;
    let ctrl2 = to - perp(b) * tangent;
    let cubic = [
      self.matrix.transform_point(from),
      self.matrix.transform_point(ctrl1),
      self.matrix.transform_point(ctrl2),
      self.matrix.transform_point(to),
    ];
    if self.out.last_point() != Some(cubic[0]) {
      self.out.push(cubic[0]);
    }
    tess::add_bezier(self.out, cubic, tess::FILL_ANGULAR);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pictor_geom::DevicePoint;

  fn style(width: f32, cap: LineCap, join: LineJoin) -> StrokeStyle {
    StrokeStyle { width, cap, join, miter_limit: 10. }
  }

  fn stroke(lines: &PathData, style: &StrokeStyle) -> PathData {
    let mut out = PathData::default();
    let mut scratch = Vec::new();
    stroke_lines(
      lines,
      style,
      &Transform::identity(),
      &InverseTransform::identity(),
      &mut scratch,
      &mut out,
    );
    out
  }

  fn open_line(points: &[(f32, f32)]) -> PathData {
    let mut data = PathData::default();
    data.begin(DevicePoint::new(points[0].0, points[0].1));
    for &(x, y) in &points[1..] {
      data.push(DevicePoint::new(x, y));
    }
    data
  }

  fn bounds(out: &PathData) -> (f32, f32, f32, f32) {
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (f32::MAX, f32::MAX, f32::MIN, f32::MIN);
    for p in &out.points {
      min_x = min_x.min(p.x);
      min_y = min_y.min(p.y);
      max_x = max_x.max(p.x);
      max_y = max_y.max(p.y);
    }
    (min_x, min_y, max_x, max_y)
  }

  #[test]
  fn butt_stroke_is_a_rectangle() {
    let lines = open_line(&[(0., 50.), (100., 50.)]);
    let out = stroke(&lines, &style(10., LineCap::Butt, LineJoin::Miter));
    assert_eq!(out.subpaths.len(), 1);
    assert!(out.subpaths[0].closed);
    assert_eq!(bounds(&out), (0., 45., 100., 55.));
  }

  #[test]
  fn square_cap_extends_by_half_width() {
    let lines = open_line(&[(0., 50.), (100., 50.)]);
    let out = stroke(&lines, &style(10., LineCap::Square, LineJoin::Miter));
    assert_eq!(bounds(&out), (-5., 45., 105., 55.));
  }

  #[test]
  fn circle_cap_reaches_half_width() {
    let lines = open_line(&[(0., 50.), (100., 50.)]);
    let out = stroke(&lines, &style(10., LineCap::Circle, LineJoin::Miter));
    let (min_x, min_y, max_x, max_y) = bounds(&out);
    assert!(min_x < -4.9 && min_x >= -5.01);
    assert!(max_x > 104.9 && max_x <= 105.01);
    assert!(min_y >= 44.99 && max_y <= 55.01);
  }

  #[test]
  fn closed_subpath_makes_two_rings() {
    let mut lines = open_line(&[(10., 10.), (90., 10.), (90., 90.), (10., 90.)]);
    lines.subpaths.last_mut().unwrap().closed = true;
    let out = stroke(&lines, &style(10., LineCap::Butt, LineJoin::Miter));
    assert_eq!(out.subpaths.len(), 2);
    assert!(out.iter().all(|(_, closed)| closed));
    assert_eq!(bounds(&out), (5., 5., 95., 95.));
  }

  #[test]
  fn miter_past_the_limit_falls_back_to_bevel() {
    // A near-reversal: the miter would shoot far past the corner.
    let lines = open_line(&[(0., 0.), (50., 1.), (0., 2.)]);
    let sharp = stroke(
      &lines,
      &StrokeStyle {
        width: 4.,
        cap: LineCap::Butt,
        join: LineJoin::Miter,
        miter_limit: 2.,
      },
    );
    let (_, _, max_x, _) = bounds(&sharp);
    assert!(max_x < 60., "bevelled corner, got {max_x}");
  }

  #[test]
  fn miter_corner_meets_at_the_offset_intersection() {
    let lines = open_line(&[(0., 0.), (50., 0.), (50., 50.)]);
    let out = stroke(&lines, &style(10., LineCap::Butt, LineJoin::Miter));
    // The outer corner of a right-angle miter lands at (55, -5).
    assert!(
      out
        .points
        .iter()
        .any(|p| (p.x - 55.).abs() < 1e-4 && (p.y + 5.).abs() < 1e-4)
    );
  }

  #[test]
  fn tight_turn_winds_through_the_vertex() {
    // Segments much shorter than the half width.
    let lines = open_line(&[(0., 0.), (3., 0.), (3., 3.)]);
    let out = stroke(&lines, &style(30., LineCap::Butt, LineJoin::Bevel));
    assert!(
      out
        .points
        .iter()
        .any(|p| (p.x - 3.).abs() < 1e-4 && p.y.abs() < 1e-4)
    );
  }

  #[test]
  fn round_outline_stays_within_half_width_of_the_polyline() {
    let polyline = [(0., 50.), (50., 50.), (100., 0.)];
    let lines = open_line(&polyline);
    let out = stroke(&lines, &style(10., LineCap::Butt, LineJoin::Round));

    let segment_distance = |p: DevicePoint, a: (f32, f32), b: (f32, f32)| {
      let (ax, ay) = a;
      let (bx, by) = b;
      let (vx, vy) = (bx - ax, by - ay);
      let t = (((p.x - ax) * vx + (p.y - ay) * vy) / (vx * vx + vy * vy)).clamp(0., 1.);
      let (dx, dy) = (p.x - ax - t * vx, p.y - ay - t * vy);
      (dx * dx + dy * dy).sqrt()
    };
    for &p in &out.points {
      let d = segment_distance(p, polyline[0], polyline[1])
        .min(segment_distance(p, polyline[1], polyline[2]));
      assert!(d <= 5. + 0.2, "outline point {p:?} strays to {d}");
    }
  }
}
