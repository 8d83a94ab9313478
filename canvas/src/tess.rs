use crate::path::PathData;
use pictor_geom::{DevicePoint, DeviceVector};

/// Flattening tolerance in pixels.
pub(crate) const TOLERANCE: f32 = 0.125;

/// Subdivision recursion cap.
const MAX_DEPTH: u32 = 20;

/// Cosine limit that disables the angle test; fills only need flatness.
pub(crate) const FILL_ANGULAR: f32 = -1.;

/// Cosine limit for stroking, chosen so that the sagitta of the residual
/// angle at half-line-width radius stays within [`TOLERANCE`].
pub(crate) fn stroke_angular(line_width: f32) -> f32 {
  let ratio = TOLERANCE / (0.5 * line_width).max(TOLERANCE);
  (ratio - 2.) * ratio * 2. + 1.
}

/// Flatten every subpath of a cubic path into polylines appended to
/// `lines`. With `angular > -1` (stroking) the tessellation keeps
/// control points so end tangents survive for joins and caps.
pub(crate) fn path_to_lines(path: &PathData, angular: f32, lines: &mut PathData) {
  lines.clear();
  for (points, closed) in path.iter() {
    if points.len() < 4 {
      // A pending move_to renders nothing.
      continue;
    }
    lines.begin(points[0]);
    for segment in points[1..].chunks_exact(3) {
      let from = lines.last_point().unwrap();
      add_bezier(lines, [from, segment[0], segment[1], segment[2]], angular);
    }
    lines.subpaths.last_mut().unwrap().closed = closed;
  }
}

/// Append the tessellation of one cubic segment.
///
/// The curve is first split at its axis extrema and at the curvature
/// extremum so the recursive pass only sees smooth monotone arcs; cusps
/// and loops land on split boundaries instead of defeating the flatness
/// test.
pub(crate) fn add_bezier(out: &mut PathData, cubic: [DevicePoint; 4], angular: f32) {
  let [p1, c1, c2, p2] = cubic;
  let d1 = c1 - p1;
  let d2 = c2 - c1;
  let d3 = p2 - c2;

  let mut splits = [0f32; 7];
  let mut count = 0;
  let mut push = |t: f32| {
    if t > 0. && t < 1. {
      splits[count] = t;
      count += 1;
    }
  };

  // Horizontal and vertical extrema: roots of the derivative per axis.
  for axis in 0..2 {
    let pick = |v: DeviceVector| if axis == 0 { v.x } else { v.y };
    let a = pick(d1) - 2. * pick(d2) + pick(d3);
    let b = 2. * (pick(d2) - pick(d1));
    let c = pick(d1);
    if a.abs() < 1e-12 {
      if b.abs() > 1e-12 {
        push(-c / b);
      }
    } else {
      let discriminant = b * b - 4. * a * c;
      if discriminant >= 0. {
        let root = discriminant.sqrt();
        push((-b + root) / (2. * a));
        push((-b - root) / (2. * a));
      }
    }
  }

  // Curvature extremum: vertex of the inflection quadratic.
  let p = d2 - d1;
  let q = d1 - d2 - d2 + d3;
  let a = p.cross(q);
  if a.abs() > 1e-12 {
    push(-d1.cross(q) / (2. * a));
  }

  let splits = &mut splits[..count];
  splits.sort_unstable_by(f32::total_cmp);

  let mut from = 0.;
  for &t in splits.iter() {
    add_tessellation(out, sub_curve(&cubic, from, t), angular, MAX_DEPTH);
    from = t;
  }
  add_tessellation(out, sub_curve(&cubic, from, 1.), angular, MAX_DEPTH);
}

fn add_tessellation(out: &mut PathData, cubic: [DevicePoint; 4], angular: f32, depth: u32) {
  let [p1, c1, c2, p2] = cubic;
  let chord = p2 - p1;
  let chord_len2 = chord.square_length();
  let distance2 = |c: DevicePoint| {
    let v = c - p1;
    if chord_len2 <= f32::EPSILON {
      v.square_length()
    } else {
      let cross = v.cross(chord);
      cross * cross / chord_len2
    }
  };

  let flat = distance2(c1) <= TOLERANCE * TOLERANCE && distance2(c2) <= TOLERANCE * TOLERANCE;
  let angle_ok = angular <= -1. || {
    let first = [c1 - p1, c2 - p1, chord]
      .into_iter()
      .find(|v| v.square_length() > 0.)
      .unwrap_or(chord);
    let last = [p2 - c2, p2 - c1, chord]
      .into_iter()
      .find(|v| v.square_length() > 0.)
      .unwrap_or(chord);
    let scale2 = first.square_length() * last.square_length();
    scale2 <= 0. || first.dot(last) >= angular * scale2.sqrt()
  };

  if (flat && angle_ok) || depth == 0 {
    if angular > -1. {
      // Keep the controls of the flattened arc so its end tangents are
      // exact for the stroker.
      for c in [c1, c2] {
        if out.last_point() != Some(c) {
          out.push(c);
        }
      }
    }
    if out.last_point() != Some(p2) {
      out.push(p2);
    }
  } else {
    let (head, tail) = split(&cubic, 0.5);
    add_tessellation(out, head, angular, depth - 1);
    add_tessellation(out, tail, angular, depth - 1);
  }
}

fn split(b: &[DevicePoint; 4], t: f32) -> ([DevicePoint; 4], [DevicePoint; 4]) {
  let ab = b[0].lerp(b[1], t);
  let bc = b[1].lerp(b[2], t);
  let cd = b[2].lerp(b[3], t);
  let ab_bc = ab.lerp(bc, t);
  let bc_cd = bc.lerp(cd, t);
  let mid = ab_bc.lerp(bc_cd, t);
  ([b[0], ab, ab_bc, mid], [mid, bc_cd, cd, b[3]])
}

/// Extract the sub-curve over `[from, to]`, `0 <= from < to <= 1`.
fn sub_curve(b: &[DevicePoint; 4], from: f32, to: f32) -> [DevicePoint; 4] {
  let (_, tail) = split(b, from);
  if to >= 1. {
    return tail;
  }
  let local = (to - from) / (1. - from);
  split(&tail, local).0
}

#[cfg(test)]
mod tests {
  use super::*;

  fn flatten(cubic: [DevicePoint; 4], angular: f32) -> Vec<DevicePoint> {
    let mut out = PathData::default();
    out.begin(cubic[0]);
    add_bezier(&mut out, cubic, angular);
    out.points
  }

  #[test]
  fn straight_cubic_stays_two_points() {
    let a = DevicePoint::new(0., 0.);
    let b = DevicePoint::new(30., 40.);
    let points = flatten([a, a, b, b], FILL_ANGULAR);
    assert_eq!(points, vec![a, b]);
  }

  #[test]
  fn flattened_arc_stays_within_tolerance() {
    // Quarter circle of radius 100 about the origin.
    let alpha = 100. * 0.552_284_75;
    let cubic = [
      DevicePoint::new(100., 0.),
      DevicePoint::new(100., alpha),
      DevicePoint::new(alpha, 100.),
      DevicePoint::new(0., 100.),
    ];
    let points = flatten(cubic, FILL_ANGULAR);
    assert!(points.len() > 4);
    for pair in points.windows(2) {
      let mid = pair[0].lerp(pair[1], 0.5);
      let r = (mid.x * mid.x + mid.y * mid.y).sqrt();
      // Chord midpoints sag inward by at most the tolerance (plus the
      // cubic's own error approximating the circle).
      assert!((r - 100.).abs() < 2. * TOLERANCE, "radius {r}");
    }
  }

  #[test]
  fn cusp_curve_is_bounded() {
    // Control points folded back to form a cusp.
    let cubic = [
      DevicePoint::new(0., 0.),
      DevicePoint::new(100., 100.),
      DevicePoint::new(-100., 100.),
      DevicePoint::new(0., 0.),
    ];
    let points = flatten(cubic, FILL_ANGULAR);
    assert!(points.len() > 2);
    assert!(points.len() < 4000);
  }

  #[test]
  fn stroking_keeps_end_tangents() {
    let cubic = [
      DevicePoint::new(0., 0.),
      DevicePoint::new(10., 0.),
      DevicePoint::new(20., 10.),
      DevicePoint::new(30., 10.),
    ];
    let points = flatten(cubic, stroke_angular(4.));
    // The first emitted edge leaves along the initial tangent.
    let first = points[1] - points[0];
    assert!(first.y.abs() < first.x * 0.25);
  }

  #[test]
  fn stroke_angular_widens_with_line_width() {
    // Wider strokes demand a finer angle than hairlines.
    assert!(stroke_angular(20.) > stroke_angular(2.));
    assert_eq!(stroke_angular(0.1), stroke_angular(0.25));
  }
}
