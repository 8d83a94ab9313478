use crate::path::PathData;
use pictor_geom::InverseTransform;

/// Break every polyline subpath of `lines` into the open "on" pieces of
/// the dash `pattern`, appending them to `out`.
///
/// Dash distances are measured in user space (inverse-transformed
/// lengths), so a scaled canvas dashes the same way an unscaled one
/// does. `pattern` must have even length and a positive total; the
/// setter enforces both.
pub(crate) fn dash_lines(
  lines: &PathData,
  pattern: &[f32],
  offset: f32,
  inverse: &InverseTransform,
  out: &mut PathData,
) {
  debug_assert!(pattern.len() % 2 == 0);
  let total: f32 = pattern.iter().sum();
  debug_assert!(total > 0.);
  out.clear();

  for (points, closed) in lines.iter() {
    if points.len() < 2 {
      continue;
    }

    let mut remaining = offset.rem_euclid(total);
    let mut index = 0;
    while remaining >= pattern[index] {
      remaining -= pattern[index];
      index = (index + 1) % pattern.len();
    }
    let mut left = pattern[index] - remaining;
    let mut on = index % 2 == 0;
    let started_on = on;

    let first_subpath = out.subpaths.len();
    let first_point = out.points.len();
    if on {
      out.begin(points[0]);
    }

    let edge_count = if closed { points.len() } else { points.len() - 1 };
    for edge in 0..edge_count {
      let from = points[edge];
      let to = points[(edge + 1) % points.len()];
      let seg_len = inverse.transform_vector(to - from).length();
      let mut traveled = 0.;
      while seg_len - traveled > left {
        traveled += left;
        let cut = from.lerp(to, traveled / seg_len);
        if on {
          out.push(cut);
        } else {
          out.begin(cut);
        }
        on = !on;
        index = (index + 1) % pattern.len();
        left = pattern[index];
      }
      left -= seg_len - traveled;
      if on {
        out.push(to);
      }
    }

    // A closed subpath whose seam falls inside an "on" interval gets its
    // seam-crossing halves spliced back into one continuous dash.
    if closed && started_on && on {
      let emitted = out.subpaths.len() - first_subpath;
      if emitted == 1 {
        // The whole loop is one dash: drop the duplicated seam point and
        // keep it closed.
        out.points.pop();
        let sub = out.subpaths.last_mut().unwrap();
        sub.count -= 1;
        sub.closed = true;
      } else if emitted > 1 {
        // Last dash ends where the first began.
        out.points.pop();
        let tail = out.subpaths.pop().unwrap().count - 1;
        out.points[first_point..].rotate_right(tail);
        out.subpaths[first_subpath].count += tail;
      }
    }
  }
}
