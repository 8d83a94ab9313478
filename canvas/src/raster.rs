use crate::path::PathData;
use ordered_float::OrderedFloat;
use pictor_geom::{DevicePoint, DeviceSize, DeviceVector};

/// A signed change in fractional coverage at pixel `(x, y)`.
///
/// Traversing a row's runs left to right and summing deltas gives the
/// winding at each pixel; coverage is `min(|sum|, 1)`. After the last
/// run of a row the sum returns to zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Run {
  pub x: u16,
  pub y: u16,
  pub delta: f32,
}

/// Scan-convert polyline subpaths into sorted, coalesced coverage runs.
///
/// Every subpath is treated as a closed polygon, clipped to the box
/// `(0..width+padding, 0..height+padding)` after shifting by `offset`.
/// Clipping against the box edges keeps the winding of off-screen
/// geometry intact, so screen-crossing paths stay artifact free.
pub(crate) fn lines_to_runs(
  lines: &PathData,
  offset: DeviceVector,
  padding: f32,
  size: DeviceSize,
  clip_front: &mut Vec<DevicePoint>,
  clip_back: &mut Vec<DevicePoint>,
  runs: &mut Vec<Run>,
) {
  runs.clear();
  let max_x = size.width as f32 + padding;
  let max_y = size.height as f32 + padding;

  for (points, _) in lines.iter() {
    if points.len() < 3 {
      continue;
    }
    clip_front.clear();
    clip_front.extend(points.iter().map(|&p| p + offset));

    clip_edge(clip_front, clip_back, |p| p.x >= 0., |p, q| cross_x(p, q, 0.));
    clip_edge(clip_back, clip_front, |p| p.x <= max_x, |p, q| cross_x(p, q, max_x));
    clip_edge(clip_front, clip_back, |p| p.y >= 0., |p, q| cross_y(p, q, 0.));
    clip_edge(clip_back, clip_front, |p| p.y <= max_y, |p, q| cross_y(p, q, max_y));

    if clip_front.len() >= 3 {
      add_runs(runs, clip_front);
    }
  }

  runs.sort_by_key(|r| (r.y, r.x, OrderedFloat(r.delta.abs())));
  coalesce(runs);
}

fn cross_x(p: DevicePoint, q: DevicePoint, x: f32) -> DevicePoint {
  let t = (x - p.x) / (q.x - p.x);
  DevicePoint::new(x, p.y + t * (q.y - p.y))
}

fn cross_y(p: DevicePoint, q: DevicePoint, y: f32) -> DevicePoint {
  let t = (y - p.y) / (q.y - p.y);
  DevicePoint::new(p.x + t * (q.x - p.x), y)
}

/// One Sutherland-Hodgman pass against a single box edge.
fn clip_edge(
  input: &mut Vec<DevicePoint>,
  output: &mut Vec<DevicePoint>,
  inside: impl Fn(DevicePoint) -> bool,
  intersect: impl Fn(DevicePoint, DevicePoint) -> DevicePoint,
) {
  output.clear();
  for index in 0..input.len() {
    let current = input[index];
    let next = input[(index + 1) % input.len()];
    if inside(current) {
      output.push(current);
    }
    if inside(current) != inside(next) {
      output.push(intersect(current, next));
    }
  }
}

/// Emit the signed trapezoidal coverage of one clipped polygon.
///
/// Each non-horizontal edge is walked a pixel row at a time; within a
/// row the covered area is split between the cells the edge crosses,
/// with the remainder carried one cell to the right so each row's deltas
/// sum back to zero.
fn add_runs(runs: &mut Vec<Run>, polygon: &[DevicePoint]) {
  let mut push = |x: i32, y: usize, delta: f32| {
    if delta != 0. {
      runs.push(Run { x: x.max(0) as u16, y: y as u16, delta });
    }
  };

  for index in 0..polygon.len() {
    let from = polygon[index];
    let to = polygon[(index + 1) % polygon.len()];
    if from.y == to.y {
      continue;
    }
    let (dir, top, bottom) = if to.y > from.y { (1., from, to) } else { (-1., to, from) };
    let dx_dy = (bottom.x - top.x) / (bottom.y - top.y);

    let mut x = top.x;
    let row_end = bottom.y.ceil() as usize;
    for y in top.y.floor() as usize..row_end {
      let band = (bottom.y.min((y + 1) as f32) - top.y.max(y as f32)).max(0.);
      if band == 0. {
        continue;
      }
      let x_next = x + dx_dy * band;
      let delta = band * dir;
      let (x0, x1) = if x < x_next { (x, x_next) } else { (x_next, x) };
      let x0_floor = x0.floor();
      let x0i = x0_floor as i32;
      let x1_ceil = x1.ceil();
      let x1i = x1_ceil as i32;

      if x1i <= x0i + 1 {
        // The band stays within one cell; its area splits between the
        // cell and the carry to its right neighbor.
        let mid = 0.5 * (x + x_next) - x0_floor;
        push(x0i, y, delta * (1. - mid));
        push(x0i + 1, y, delta * mid);
      } else {
        let slope = 1. / (x1 - x0);
        let x0f = x0 - x0_floor;
        let first = 0.5 * slope * (1. - x0f) * (1. - x0f);
        let x1f = x1 - (x1_ceil - 1.);
        let last = 0.5 * slope * x1f * x1f;
        push(x0i, y, delta * first);
        if x1i == x0i + 2 {
          push(x0i + 1, y, delta * (1. - first - last));
        } else {
          let second = slope * (1.5 - x0f);
          push(x0i + 1, y, delta * (second - first));
          for xi in x0i + 2..x1i - 1 {
            push(xi, y, delta * slope);
          }
          let runner = second + (x1i - x0i - 3) as f32 * slope;
          push(x1i - 1, y, delta * (1. - runner - last));
        }
        push(x1i, y, delta * last);
      }
      x = x_next;
    }
  }
}

/// Merge neighboring runs that landed on the same pixel and drop the
/// zeros the merge produces.
fn coalesce(runs: &mut Vec<Run>) {
  let mut kept = 0;
  for index in 0..runs.len() {
    let run = runs[index];
    if kept > 0 && runs[kept - 1].x == run.x && runs[kept - 1].y == run.y {
      runs[kept - 1].delta += run.delta;
      if runs[kept - 1].delta == 0. {
        kept -= 1;
      }
    } else {
      runs[kept] = run;
      kept += 1;
    }
  }
  runs.truncate(kept);
}
