use pictor_canvas::{
  Bitmap, Canvas, Color, CompositeOp, Gamma, LineCap, LineJoin, PixelFormat, Point, Rect, Size,
  TextAlign, TextBaseline,
};

fn canvas(width: u32, height: u32) -> Canvas<Bitmap> {
  Canvas::new(Bitmap::new(width, height, PixelFormat::Rgba8), Gamma::Srgb)
}

fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect { Rect::new(Point::new(x, y), Size::new(w, h)) }

#[test]
fn xor_clears_the_intersection() {
  let mut canvas = canvas(100, 100);
  canvas.set_fill_style(Color::RED);
  canvas.fill_rect(&rect(10., 10., 50., 50.));
  canvas.set_composite_op(CompositeOp::XOR);
  canvas.set_fill_style(Color::new(0., 0., 1., 1.));
  canvas.fill_rect(&rect(40., 40., 50., 50.));

  let bitmap = canvas.surface();
  // Intersection wiped to transparent.
  assert_eq!(bitmap.pixel(50, 50).a, 0.);
  // Symmetric difference stays opaque, each square its own color.
  let first_only = bitmap.pixel(20, 20);
  assert!(first_only.a > 0.99 && first_only.r > 0.9);
  let second_only = bitmap.pixel(80, 80);
  assert!(second_only.a > 0.99 && second_only.b > 0.9);
  // Untouched corners stay empty.
  assert_eq!(bitmap.pixel(5, 95).a, 0.);
}

#[test]
fn clip_restricts_filling_to_the_region() {
  let mut canvas = canvas(200, 200);
  canvas.begin_path();
  canvas.rect(&rect(50., 50., 50., 50.));
  canvas.clip();
  canvas.set_fill_style(Color::RED);
  canvas.fill_rect(&rect(0., 0., 200., 200.));

  let bitmap = canvas.surface();
  for &(x, y) in &[(51, 51), (75, 75), (98, 98)] {
    let c = bitmap.pixel(x, y);
    assert!(c.r > 0.9 && c.a > 0.99, "inside clip at ({x}, {y}): {c:?}");
  }
  for &(x, y) in &[(48, 75), (102, 75), (75, 48), (75, 102), (0, 0), (199, 199)] {
    assert_eq!(bitmap.pixel(x, y).a, 0., "outside clip at ({x}, {y})");
  }
}

#[test]
fn pixels_outside_the_clip_never_change() {
  let mut canvas = canvas(80, 80);
  canvas.set_fill_style(Color::new(0.2, 0.5, 0.8, 1.));
  canvas.fill_rect(&rect(0., 0., 80., 80.));
  let before = canvas.surface().bytes().to_vec();

  canvas.begin_path();
  canvas.rect(&rect(20., 20., 20., 20.));
  canvas.clip();
  canvas.set_fill_style(Color::YELLOW);
  canvas.fill_rect(&rect(0., 0., 80., 80.));
  canvas.set_composite_op(CompositeOp::SOURCE_COPY);
  canvas.set_fill_style(Color::RED);
  canvas.fill_rect(&rect(0., 0., 80., 80.));

  let after = canvas.surface();
  let stride = after.stride();
  for y in 0..80usize {
    for x in 0..80usize {
      let outside = !(20..40).contains(&x) || !(20..40).contains(&y);
      if outside && (x < 19 || x > 40 || y < 19 || y > 40) {
        let at = y * stride + x * 4;
        assert_eq!(
          &after.bytes()[at..at + 4],
          &before[at..at + 4],
          "pixel ({x}, {y}) changed outside the clip",
        );
      }
    }
  }
}

#[test]
fn nested_clips_intersect() {
  let mut canvas = canvas(100, 100);
  canvas.begin_path();
  canvas.rect(&rect(10., 10., 60., 60.));
  canvas.clip();
  canvas.begin_path();
  canvas.rect(&rect(40., 40., 60., 60.));
  canvas.clip();
  canvas.set_fill_style(Color::RED);
  canvas.fill_rect(&rect(0., 0., 100., 100.));

  let bitmap = canvas.surface();
  assert!(bitmap.pixel(50, 50).a > 0.99);
  assert!(bitmap.pixel(65, 65).a > 0.99);
  assert_eq!(bitmap.pixel(30, 30).a, 0.);
  assert_eq!(bitmap.pixel(80, 80).a, 0.);
}

#[test]
fn shadowed_star_spreads_soft_alpha() {
  let mut canvas = canvas(256, 256);
  canvas.set_shadow_color(Color::new(0., 0., 0., 0.5));
  canvas.set_shadow_blur(8.);
  canvas.set_shadow_offset(0., 4.);

  canvas.begin_path();
  canvas.move_to(Point::new(128., 28.));
  canvas.line_to(Point::new(157., 87.));
  canvas.line_to(Point::new(223., 97.));
  canvas.line_to(Point::new(175., 143.));
  canvas.line_to(Point::new(186., 208.));
  canvas.line_to(Point::new(128., 178.));
  canvas.line_to(Point::new(69., 208.));
  canvas.line_to(Point::new(80., 143.));
  canvas.line_to(Point::new(32., 97.));
  canvas.line_to(Point::new(98., 87.));
  canvas.close_path();
  canvas.set_fill_style(Color::YELLOW);
  canvas.fill();

  let bitmap = canvas.surface();
  // Solid yellow interior.
  let center = bitmap.pixel(128, 120);
  assert_eq!(center.a, 1.);
  assert!(center.r > 0.95 && center.g > 0.95 && center.b < 0.05);
  // Below the lower-right edge the blurred shadow is soft but present.
  let spread = bitmap.pixel(157, 203);
  assert!(spread.a > 0., "no shadow spread");
  assert!(spread.a < 0.6, "shadow too hard: {}", spread.a);
  // Far away there is nothing.
  assert_eq!(bitmap.pixel(10, 10).a, 0.);
}

#[test]
fn shadow_draws_under_the_shape() {
  let mut canvas = canvas(64, 64);
  canvas.set_shadow_color(Color::new(0., 0., 0., 1.));
  canvas.set_shadow_offset(10., 0.);
  canvas.set_fill_style(Color::RED);
  canvas.fill_rect(&rect(10., 10., 20., 20.));

  let bitmap = canvas.surface();
  // The offset shadow pokes out to the right of the shape.
  let shadow = bitmap.pixel(35, 20);
  assert!(shadow.a > 0.99 && shadow.r < 0.05);
  // The shape itself stays red where both overlap.
  let shape = bitmap.pixel(25, 20);
  assert!(shape.r > 0.9);
}

#[test]
fn save_restore_round_trips_every_setting() {
  let mut canvas = canvas(32, 32);
  canvas.translate(3., 4.);
  canvas.set_global_alpha(0.7);
  canvas.set_composite_op(CompositeOp::LIGHTER);
  canvas.set_line_width(5.);
  canvas.set_line_cap(LineCap::Circle);
  canvas.set_line_join(LineJoin::Round);
  canvas.set_miter_limit(3.);
  canvas.set_line_dash(&[4., 2.]);
  canvas.set_line_dash_offset(1.);
  canvas.set_text_align(TextAlign::Center);
  canvas.set_text_baseline(TextBaseline::Middle);
  canvas.set_fill_style(Color::RED);
  canvas.set_shadow_blur(2.);

  let matrix = canvas.current_transform();
  for _ in 0..3 {
    canvas.save();
  }
  canvas.reset_transform();
  canvas.set_global_alpha(0.1);
  canvas.set_composite_op(CompositeOp::XOR);
  canvas.set_line_width(1.);
  canvas.set_line_cap(LineCap::Square);
  canvas.set_line_join(LineJoin::Bevel);
  canvas.set_miter_limit(9.);
  canvas.set_line_dash(&[]);
  canvas.set_line_dash_offset(0.);
  canvas.set_text_align(TextAlign::END);
  canvas.set_text_baseline(TextBaseline::Top);
  canvas.set_fill_style(Color::WHITE);
  canvas.set_shadow_blur(0.);
  for _ in 0..3 {
    canvas.restore();
  }

  assert_eq!(canvas.current_transform(), matrix);
  assert_eq!(canvas.global_alpha(), 0.7);
  assert_eq!(canvas.composite_op(), CompositeOp::LIGHTER);
  assert_eq!(canvas.line_width(), 5.);
  assert_eq!(canvas.line_cap(), LineCap::Circle);
  assert_eq!(canvas.line_join(), LineJoin::Round);
  assert_eq!(canvas.miter_limit(), 3.);
  assert_eq!(canvas.line_dash(), &[4., 2.]);
  assert_eq!(canvas.line_dash_offset(), 1.);
  assert_eq!(canvas.text_align(), TextAlign::Center);
  assert_eq!(canvas.text_baseline(), TextBaseline::Middle);
  assert_eq!(canvas.fill_style(), &pictor_canvas::FillStyle::Color(Color::RED));
  assert_eq!(canvas.shadow_blur(), 2.);
}

#[test]
fn restore_brings_the_clip_back() {
  let mut canvas = canvas(60, 60);
  canvas.save();
  canvas.begin_path();
  canvas.rect(&rect(10., 10., 10., 10.));
  canvas.clip();
  canvas.restore();

  canvas.set_fill_style(Color::RED);
  canvas.fill_rect(&rect(0., 0., 60., 60.));
  assert!(canvas.surface().pixel(40, 40).a > 0.99);
}

#[test]
fn invalid_settings_are_ignored() {
  let mut canvas = canvas(16, 16);
  canvas.set_global_alpha(0.5);
  canvas.set_global_alpha(1.5);
  canvas.set_global_alpha(-0.25);
  assert_eq!(canvas.global_alpha(), 0.5);

  canvas.set_line_width(2.);
  canvas.set_line_width(0.);
  canvas.set_line_width(-3.);
  assert_eq!(canvas.line_width(), 2.);

  canvas.set_miter_limit(4.);
  canvas.set_miter_limit(0.);
  assert_eq!(canvas.miter_limit(), 4.);

  canvas.set_shadow_blur(3.);
  canvas.set_shadow_blur(-1.);
  assert_eq!(canvas.shadow_blur(), 3.);

  canvas.translate(5., 5.);
  let before = canvas.current_transform();
  canvas.set_transform(1., 2., 2., 4., 0., 0.);
  assert_eq!(canvas.current_transform(), before);
}

#[test]
#[should_panic(expected = "save stack overflow")]
fn overflowing_the_save_stack_is_fatal() {
  let mut canvas = canvas(8, 8);
  for _ in 0..17 {
    canvas.save();
  }
}

#[test]
#[should_panic(expected = "restore without matching save")]
fn restoring_past_the_bottom_is_fatal() {
  let mut canvas = canvas(8, 8);
  canvas.restore();
}
