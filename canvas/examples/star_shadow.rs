//! Draws a ten-point star with a soft drop shadow and writes the result
//! to `star_shadow.png`.

use pictor_canvas::{Bitmap, Canvas, Color, Gamma, PixelFormat, Point};

fn main() {
  env_logger::init();

  let mut canvas = Canvas::new(Bitmap::new(256, 256, PixelFormat::Rgba8), Gamma::Srgb);

  canvas.set_shadow_color(Color::new(0., 0., 0., 0.5));
  canvas.set_shadow_blur(8.);
  canvas.set_shadow_offset(0., 4.);

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

  let file = std::fs::File::create("star_shadow.png").expect("create star_shadow.png");
  canvas
    .surface()
    .png_encode(std::io::BufWriter::new(file))
    .expect("encode star_shadow.png");
  println!("wrote star_shadow.png");
}
