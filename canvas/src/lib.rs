//! A single-threaded CPU rasterizer for 2D vector graphics, shaped
//! after the HTML5 canvas drawing model: paths, strokes, fills, clips,
//! shadows and affine transforms, rendered with gamma-correct
//! premultiplied blending into a caller-supplied pixel buffer.

mod brush;
mod canvas;
mod clip;
mod color;
mod compose;
mod dash;
mod path;
mod raster;
mod shadow;
mod state;
mod stroke;
mod surface;
mod tess;

pub use brush::{FillStyle, Gradient, GradientStop, Pattern, Repetition};
pub use canvas::{Canvas, MAX_CANVAS_EXTENT, MAX_SAVE_DEPTH};
pub use color::{Color, Gamma};
pub use compose::CompositeOp;
pub use path::BorderRadius;
pub use state::{LineCap, LineJoin, TextAlign, TextBaseline};
pub use surface::{Bitmap, PixelFormat, Surface};

pub use pictor_geom::{Point, Rect, Size, Vector};
