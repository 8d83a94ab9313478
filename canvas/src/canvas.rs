use crate::{
  brush::{FillStyle, PaintBrush, Pattern, Repetition},
  clip, compose,
  color::{Color, Gamma},
  dash, raster,
  shadow::{self, BlurKernel, ShadowGrid},
  state::{DrawState, LineCap, LineJoin, TextAlign, TextBaseline},
  stroke::{self, StrokeStyle},
  surface::Surface,
  tess,
};
use crate::{compose::CompositeOp, path::PathData, raster::Run};
use pictor_geom::{
  DevicePoint, DeviceVector, LogicTransform, Point, Rect, Transform, Vector,
};

/// How many states may be stacked by [`Canvas::save`]. Running past the
/// cap, like restoring past the bottom, is a programming error.
pub const MAX_SAVE_DEPTH: usize = 16;

/// Smallest and largest supported surface extent, in pixels.
pub const MAX_CANVAS_EXTENT: u32 = 32_768;

/// An immediate-mode 2D drawing context rasterizing into a [`Surface`].
///
/// The canvas owns all drawing state; the surface is exclusively
/// mutated during a draw call and can be taken back with
/// [`Canvas::into_surface`]. One canvas is single-threaded, but
/// independent canvases share nothing and may live on different
/// threads.
pub struct Canvas<S: Surface> {
  surface: S,
  gamma: Gamma,
  pub(crate) state: DrawState,
  saved: Vec<DrawState>,
  pub(crate) path: PathData,
  lines: PathData,
  dashed: PathData,
  stroked: PathData,
  user_scratch: Vec<Point>,
  clip_front: Vec<DevicePoint>,
  clip_back: Vec<DevicePoint>,
  runs: Vec<Run>,
  mask_scratch: Vec<Run>,
  shadow_grid: ShadowGrid,
  span: Vec<Color>,
}

enum PassSource {
  Lines,
  Stroked,
}

enum PassBrush {
  Fill,
  Stroke,
  Replaced,
}

impl<S: Surface> Canvas<S> {
  /// Wrap a surface in a drawing context using the given gamma curve
  /// for all color conversion.
  ///
  /// # Panics
  /// When the surface extent is outside `1..=32768` on either axis.
  pub fn new(surface: S, gamma: Gamma) -> Self {
    let size = surface.size();
    assert!(
      (1..=MAX_CANVAS_EXTENT).contains(&size.width)
        && (1..=MAX_CANVAS_EXTENT).contains(&size.height),
      "canvas size {}x{} out of range",
      size.width,
      size.height,
    );
    Self {
      state: DrawState::new(size, gamma),
      surface,
      gamma,
      saved: Vec::new(),
      path: PathData::default(),
      lines: PathData::default(),
      dashed: PathData::default(),
      stroked: PathData::default(),
      user_scratch: Vec::new(),
      clip_front: Vec::new(),
      clip_back: Vec::new(),
      runs: Vec::new(),
      mask_scratch: Vec::new(),
      shadow_grid: ShadowGrid::default(),
      span: Vec::new(),
    }
  }

  #[inline]
  pub fn surface(&self) -> &S { &self.surface }

  #[inline]
  pub fn surface_mut(&mut self) -> &mut S { &mut self.surface }

  #[inline]
  pub fn into_surface(self) -> S { self.surface }

  #[inline]
  pub fn gamma(&self) -> Gamma { self.gamma }

  #[inline]
  pub fn width(&self) -> u32 { self.surface.size().width }

  #[inline]
  pub fn height(&self) -> u32 { self.surface.size().height }

  // ===== state stack ======================================================

  /// Saves the entire state of the canvas by pushing the current drawing
  /// state onto a stack.
  ///
  /// # Panics
  /// After [`MAX_SAVE_DEPTH`] unmatched saves.
  pub fn save(&mut self) {
    assert!(self.saved.len() < MAX_SAVE_DEPTH, "canvas save stack overflow");
    self.saved.push(self.state.clone());
  }

  /// Restores the most recently saved canvas state.
  ///
  /// # Panics
  /// When there is no saved state left to restore.
  pub fn restore(&mut self) {
    self.state = self.saved.pop().expect("canvas restore without matching save");
  }

  // ===== transforms =======================================================

  /// Resets the current transform to the identity and then applies the
  /// given matrix, specified by its `(a, b, c, d, e, f)` columns.
  pub fn set_transform(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
    let matrix = Transform::new(a, b, c, d, e, f);
    self.adopt_matrix(matrix);
  }

  /// Multiplies the current transform by the given matrix, applied
  /// ahead of it in user space.
  pub fn transform(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
    let local = LogicTransform::new(a, b, c, d, e, f);
    let matrix = local.then(&self.state.matrix);
    self.adopt_matrix(matrix);
  }

  #[inline]
  pub fn reset_transform(&mut self) { self.adopt_matrix(Transform::identity()); }

  /// Moves the origin of user space.
  #[inline]
  pub fn translate(&mut self, x: f32, y: f32) { self.transform(1., 0., 0., 1., x, y); }

  /// Scales user space per axis.
  #[inline]
  pub fn scale(&mut self, x: f32, y: f32) { self.transform(x, 0., 0., y, 0., 0.); }

  /// Rotates user space clockwise by `radians`.
  pub fn rotate(&mut self, radians: f32) {
    let (sin, cos) = radians.sin_cos();
    self.transform(cos, sin, -sin, cos, 0., 0.);
  }

  /// The current user-to-device matrix.
  #[inline]
  pub fn current_transform(&self) -> Transform { self.state.matrix }

  fn adopt_matrix(&mut self, matrix: Transform) {
    match matrix.inverse() {
      Some(inverse) => {
        self.state.matrix = matrix;
        self.state.inverse = inverse;
      }
      None => log::warn!("singular transform ignored: {matrix:?}"),
    }
  }

  // ===== compositing state ================================================

  #[inline]
  pub fn global_alpha(&self) -> f32 { self.state.global_alpha }

  /// Sets the opacity applied on top of every drawing operation. Values
  /// outside `[0, 1]` are ignored.
  pub fn set_global_alpha(&mut self, alpha: f32) {
    if (0. ..=1.).contains(&alpha) {
      self.state.global_alpha = alpha;
    } else {
      log::warn!("global alpha {alpha} ignored");
    }
  }

  #[inline]
  pub fn composite_op(&self) -> CompositeOp { self.state.composite_op }

  #[inline]
  pub fn set_composite_op(&mut self, op: CompositeOp) { self.state.composite_op = op; }

  #[inline]
  pub fn shadow_color(&self) -> Color { self.state.shadow_color }

  #[inline]
  pub fn set_shadow_color(&mut self, color: Color) { self.state.shadow_color = color; }

  #[inline]
  pub fn set_shadow_offset(&mut self, x: f32, y: f32) {
    self.state.shadow_offset = DeviceVector::new(x, y);
  }

  #[inline]
  pub fn shadow_blur(&self) -> f32 { self.state.shadow_blur }

  /// Sets the shadow spread. Negative blurs are ignored.
  pub fn set_shadow_blur(&mut self, blur: f32) {
    if blur >= 0. {
      self.state.shadow_blur = blur;
    } else {
      log::warn!("shadow blur {blur} ignored");
    }
  }

  // ===== stroke state =====================================================

  #[inline]
  pub fn line_width(&self) -> f32 { self.state.line_width }

  /// Sets the stroke thickness in user units. Zero and negative widths
  /// are ignored.
  pub fn set_line_width(&mut self, width: f32) {
    if width > 0. {
      self.state.line_width = width;
    } else {
      log::warn!("line width {width} ignored");
    }
  }

  #[inline]
  pub fn line_cap(&self) -> LineCap { self.state.line_cap }

  #[inline]
  pub fn set_line_cap(&mut self, cap: LineCap) { self.state.line_cap = cap; }

  #[inline]
  pub fn line_join(&self) -> LineJoin { self.state.line_join }

  #[inline]
  pub fn set_line_join(&mut self, join: LineJoin) { self.state.line_join = join; }

  #[inline]
  pub fn miter_limit(&self) -> f32 { self.state.miter_limit }

  /// Sets the length limit of miter joins, as a multiple of the half
  /// line width. Zero and negative limits are ignored.
  pub fn set_miter_limit(&mut self, limit: f32) {
    if limit > 0. {
      self.state.miter_limit = limit;
    } else {
      log::warn!("miter limit {limit} ignored");
    }
  }

  /// Sets the dash pattern, in user units. A pattern with a negative
  /// entry is ignored; an odd-length pattern is repeated to even it out.
  /// An empty pattern turns dashing off.
  pub fn set_line_dash(&mut self, pattern: &[f32]) {
    if pattern.iter().any(|&d| d < 0.) {
      log::warn!("dash pattern with negative entries ignored");
      return;
    }
    self.state.dash_pattern.clear();
    self.state.dash_pattern.extend_from_slice(pattern);
    if pattern.len() % 2 == 1 {
      self.state.dash_pattern.extend_from_slice(pattern);
    }
  }

  #[inline]
  pub fn line_dash(&self) -> &[f32] { &self.state.dash_pattern }

  #[inline]
  pub fn line_dash_offset(&self) -> f32 { self.state.dash_offset }

  #[inline]
  pub fn set_line_dash_offset(&mut self, offset: f32) { self.state.dash_offset = offset; }

  // ===== text state =======================================================

  #[inline]
  pub fn text_align(&self) -> TextAlign { self.state.text_align }

  #[inline]
  pub fn set_text_align(&mut self, align: TextAlign) { self.state.text_align = align; }

  #[inline]
  pub fn text_baseline(&self) -> TextBaseline { self.state.text_baseline }

  #[inline]
  pub fn set_text_baseline(&mut self, baseline: TextBaseline) {
    self.state.text_baseline = baseline;
  }

  // ===== brushes ==========================================================

  /// Returns the color, gradient, or pattern used for fills.
  #[inline]
  pub fn fill_style(&self) -> &FillStyle { &self.state.fill_style }

  /// Change the style of brush used to fill paths.
  pub fn set_fill_style(&mut self, style: impl Into<FillStyle>) {
    self.state.fill_style = style.into();
    self.state.fill_brush = PaintBrush::new(&self.state.fill_style, self.gamma);
  }

  /// Returns the color, gradient, or pattern used for strokes.
  #[inline]
  pub fn stroke_style(&self) -> &FillStyle { &self.state.stroke_style }

  /// Change the style of pen used to stroke paths.
  pub fn set_stroke_style(&mut self, style: impl Into<FillStyle>) {
    self.state.stroke_style = style.into();
    self.state.stroke_brush = PaintBrush::new(&self.state.stroke_style, self.gamma);
  }

  // ===== draw calls =======================================================

  /// Fills the interior of the current path with the fill brush, using
  /// non-zero winding.
  pub fn fill(&mut self) {
    tess::path_to_lines(&self.path, tess::FILL_ANGULAR, &mut self.lines);
    self.paint(PassSource::Lines, PassBrush::Fill, None);
  }

  /// Strokes the outline of the current path with the stroke pen,
  /// applying the dash pattern, joins and caps.
  pub fn stroke(&mut self) {
    self.flatten_and_expand_stroke();
    self.paint(PassSource::Stroked, PassBrush::Stroke, None);
  }

  /// Replaces the clip region with its intersection with the interior
  /// of the current path. Only `restore` can grow the region back.
  pub fn clip(&mut self) {
    tess::path_to_lines(&self.path, tess::FILL_ANGULAR, &mut self.lines);
    raster::lines_to_runs(
      &self.lines,
      DeviceVector::zero(),
      0.,
      self.surface.size(),
      &mut self.clip_front,
      &mut self.clip_back,
      &mut self.runs,
    );
    clip::intersect_mask(&self.state.clip_mask, &self.runs, &mut self.mask_scratch);
    std::mem::swap(&mut self.state.clip_mask, &mut self.mask_scratch);
  }

  /// Fills a rectangle with the fill brush without touching the current
  /// path.
  pub fn fill_rect(&mut self, rect: &Rect) {
    self.rect_to_lines(rect);
    self.paint(PassSource::Lines, PassBrush::Fill, None);
  }

  /// Strokes a rectangle outline without touching the current path.
  pub fn stroke_rect(&mut self, rect: &Rect) {
    self.rect_to_lines(rect);
    self.expand_stroke();
    self.paint(PassSource::Stroked, PassBrush::Stroke, None);
  }

  /// Erases a rectangle back to transparent black, ignoring the
  /// composite operation, shadow, and global alpha.
  pub fn clear_rect(&mut self, rect: &Rect) {
    self.rect_to_lines(rect);
    let eraser = PaintBrush::new(&FillStyle::Color(Color::BLACK), self.gamma);
    self.paint_with(
      PassSource::Lines,
      PassBrush::Replaced,
      Some(&eraser),
      1.,
      CompositeOp::DESTINATION_OUT,
      false,
    );
  }

  /// Resamples an RGBA8 image into the given user-space rectangle
  /// through the current transform, bicubically filtered.
  pub fn draw_image(&mut self, rgba: &[u8], width: u32, height: u32, to: &Rect) {
    let Some(pattern) = Pattern::new(rgba, width, height, Repetition::NoRepeat) else {
      return;
    };
    if to.width() == 0. || to.height() == 0. {
      return;
    }
    let brush = PaintBrush::new(&FillStyle::Pattern(pattern), self.gamma);

    // Map the image onto the target rectangle with a temporary matrix.
    let stashed = (self.state.matrix, self.state.inverse);
    let local = LogicTransform::scale(to.width() / width as f32, to.height() / height as f32)
      .then_translate(Vector::new(to.min_x(), to.min_y()));
    let combined = local.then(&stashed.0);
    let Some(inverse) = combined.inverse() else { return };
    self.state.matrix = combined;
    self.state.inverse = inverse;
    self.rect_to_lines(&Rect::new(
      Point::new(0., 0.),
      pictor_geom::Size::new(width as f32, height as f32),
    ));
    self.paint(PassSource::Lines, PassBrush::Replaced, Some(&brush));
    self.state.matrix = stashed.0;
    self.state.inverse = stashed.1;
  }

  // ===== pipeline =========================================================

  fn rect_to_lines(&mut self, rect: &Rect) {
    self.lines.clear();
    let corners = [
      rect.min(),
      Point::new(rect.max_x(), rect.min_y()),
      rect.max(),
      Point::new(rect.min_x(), rect.max_y()),
    ];
    self.lines.begin(self.state.matrix.transform_point(corners[0]));
    for corner in &corners[1..] {
      self.lines.push(self.state.matrix.transform_point(*corner));
    }
    self.lines.subpaths.last_mut().unwrap().closed = true;
  }

  fn flatten_and_expand_stroke(&mut self) {
    let angular = tess::stroke_angular(self.state.line_width);
    tess::path_to_lines(&self.path, angular, &mut self.lines);
    self.expand_stroke();
  }

  fn expand_stroke(&mut self) {
    let total: f32 = self.state.dash_pattern.iter().sum();
    let dashed = if !self.state.dash_pattern.is_empty() && total > 0. {
      dash::dash_lines(
        &self.lines,
        &self.state.dash_pattern,
        self.state.dash_offset,
        &self.state.inverse,
        &mut self.dashed,
      );
      &self.dashed
    } else {
      &self.lines
    };
    let style = StrokeStyle {
      width: self.state.line_width,
      cap: self.state.line_cap,
      join: self.state.line_join,
      miter_limit: self.state.miter_limit,
    };
    stroke::stroke_lines(
      dashed,
      &style,
      &self.state.matrix,
      &self.state.inverse,
      &mut self.user_scratch,
      &mut self.stroked,
    );
  }

  fn paint(&mut self, source: PassSource, brush: PassBrush, replacement: Option<&PaintBrush>) {
    self.paint_with(
      source,
      brush,
      replacement,
      self.state.global_alpha,
      self.state.composite_op,
      true,
    );
  }

  fn paint_with(
    &mut self,
    source: PassSource,
    brush: PassBrush,
    replacement: Option<&PaintBrush>,
    alpha: f32,
    op: CompositeOp,
    allow_shadow: bool,
  ) {
    let size = self.surface.size();
    let lines = match source {
      PassSource::Lines => &self.lines,
      PassSource::Stroked => &self.stroked,
    };
    let brush = match brush {
      PassBrush::Fill => &self.state.fill_brush,
      PassBrush::Stroke => &self.state.stroke_brush,
      PassBrush::Replaced => replacement.expect("replacement brush"),
    };

    if allow_shadow && self.state.shadow_enabled() {
      let kernel = BlurKernel::new(self.state.shadow_blur);
      let border = kernel.border;
      raster::lines_to_runs(
        lines,
        DeviceVector::new(
          border as f32 + self.state.shadow_offset.x,
          border as f32 + self.state.shadow_offset.y,
        ),
        2. * border as f32,
        size,
        &mut self.clip_front,
        &mut self.clip_back,
        &mut self.runs,
      );
      self.shadow_grid.accumulate(size, border, &self.runs);
      self.shadow_grid.blur(&kernel);
      shadow::render_shadow(
        &mut self.surface,
        self.gamma,
        &self.shadow_grid,
        border,
        &self.state.clip_mask,
        self.state.shadow_color,
        alpha,
        op,
        &mut self.span,
      );
    }

    raster::lines_to_runs(
      lines,
      DeviceVector::zero(),
      0.,
      size,
      &mut self.clip_front,
      &mut self.clip_back,
      &mut self.runs,
    );
    compose::render_main(
      &mut self.surface,
      self.gamma,
      &self.runs,
      &self.state.clip_mask,
      brush,
      alpha,
      op,
      &self.state.inverse,
      &mut self.span,
    );
  }
}
