use crate::{
  brush::{FillStyle, PaintBrush},
  color::{Color, Gamma},
  compose::CompositeOp,
  raster::Run,
};
use pictor_geom::{DeviceSize, DeviceVector, InverseTransform, Transform};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// The shape of a stroke's open ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineCap {
  #[default]
  Butt,
  Square,
  Circle,
}

/// The shape of a stroke's corners.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineJoin {
  #[default]
  Miter,
  Bevel,
  Round,
}

/// Horizontal anchoring of text relative to its draw position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAlign {
  #[default]
  Leftward,
  Rightward,
  Center,
}

impl TextAlign {
  pub const START: TextAlign = TextAlign::Leftward;
  pub const END: TextAlign = TextAlign::Rightward;
}

/// Vertical anchoring of text relative to its draw position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextBaseline {
  #[default]
  Alphabetic,
  Top,
  Middle,
  Bottom,
  Hanging,
}

impl TextBaseline {
  pub const IDEOGRAPHIC: TextBaseline = TextBaseline::Bottom;
}

/// Everything `save` preserves and `restore` brings back.
#[derive(Clone, Debug)]
pub(crate) struct DrawState {
  pub matrix: Transform,
  pub inverse: InverseTransform,
  pub global_alpha: f32,
  pub composite_op: CompositeOp,
  pub shadow_color: Color,
  pub shadow_offset: DeviceVector,
  pub shadow_blur: f32,
  pub line_width: f32,
  pub line_cap: LineCap,
  pub line_join: LineJoin,
  pub miter_limit: f32,
  pub dash_pattern: SmallVec<[f32; 4]>,
  pub dash_offset: f32,
  pub text_align: TextAlign,
  pub text_baseline: TextBaseline,
  pub fill_style: FillStyle,
  pub fill_brush: PaintBrush,
  pub stroke_style: FillStyle,
  pub stroke_brush: PaintBrush,
  pub clip_mask: Vec<Run>,
}

impl DrawState {
  pub fn new(size: DeviceSize, gamma: Gamma) -> Self {
    let fill_style = FillStyle::Color(Color::BLACK);
    let stroke_style = FillStyle::Color(Color::BLACK);
    Self {
      matrix: Transform::identity(),
      inverse: InverseTransform::identity(),
      global_alpha: 1.,
      composite_op: CompositeOp::SOURCE_OVER,
      shadow_color: Color::TRANSPARENT,
      shadow_offset: DeviceVector::zero(),
      shadow_blur: 0.,
      line_width: 1.,
      line_cap: LineCap::default(),
      line_join: LineJoin::default(),
      miter_limit: 10.,
      dash_pattern: SmallVec::new(),
      dash_offset: 0.,
      text_align: TextAlign::default(),
      text_baseline: TextBaseline::default(),
      fill_brush: PaintBrush::new(&fill_style, gamma),
      stroke_brush: PaintBrush::new(&stroke_style, gamma),
      fill_style,
      stroke_style,
      clip_mask: full_mask(size),
    }
  }

  /// Shadows draw only when they would be visible at all.
  pub fn shadow_enabled(&self) -> bool {
    self.shadow_color.a > 0.
      && (self.shadow_blur > 0. || self.shadow_offset.x != 0. || self.shadow_offset.y != 0.)
  }
}

/// The mask that hides nothing: every row fully visible.
pub(crate) fn full_mask(size: DeviceSize) -> Vec<Run> {
  let mut mask = Vec::with_capacity(2 * size.height as usize);
  for y in 0..size.height as u16 {
    mask.push(Run { x: 0, y, delta: 1. });
    mask.push(Run { x: size.width as u16, y, delta: -1. });
  }
  mask
}
