//! Geometry for the rasterizer, with the two coordinate worlds kept
//! apart by `euclid` unit tags: values cannot drift between user space
//! and the pixel grid without going through a transform.

/// Unit tag for user space, where paths, brushes and line widths are
/// specified.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicUnit;

/// Unit tag for the pixel grid of a drawing surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysicUnit;

pub type Point<T = f32> = euclid::Point2D<T, LogicUnit>;
pub type Vector<T = f32> = euclid::Vector2D<T, LogicUnit>;
pub type Size<T = f32> = euclid::Size2D<T, LogicUnit>;
pub type Rect<T = f32> = euclid::Rect<T, LogicUnit>;

/// A continuous position on the pixel grid; fractions matter to the
/// scan converter, so the default scalar stays `f32`.
pub type DevicePoint<T = f32> = euclid::Point2D<T, PhysicUnit>;
pub type DeviceVector<T = f32> = euclid::Vector2D<T, PhysicUnit>;
/// Surface extents count whole pixels.
pub type DeviceSize<T = u32> = euclid::Size2D<T, PhysicUnit>;

/// Maps user space onto the pixel grid of the canvas.
pub type Transform<T = f32> = euclid::Transform2D<T, LogicUnit, PhysicUnit>;
/// The reverse mapping, cached beside the forward matrix wherever both
/// are needed.
pub type InverseTransform<T = f32> = euclid::Transform2D<T, PhysicUnit, LogicUnit>;
/// A user-space-to-user-space transformation, the kind `transform()`
/// multiplies onto the current matrix.
pub type LogicTransform<T = f32> = euclid::Transform2D<T, LogicUnit, LogicUnit>;
