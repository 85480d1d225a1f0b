/// Failures computing a layout from product geometry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum LayoutError {
    /// The product has no renderers, or no width or depth.
    #[error("product bounds are degenerate")]
    DegenerateBounds,

    #[error("slot name {0:?} contains no product id")]
    SlotWithoutId(String),
}
