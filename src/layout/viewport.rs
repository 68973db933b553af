//! Viewport: The pixel area the overlay draws into.

/// Size of the render surface in pixels.
#[derive(Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

impl Viewport {
    /// Create a new viewport.
    #[inline]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Zero-sized viewport.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Whether both dimensions are finite and positive.
    ///
    /// Ticks are idle while this is false.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// X coordinate where new sprites enter.
    #[inline]
    pub fn spawn_x(&self) -> f64 {
        self.width + 10.0
    }
}

impl std::fmt::Debug for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Viewport({}x{})", self.width, self.height)
    }
}
