use crate::orientation::DisplayOrientation;

/// A 2D affine transform in row-major form:
///
/// ```text
/// x' = a * x + b * y + tx
/// y' = c * x + d * y + ty
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Transform2D {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Rotation by `degrees` (counter-clockwise positive) about `(cx, cy)`.
    pub fn rotation_about(degrees: f64, cx: f64, cy: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            a: cos,
            b: -sin,
            c: sin,
            d: cos,
            tx: cx - cos * cx + sin * cy,
            ty: cy - sin * cx - cos * cy,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Apply the transform to a point.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.b * y + self.tx,
            self.c * x + self.d * y + self.ty,
        )
    }

    /// Inverse transform, or `None` when the transform is degenerate.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let a = self.d * inv_det;
        let b = -self.b * inv_det;
        let c = -self.c * inv_det;
        let d = self.a * inv_det;
        Some(Self {
            a,
            b,
            c,
            d,
            tx: -(a * self.tx + b * self.ty),
            ty: -(c * self.tx + d * self.ty),
        })
    }
}

/// Computes the upright-correcting transform for a preview surface.
///
/// The preview output is counter-rotated by the display orientation about the
/// view center so the rendered image stays upright across all four physical
/// orientations. Pure and stateless; invoked on every layout change, not once.
pub struct PreviewTransformCalculator;

impl PreviewTransformCalculator {
    pub fn compute_transform(
        view_width: u32,
        view_height: u32,
        orientation: DisplayOrientation,
    ) -> Transform2D {
        if orientation == DisplayOrientation::Deg0 {
            return Transform2D::IDENTITY;
        }

        let center_x = view_width as f64 / 2.0;
        let center_y = view_height as f64 / 2.0;
        Transform2D::rotation_about(-(orientation.degrees() as f64), center_x, center_y)
    }
}
