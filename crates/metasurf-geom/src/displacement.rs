//! Procedural mapping and displacement.
//!
//! Mapping and displacement procedures are supplied by the host
//! application and evaluated once per UV sample. Displacement is baked into
//! a [`DisplacementImage`] per patch; displacement-driven subdivision then
//! works on the raster only.

use metasurf_math::{next_pow2, Point2, Point3, Vec3};

use crate::ParametricPatch;

/// Inputs visible to a mapping or displacement procedure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleContext {
    /// Material ID of the patch being evaluated.
    pub material: u32,
    /// Patch-local parameter.
    pub uv: Point2,
    /// Undisplaced surface position.
    pub position: Point3,
    /// Undisplaced surface normal.
    pub normal: Vec3,
    /// Average normal of the patch corners.
    pub face_normal: Vec3,
}

/// A procedure producing the displaced position of a surface sample.
pub trait Displacement: Send + Sync + std::fmt::Debug {
    /// Displaced position for `ctx`.
    fn displace(&self, ctx: &SampleContext) -> Point3;
}

/// A procedure producing texture coordinates for a patch corner.
pub trait UvMapping: Send + Sync + std::fmt::Debug {
    /// Texture coordinate for `ctx`.
    fn map(&self, ctx: &SampleContext) -> Point2;
}

/// Split request produced by a flatness test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitDecision {
    /// Split across `u` (new vertices on edges 0 and 2).
    pub split_u: bool,
    /// Split across `v` (new vertices on edges 1 and 3).
    pub split_v: bool,
    /// Bit `i` set when edge `i` is still curved and must keep its true
    /// midpoint.
    pub curved: u8,
}

impl SplitDecision {
    /// Whether any split is requested.
    pub fn any(&self) -> bool {
        self.split_u || self.split_v
    }

    fn mark_u(&mut self, edge_bit: u8) {
        self.split_u = true;
        self.curved |= edge_bit;
    }

    fn mark_v(&mut self, edge_bit: u8) {
        self.split_v = true;
        self.curved |= edge_bit;
    }
}

/// Raster of displaced positions sampled on a regular UV grid.
#[derive(Debug, Clone)]
pub struct DisplacementImage {
    width: usize,
    height: usize,
    texels: Vec<Point3>,
}

/// Texel rounding bias used when quantizing UV coordinates.
const TEXEL_BIAS: f64 = 0.499_023_437_5;

impl DisplacementImage {
    /// Raster dimension along one axis for a physical extent `len`.
    pub fn dimension(len: f64, precision: f64) -> usize {
        let raw = if precision > 0.0 {
            (len * 0.75 / precision).clamp(0.0, 4096.0) as u32
        } else {
            0
        };
        (next_pow2(raw) as usize + 1).clamp(2, 1024)
    }

    /// Sample `displacement` over the surface of `patch`.
    ///
    /// The raster size follows the physical size of the control quad
    /// `controls` divided by `precision`.
    pub fn build(
        patch: &dyn ParametricPatch,
        controls: &[Point3; 4],
        precision: f64,
        displacement: &dyn Displacement,
        base: &SampleContext,
    ) -> Self {
        let [c0, c1, c2, c3] = controls;
        let du0 = c1 - c0;
        let du1 = c2 - c3;
        let dv0 = c3 - c0;
        let dv1 = c2 - c1;

        let area = (du0.cross(&dv1).norm() + du1.cross(&dv0).norm()) * 0.5;
        let du = du0.norm().max(du1.norm());
        let dv = if du > 0.0 { area / du } else { 0.0 };

        let width = Self::dimension(du, precision);
        let height = Self::dimension(dv, precision);

        let mut texels = Vec::with_capacity(width * height);
        for y in 0..height {
            let v = y as f64 / (height - 1) as f64;
            for x in 0..width {
                let u = x as f64 / (width - 1) as f64;
                let uv = Point2::new(u, v);
                let (position, normal) = patch.parameters(&uv);
                let ctx = SampleContext {
                    uv,
                    position,
                    normal,
                    ..*base
                };
                texels.push(displacement.displace(&ctx));
            }
        }

        Self {
            width,
            height,
            texels,
        }
    }

    /// Raster size `(width, height)`.
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn texel(&self, x: usize, y: usize) -> Point3 {
        self.texels[y * self.width + x]
    }

    /// Bilinearly interpolated displaced position at `uv`.
    pub fn displace(&self, uv: &Point2) -> Point3 {
        let s = uv.x.clamp(0.0, 1.0) * (self.width - 1) as f64;
        let t = uv.y.clamp(0.0, 1.0) * (self.height - 1) as f64;
        let xi = (s as usize).min(self.width - 1);
        let yi = (t as usize).min(self.height - 1);
        let xf = s - xi as f64;
        let yf = t - yi as f64;

        let xn = if xi < self.width - 1 { xi + 1 } else { xi };
        let yn = if yi < self.height - 1 { yi + 1 } else { yi };

        let bl = self.texel(xi, yi).coords;
        let br = self.texel(xn, yi).coords;
        let tl = self.texel(xi, yn).coords;
        let tr = self.texel(xn, yn).coords;
        let bottom = bl.lerp(&br, xf);
        let top = tl.lerp(&tr, xf);
        Point3::from(bottom.lerp(&top, yf))
    }

    /// Surface normal of the displaced raster at `uv`, from central
    /// differences one texel apart. Returns `fallback` on flat spots.
    pub fn normal(&self, uv: &Point2, fallback: &Vec3) -> Vec3 {
        let hu = 1.0 / (self.width - 1) as f64;
        let hv = 1.0 / (self.height - 1) as f64;
        let at = |u: f64, v: f64| self.displace(&Point2::new(u.clamp(0.0, 1.0), v.clamp(0.0, 1.0)));
        let su = at(uv.x + hu, uv.y) - at(uv.x - hu, uv.y);
        let sv = at(uv.x, uv.y + hv) - at(uv.x, uv.y - hv);
        su.cross(&sv).try_normalize(1e-12).unwrap_or(*fallback)
    }

    /// Walk texels `from..=to` along a row (`step = 1`) or column
    /// (`step = width`) starting at `start`, and report whether any interior
    /// texel strays more than `error2` (squared) from the straight line
    /// joining the two ends.
    fn scanline(&self, start: usize, step: usize, from: usize, to: usize, error2: f64) -> bool {
        let span = to - from;
        let p0 = self.texels[start].coords;
        let p1 = self.texels[start + step * span].coords;
        let inc = (p1 - p0) / span as f64;
        let mut p = p0;
        let mut src = start;
        for _ in from + 1..to {
            p += inc;
            src += step;
            if (p - self.texels[src].coords).norm_squared() > error2 {
                return true;
            }
        }
        false
    }

    /// Flatness test of the subpatch spanning `uv0..uv2`.
    ///
    /// `curved` holds one bit per subpatch edge still considered curved;
    /// only those edges are scanned. Interior rows (columns) are scanned
    /// only while no edge already requested the split.
    pub fn flatness(&self, uv0: &Point2, uv2: &Point2, curved: u8, error: f64) -> SplitDecision {
        let error2 = error * error;
        let sx = (self.width - 1) as f64;
        let sy = (self.height - 1) as f64;
        let u0 = (uv0.x * sx + TEXEL_BIAS) as usize;
        let v0 = (uv0.y * sy + TEXEL_BIAS) as usize;
        let u1 = ((uv2.x * sx + TEXEL_BIAS) as usize).min(self.width - 1);
        let v1 = ((uv2.y * sy + TEXEL_BIAS) as usize).min(self.height - 1);
        let w = self.width;

        let mut out = SplitDecision::default();

        if u1 > u0 + 1 {
            if curved & 1 != 0 && self.scanline(u0 + v0 * w, 1, u0, u1, error2) {
                out.mark_u(1);
            }
            if curved & 4 != 0 && self.scanline(u0 + v1 * w, 1, u0, u1, error2) {
                out.mark_u(4);
            }
            let mut j = v0 + 1;
            while j < v1 && !out.split_u {
                if self.scanline(u0 + j * w, 1, u0, u1, error2) {
                    out.split_u = true;
                }
                j += 1;
            }
        }

        if v1 > v0 + 1 {
            if curved & 8 != 0 && self.scanline(u0 + v0 * w, w, v0, v1, error2) {
                out.mark_v(8);
            }
            if curved & 2 != 0 && self.scanline(u1 + v0 * w, w, v0, v1, error2) {
                out.mark_v(2);
            }
            let mut i = u0 + 1;
            while i < u1 && !out.split_v {
                if self.scanline(i + v0 * w, w, v0, v1, error2) {
                    out.split_v = true;
                }
                i += 1;
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BilinearPatch;

    #[derive(Debug)]
    struct Bump;

    impl Displacement for Bump {
        fn displace(&self, ctx: &SampleContext) -> Point3 {
            let h = (ctx.uv.x * std::f64::consts::PI).sin() * 0.25;
            ctx.position + ctx.normal * h
        }
    }

    #[derive(Debug)]
    struct Identity;

    impl Displacement for Identity {
        fn displace(&self, ctx: &SampleContext) -> Point3 {
            ctx.position
        }
    }

    fn square() -> (BilinearPatch, [Point3; 4]) {
        let c = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        (BilinearPatch::new(c), c)
    }

    fn base() -> SampleContext {
        SampleContext {
            material: 0,
            uv: Point2::origin(),
            position: Point3::origin(),
            normal: Vec3::z(),
            face_normal: Vec3::z(),
        }
    }

    #[test]
    fn dimensions_are_pow2_plus_one_and_clamped() {
        assert_eq!(DisplacementImage::dimension(1.0, 0.1), 9);
        assert_eq!(DisplacementImage::dimension(0.0, 0.1), 2);
        assert_eq!(DisplacementImage::dimension(1e6, 0.1), 1024);
    }

    #[test]
    fn flat_displacement_never_splits() {
        let (p, c) = square();
        let img = DisplacementImage::build(&p, &c, 0.1, &Identity, &base());
        assert_eq!(img.size(), (9, 9));
        let d = img.flatness(&Point2::new(0.0, 0.0), &Point2::new(1.0, 1.0), 0xf, 1e-3);
        assert!(!d.any(), "flat raster requested a split: {d:?}");
    }

    #[test]
    fn bump_splits_across_u_only() {
        let (p, c) = square();
        let img = DisplacementImage::build(&p, &c, 0.1, &Bump, &base());
        let d = img.flatness(&Point2::new(0.0, 0.0), &Point2::new(1.0, 1.0), 0xf, 1e-3);
        assert!(d.split_u);
        assert!(!d.split_v, "bump is constant along v");
        assert_eq!(d.curved & 0b0101, 0b0101, "both u edges are curved");
    }

    #[test]
    fn displace_interpolates_texels() {
        let (p, c) = square();
        let img = DisplacementImage::build(&p, &c, 0.1, &Bump, &base());
        let mid = img.displace(&Point2::new(0.5, 0.5));
        assert!((mid.z - 0.25).abs() < 1e-12, "texel at u=0.5 is exact, got {}", mid.z);
        let edge = img.displace(&Point2::new(1.0, 1.0));
        assert!((edge - Point3::new(1.0, 1.0, 0.0)).norm() < 1e-12);
    }
}
