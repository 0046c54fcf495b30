//! Tracing of light beams bouncing off planar disk reflectors, optionally
//! ending in a receiving aperture (e.g. an optical fiber).

pub use nalgebra;

use impl_trait_for_tuples::impl_for_tuples;
use nalgebra::{zero, RealField, SVector, Unit};

mod bench;
mod disk;
mod error;
mod receiver;
mod registry;
mod trace;

pub use bench::*;
pub use disk::*;
pub use error::*;
pub use receiver::*;
pub use registry::*;
pub use trace::*;

/// The scalar type used by the JSON and random scene crates.
pub type Float = f64;

/// Reflect `v` w.r.t. the hyperplane orthogonal to `normal`
/// (`v - 2 (v . n) n`).
#[inline]
#[must_use]
pub fn reflect<S: RealField, const D: usize>(
    v: &SVector<S, D>,
    normal: &Unit<SVector<S, D>>,
) -> SVector<S, D> {
    let n = normal.as_ref();
    let p = v.dot(n);
    v - n * (p.clone() + p)
}

/// A light ray, represented as a half-line
#[derive(Clone, Debug)]
pub struct Ray<S, const D: usize> {
    /// The starting point of the half-line
    pub origin: SVector<S, D>,
    /// the direction of the half-line
    pub dir: Unit<SVector<S, D>>,
}

// Unit<Vector<T>>: PartialEq has an extra (useless?) requirement of T: Scalar
impl<S: PartialEq, const D: usize> PartialEq for Ray<S, D> {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin && self.dir.as_ref() == other.dir.as_ref()
    }
}

impl<S: RealField, const D: usize> Ray<S, D> {
    /// Returns [`TraceError::InvalidDirection`] if `dir` is zero or not finite.
    #[inline]
    pub fn try_new(
        origin: impl Into<SVector<S, D>>,
        dir: impl Into<SVector<S, D>>,
    ) -> Result<Self> {
        try_normalize(dir.into())
            .map(|dir| Self {
                origin: origin.into(),
                dir,
            })
            .ok_or(TraceError::InvalidDirection)
    }

    /// # Panics
    ///
    /// If `dir` is the zero vector.
    #[inline]
    #[must_use]
    pub fn new(origin: impl Into<SVector<S, D>>, dir: impl Into<SVector<S, D>>) -> Self {
        Self::try_new(origin, dir).expect("direction must be non-zero")
    }

    #[inline]
    #[must_use]
    pub fn new_unit_dir(origin: impl Into<SVector<S, D>>, dir: Unit<SVector<S, D>>) -> Self {
        Self {
            origin: origin.into(),
            dir,
        }
    }

    /// Returns the smallest positive `t`, above the guard distance described in
    /// [`SimulationCtx::add_tangent`], such that [`self.at(t)`](Self::at)
    /// lies on `mirror`, along with the mirror's unit normal at that point, if any.
    ///
    /// Right after a reflection, the ray's origin lies (approximately) on the
    /// surface it just left. The guard keeps that surface from being hit
    /// again at `t ~ 0`.
    ///
    /// `eps.abs()` is used.
    #[inline]
    #[must_use]
    pub fn closest_intersection(
        &self,
        mirror: &(impl Mirror<D, Scalar = S> + ?Sized),
        eps: S,
    ) -> Option<(S, Unit<SVector<S, D>>)> {
        let mut ctx = SimulationCtx::new(self, eps);
        mirror.add_tangents(&mut ctx);
        ctx.reset_closest()
    }

    /// Reflect [`self.dir`](Self::dir) off the surface with the given `normal`.
    #[inline]
    pub fn reflect_dir(&mut self, normal: &Unit<SVector<S, D>>) {
        self.dir = Unit::new_normalize(reflect(self.dir.as_ref(), normal));
    }

    /// Translates [`self.origin`](Self::origin) by [`self.dir`](Self::dir)`* t`.
    #[inline]
    pub fn advance(&mut self, t: S) {
        self.origin += self.dir.as_ref() * t;
    }

    /// Returns [`self.origin`](Self::origin), translated by [`self.dir`](Self::dir)`* t`.
    #[inline]
    #[must_use]
    pub fn at(&self, t: S) -> SVector<S, D> {
        &self.origin + self.dir.as_ref() * t
    }
}

/// Normalizes `v`, returning `None` if it is zero or has non-finite coordinates.
#[inline]
pub(crate) fn try_normalize<S: RealField, const D: usize>(
    v: SVector<S, D>,
) -> Option<Unit<SVector<S, D>>> {
    if v.iter().all(|c| c.is_finite()) {
        Unit::try_new(v, zero())
    } else {
        None
    }
}

pub struct SimulationCtx<'a, S: RealField, const D: usize> {
    ray: &'a Ray<S, D>,
    closest: Option<(S, Unit<SVector<S, D>>)>,
    // garanteed to be positive
    epsilon: S,
    // max(1, |origin|_inf)
    scale: S,
}

impl<'a, S: RealField, const D: usize> SimulationCtx<'a, S, D> {
    #[inline]
    #[must_use]
    fn new(ray: &'a Ray<S, D>, epsilon: S) -> Self {
        let scale = ray
            .origin
            .iter()
            .fold(S::one(), |acc, c| acc.max(c.clone().abs()));

        Self {
            ray,
            epsilon: epsilon.abs(),
            closest: None,
            scale,
        }
    }

    /// Smallest distance at which a surface with the given `normal` may be hit.
    ///
    /// The rounding error on the ray's origin grows with its coordinates, and
    /// turns into an error on `t` amplified by `1 / |dir . normal|`, so the
    /// guard is `eps * max(1, |origin|_inf) / |dir . normal|`.
    fn min_dist(&self, normal: &Unit<SVector<S, D>>) -> S {
        let cos = self
            .ray
            .dir
            .as_ref()
            .dot(normal.as_ref())
            .abs()
            .max(S::default_epsilon());

        self.epsilon.clone() * self.scale.clone() / cos
    }

    /// Stores `dist`, and `normal` along with it, if `dist` is strictly
    /// greater than `eps * max(1, |origin|_inf) / |dir . normal|` and
    /// strictly smaller than the distance stored internally.
    ///
    /// Ties keep the tangent that was added first.
    pub fn add_tangent(&mut self, dist: S, normal: Unit<SVector<S, D>>) {
        if dist > self.min_dist(&normal)
            && self
                .closest
                .as_ref()
                .map_or(true, |(t, _)| *t > dist)
        {
            self.closest = Some((dist, normal));
        }
    }

    #[inline]
    #[must_use]
    pub const fn ray(&self) -> &Ray<S, D> {
        self.ray
    }

    #[inline]
    fn reset_closest(&mut self) -> Option<(S, Unit<SVector<S, D>>)> {
        self.closest.take()
    }
}

/// A reflective surface, or a set of them.
///
/// The dimension parameter, `D`, defines the dimension of the space it
/// exists in (3 for optical benches, but 2 works just as well).
pub trait Mirror<const D: usize> {
    type Scalar: RealField;
    /// Adds the tangents to this mirror, at the points of intersection
    /// between it and a given ray, in no particular order.
    ///
    /// The ray can be accessed through [`ctx.ray( )`](SimulationCtx::ray).
    ///
    /// Tangents can be added with [`ctx.add_tangent(...)`](SimulationCtx::add_tangent).
    ///
    /// Adds nothing if the ray doesn't intersect with the set that `self` represents.
    ///
    /// Tangents at negative (or too small) distances are discarded by `ctx`.
    ///
    /// This method must be deterministic with respect to the ray: the bounce
    /// tracer relies on tracing being a pure function of the geometry.
    fn add_tangents(&self, ctx: &mut SimulationCtx<Self::Scalar, D>);
}

#[impl_for_tuples(1, 16)]
impl<S: RealField, const D: usize> Mirror<D> for T {
    for_tuples!( where #( T: Mirror<D, Scalar = S> )* );
    type Scalar = S;

    #[inline]
    fn add_tangents(&self, ctx: &mut SimulationCtx<Self::Scalar, D>) {
        for_tuples!( #( T.add_tangents(ctx); )* );
    }
}

impl<const D: usize, T: Mirror<D>> Mirror<D> for [T] {
    type Scalar = T::Scalar;
    #[inline]
    fn add_tangents(&self, ctx: &mut SimulationCtx<Self::Scalar, D>) {
        self.iter().for_each(|mirror| mirror.add_tangents(ctx));
    }
}

impl<const D: usize, T: Mirror<D>> Mirror<D> for Vec<T> {
    type Scalar = T::Scalar;
    #[inline]
    fn add_tangents(&self, ctx: &mut SimulationCtx<Self::Scalar, D>) {
        self.as_slice().add_tangents(ctx);
    }
}

impl<const D: usize, T: Mirror<D> + ?Sized> Mirror<D> for &T {
    type Scalar = T::Scalar;
    #[inline]
    fn add_tangents(&self, ctx: &mut SimulationCtx<Self::Scalar, D>) {
        (*self).add_tangents(ctx);
    }
}


#[cfg(test)]
mod tests {
    use super::{test_util::*, *};
    use nalgebra::Vector3;

    #[test]
    fn zero_direction_is_rejected() {
        assert_eq!(
            Ray::<f64, 3>::try_new([0., 0., 0.], [0., 0., 0.]),
            Err(TraceError::InvalidDirection)
        );
        assert_eq!(
            Ray::<f64, 3>::try_new([0., 0., 0.], [f64::NAN, 1., 0.]),
            Err(TraceError::InvalidDirection)
        );
    }

    #[test]
    fn direction_is_normalized() {
        let ray = Ray::<f64, 3>::new([1., 2., 3.], [0., 3., 4.]);
        assert_vec_close(ray.dir.as_ref(), &Vector3::new(0., 0.6, 0.8));
        assert_vec_close(&ray.at(5.), &Vector3::new(1., 5., 7.));
    }

    #[test]
    fn reflection_preserves_norm_and_flips_normal_component() {
        let n = Unit::new_normalize(Vector3::new(1., 0., 1.));
        let d = Vector3::new(-1., 0.2, 0.1).normalize();

        let r = reflect(&d, &n);

        assert_close(r.norm(), 1.);
        assert_close(r.dot(n.as_ref()), -d.dot(n.as_ref()));
        assert_vec_close(&r, &(d - n.as_ref() * (2. * d.dot(n.as_ref()))));
    }

    #[test]
    fn closest_tangent_wins_and_ties_keep_the_first() {
        let ray = Ray::<f64, 3>::new([0., 0., 0.], [1., 0., 0.]);
        let mut ctx = SimulationCtx::new(&ray, 1e-12);

        let first = Unit::new_normalize(Vector3::new(-1., 0., 0.));
        let second = Unit::new_normalize(Vector3::new(-1., 1., 0.));

        ctx.add_tangent(-1., second);
        ctx.add_tangent(0., second);
        ctx.add_tangent(3., second);
        ctx.add_tangent(2., first);
        ctx.add_tangent(2., second);

        let (t, n) = ctx.reset_closest().unwrap();
        assert_close(t, 2.);
        assert_eq!(n.as_ref(), first.as_ref());
    }
}
