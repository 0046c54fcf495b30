use super::*;

/// A flat, infinitely thin disk: all points of the hyperplane through `center`
/// orthogonal to `normal` whose distance to `center` is at most `radius`.
///
/// Disks with a non-positive radius are degenerate and never intersected.
#[derive(Clone, Debug)]
pub struct Disk<S, const D: usize> {
    center: SVector<S, D>,
    normal: Unit<SVector<S, D>>,
    radius: S,
}

impl<S: PartialEq, const D: usize> PartialEq for Disk<S, D> {
    fn eq(&self, other: &Self) -> bool {
        self.center == other.center
            && self.normal.as_ref() == other.normal.as_ref()
            && self.radius == other.radius
    }
}

impl<S: RealField, const D: usize> Disk<S, D> {
    /// Returns [`TraceError::InvalidNormal`] if `normal` is zero or not finite.
    #[inline]
    pub fn try_new(
        center: impl Into<SVector<S, D>>,
        normal: impl Into<SVector<S, D>>,
        radius: S,
    ) -> Result<Self> {
        try_normalize(normal.into())
            .map(|normal| Self {
                center: center.into(),
                normal,
                radius,
            })
            .ok_or(TraceError::InvalidNormal)
    }

    /// # Panics
    ///
    /// If `normal` is the zero vector.
    #[inline]
    #[must_use]
    pub fn new(
        center: impl Into<SVector<S, D>>,
        normal: impl Into<SVector<S, D>>,
        radius: S,
    ) -> Self {
        Self::try_new(center, normal, radius).expect("normal must be non-zero")
    }

    #[inline]
    #[must_use]
    pub const fn center(&self) -> &SVector<S, D> {
        &self.center
    }

    #[inline]
    #[must_use]
    pub const fn normal(&self) -> &Unit<SVector<S, D>> {
        &self.normal
    }

    #[inline]
    #[must_use]
    pub const fn radius(&self) -> &S {
        &self.radius
    }

    #[inline]
    pub fn set_center(&mut self, center: impl Into<SVector<S, D>>) {
        self.center = center.into();
    }

    #[inline]
    pub fn set_radius(&mut self, radius: S) {
        self.radius = radius;
    }

    /// Re-orients this disk. `normal` is normalized before being stored.
    ///
    /// Leaves `self` untouched and returns [`TraceError::InvalidNormal`]
    /// if `normal` is zero or not finite.
    #[inline]
    pub fn set_normal(&mut self, normal: impl Into<SVector<S, D>>) -> Result<()> {
        self.normal = try_normalize(normal.into()).ok_or(TraceError::InvalidNormal)?;
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.radius <= zero()
    }

    /// Returns the distance `t` such that [`ray.at(t)`](Ray::at) lies on `self`.
    ///
    /// `t` may be negative. Returns `None` if the ray is parallel to the
    /// disk's plane, if the plane intersection is further than `radius`
    /// from `center`, or if `self` is degenerate.
    #[inline]
    #[must_use]
    pub fn intersection(&self, ray: &Ray<S, D>) -> Option<S> {
        if self.is_degenerate() {
            return None;
        }

        let n = self.normal.as_ref();
        let u = ray.dir.as_ref().dot(n);

        if u.clone().abs() <= S::default_epsilon() {
            return None;
        }

        let t = (&self.center - &ray.origin).dot(n) / u;

        // the intersection lies in the plane, so this is the in-plane distance
        let offset = ray.at(t.clone()) - &self.center;
        let r = self.radius.clone();

        (offset.norm_squared() <= r.clone() * r).then_some(t)
    }
}

impl<S: RealField, const D: usize> Mirror<D> for Disk<S, D> {
    type Scalar = S;

    fn add_tangents(&self, ctx: &mut SimulationCtx<Self::Scalar, D>) {
        if let Some(t) = self.intersection(ctx.ray()) {
            ctx.add_tangent(t, self.normal.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;

    fn mirror() -> Disk<f64, 3> {
        Disk::new([0., 0., 0.], [0., 2., 0.], 0.25)
    }

    #[test]
    fn normal_is_normalized_on_construction_and_assignment() {
        let mut disk = mirror();
        assert_close(disk.normal().norm(), 1.);

        disk.set_normal([3., 0., 4.]).unwrap();
        assert_close(disk.normal().norm(), 1.);
        assert_close(disk.normal()[2], 0.8);
    }

    #[test]
    fn zero_normal_is_rejected_and_leaves_the_disk_untouched() {
        let mut disk = mirror();
        assert_eq!(disk.set_normal([0., 0., 0.]), Err(TraceError::InvalidNormal));
        assert_eq!(disk, mirror());
        assert!(Disk::<f64, 3>::try_new([0., 0., 0.], [0., 0., 0.], 1.).is_err());
    }

    #[test]
    fn hit_inside_radius() {
        let ray = Ray::new([0.1, 1., 0.1], [0., -1., 0.]);
        assert_close(mirror().intersection(&ray).unwrap(), 1.);
    }

    #[test]
    fn hit_behind_origin_has_negative_distance() {
        let ray = Ray::new([0., 1., 0.], [0., 1., 0.]);
        assert_close(mirror().intersection(&ray).unwrap(), -1.);
    }

    #[test]
    fn plane_hit_outside_radius_is_ignored() {
        let ray = Ray::new([0.3, 1., 0.], [0., -1., 0.]);
        assert_eq!(mirror().intersection(&ray), None);
    }

    #[test]
    fn parallel_ray_misses() {
        let ray = Ray::new([1., 1., 0.], [-1., 0., 0.]);
        assert_eq!(mirror().intersection(&ray), None);
    }

    #[test]
    fn degenerate_disk_is_inert() {
        let mut disk = mirror();
        let ray = Ray::new([0., 1., 0.], [0., -1., 0.]);

        disk.set_radius(0.);
        assert!(disk.is_degenerate());
        assert_eq!(disk.intersection(&ray), None);

        disk.set_radius(-1.);
        assert_eq!(disk.intersection(&ray), None);
    }

    #[test]
    fn works_in_two_dimensions() {
        // a "disk" in the plane is a line segment
        let segment = Disk::<f64, 2>::new([0., 0.], [1., 0.], 1.);
        let ray = Ray::new([2., 0.5], [-1., 0.]);
        assert_close(segment.intersection(&ray).unwrap(), 2.);

        let ray = Ray::new([2., 1.5], [-1., 0.]);
        assert_eq!(segment.intersection(&ray), None);
    }
}
