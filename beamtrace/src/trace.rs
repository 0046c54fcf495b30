use super::*;

use log::{debug, trace as trace_log};
use nalgebra::{convert, ComplexField};

/// Parameters of the bounce tracer.
#[derive(Clone, Debug, PartialEq)]
pub struct TraceParams<S> {
    /// Maximum number of casts (and thus segments) per trace. Must be at least 1.
    pub max_bounces: usize,
    /// Length of the segment drawn for a beam that hits nothing.
    pub escape_distance: S,
    /// Relative guard on the distance travelled before a surface can be hit.
    /// Must be positive and finite.
    ///
    /// See [`SimulationCtx::add_tangent`].
    pub eps: S,
}

impl<S: RealField> Default for TraceParams<S> {
    fn default() -> Self {
        Self {
            max_bounces: 5,
            escape_distance: convert(100.0),
            eps: S::default_epsilon() * convert(64.0),
        }
    }
}

impl<S: RealField> TraceParams<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_bounces(mut self, max_bounces: usize) -> Self {
        self.max_bounces = max_bounces;
        self
    }

    pub fn escape_distance(mut self, distance: S) -> Self {
        self.escape_distance = distance;
        self
    }

    pub fn eps(mut self, eps: S) -> Self {
        self.eps = eps;
        self
    }
}

/// One leg of a beam's path.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment<S, const D: usize> {
    pub start: SVector<S, D>,
    pub end: SVector<S, D>,
}

impl<S: RealField, const D: usize> Segment<S, D> {
    #[inline]
    #[must_use]
    pub fn new(start: SVector<S, D>, end: SVector<S, D>) -> Self {
        Self { start, end }
    }

    #[inline]
    #[must_use]
    pub fn length(&self) -> S {
        (&self.end - &self.start).norm()
    }

    /// `None` if the segment has zero length.
    #[inline]
    #[must_use]
    pub fn direction(&self) -> Option<Unit<SVector<S, D>>> {
        try_normalize(&self.end - &self.start)
    }
}

/// How a trace ended.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Outcome<S> {
    /// The beam hit nothing and left the scene.
    Escaped,
    /// The beam was still bouncing after the maximum number of casts.
    BounceLimitReached,
    /// The beam entered the receiver.
    Captured { efficiency: S },
}

/// The result of a single cast.
#[derive(Clone, Debug)]
pub enum Cast<S, const D: usize> {
    /// The beam hit a reflector at `point` and now travels along `direction`.
    Reflected {
        point: SVector<S, D>,
        direction: Unit<SVector<S, D>>,
    },
    /// The beam hit the receiver at `point`.
    Captured { point: SVector<S, D>, efficiency: S },
    /// The beam hit nothing, `point` is the end of the escape segment.
    Escaped { point: SVector<S, D> },
}

// Unit<Vector<T>>: PartialEq has an extra requirement of T: Scalar
impl<S: PartialEq, const D: usize> PartialEq for Cast<S, D> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Reflected {
                    point: p1,
                    direction: d1,
                },
                Self::Reflected {
                    point: p2,
                    direction: d2,
                },
            ) => p1 == p2 && d1.as_ref() == d2.as_ref(),
            (
                Self::Captured {
                    point: p1,
                    efficiency: e1,
                },
                Self::Captured {
                    point: p2,
                    efficiency: e2,
                },
            ) => p1 == p2 && e1 == e2,
            (Self::Escaped { point: p1 }, Self::Escaped { point: p2 }) => p1 == p2,
            _ => false,
        }
    }
}

impl<S, const D: usize> Cast<S, D> {
    #[inline]
    #[must_use]
    pub const fn point(&self) -> &SVector<S, D> {
        match self {
            Self::Reflected { point, .. }
            | Self::Captured { point, .. }
            | Self::Escaped { point } => point,
        }
    }
}

/// The path of a beam, and how it ended.
#[derive(Clone, Debug, PartialEq)]
pub struct TraceResult<S, const D: usize> {
    pub segments: Vec<Segment<S, D>>,
    pub outcome: Outcome<S>,
}

impl<S: RealField, const D: usize> TraceResult<S, D> {
    /// `Some` only if the beam was captured.
    #[inline]
    #[must_use]
    pub fn coupling_efficiency(&self) -> Option<S> {
        match &self.outcome {
            Outcome::Captured { efficiency } => Some(efficiency.clone()),
            _ => None,
        }
    }

    /// The coupling efficiency, or `0` if the beam wasn't captured.
    #[inline]
    #[must_use]
    pub fn coupling_power(&self) -> S {
        self.coupling_efficiency().unwrap_or_else(zero)
    }

    #[inline]
    #[must_use]
    pub fn is_captured(&self) -> bool {
        matches!(self.outcome, Outcome::Captured { .. })
    }

    /// Number of reflections along the path.
    #[inline]
    #[must_use]
    pub fn bounces(&self) -> usize {
        match self.outcome {
            Outcome::BounceLimitReached => self.segments.len(),
            _ => self.segments.len().saturating_sub(1),
        }
    }

    /// Total length of the path, escape segment included.
    #[inline]
    #[must_use]
    pub fn path_length(&self) -> S {
        self.segments
            .iter()
            .fold(zero(), |acc: S, segment| acc + segment.length())
    }

    #[inline]
    #[must_use]
    pub fn end_point(&self) -> Option<&SVector<S, D>> {
        self.segments.last().map(|segment| &segment.end)
    }
}

/// Casts `ray` once against `reflectors` and `receiver`.
///
/// The closest hit wins. A receiver hit at the same distance as a reflector
/// hit wins over the reflector.
#[must_use]
pub fn cast<M: Mirror<D> + ?Sized, const D: usize>(
    ray: &Ray<M::Scalar, D>,
    reflectors: &M,
    receiver: Option<&Receiver<M::Scalar, D>>,
    params: &TraceParams<M::Scalar>,
) -> Cast<M::Scalar, D> {
    let reflection = ray.closest_intersection(reflectors, params.eps.clone());
    let capture = receiver.and_then(|receiver| {
        ray.closest_intersection(receiver.aperture(), params.eps.clone())
            .map(|(t, _)| (t, receiver))
    });

    match (reflection, capture) {
        (reflection, Some((t, receiver)))
            if reflection.as_ref().map_or(true, |(d, _)| t <= *d) =>
        {
            Cast::Captured {
                point: ray.at(t),
                efficiency: receiver.coupling(&ray.dir),
            }
        }
        (Some((t, normal)), _) => {
            let mut next = ray.clone();
            next.advance(t);
            next.reflect_dir(&normal);
            Cast::Reflected {
                point: next.origin,
                direction: next.dir,
            }
        }
        (None, _) => Cast::Escaped {
            point: ray.at(params.escape_distance.clone()),
        },
    }
}

/// Traces the path of a beam starting with `ray`, bouncing off `reflectors`
/// until it is captured by `receiver`, escapes, or `params.max_bounces`
/// casts have been made.
///
/// Every cast adds exactly one segment, so the result never holds more than
/// `params.max_bounces` segments. Reads, but never mutates, the geometry.
///
/// # Errors
///
/// - [`TraceError::InvalidBounceLimit`] if `params.max_bounces` is zero.
/// - [`TraceError::InvalidEpsilon`] if `params.eps` isn't positive and finite.
/// - [`TraceError::InvalidDirection`] if the ray's direction can't be normalized.
pub fn trace<M: Mirror<D> + ?Sized, const D: usize>(
    ray: &Ray<M::Scalar, D>,
    reflectors: &M,
    receiver: Option<&Receiver<M::Scalar, D>>,
    params: &TraceParams<M::Scalar>,
) -> Result<TraceResult<M::Scalar, D>> {
    if params.max_bounces == 0 {
        return Err(TraceError::InvalidBounceLimit);
    }
    if !(params.eps > zero() && params.eps.is_finite()) {
        return Err(TraceError::InvalidEpsilon);
    }

    let mut ray = ray.clone();
    let mut segments = Vec::new();

    for i in 0..params.max_bounces {
        ray.dir = try_normalize(ray.dir.clone().into_inner())
            .ok_or(TraceError::InvalidDirection)?;

        let step = cast(&ray, reflectors, receiver, params);
        trace_log!("cast {i}: {step:?}");

        segments.push(Segment::new(ray.origin.clone(), step.point().clone()));

        let outcome = match step {
            Cast::Reflected { point, direction } => {
                ray = Ray::new_unit_dir(point, direction);
                continue;
            }
            Cast::Captured { efficiency, .. } => Outcome::Captured { efficiency },
            Cast::Escaped { .. } => Outcome::Escaped,
        };

        debug!("trace ended after {} segment(s): {outcome:?}", segments.len());
        return Ok(TraceResult { segments, outcome });
    }

    debug!("trace reached the bounce limit ({})", params.max_bounces);

    Ok(TraceResult {
        segments,
        outcome: Outcome::BounceLimitReached,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;
    use nalgebra::Vector3;

    type Params = TraceParams<f64>;

    fn none() -> Option<&'static Receiver<f64, 3>> {
        None
    }

    #[test]
    fn no_reflectors_escapes_after_one_cast() {
        init_logger();
        let registry = ReflectorRegistry::<f64, 3>::new();
        let ray = Ray::new([1., 1., 0.], [-1., 0., 0.]);

        let result = trace(&ray, &registry, none(), &Params::default()).unwrap();

        assert_eq!(result.outcome, Outcome::Escaped);
        assert_eq!(result.segments.len(), 1);
        assert_close(result.segments[0].length(), 100.);
        assert_vec_close(&result.segments[0].end, &Vector3::new(-99., 1., 0.));
        assert_eq!(result.coupling_efficiency(), None);
        assert_close(result.coupling_power(), 0.);
        assert_eq!(result.bounces(), 0);
    }

    #[test]
    fn escape_distance_is_configurable() {
        let ray = Ray::new([0., 0., 0.], [0., 0., 2.]);
        let params = Params::new().escape_distance(7.5);

        let result = trace(&ray, &[] as &[Disk<f64, 3>], none(), &params).unwrap();

        assert_vec_close(&result.segments[0].end, &Vector3::new(0., 0., 7.5));
        assert_close(result.path_length(), 7.5);
    }

    #[test]
    fn ray_parallel_to_a_reflector_escapes() {
        let mut registry = ReflectorRegistry::new();
        registry.add(Disk::new([0., 0., 0.], [0., 1., 0.], 0.25));
        let ray = Ray::new([1., 1., 0.], [-1., 0., 0.]);

        let result = trace(&ray, &registry, none(), &Params::default()).unwrap();

        assert_eq!(result.outcome, Outcome::Escaped);
        assert_eq!(
            result.segments,
            [Segment::new(Vector3::new(1., 1., 0.), Vector3::new(-99., 1., 0.))]
        );
    }

    #[test]
    fn single_reflection_obeys_the_reflection_law() {
        let mut registry = ReflectorRegistry::new();
        let id = registry.add(Disk::new([0., 0., 0.], [0., 1., 1.], 1.));
        let n = registry.get(id).unwrap().normal().into_inner();

        let ray = Ray::new([0.1, 1., 0.], [0., -1., 0.]);
        let d = ray.dir.into_inner();

        let step = cast(&ray, &registry, none(), &Params::default());
        let Cast::Reflected { point, direction } = step else {
            panic!("expected a reflection, got {step:?}");
        };

        let direction = direction.into_inner();

        assert_vec_close(&point, &Vector3::new(0.1, 0., 0.));
        assert_close(direction.norm(), 1.);
        assert_close(direction.dot(&n), -d.dot(&n));
        assert_vec_close(&direction, &(d - n * (2. * d.dot(&n))));
    }

    #[test]
    fn plane_hit_outside_radius_falls_through_to_the_next_reflector() {
        let mut registry = ReflectorRegistry::new();
        // nearer, but too small
        registry.add(Disk::new([0., 0., 0.], [1., 0., 0.], 0.25));
        // further away, large enough
        registry.add(Disk::new([-1., 0., 0.], [1., 0., 0.], 1.));

        let ray = Ray::new([1., 0.5, 0.], [-1., 0., 0.]);
        let params = Params::new().max_bounces(2);

        let result = trace(&ray, &registry, none(), &params).unwrap();

        assert_eq!(result.outcome, Outcome::Escaped);
        assert_vec_close(&result.segments[0].end, &Vector3::new(-1., 0.5, 0.));
        // bounced straight back, and through the small disk's plane outside of its radius
        assert_vec_close(&result.segments[1].end, &Vector3::new(99., 0.5, 0.));
    }

    #[test]
    fn parallel_mirrors_stop_at_the_bounce_limit() {
        init_logger();
        let mut registry = ReflectorRegistry::new();
        registry.add(Disk::new([0., 0., 0.], [0., 1., 0.], 1.));
        registry.add(Disk::new([0., 1., 0.], [0., -1., 0.], 1.));

        let ray = Ray::new([0., 0.5, 0.], [0., 1., 0.]);

        for max_bounces in [1, 4, 25] {
            let params = Params::new().max_bounces(max_bounces);
            let result = trace(&ray, &registry, none(), &params).unwrap();

            assert_eq!(result.outcome, Outcome::BounceLimitReached);
            assert_eq!(result.segments.len(), max_bounces);
            assert_eq!(result.bounces(), max_bounces);
        }
    }

    #[test]
    fn receiver_capture_head_on() {
        let receiver =
            Receiver::try_new(Disk::new([0., 0., 5.], [0., 0., -1.], 0.03), 0.02).unwrap();
        let ray = Ray::new([0., 0., 0.], [0., 0., 1.]);
        let registry = ReflectorRegistry::new();

        let result = trace(&ray, &registry, Some(&receiver), &Params::default()).unwrap();

        assert_eq!(result.segments.len(), 1);
        assert_vec_close(&result.segments[0].end, &Vector3::new(0., 0., 5.));
        assert_close(result.coupling_efficiency().unwrap(), 1.);
    }

    #[test]
    fn receiver_behind_a_reflector_is_shadowed() {
        let receiver =
            Receiver::try_new(Disk::new([0., 0., 5.], [0., 0., -1.], 0.5), 0.02).unwrap();
        let mut registry = ReflectorRegistry::new();
        registry.add(Disk::new([0., 0., 2.], [0., 0., -1.], 1.));

        let ray = Ray::new([0., 0., 0.], [0., 0., 1.]);
        let params = Params::new().max_bounces(2);

        let result = trace(&ray, &registry, Some(&receiver), &params).unwrap();

        assert_eq!(result.outcome, Outcome::Escaped);
        assert_vec_close(&result.segments[1].end, &Vector3::new(0., 0., -98.));
    }

    #[test]
    fn capture_ignores_the_acceptance_cone() {
        // 45 degrees off-axis, far outside the cone, still captured
        let receiver =
            Receiver::try_new(Disk::new([0., 0., 1.], [0., 0., -1.], 0.5), 0.02).unwrap();
        let ray = Ray::new([-1., 0., 0.], [1., 0., 1.]);

        let result = trace(&ray, &[] as &[Disk<f64, 3>], Some(&receiver), &Params::default())
            .unwrap();

        assert_close(result.coupling_efficiency().unwrap(), 0.5f64.sqrt());
        let incoming = result.segments[0].direction().unwrap();
        assert!(!receiver.accepts(&incoming));
    }

    #[test]
    fn receiver_and_reflector_at_the_same_distance() {
        let receiver =
            Receiver::try_new(Disk::new([0., 0., 1.], [0., 0., -1.], 0.1), 0.1).unwrap();
        let mirror = Disk::new([0., 0., 1.], [0., 0., -1.], 1.);
        let ray = Ray::new([0., 0., 0.], [0., 0., 1.]);

        let result = trace(&ray, &mirror, Some(&receiver), &Params::default()).unwrap();

        assert!(result.is_captured());
    }

    #[test]
    fn invalid_inputs() {
        let ray = Ray::new([0., 0., 0.], [0., 0., 1.]);
        let registry = ReflectorRegistry::<f64, 3>::new();

        assert_eq!(
            trace(&ray, &registry, none(), &Params::new().max_bounces(0)),
            Err(TraceError::InvalidBounceLimit)
        );

        let zero = Ray::new_unit_dir(Vector3::zeros(), Unit::new_unchecked(Vector3::zeros()));
        assert_eq!(
            trace(&zero, &registry, none(), &Params::default()),
            Err(TraceError::InvalidDirection)
        );

        for eps in [0., -1e-9, f64::NAN, f64::INFINITY] {
            assert_eq!(
                trace(&ray, &registry, none(), &Params::new().eps(eps)),
                Err(TraceError::InvalidEpsilon)
            );
        }
    }

    #[test]
    fn surface_at_the_origin_is_not_hit() {
        let receiver =
            Receiver::try_new(Disk::new([0., 0., 0.], [0., 0., 1.], 0.1), 0.2).unwrap();
        let ray = Ray::new([0., 0., 0.], [0., 0., 1.]);

        for eps in [1e-300, 1e-14] {
            let result = trace(
                &ray,
                &ReflectorRegistry::<f64, 3>::new(),
                Some(&receiver),
                &Params::new().eps(eps),
            )
            .unwrap();

            assert_eq!(result.outcome, Outcome::Escaped);
            assert_close(result.path_length(), 100.);
        }

        // `t == 0` is rejected even without any guard
        assert!(ray.closest_intersection(receiver.aperture(), 0.).is_none());
    }

    #[test]
    fn grazing_reflection_does_not_hit_the_same_mirror_twice() {
        let center = Vector3::new(3., 7., -4.);
        let normal = Vector3::new(0.3, 1., -0.2).normalize();
        let mirror = Disk::new(center, normal, 5.);

        // orthonormal tangents of the mirror's plane
        let u = normal.cross(&Vector3::new(1., 0., 0.)).normalize();
        let v = normal.cross(&u);

        let grazing = 0.5f64.to_radians();
        let params = Params::new().max_bounces(3);

        for i in 0..2000 {
            let f = i as f64;
            // a hit point well inside the disk, and an azimuth in its plane
            let target = center + u * (3. * (0.37 * f).sin()) + v * (3. * (0.61 * f).cos());
            let azimuth = 0.013 * f;
            let along = u * azimuth.cos() + v * azimuth.sin();
            let dir = along * grazing.cos() - normal * grazing.sin();

            let ray = Ray::new(target - dir * 2., dir);
            let result = trace(&ray, &mirror, none(), &params).unwrap();

            assert_eq!(result.outcome, Outcome::Escaped, "ray {i}: {result:?}");
            assert_eq!(result.bounces(), 1, "ray {i}");

            let out = result.segments[1].direction().unwrap();
            assert_close(out.dot(&normal), grazing.sin());
        }
    }

    #[test]
    fn tracing_is_deterministic() {
        let mut registry = ReflectorRegistry::new();
        registry.add(Disk::new([0., 1., 0.], [1., 0.1, 1.], 0.25));
        registry.add(Disk::new([0., 1., 1.], [1., 0., -1.02], 0.25));
        let ray = Ray::new([1., 1., 0.], [-1., 0., 0.]);

        let a = trace(&ray, &registry, none(), &Params::default()).unwrap();
        let b = trace(&ray, &registry, none(), &Params::default()).unwrap();

        assert_eq!(a, b);
    }
}
