use super::*;

use log::debug;
use nalgebra::convert;

/// Handle to a beam on an [`OpticalBench`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BeamId(usize);

impl BeamId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A light source: the ray it emits and, optionally, its own bounce limit.
#[derive(Clone, Debug, PartialEq)]
pub struct Beam<S, const D: usize> {
    pub ray: Ray<S, D>,
    /// Overrides [`TraceParams::max_bounces`] for this beam.
    pub max_bounces: Option<usize>,
}

impl<S: RealField, const D: usize> Beam<S, D> {
    #[inline]
    pub fn try_new(
        origin: impl Into<SVector<S, D>>,
        direction: impl Into<SVector<S, D>>,
    ) -> Result<Self> {
        Ray::try_new(origin, direction).map(Self::from_ray)
    }

    #[inline]
    #[must_use]
    pub const fn from_ray(ray: Ray<S, D>) -> Self {
        Self {
            ray,
            max_bounces: None,
        }
    }

    /// A beam leaving `receiver`'s aperture along its boresight.
    ///
    /// By reversibility, light following this path backwards gets coupled
    /// head-on into the receiver.
    #[inline]
    #[must_use]
    pub fn from_receiver(receiver: &Receiver<S, D>) -> Self {
        let aperture = receiver.aperture();
        Self::from_ray(Ray::new_unit_dir(
            aperture.center().clone(),
            aperture.normal().clone(),
        ))
    }

    #[inline]
    #[must_use]
    pub fn with_max_bounces(mut self, max_bounces: usize) -> Self {
        self.max_bounces = Some(max_bounces);
        self
    }
}

#[derive(Clone, Debug)]
pub struct AlignmentCandidate<S, const D: usize> {
    pub normal: Unit<SVector<S, D>>,
    pub efficiency: S,
}

impl<S: PartialEq, const D: usize> PartialEq for AlignmentCandidate<S, D> {
    fn eq(&self, other: &Self) -> bool {
        self.normal.as_ref() == other.normal.as_ref() && self.efficiency == other.efficiency
    }
}

/// Outcome of [`OpticalBench::scan_alignment`].
#[derive(Clone, Debug, PartialEq)]
pub struct AlignmentScan<S, const D: usize> {
    /// The candidate orientation with the highest coupling efficiency, if any captured the beam.
    pub best: Option<AlignmentCandidate<S, D>>,
    /// Number of orientations traced.
    pub evaluated: usize,
    /// Number of orientations for which the beam was captured.
    pub captured: usize,
}

/// Reflectors, an optional receiver and the beams shining through them.
///
/// Changing the geometry doesn't re-trace anything, [`Self::tick`] does.
#[derive(Clone, Debug, PartialEq)]
pub struct OpticalBench<S, const D: usize> {
    reflectors: ReflectorRegistry<S, D>,
    receiver: Option<Receiver<S, D>>,
    beams: Vec<Beam<S, D>>,
    params: TraceParams<S>,
}

impl<S: RealField, const D: usize> Default for OpticalBench<S, D> {
    fn default() -> Self {
        Self::new(TraceParams::default())
    }
}

impl<S: RealField, const D: usize> OpticalBench<S, D> {
    #[inline]
    #[must_use]
    pub fn new(params: TraceParams<S>) -> Self {
        Self {
            reflectors: ReflectorRegistry::new(),
            receiver: None,
            beams: Vec::new(),
            params,
        }
    }

    #[inline]
    #[must_use]
    pub const fn reflectors(&self) -> &ReflectorRegistry<S, D> {
        &self.reflectors
    }

    #[inline]
    pub fn reflectors_mut(&mut self) -> &mut ReflectorRegistry<S, D> {
        &mut self.reflectors
    }

    #[inline]
    pub fn add_reflector(&mut self, reflector: Disk<S, D>) -> ReflectorId {
        self.reflectors.add(reflector)
    }

    #[inline]
    pub fn set_reflector_normal(
        &mut self,
        id: ReflectorId,
        normal: impl Into<SVector<S, D>>,
    ) -> Result<()> {
        self.reflectors.set_normal(id, normal)
    }

    #[inline]
    #[must_use]
    pub const fn receiver(&self) -> Option<&Receiver<S, D>> {
        self.receiver.as_ref()
    }

    #[inline]
    pub fn receiver_mut(&mut self) -> Option<&mut Receiver<S, D>> {
        self.receiver.as_mut()
    }

    /// Installs `receiver` (or removes it, with `None`), returning the previous one.
    #[inline]
    pub fn set_receiver(&mut self, receiver: Option<Receiver<S, D>>) -> Option<Receiver<S, D>> {
        core::mem::replace(&mut self.receiver, receiver)
    }

    #[inline]
    #[must_use]
    pub fn beams(&self) -> &[Beam<S, D>] {
        &self.beams
    }

    #[inline]
    pub fn push_beam(&mut self, beam: Beam<S, D>) -> BeamId {
        let id = BeamId(self.beams.len());
        self.beams.push(beam);
        id
    }

    #[inline]
    pub fn add_beam(
        &mut self,
        origin: impl Into<SVector<S, D>>,
        direction: impl Into<SVector<S, D>>,
    ) -> Result<BeamId> {
        Beam::try_new(origin, direction).map(|beam| self.push_beam(beam))
    }

    /// Looks up the beam at position `index`, in insertion order.
    #[inline]
    #[must_use]
    pub fn beam_id(&self, index: usize) -> Option<BeamId> {
        (index < self.beams.len()).then_some(BeamId(index))
    }

    #[inline]
    #[must_use]
    pub fn beam(&self, id: BeamId) -> Option<&Beam<S, D>> {
        self.beams.get(id.0)
    }

    #[inline]
    #[must_use]
    pub const fn params(&self) -> &TraceParams<S> {
        &self.params
    }

    #[inline]
    pub fn params_mut(&mut self) -> &mut TraceParams<S> {
        &mut self.params
    }

    fn beam_params(&self, beam: &Beam<S, D>) -> TraceParams<S> {
        let mut params = self.params.clone();
        if let Some(max_bounces) = beam.max_bounces {
            params.max_bounces = max_bounces;
        }
        params
    }

    pub fn trace_beam(&self, id: BeamId) -> Result<TraceResult<S, D>> {
        let beam = self.beam(id).ok_or(TraceError::UnknownBeam(id.0))?;
        trace(
            &beam.ray,
            &self.reflectors,
            self.receiver.as_ref(),
            &self.beam_params(beam),
        )
    }

    /// Traces every beam against the current geometry, in insertion order.
    pub fn tick(&self) -> Result<Vec<TraceResult<S, D>>> {
        self.beams
            .iter()
            .map(|beam| {
                trace(
                    &beam.ray,
                    &self.reflectors,
                    self.receiver.as_ref(),
                    &self.beam_params(beam),
                )
            })
            .collect()
    }

    /// Searches for the orientation of `reflector` that best couples `beam`
    /// into the receiver.
    ///
    /// Candidate normals are `n + sum(a_k * e_k)` where `n` is the current
    /// normal, `(e_k)` an orthonormal basis of its orthogonal complement, and
    /// each `a_k` ranges over `steps` evenly spaced values in `[-span, span]`
    /// (just `0` if `steps == 1`), for `steps^(D-1)` candidates in total.
    ///
    /// The bench itself is left untouched.
    pub fn scan_alignment(
        &self,
        beam: BeamId,
        reflector: ReflectorId,
        span: S,
        steps: usize,
    ) -> Result<AlignmentScan<S, D>> {
        if steps == 0 {
            return Err(TraceError::EmptyScan);
        }

        let beam = self.beam(beam).ok_or(TraceError::UnknownBeam(beam.0))?;
        let normal = self
            .reflectors
            .get(reflector)
            .ok_or(TraceError::UnknownReflector(reflector.index()))?
            .normal()
            .clone()
            .into_inner();

        let mut tangents = Vec::with_capacity(D.saturating_sub(1));
        SVector::<S, D>::orthonormal_subspace_basis(&[normal.clone()], |e| {
            tangents.push(e.clone());
            true
        });

        let offsets: Vec<S> = (0..steps)
            .map(|k| {
                if steps == 1 {
                    zero()
                } else {
                    let f: S = convert(k as f64 / (steps - 1) as f64);
                    span.clone() * (f.clone() + f - S::one())
                }
            })
            .collect();

        let params = self.beam_params(beam);
        let mut scratch = self.reflectors.clone();
        let mut index = vec![0; tangents.len()];
        let mut scan = AlignmentScan {
            best: None,
            evaluated: 0,
            captured: 0,
        };

        loop {
            let candidate = index
                .iter()
                .zip(&tangents)
                .fold(normal.clone(), |n, (&k, e)| n + e * offsets[k].clone());

            scratch.set_normal(reflector, candidate)?;

            let result = trace(&beam.ray, &scratch, self.receiver.as_ref(), &params)?;
            scan.evaluated += 1;

            if let Some(efficiency) = result.coupling_efficiency() {
                scan.captured += 1;

                if scan
                    .best
                    .as_ref()
                    .map_or(true, |best| efficiency > best.efficiency)
                {
                    if let Some(disk) = scratch.get(reflector) {
                        scan.best = Some(AlignmentCandidate {
                            normal: disk.normal().clone(),
                            efficiency,
                        });
                    }
                }
            }

            if !next_grid_index(&mut index, steps) {
                break;
            }
        }

        debug!(
            "alignment scan of reflector {}: {} of {} orientations captured the beam",
            reflector.index(),
            scan.captured,
            scan.evaluated,
        );

        Ok(scan)
    }
}

/// Advances `index` to the next point of a `steps^len` grid, returning
/// `false` once every point has been visited.
fn next_grid_index(index: &mut [usize], steps: usize) -> bool {
    for k in index.iter_mut() {
        *k += 1;
        if *k < steps {
            return true;
        }
        *k = 0;
    }
    false
}
