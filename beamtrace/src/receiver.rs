use super::*;

/// Coupling efficiency of a beam travelling along `incoming` into an aperture
/// whose boresight is `boresight`: `-(incoming . boresight)`.
///
/// `1` for a beam travelling straight into the boresight, `<= 0` for a beam
/// arriving perpendicular to, or from behind, the aperture. Not clamped.
#[inline]
#[must_use]
pub fn coupling_efficiency<S: RealField, const D: usize>(
    incoming: &Unit<SVector<S, D>>,
    boresight: &Unit<SVector<S, D>>,
) -> S {
    -incoming.as_ref().dot(boresight.as_ref())
}

/// A terminal, non-reflective, disk-shaped aperture, accepting light within
/// a cone around its boresight (the aperture's normal, facing the incoming light).
#[derive(Clone, Debug, PartialEq)]
pub struct Receiver<S, const D: usize> {
    aperture: Disk<S, D>,
    acceptance_half_angle: S,
}

impl<S: RealField, const D: usize> Receiver<S, D> {
    /// Returns [`TraceError::InvalidAcceptanceAngle`] unless
    /// `0 < acceptance_half_angle < pi / 2`.
    #[inline]
    pub fn try_new(aperture: Disk<S, D>, acceptance_half_angle: S) -> Result<Self> {
        check_half_angle(&acceptance_half_angle)?;
        Ok(Self {
            aperture,
            acceptance_half_angle,
        })
    }

    #[inline]
    #[must_use]
    pub const fn aperture(&self) -> &Disk<S, D> {
        &self.aperture
    }

    /// Mutable access to the aperture, e.g. to re-aim the receiver.
    #[inline]
    pub fn aperture_mut(&mut self) -> &mut Disk<S, D> {
        &mut self.aperture
    }

    #[inline]
    #[must_use]
    pub fn boresight(&self) -> &Unit<SVector<S, D>> {
        self.aperture.normal()
    }

    #[inline]
    #[must_use]
    pub const fn acceptance_half_angle(&self) -> &S {
        &self.acceptance_half_angle
    }

    #[inline]
    pub fn set_acceptance_half_angle(&mut self, angle: S) -> Result<()> {
        check_half_angle(&angle)?;
        self.acceptance_half_angle = angle;
        Ok(())
    }

    /// `sin` of the acceptance half-angle.
    #[inline]
    #[must_use]
    pub fn numerical_aperture(&self) -> S {
        self.acceptance_half_angle.clone().sin()
    }

    /// See [`coupling_efficiency`].
    #[inline]
    #[must_use]
    pub fn coupling(&self, incoming: &Unit<SVector<S, D>>) -> S {
        coupling_efficiency(incoming, self.boresight())
    }

    /// Whether a beam travelling along `incoming` falls inside the acceptance cone.
    ///
    /// Capture itself is purely geometric, this is informational.
    #[inline]
    #[must_use]
    pub fn accepts(&self, incoming: &Unit<SVector<S, D>>) -> bool {
        let cos = self.coupling(incoming).clamp(-S::one(), S::one());
        cos.acos() <= self.acceptance_half_angle
    }
}

fn check_half_angle<S: RealField>(angle: &S) -> Result<()> {
    if *angle > zero() && *angle < S::frac_pi_2() {
        Ok(())
    } else {
        Err(TraceError::InvalidAcceptanceAngle)
    }
}
