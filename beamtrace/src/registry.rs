use super::*;

/// Handle to a reflector in a [`ReflectorRegistry`].
///
/// Registries are append-only, so handles stay valid for the registry's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReflectorId(usize);

impl ReflectorId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// The set of disk reflectors a beam can bounce off.
///
/// Enumeration order is insertion order, which is also the order in which
/// equally distant hits are resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct ReflectorRegistry<S, const D: usize> {
    reflectors: Vec<Disk<S, D>>,
}

impl<S, const D: usize> Default for ReflectorRegistry<S, D> {
    fn default() -> Self {
        Self {
            reflectors: Vec::new(),
        }
    }
}

impl<S: RealField, const D: usize> ReflectorRegistry<S, D> {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, reflector: Disk<S, D>) -> ReflectorId {
        let id = ReflectorId(self.reflectors.len());
        log::debug!("registered reflector {} at {:?}", id.0, reflector.center());
        self.reflectors.push(reflector);
        id
    }

    /// Re-orients a reflector. Subsequent traces bounce off the new
    /// orientation, results of previous traces are left as they are.
    pub fn set_normal(&mut self, id: ReflectorId, normal: impl Into<SVector<S, D>>) -> Result<()> {
        self.reflectors
            .get_mut(id.0)
            .ok_or(TraceError::UnknownReflector(id.0))?
            .set_normal(normal)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, id: ReflectorId) -> Option<&Disk<S, D>> {
        self.reflectors.get(id.0)
    }

    /// Looks up the reflector at position `index`, in insertion order.
    #[inline]
    #[must_use]
    pub fn id(&self, index: usize) -> Option<ReflectorId> {
        (index < self.reflectors.len()).then_some(ReflectorId(index))
    }

    /// All reflectors, in insertion order.
    ///
    /// The returned iterator can be cloned to restart the enumeration. It
    /// borrows the registry, which therefore can't change while it's alive.
    #[inline]
    pub fn all(&self) -> impl Iterator<Item = &Disk<S, D>> + Clone + '_ {
        self.reflectors.iter()
    }

    #[inline]
    pub fn ids(&self) -> impl Iterator<Item = ReflectorId> + Clone {
        (0..self.reflectors.len()).map(ReflectorId)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.reflectors.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reflectors.is_empty()
    }
}

impl<S: RealField, const D: usize> FromIterator<Disk<S, D>> for ReflectorRegistry<S, D> {
    fn from_iter<I: IntoIterator<Item = Disk<S, D>>>(iter: I) -> Self {
        Self {
            reflectors: iter.into_iter().collect(),
        }
    }
}

impl<S: RealField, const D: usize> Mirror<D> for ReflectorRegistry<S, D> {
    type Scalar = S;

    #[inline]
    fn add_tangents(&self, ctx: &mut SimulationCtx<Self::Scalar, D>) {
        self.reflectors.add_tangents(ctx);
    }
}
