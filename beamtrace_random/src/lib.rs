use core::{f64::consts::FRAC_PI_2, iter};

use beamtrace::{
    nalgebra::{SVector, Unit},
    Beam, Disk, Float, OpticalBench, Ray, Receiver, TraceParams,
};

pub use rand;

/// Coordinates of random centers and origins lie in `[-MAX_COORD, MAX_COORD]`.
pub const MAX_COORD: Float = 7.0;

pub trait Random: Sized {
    /// Generate a randomized value using the provided `rng`
    ///
    /// This method must not fail. If creating a value is faillible, keep trying until success
    fn random(rng: &mut (impl rand::Rng + ?Sized)) -> Self;
}

impl<const D: usize> Random for Ray<Float, D> {
    fn random(rng: &mut (impl rand::Rng + ?Sized)) -> Self {
        let origin = rand_vect(rng, MAX_COORD);
        Self::new_unit_dir(origin, rand_unit_vect(rng))
    }
}

impl<const D: usize> Random for Disk<Float, D> {
    fn random(rng: &mut (impl rand::Rng + ?Sized)) -> Self {
        loop {
            let center = rand_vect(rng, MAX_COORD);
            let radius = rng.gen_range(0.1..2.0);
            if let Ok(disk) = Self::try_new(center, rand_vect(rng, 1.0), radius) {
                break disk;
            }
        }
    }
}

impl<const D: usize> Random for Receiver<Float, D> {
    fn random(rng: &mut (impl rand::Rng + ?Sized)) -> Self {
        let mut aperture = Disk::random(rng);
        aperture.set_radius(rng.gen_range(0.01..0.5));

        // `0` can be drawn, and is rejected
        loop {
            let half_angle = rng.gen_range(0.0..FRAC_PI_2);
            if let Ok(receiver) = Self::try_new(aperture.clone(), half_angle) {
                break receiver;
            }
        }
    }
}

impl<const D: usize> Random for Beam<Float, D> {
    fn random(rng: &mut (impl rand::Rng + ?Sized)) -> Self {
        let beam = Self::from_ray(Ray::random(rng));

        if rng.gen_bool(0.25) {
            beam.with_max_bounces(rng.gen_range(1..=16))
        } else {
            beam
        }
    }
}

/// A bench with default parameters, `num_reflectors` random reflectors,
/// a random receiver and `num_beams` random beams.
pub fn random_bench<const D: usize>(
    rng: &mut (impl rand::Rng + ?Sized),
    num_reflectors: usize,
    num_beams: usize,
) -> OpticalBench<Float, D> {
    let mut bench = OpticalBench::new(TraceParams::default());

    *bench.reflectors_mut() = iter::repeat_with(|| Disk::random(rng))
        .take(num_reflectors)
        .collect();

    bench.set_receiver(Some(Receiver::random(rng)));

    for beam in iter::repeat_with(|| Beam::random(rng)).take(num_beams) {
        bench.push_beam(beam);
    }

    bench
}

pub fn rand_vect<const D: usize>(
    rng: &mut (impl rand::Rng + ?Sized),
    max_coord_mag: Float,
) -> SVector<Float, D> {
    // the rng generates floats in 0.0..1.0, scale and translate the range accordingly

    SVector::<Float, D>::from_fn(|_, _| (rng.gen::<Float>() - 0.5) * (max_coord_mag.abs() * 2.0))
}

pub fn rand_unit_vect<const D: usize>(rng: &mut (impl rand::Rng + ?Sized)) -> Unit<SVector<Float, D>> {
    loop {
        if let Some(v) = Unit::try_new(rand_vect(rng, 1.0), Float::EPSILON * 8.0) {
            break v;
        }
    }
}
