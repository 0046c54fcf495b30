//! JSON (de)serialization of optical benches and trace results.
//!
//! A bench is stored as:
//!
//! ```json
//! {
//!     "dim": 3,
//!     "params": { "max_bounces": 5, "escape_distance": 100.0, "eps": 1e-14 },
//!     "reflectors": [
//!         { "center": [0.0, 1.0, 0.0], "normal": [1.0, 0.0, 1.0], "radius": 0.25 }
//!     ],
//!     "receiver": {
//!         "center": [2.0, 1.0, 1.0],
//!         "normal": [-1.0, 0.0, 0.0],
//!         "radius": 0.03,
//!         "acceptance_half_angle": 0.02
//!     },
//!     "beams": [
//!         { "origin": [1.0, 1.0, 0.0], "direction": [-1.0, 0.0, 0.0], "max_bounces": 5 }
//!     ]
//! }
//! ```
//!
//! `params` (and each of its fields), `receiver` and per-beam `max_bounces` are optional.
//! `eps` must be positive.

use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use beamtrace::{
    nalgebra::SVector, AlignmentScan, Beam, Disk, Float, OpticalBench, Outcome, Ray, Receiver,
    ReflectorRegistry, Segment, TraceError, TraceParams, TraceResult,
};
use serde_json::Value;
use thiserror::Error;

pub use serde_json;

#[derive(Error, Debug)]
pub enum SceneError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid value for `{0}`")]
    InvalidField(&'static str),

    #[error("dimension must be {expected}, found {found}")]
    Dimension { expected: usize, found: u64 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid geometry: {0}")]
    Trace(#[from] TraceError),
}

pub type Result<T> = std::result::Result<T, SceneError>;

/// This is essentially `try_into` then `try_map` but the latter is nightly-only
pub fn json_array_to_float_array<const D: usize>(json_array: &[Value]) -> Option<[Float; D]> {
    let array: &[Value; D] = json_array.try_into().ok()?;

    let mut coords = [0.; D];
    for (coord, value) in coords.iter_mut().zip(array) {
        *coord = value.as_f64()?;
    }
    Some(coords)
}

pub fn json_array_to_vector<const D: usize>(json_array: &[Value]) -> Option<SVector<Float, D>> {
    json_array_to_float_array(json_array).map(SVector::from)
}

pub fn map_json_array<C: FromIterator<T>, T>(
    json: &Value,
    field: &'static str,
    map: impl FnMut(&Value) -> Result<T>,
) -> Result<C> {
    json.as_array()
        .ok_or(SceneError::InvalidField(field))?
        .iter()
        .map(map)
        .collect()
}

fn field<'a>(json: &'a Value, name: &'static str) -> Result<&'a Value> {
    json.get(name).ok_or(SceneError::MissingField(name))
}

fn vector_field<const D: usize>(json: &Value, name: &'static str) -> Result<SVector<Float, D>> {
    field(json, name)?
        .as_array()
        .map(Vec::as_slice)
        .and_then(json_array_to_vector)
        .ok_or(SceneError::InvalidField(name))
}

fn float_field(json: &Value, name: &'static str) -> Result<Float> {
    field(json, name)?
        .as_f64()
        .ok_or(SceneError::InvalidField(name))
}

/// A missing or `null` field is `None`.
fn optional<'a>(json: &'a Value, name: &'static str) -> Option<&'a Value> {
    json.get(name).filter(|value| !value.is_null())
}

fn bounce_limit(value: &Value, name: &'static str) -> Result<usize> {
    value
        .as_u64()
        .filter(|&n| n > 0)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or(SceneError::InvalidField(name))
}

pub trait JsonSer {
    /// Serialize `self` into a JSON value.
    fn to_json(&self) -> Value;
}

impl<T: JsonSer> JsonSer for [T] {
    fn to_json(&self) -> Value {
        Value::Array(self.iter().map(T::to_json).collect())
    }
}

impl<T: JsonSer> JsonSer for Vec<T> {
    fn to_json(&self) -> Value {
        self.as_slice().to_json()
    }
}

pub trait JsonDes {
    /// Deserialize from a JSON value.
    ///
    /// Returns an error if `json`'s format or values are invalid.
    fn from_json(json: &Value) -> Result<Self>
    where
        Self: Sized;
}

impl<const D: usize> JsonSer for Disk<Float, D> {
    fn to_json(&self) -> Value {
        serde_json::json!({
            "center": self.center().as_slice(),
            "normal": self.normal().as_slice(),
            "radius": self.radius(),
        })
    }
}

impl<const D: usize> JsonDes for Disk<Float, D> {
    /// ```json
    /// { "center": [0., 1., 0.], "normal": [1., 0., 1.], "radius": 0.25 }
    /// ```
    ///
    /// `normal` must be non-zero, it is normalized.
    fn from_json(json: &Value) -> Result<Self> {
        Ok(Self::try_new(
            vector_field::<D>(json, "center")?,
            vector_field::<D>(json, "normal")?,
            float_field(json, "radius")?,
        )?)
    }
}

impl<const D: usize> JsonSer for ReflectorRegistry<Float, D> {
    fn to_json(&self) -> Value {
        Value::Array(self.all().map(Disk::to_json).collect())
    }
}

impl<const D: usize> JsonDes for ReflectorRegistry<Float, D> {
    fn from_json(json: &Value) -> Result<Self> {
        map_json_array(json, "reflectors", Disk::from_json)
    }
}

impl<const D: usize> JsonSer for Receiver<Float, D> {
    fn to_json(&self) -> Value {
        let mut json = self.aperture().to_json();
        json["acceptance_half_angle"] = (*self.acceptance_half_angle()).into();
        json
    }
}

impl<const D: usize> JsonDes for Receiver<Float, D> {
    /// Same layout as a [`Disk`], with an extra `acceptance_half_angle` field, in radians.
    fn from_json(json: &Value) -> Result<Self> {
        Ok(Self::try_new(
            Disk::from_json(json)?,
            float_field(json, "acceptance_half_angle")?,
        )?)
    }
}

impl<const D: usize> JsonSer for Beam<Float, D> {
    fn to_json(&self) -> Value {
        let mut json = serde_json::json!({
            "origin": self.ray.origin.as_slice(),
            "direction": self.ray.dir.as_slice(),
        });
        if let Some(max_bounces) = self.max_bounces {
            json["max_bounces"] = max_bounces.into();
        }
        json
    }
}

impl<const D: usize> JsonDes for Beam<Float, D> {
    /// ```json
    /// { "origin": [1., 1., 0.], "direction": [-1., 0., 0.], "max_bounces": 5 }
    /// ```
    ///
    /// `direction` must be non-zero, it is normalized. `max_bounces` is optional.
    fn from_json(json: &Value) -> Result<Self> {
        let ray = Ray::try_new(
            vector_field::<D>(json, "origin")?,
            vector_field::<D>(json, "direction")?,
        )?;

        let mut beam = Self::from_ray(ray);
        if let Some(value) = optional(json, "max_bounces") {
            beam = beam.with_max_bounces(bounce_limit(value, "max_bounces")?);
        }
        Ok(beam)
    }
}

impl JsonSer for TraceParams<Float> {
    fn to_json(&self) -> Value {
        serde_json::json!({
            "max_bounces": self.max_bounces,
            "escape_distance": self.escape_distance,
            "eps": self.eps,
        })
    }
}

impl JsonDes for TraceParams<Float> {
    /// Every field is optional, missing ones take their default value.
    fn from_json(json: &Value) -> Result<Self> {
        let mut params = Self::default();

        if let Some(value) = optional(json, "max_bounces") {
            params.max_bounces = bounce_limit(value, "max_bounces")?;
        }
        if optional(json, "escape_distance").is_some() {
            params.escape_distance = float_field(json, "escape_distance")?;
        }
        if optional(json, "eps").is_some() {
            params.eps = Some(float_field(json, "eps")?)
                .filter(|eps| *eps > 0. && eps.is_finite())
                .ok_or(SceneError::InvalidField("eps"))?;
        }

        Ok(params)
    }
}

impl<const D: usize> JsonSer for Segment<Float, D> {
    fn to_json(&self) -> Value {
        serde_json::json!([self.start.as_slice(), self.end.as_slice()])
    }
}

impl<const D: usize> JsonSer for TraceResult<Float, D> {
    fn to_json(&self) -> Value {
        let outcome = match self.outcome {
            Outcome::Escaped => "escaped",
            Outcome::BounceLimitReached => "bounce_limit_reached",
            Outcome::Captured { .. } => "captured",
        };

        serde_json::json!({
            "outcome": outcome,
            "coupling_efficiency": self.coupling_efficiency(),
            "bounces": self.bounces(),
            "path_length": self.path_length(),
            "segments": self.segments.to_json(),
        })
    }
}

impl<const D: usize> JsonSer for AlignmentScan<Float, D> {
    fn to_json(&self) -> Value {
        let best = self.best.as_ref().map_or(Value::Null, |best| {
            serde_json::json!({
                "normal": best.normal.as_slice(),
                "efficiency": best.efficiency,
            })
        });

        serde_json::json!({
            "evaluated": self.evaluated,
            "captured": self.captured,
            "best": best,
        })
    }
}

pub fn serialize_bench<const D: usize>(bench: &OpticalBench<Float, D>) -> Value {
    serde_json::json!({
        "dim": D,
        "params": bench.params().to_json(),
        "reflectors": bench.reflectors().to_json(),
        "receiver": bench.receiver().map_or(Value::Null, JsonSer::to_json),
        "beams": bench.beams().to_json(),
    })
}

/// Reads the `dim` field of a serialized bench.
pub fn bench_dim(json: &Value) -> Result<u64> {
    field(json, "dim")?
        .as_u64()
        .ok_or(SceneError::InvalidField("dim"))
}

pub fn deserialize_bench<const D: usize>(json: &Value) -> Result<OpticalBench<Float, D>> {
    let dim = bench_dim(json)?;
    if dim != D as u64 {
        return Err(SceneError::Dimension {
            expected: D,
            found: dim,
        });
    }

    let params = optional(json, "params")
        .map(TraceParams::from_json)
        .transpose()?
        .unwrap_or_default();

    let mut bench = OpticalBench::new(params);

    let reflectors: ReflectorRegistry<Float, D> =
        ReflectorRegistry::from_json(field(json, "reflectors")?)?;
    *bench.reflectors_mut() = reflectors;

    bench.set_receiver(optional(json, "receiver").map(Receiver::from_json).transpose()?);

    let beams: Vec<Beam<Float, D>> = map_json_array(field(json, "beams")?, "beams", Beam::from_json)?;
    for beam in beams {
        bench.push_beam(beam);
    }

    log::debug!(
        "loaded a {D}D bench: {} reflector(s), {} beam(s), receiver: {}",
        bench.reflectors().len(),
        bench.beams().len(),
        bench.receiver().is_some(),
    );

    Ok(bench)
}

pub fn read_json(path: impl AsRef<Path>) -> Result<Value> {
    Ok(serde_json::from_reader(BufReader::new(File::open(path)?))?)
}

pub fn write_json(path: impl AsRef<Path>, json: &Value) -> Result<()> {
    Ok(serde_json::to_writer_pretty(
        BufWriter::new(File::create(path)?),
        json,
    )?)
}
