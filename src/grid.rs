use crate::domain::{AgeScale, Metallicity, MetallicityScale};
use crate::error::IsoError;

/// Solar `Z/X` the service uses for `[M/H]`.
pub const SOLAR_Z_OVER_X: f64 = 0.0207;
/// Primordial helium, `Y = Y_P + dY/dZ * Z`.
pub const PRIMORDIAL_HELIUM: f64 = 0.2485;
pub const HELIUM_ENRICHMENT: f64 = 1.78;
/// Upper bound on the points of one grid.
pub const MAX_GRID_POINTS: usize = 10_000;

/// Converts `[M/H]` to the mass fraction `Z`.
///
/// With `Y = 0.2485 + 1.78 Z` and `X = 1 - Y - Z`, solving
/// `[M/H] = log10(Z/X) - log10(Z/X)_sun` for `Z` gives
/// `Z = (1 - Y_P) a / (1 + (1 + dY/dZ) a)` where `a = (Z/X)_sun 10^[M/H]`.
pub fn mh_to_z(mh: f64) -> f64 {
    let a = SOLAR_Z_OVER_X * 10f64.powf(mh);
    (1.0 - PRIMORDIAL_HELIUM) * a / (1.0 + (1.0 + HELIUM_ENRICHMENT) * a)
}

pub fn z_to_mh(z: f64) -> f64 {
    let y = PRIMORDIAL_HELIUM + HELIUM_ENRICHMENT * z;
    let x = 1.0 - y - z;
    (z / x).log10() - SOLAR_Z_OVER_X.log10()
}

fn validate_range(name: &str, start: f64, stop: f64, step: f64) -> Result<(), IsoError> {
    if !(start.is_finite() && stop.is_finite() && step.is_finite()) {
        return Err(IsoError::InvalidRange(format!(
            "{name} range must be finite: ({start}, {stop}, {step})"
        )));
    }
    if step <= 0.0 {
        return Err(IsoError::InvalidRange(format!(
            "{name} step must be positive, got {step}"
        )));
    }
    if stop < start {
        return Err(IsoError::InvalidRange(format!(
            "{name} range is reversed: start {start} > stop {stop}"
        )));
    }
    let points = ((stop - start) / step).floor() + 2.0;
    if points > MAX_GRID_POINTS as f64 {
        return Err(IsoError::InvalidRange(format!(
            "{name} range ({start}, {stop}, {step}) needs more than {MAX_GRID_POINTS} points"
        )));
    }
    Ok(())
}

/// Ages requested in one query, in the order the service emits the blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeGrid {
    scale: AgeScale,
    start: f64,
    stop: f64,
    step: f64,
    values: Vec<f64>,
}

impl AgeGrid {
    /// Builds `start, start + step, ...` and always ends on `stop`, even when
    /// `step` does not divide the interval.
    pub fn new(scale: AgeScale, start: f64, stop: f64, step: f64) -> Result<Self, IsoError> {
        validate_range("age", start, stop, step)?;
        let tolerance = step * 1e-6;
        let mut values = Vec::new();
        let mut index = 0usize;
        loop {
            let value = start + step * index as f64;
            if value >= stop - tolerance {
                break;
            }
            values.push(value);
            index += 1;
        }
        values.push(stop);
        Ok(Self {
            scale,
            start,
            stop,
            step,
            values,
        })
    }

    pub fn scale(&self) -> AgeScale {
        self.scale
    }

    pub fn bounds(&self) -> (f64, f64, f64) {
        (self.start, self.stop, self.step)
    }

    /// Grid values on the configured axis (log or linear).
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Ages in years.
    pub fn years(&self) -> Vec<f64> {
        match self.scale {
            AgeScale::Log => self.values.iter().map(|v| 10f64.powf(*v)).collect(),
            AgeScale::Linear => self.values.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetallicityGrid {
    scale: MetallicityScale,
    values: Vec<f64>,
}

impl MetallicityGrid {
    /// Half-open arithmetic range: `stop` itself is not requested.
    pub fn from_range(
        scale: MetallicityScale,
        start: f64,
        stop: f64,
        step: f64,
    ) -> Result<Self, IsoError> {
        validate_range("metallicity", start, stop, step)?;
        let tolerance = step * 1e-6;
        let mut values = Vec::new();
        let mut index = 0usize;
        loop {
            let value = start + step * index as f64;
            if value >= stop - tolerance {
                break;
            }
            values.push(value);
            index += 1;
        }
        Self::from_values(scale, values)
    }

    pub fn from_values(scale: MetallicityScale, values: Vec<f64>) -> Result<Self, IsoError> {
        if values.is_empty() {
            return Err(IsoError::InvalidRange(
                "metallicity grid is empty".to_string(),
            ));
        }
        if values.len() > MAX_GRID_POINTS {
            return Err(IsoError::InvalidRange(format!(
                "metallicity grid has {} values, limit is {MAX_GRID_POINTS}",
                values.len()
            )));
        }
        if let Some(bad) = values.iter().find(|value| !value.is_finite()) {
            return Err(IsoError::InvalidRange(format!(
                "metallicity value is not finite: {bad}"
            )));
        }
        if scale == MetallicityScale::Z {
            if let Some(bad) = values.iter().find(|value| **value <= 0.0) {
                return Err(IsoError::InvalidRange(format!(
                    "metallicity Z must be positive, got {bad}"
                )));
            }
        }
        Ok(Self { scale, values })
    }

    pub fn scale(&self) -> MetallicityScale {
        self.scale
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Metallicity> + '_ {
        self.values
            .iter()
            .map(|value| Metallicity::new(self.scale, *value))
    }
}
