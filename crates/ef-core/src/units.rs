//! Runtime units and the bridge from `uom` SI quantities.
//!
//! Model quantities carry their unit as data (their dimension is only known
//! when a model is declared), so coherence is checked at runtime against an
//! exponent vector over the SI base dimensions. Statically typed `uom` values
//! convert into a [`Measure`] and can then be assigned to any coherent
//! quantity.

use core::fmt;
use core::ops::{Div, Mul};

use uom::si::f64::{
    Area as UomArea, Energy as UomEnergy, Length as UomLength, Mass as UomMass,
    MassRate as UomMassRate, Power as UomPower, Pressure as UomPressure, Ratio as UomRatio,
    ThermodynamicTemperature as UomThermodynamicTemperature, Time as UomTime,
};

// Public canonical unit types (SI, f64)
pub type Area = UomArea;
pub type Energy = UomEnergy;
pub type Length = UomLength;
pub type Mass = UomMass;
pub type MassRate = UomMassRate;
pub type Power = UomPower;
pub type Pressure = UomPressure;
pub type Ratio = UomRatio;
pub type Temperature = UomThermodynamicTemperature;
pub type Time = UomTime;

/// Number of SI base dimensions tracked by [`Unit`].
pub const BASE_DIMENSIONS: usize = 7;

const BASE_SYMBOLS: [&str; BASE_DIMENSIONS] = ["m", "kg", "s", "K", "mol", "A", "cd"];

/// A runtime unit: exponents over (length, mass, time, temperature, amount,
/// current, luminosity) and a scale factor to the coherent SI unit.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Unit {
    dims: [i8; BASE_DIMENSIONS],
    factor: f64,
}

impl Unit {
    pub const fn new(dims: [i8; BASE_DIMENSIONS], factor: f64) -> Self {
        Self { dims, factor }
    }

    pub const fn dims(&self) -> [i8; BASE_DIMENSIONS] {
        self.dims
    }

    pub const fn factor(&self) -> f64 {
        self.factor
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dims.iter().all(|&d| d == 0)
    }

    /// Two units are coherent when they measure the same dimension.
    pub fn is_coherent_with(&self, other: &Unit) -> bool {
        self.dims == other.dims
    }

    /// Same unit scaled by `factor` (e.g. `si::GRAM == si::KILOGRAM.scaled(1e-3)`).
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            dims: self.dims,
            factor: self.factor * factor,
        }
    }

    pub fn powi(self, n: i8) -> Self {
        let mut dims = self.dims;
        for d in &mut dims {
            *d *= n;
        }
        Self {
            dims,
            factor: self.factor.powi(i32::from(n)),
        }
    }

    /// Convert `value` expressed in `self` into `target`. `None` if incoherent.
    pub fn convert(&self, value: f64, target: &Unit) -> Option<f64> {
        if self.is_coherent_with(target) {
            Some(value * self.factor / target.factor)
        } else {
            None
        }
    }
}

impl Mul for Unit {
    type Output = Unit;

    fn mul(self, rhs: Unit) -> Unit {
        let mut dims = self.dims;
        for (d, r) in dims.iter_mut().zip(rhs.dims) {
            *d += r;
        }
        Unit {
            dims,
            factor: self.factor * rhs.factor,
        }
    }
}

impl Div for Unit {
    type Output = Unit;

    fn div(self, rhs: Unit) -> Unit {
        let mut dims = self.dims;
        for (d, r) in dims.iter_mut().zip(rhs.dims) {
            *d -= r;
        }
        Unit {
            dims,
            factor: self.factor / rhs.factor,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.factor != 1.0 {
            write!(f, "{}·", self.factor)?;
        }
        if self.is_dimensionless() {
            return write!(f, "1");
        }
        let mut first = true;
        for (sym, &exp) in BASE_SYMBOLS.iter().zip(self.dims.iter()) {
            if exp == 0 {
                continue;
            }
            if !first {
                write!(f, "·")?;
            }
            first = false;
            if exp == 1 {
                write!(f, "{sym}")?;
            } else {
                write!(f, "{sym}^{exp}")?;
            }
        }
        Ok(())
    }
}

/// Predefined units.
pub mod si {
    use super::Unit;

    pub const DIMENSIONLESS: Unit = Unit::new([0, 0, 0, 0, 0, 0, 0], 1.0);
    pub const METER: Unit = Unit::new([1, 0, 0, 0, 0, 0, 0], 1.0);
    pub const KILOGRAM: Unit = Unit::new([0, 1, 0, 0, 0, 0, 0], 1.0);
    pub const SECOND: Unit = Unit::new([0, 0, 1, 0, 0, 0, 0], 1.0);
    pub const KELVIN: Unit = Unit::new([0, 0, 0, 1, 0, 0, 0], 1.0);
    pub const MOLE: Unit = Unit::new([0, 0, 0, 0, 1, 0, 0], 1.0);
    pub const AMPERE: Unit = Unit::new([0, 0, 0, 0, 0, 1, 0], 1.0);
    pub const CANDELA: Unit = Unit::new([0, 0, 0, 0, 0, 0, 1], 1.0);

    pub const SQUARE_METER: Unit = Unit::new([2, 0, 0, 0, 0, 0, 0], 1.0);
    pub const CUBIC_METER: Unit = Unit::new([3, 0, 0, 0, 0, 0, 0], 1.0);
    pub const PER_SECOND: Unit = Unit::new([0, 0, -1, 0, 0, 0, 0], 1.0);
    pub const KILOGRAM_PER_SECOND: Unit = Unit::new([0, 1, -1, 0, 0, 0, 0], 1.0);
    pub const MOLE_PER_SECOND: Unit = Unit::new([0, 0, -1, 0, 1, 0, 0], 1.0);
    pub const PASCAL: Unit = Unit::new([-1, 1, -2, 0, 0, 0, 0], 1.0);
    pub const JOULE: Unit = Unit::new([2, 1, -2, 0, 0, 0, 0], 1.0);
    pub const JOULE_PER_MOLE: Unit = Unit::new([2, 1, -2, 0, -1, 0, 0], 1.0);
    pub const WATT: Unit = Unit::new([2, 1, -3, 0, 0, 0, 0], 1.0);
    pub const KILOGRAM_PER_CUBIC_METER: Unit = Unit::new([-3, 1, 0, 0, 0, 0, 0], 1.0);

    pub const GRAM: Unit = Unit::new([0, 1, 0, 0, 0, 0, 0], 1e-3);
    pub const BAR: Unit = Unit::new([-1, 1, -2, 0, 0, 0, 0], 1e5);
    pub const MINUTE: Unit = Unit::new([0, 0, 1, 0, 0, 0, 0], 60.0);
    pub const HOUR: Unit = Unit::new([0, 0, 1, 0, 0, 0, 0], 3600.0);
}

/// A value tagged with its unit.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Measure {
    pub value: f64,
    pub unit: Unit,
}

impl Measure {
    pub const fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    /// Express this measure in `target`. `None` if incoherent.
    pub fn in_unit(&self, target: &Unit) -> Option<f64> {
        self.unit.convert(self.value, target)
    }
}

macro_rules! measure_from_uom {
    ($($ty:ty => $unit:expr),* $(,)?) => {
        $(
            impl From<$ty> for Measure {
                fn from(q: $ty) -> Self {
                    // uom stores values in coherent SI base units.
                    Measure::new(q.value, $unit)
                }
            }
        )*
    };
}

measure_from_uom! {
    Area => si::SQUARE_METER,
    Energy => si::JOULE,
    Length => si::METER,
    Mass => si::KILOGRAM,
    MassRate => si::KILOGRAM_PER_SECOND,
    Power => si::WATT,
    Pressure => si::PASCAL,
    Ratio => si::DIMENSIONLESS,
    Temperature => si::KELVIN,
    Time => si::SECOND,
}

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn kgps(v: f64) -> MassRate {
    use uom::si::mass_rate::kilogram_per_second;
    MassRate::new::<kilogram_per_second>(v)
}

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn s(v: f64) -> Time {
    use uom::si::time::second;
    Time::new::<second>(v)
}

#[inline]
pub fn unitless(v: f64) -> Ratio {
    use uom::si::ratio::ratio;
    Ratio::new::<ratio>(v)
}
