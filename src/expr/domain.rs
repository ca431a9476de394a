//! Domain tags, quantity roles and AC frequency keys.

use std::cmp::Ordering;
use std::fmt;

use crate::cas::{self, Ratio};
use crate::error::{Result, SymnodalError};

/// Representation domain of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    Time,
    Laplace,
    Fourier,
    AngularFourier,
    Z,
    DiscreteTime,
    DiscreteFrequency,
    Constant,
    Phasor,
    NoiseF,
    NoiseOmega,
}

impl Domain {
    pub fn name(self) -> &'static str {
        match self {
            Domain::Time => "time",
            Domain::Laplace => "Laplace",
            Domain::Fourier => "Fourier",
            Domain::AngularFourier => "angular Fourier",
            Domain::Z => "z",
            Domain::DiscreteTime => "discrete-time",
            Domain::DiscreteFrequency => "discrete-frequency",
            Domain::Constant => "constant",
            Domain::Phasor => "phasor",
            Domain::NoiseF => "noise (f)",
            Domain::NoiseOmega => "noise (omega)",
        }
    }

    /// Independent variable of the domain.
    pub fn var(self) -> Option<&'static str> {
        match self {
            Domain::Time => Some(cas::T),
            Domain::Laplace => Some(cas::S),
            Domain::Fourier | Domain::NoiseF => Some(cas::F),
            Domain::AngularFourier | Domain::NoiseOmega => Some(cas::OMEGA),
            Domain::Z => Some(cas::Z),
            Domain::DiscreteTime => Some(cas::N),
            Domain::DiscreteFrequency => Some(cas::K),
            Domain::Constant | Domain::Phasor => None,
        }
    }

    /// Domain variables an expression in this domain must not contain.
    pub fn forbidden(self) -> Vec<&'static str> {
        let allowed: &[&str] = match self {
            Domain::Time => &[cas::T, cas::OMEGA],
            Domain::Laplace => &[cas::S, cas::OMEGA],
            Domain::Fourier | Domain::NoiseF => &[cas::F],
            Domain::AngularFourier | Domain::NoiseOmega => &[cas::OMEGA],
            Domain::Z => &[cas::Z],
            Domain::DiscreteTime => &[cas::N],
            Domain::DiscreteFrequency => &[cas::K],
            Domain::Constant | Domain::Phasor => &[cas::OMEGA],
        };
        cas::RESERVED
            .iter()
            .copied()
            .filter(|v| !allowed.contains(v))
            .collect()
    }

    /// Domain reached by the canonical transform pair.
    pub fn conjugate(self) -> Option<Domain> {
        match self {
            Domain::Time => Some(Domain::Laplace),
            Domain::Laplace | Domain::Fourier | Domain::AngularFourier => Some(Domain::Time),
            Domain::Z | Domain::DiscreteFrequency => Some(Domain::DiscreteTime),
            Domain::DiscreteTime => Some(Domain::Z),
            Domain::Constant | Domain::Phasor | Domain::NoiseF | Domain::NoiseOmega => None,
        }
    }

    pub fn is_noise(self) -> bool {
        matches!(self, Domain::NoiseF | Domain::NoiseOmega)
    }

    /// Picks the domain of a raw expression from the domain symbols it uses.
    pub fn classify(symbols: &[String]) -> Result<Domain> {
        let has = |v: &str| symbols.iter().any(|s| s == v);
        let candidates: Vec<Domain> = [
            (cas::T, Domain::Time),
            (cas::S, Domain::Laplace),
            (cas::F, Domain::Fourier),
            (cas::Z, Domain::Z),
            (cas::N, Domain::DiscreteTime),
            (cas::K, Domain::DiscreteFrequency),
        ]
        .iter()
        .filter(|(v, _)| has(v))
        .map(|(_, d)| *d)
        .collect();
        match candidates.as_slice() {
            [] if has(cas::OMEGA) => Ok(Domain::AngularFourier),
            [] => Ok(Domain::Constant),
            [d] => Ok(*d),
            _ => Err(SymnodalError::Parse(format!(
                "expression mixes the variables of several domains: {:?}",
                symbols
            ))),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Physical role of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    Voltage,
    Current,
    Impedance,
    Admittance,
    Transfer,
    Undefined,
}

impl Quantity {
    pub fn name(self) -> &'static str {
        match self {
            Quantity::Voltage => "voltage",
            Quantity::Current => "current",
            Quantity::Impedance => "impedance",
            Quantity::Admittance => "admittance",
            Quantity::Transfer => "transfer",
            Quantity::Undefined => "undefined",
        }
    }

    /// Quantity of a sum; mixing two different physical quantities is an error.
    pub fn add(self, other: Quantity) -> Result<Quantity> {
        use Quantity::*;
        match (self, other) {
            (a, b) if a == b => Ok(a),
            (Undefined, q) | (q, Undefined) => Ok(q),
            (Transfer, q) | (q, Transfer) => Ok(q),
            (a, b) => Err(SymnodalError::IncompatibleOperands(format!(
                "cannot add a {} to a {}",
                b.name(),
                a.name()
            ))),
        }
    }

    pub fn mul(self, other: Quantity) -> Quantity {
        use Quantity::*;
        match (self, other) {
            (Transfer, q) | (q, Transfer) => q,
            (Voltage, Admittance) | (Admittance, Voltage) => Current,
            (Current, Impedance) | (Impedance, Current) => Voltage,
            (Impedance, Admittance) | (Admittance, Impedance) => Transfer,
            _ => Undefined,
        }
    }

    pub fn div(self, other: Quantity) -> Quantity {
        use Quantity::*;
        match (self, other) {
            (a, b) if a == b && a != Undefined => Transfer,
            (q, Transfer) => q,
            (Voltage, Impedance) => Current,
            (Current, Admittance) => Voltage,
            (Voltage, Current) => Impedance,
            (Current, Voltage) => Admittance,
            (Transfer, Impedance) => Admittance,
            (Transfer, Admittance) => Impedance,
            _ => Undefined,
        }
    }

    /// Quantity of a reciprocal.
    pub fn inv(self) -> Quantity {
        match self {
            Quantity::Impedance => Quantity::Admittance,
            Quantity::Admittance => Quantity::Impedance,
            Quantity::Transfer => Quantity::Transfer,
            _ => Quantity::Undefined,
        }
    }
}

/// Angular frequency of an AC component, numeric or symbolic.
///
/// Ordered and compared by its printed form so it can key a map.
#[derive(Debug, Clone)]
pub struct Omega(Ratio);

impl Omega {
    pub fn new(value: Ratio) -> Result<Self> {
        if let Some(bad) = value
            .free_symbols()
            .into_iter()
            .find(|s| cas::RESERVED.contains(&s.as_str()) && s != cas::OMEGA)
        {
            return Err(SymnodalError::DomainInvariant {
                domain: "angular frequency",
                symbol: bad,
                expr: value.to_string(),
            });
        }
        Ok(Self(value))
    }

    pub fn numeric(w: f64) -> Self {
        Self(Ratio::real(w))
    }

    /// The symbolic `omega`.
    pub fn symbolic() -> Self {
        Self(Ratio::symbol(cas::OMEGA))
    }

    pub fn value(&self) -> &Ratio {
        &self.0
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.0.as_real()
    }

    /// `j·ω`.
    pub fn jw(&self) -> Ratio {
        self.0.mul(&Ratio::imag(1.0))
    }

    fn key(&self) -> String {
        self.0.to_string()
    }
}

impl PartialEq for Omega {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Omega {}

impl PartialOrd for Omega {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Omega {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal).then_with(|| self.key().cmp(&other.key())),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.key().cmp(&other.key()),
        }
    }
}

impl std::hash::Hash for Omega {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for Omega {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        let syms = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(Domain::classify(&syms(&["R", "s"])).unwrap(), Domain::Laplace);
        assert_eq!(Domain::classify(&syms(&["omega", "t"])).unwrap(), Domain::Time);
        assert_eq!(Domain::classify(&syms(&["omega"])).unwrap(), Domain::AngularFourier);
        assert_eq!(Domain::classify(&syms(&["R"])).unwrap(), Domain::Constant);
        assert!(Domain::classify(&syms(&["s", "t"])).is_err());
    }

    #[test]
    fn test_quantity_algebra() {
        assert_eq!(Quantity::Voltage.mul(Quantity::Admittance), Quantity::Current);
        assert_eq!(Quantity::Voltage.div(Quantity::Current), Quantity::Impedance);
        assert_eq!(Quantity::Voltage.div(Quantity::Voltage), Quantity::Transfer);
        assert!(Quantity::Voltage.add(Quantity::Current).is_err());
        assert_eq!(Quantity::Voltage.add(Quantity::Undefined).unwrap(), Quantity::Voltage);
    }

    #[test]
    fn test_omega_ordering() {
        let a = Omega::numeric(1.0);
        let b = Omega::numeric(2.0);
        assert!(a < b);
        assert!(b < Omega::symbolic());
        assert_eq!(Omega::numeric(3.0), Omega::numeric(3.0));
        assert!(Omega::new(Ratio::symbol("t")).is_err());
    }
}
