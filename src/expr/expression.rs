//! Domain-tagged expressions and their arithmetic.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use super::density::Density;
use super::domain::{Domain, Omega, Quantity};
use crate::cas::parse as cparse;
use crate::cas::{self, Delayed, Family, Ratio, Signal, C64};
use crate::error::{Result, SymnodalError};
use crate::session::Nid;

/// Value of an expression, one variant per domain.
#[derive(Debug, Clone)]
pub enum Value {
    Time(Signal),
    Laplace(Delayed),
    Fourier(Delayed),
    AngularFourier(Delayed),
    Z(Ratio),
    DiscreteTime(Signal),
    DiscreteFrequency(Signal),
    Constant(Ratio),
    /// Complex amplitude `X` of `Re(X·e^{jωt})`.
    Phasor { omega: Omega, value: Ratio },
    /// Amplitude spectral density in `f`.
    NoiseF { nid: Nid, asd: Density },
    /// Amplitude spectral density in `omega`.
    NoiseOmega { nid: Nid, asd: Density },
}

impl Value {
    pub fn domain(&self) -> Domain {
        match self {
            Value::Time(_) => Domain::Time,
            Value::Laplace(_) => Domain::Laplace,
            Value::Fourier(_) => Domain::Fourier,
            Value::AngularFourier(_) => Domain::AngularFourier,
            Value::Z(_) => Domain::Z,
            Value::DiscreteTime(_) => Domain::DiscreteTime,
            Value::DiscreteFrequency(_) => Domain::DiscreteFrequency,
            Value::Constant(_) => Domain::Constant,
            Value::Phasor { .. } => Domain::Phasor,
            Value::NoiseF { .. } => Domain::NoiseF,
            Value::NoiseOmega { .. } => Domain::NoiseOmega,
        }
    }

    fn free_symbols(&self) -> std::collections::BTreeSet<String> {
        match self {
            Value::Time(s) | Value::DiscreteTime(s) | Value::DiscreteFrequency(s) => {
                s.free_symbols()
            }
            Value::Laplace(d) | Value::Fourier(d) | Value::AngularFourier(d) => d.free_symbols(),
            Value::Z(r) | Value::Constant(r) => r.free_symbols(),
            Value::Phasor { omega, value } => {
                let mut out = value.free_symbols();
                out.extend(omega.value().free_symbols());
                out
            }
            Value::NoiseF { asd, .. } | Value::NoiseOmega { asd, .. } => asd.free_symbols(),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Value::Time(s) | Value::DiscreteTime(s) | Value::DiscreteFrequency(s) => s.is_zero(),
            Value::Laplace(d) | Value::Fourier(d) | Value::AngularFourier(d) => d.is_zero(),
            Value::Z(r) | Value::Constant(r) => r.is_zero(),
            Value::Phasor { value, .. } => value.is_zero(),
            Value::NoiseF { asd, .. } | Value::NoiseOmega { asd, .. } => asd.is_zero(),
        }
    }

    /// Applies a map to every rational coefficient.
    pub fn map_ratios<F>(&self, f: F) -> Result<Value>
    where
        F: Fn(&Ratio) -> Result<Ratio>,
    {
        Ok(match self {
            Value::Time(s) => Value::Time(s.map_ratios(&f)?),
            Value::DiscreteTime(s) => Value::DiscreteTime(s.map_ratios(&f)?),
            Value::DiscreteFrequency(s) => Value::DiscreteFrequency(s.map_ratios(&f)?),
            Value::Laplace(d) => Value::Laplace(d.map_ratios(&f)?),
            Value::Fourier(d) => Value::Fourier(d.map_ratios(&f)?),
            Value::AngularFourier(d) => Value::AngularFourier(d.map_ratios(&f)?),
            Value::Z(r) => Value::Z(f(r)?),
            Value::Constant(r) => Value::Constant(f(r)?),
            Value::Phasor { omega, value } => Value::Phasor {
                omega: Omega::new(f(omega.value())?)?,
                value: f(value)?,
            },
            Value::NoiseF { nid, asd } => Value::NoiseF {
                nid: *nid,
                asd: asd.map_ratios(&f)?,
            },
            Value::NoiseOmega { nid, asd } => Value::NoiseOmega {
                nid: *nid,
                asd: asd.map_ratios(&f)?,
            },
        })
    }

    fn zero_in(domain: Domain) -> Option<Value> {
        Some(match domain {
            Domain::Time => Value::Time(Signal::zero(Family::Continuous, cas::T)),
            Domain::Laplace => Value::Laplace(Delayed::zero()),
            Domain::Fourier => Value::Fourier(Delayed::zero()),
            Domain::AngularFourier => Value::AngularFourier(Delayed::zero()),
            Domain::Z => Value::Z(Ratio::zero()),
            Domain::DiscreteTime => Value::DiscreteTime(Signal::zero(Family::Discrete, cas::N)),
            Domain::DiscreteFrequency => {
                Value::DiscreteFrequency(Signal::zero(Family::Discrete, cas::K))
            }
            Domain::Constant => Value::Constant(Ratio::zero()),
            Domain::Phasor | Domain::NoiseF | Domain::NoiseOmega => return None,
        })
    }

    /// A constant expressed in another domain.
    fn promote(c: &Ratio, domain: Domain) -> Option<Value> {
        Some(match domain {
            Domain::Time => Value::Time(Signal::constant(Family::Continuous, cas::T, c.clone())),
            Domain::Laplace => Value::Laplace(Delayed::from_ratio(c.clone())),
            Domain::Fourier => Value::Fourier(Delayed::from_ratio(c.clone())),
            Domain::AngularFourier => Value::AngularFourier(Delayed::from_ratio(c.clone())),
            Domain::Z => Value::Z(c.clone()),
            Domain::DiscreteTime => {
                Value::DiscreteTime(Signal::constant(Family::Discrete, cas::N, c.clone()))
            }
            Domain::DiscreteFrequency => {
                Value::DiscreteFrequency(Signal::constant(Family::Discrete, cas::K, c.clone()))
            }
            Domain::Constant => Value::Constant(c.clone()),
            Domain::Phasor | Domain::NoiseF | Domain::NoiseOmega => return None,
        })
    }
}

/// A quantity in one representation domain.
#[derive(Debug, Clone)]
pub struct Expr {
    quantity: Quantity,
    value: Value,
}

impl Expr {
    /// Builds an expression, enforcing the domain's free-variable invariant.
    pub fn new(quantity: Quantity, value: Value) -> Result<Expr> {
        let domain = value.domain();
        let forbidden = domain.forbidden();
        if let Some(bad) = value
            .free_symbols()
            .into_iter()
            .find(|s| forbidden.contains(&s.as_str()))
        {
            return Err(SymnodalError::DomainInvariant {
                domain: domain.name(),
                symbol: bad,
                expr: Expr { quantity, value }.to_string(),
            });
        }
        Ok(Expr { quantity, value })
    }

    pub fn zero(domain: Domain) -> Result<Expr> {
        let value = Value::zero_in(domain).ok_or_else(|| {
            SymnodalError::IncompatibleOperands(format!("no generic zero in the {} domain", domain))
        })?;
        Ok(Expr {
            quantity: Quantity::Undefined,
            value,
        })
    }

    pub fn constant(c: Ratio) -> Result<Expr> {
        Expr::new(Quantity::Undefined, Value::Constant(c))
    }

    pub fn real(x: f64) -> Expr {
        Expr {
            quantity: Quantity::Undefined,
            value: Value::Constant(Ratio::real(x)),
        }
    }

    pub fn laplace_ratio(r: Ratio) -> Result<Expr> {
        Expr::new(Quantity::Undefined, Value::Laplace(Delayed::from_ratio(r)))
    }

    pub fn from_signal(s: Signal) -> Result<Expr> {
        let value = match (s.family(), s.var()) {
            (Family::Continuous, v) if v == cas::T => Value::Time(s),
            (Family::Discrete, v) if v == cas::N => Value::DiscreteTime(s),
            (Family::Discrete, v) if v == cas::K => Value::DiscreteFrequency(s),
            (_, v) => {
                return Err(SymnodalError::Algebra(format!("unexpected signal variable {}", v)));
            }
        };
        Expr::new(Quantity::Undefined, value)
    }

    /// AC term `Re(value·e^{jωt})`.
    pub fn ac(omega: Omega, value: Ratio) -> Result<Expr> {
        Expr::new(Quantity::Undefined, Value::Phasor { omega, value })
    }

    pub fn noise_f(nid: Nid, asd: Ratio) -> Result<Expr> {
        Expr::noise_density(nid, Density::from_ratio(asd))
    }

    pub fn noise_density(nid: Nid, asd: Density) -> Result<Expr> {
        Expr::new(Quantity::Undefined, Value::NoiseF { nid, asd })
    }

    pub fn noise_omega(nid: Nid, asd: Ratio) -> Result<Expr> {
        Expr::new(
            Quantity::Undefined,
            Value::NoiseOmega {
                nid,
                asd: Density::from_ratio(asd),
            },
        )
    }

    /// Parses `text` as an expression in `domain`.
    ///
    /// Phasor and noise domains need extra data; use [`Expr::parse_phasor`]
    /// and [`Expr::parse_noise`].
    pub fn parse(text: &str, domain: Domain) -> Result<Expr> {
        let ast = cparse::parse(text)?;
        let two_pi_j = C64::new(0.0, 2.0 * std::f64::consts::PI);
        let value = match domain {
            Domain::Time => Value::Time(cparse::to_signal(&ast, Family::Continuous, cas::T)?),
            Domain::Laplace => Value::Laplace(cparse::to_delayed(&ast, cas::S, C64::new(1.0, 0.0))?),
            Domain::Fourier => Value::Fourier(cparse::to_delayed(&ast, cas::F, two_pi_j)?),
            Domain::AngularFourier => {
                Value::AngularFourier(cparse::to_delayed(&ast, cas::OMEGA, C64::new(0.0, 1.0))?)
            }
            Domain::Z => Value::Z(cparse::to_ratio(&ast)?),
            Domain::DiscreteTime => {
                Value::DiscreteTime(cparse::to_signal(&ast, Family::Discrete, cas::N)?)
            }
            Domain::DiscreteFrequency => {
                Value::DiscreteFrequency(cparse::to_signal(&ast, Family::Discrete, cas::K)?)
            }
            Domain::Constant => Value::Constant(cparse::to_ratio(&ast)?),
            Domain::Phasor | Domain::NoiseF | Domain::NoiseOmega => {
                return Err(SymnodalError::Parse(format!(
                    "{} expressions need an angular frequency or noise identity",
                    domain
                )));
            }
        };
        Expr::new(Quantity::Undefined, value)
    }

    /// Parses `text`, choosing the domain from the domain variables it uses.
    pub fn parse_any(text: &str) -> Result<Expr> {
        let ast = cparse::parse(text)?;
        Expr::parse(text, Domain::classify(&ast.symbols())?)
    }

    pub fn parse_phasor(text: &str, omega: Omega) -> Result<Expr> {
        Expr::ac(omega, cparse::to_ratio(&cparse::parse(text)?)?)
    }

    pub fn parse_noise(text: &str, nid: Nid) -> Result<Expr> {
        Expr::noise_f(nid, cparse::to_ratio(&cparse::parse(text)?)?)
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn domain(&self) -> Domain {
        self.value.domain()
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Same value with another quantity role.
    pub fn with_quantity(mut self, quantity: Quantity) -> Expr {
        self.quantity = quantity;
        self
    }

    pub fn as_voltage(self) -> Expr {
        self.with_quantity(Quantity::Voltage)
    }

    pub fn as_current(self) -> Expr {
        self.with_quantity(Quantity::Current)
    }

    pub fn free_symbols(&self) -> std::collections::BTreeSet<String> {
        self.value.free_symbols()
    }

    /// Rational value of a constant, Z-domain or undelayed transform-domain expression.
    pub fn ratio(&self) -> Option<Ratio> {
        match &self.value {
            Value::Z(r) | Value::Constant(r) => Some(r.clone()),
            Value::Laplace(d) | Value::Fourier(d) | Value::AngularFourier(d) => d.as_ratio(),
            Value::Phasor { value, .. } => Some(value.clone()),
            Value::NoiseF { asd, .. } | Value::NoiseOmega { asd, .. } => asd.as_ratio(),
            Value::Time(s) | Value::DiscreteTime(s) | Value::DiscreteFrequency(s) => s.as_constant(),
        }
    }

    pub fn density(&self) -> Option<&Density> {
        match &self.value {
            Value::NoiseF { asd, .. } | Value::NoiseOmega { asd, .. } => Some(asd),
            _ => None,
        }
    }

    pub fn signal(&self) -> Option<&Signal> {
        match &self.value {
            Value::Time(s) | Value::DiscreteTime(s) | Value::DiscreteFrequency(s) => Some(s),
            _ => None,
        }
    }

    pub fn delayed(&self) -> Option<&Delayed> {
        match &self.value {
            Value::Laplace(d) | Value::Fourier(d) | Value::AngularFourier(d) => Some(d),
            _ => None,
        }
    }

    /// Replaces a symbol by a rational value.
    pub fn subs(&self, symbol: &str, value: &Ratio) -> Result<Expr> {
        Expr::new(self.quantity, self.value.map_ratios(|r| r.subs(symbol, value))?)
    }

    /// Substitutes numeric values for symbols.
    pub fn with_values(&self, values: &HashMap<String, f64>) -> Result<Expr> {
        let values: HashMap<String, C64> = values
            .iter()
            .map(|(k, v)| (k.clone(), C64::new(*v, 0.0)))
            .collect();
        Expr::new(self.quantity, self.value.map_ratios(|r| r.eval(&values))?)
    }

    /// Scales by a rational constant.
    pub fn scale(&self, k: &Ratio) -> Result<Expr> {
        self.mul(&Expr::constant(k.clone())?)
    }

    fn binary(&self, other: &Expr, op: Op) -> Result<Expr> {
        let quantity = match op {
            Op::Add | Op::Sub => self.quantity.add(other.quantity)?,
            Op::Mul => self.quantity.mul(other.quantity),
            Op::Div => self.quantity.div(other.quantity),
        };
        let (a, b) = coerce(&self.value, &other.value, op)?;
        let value = combine(&a, &b, op)?;
        Expr::new(quantity, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    fn verb(self) -> &'static str {
        match self {
            Op::Add => "add",
            Op::Sub => "subtract",
            Op::Mul => "multiply",
            Op::Div => "divide",
        }
    }
}

fn mismatch(a: &Value, b: &Value, op: Op) -> SymnodalError {
    SymnodalError::DomainMismatch {
        op: op.verb(),
        lhs: a.domain().name(),
        rhs: b.domain().name(),
    }
}

/// Brings both operands into one domain by promoting constants.
fn coerce(a: &Value, b: &Value, op: Op) -> Result<(Value, Value)> {
    if a.domain() == b.domain() {
        return Ok((a.clone(), b.clone()));
    }
    let scaling = matches!(op, Op::Mul | Op::Div);
    match (a, b) {
        (Value::Constant(c), other) => match Value::promote(c, other.domain()) {
            Some(p) => Ok((p, other.clone())),
            None if scaling => Ok((a.clone(), b.clone())),
            None => Err(mismatch(a, b, op)),
        },
        (other, Value::Constant(c)) => match Value::promote(c, other.domain()) {
            Some(p) => Ok((other.clone(), p)),
            None if scaling => Ok((a.clone(), b.clone())),
            None => Err(mismatch(a, b, op)),
        },
        _ => Err(mismatch(a, b, op)),
    }
}

fn ratio_op(a: &Ratio, b: &Ratio, op: Op) -> Result<Ratio> {
    match op {
        Op::Add => Ok(a.add(b)),
        Op::Sub => Ok(a.sub(b)),
        Op::Mul => Ok(a.mul(b)),
        Op::Div => a.div(b),
    }
}

fn density_op(a: &Density, k: &Ratio, op: Op) -> Result<Density> {
    match op {
        Op::Div => a.div_ratio(k),
        _ => Ok(a.mul_ratio(k)),
    }
}

fn delayed_op(a: &Delayed, b: &Delayed, op: Op) -> Result<Delayed> {
    match op {
        Op::Add => Ok(a.add(b)),
        Op::Sub => Ok(a.sub(b)),
        Op::Mul => Ok(a.mul(b)),
        Op::Div => a.div(b),
    }
}

fn signal_op(a: &Signal, b: &Signal, op: Op) -> Result<Signal> {
    match op {
        Op::Add => a.add(b),
        Op::Sub => a.sub(b),
        Op::Mul => a.mul(b),
        Op::Div => {
            let c = b.as_constant().ok_or_else(|| {
                SymnodalError::Algebra("division by a time-varying signal".to_string())
            })?;
            Ok(a.scale(&c.inv()?))
        }
    }
}

fn combine(a: &Value, b: &Value, op: Op) -> Result<Value> {
    Ok(match (a, b) {
        (Value::Time(x), Value::Time(y)) => Value::Time(signal_op(x, y, op)?),
        (Value::DiscreteTime(x), Value::DiscreteTime(y)) => Value::DiscreteTime(signal_op(x, y, op)?),
        (Value::DiscreteFrequency(x), Value::DiscreteFrequency(y)) => {
            Value::DiscreteFrequency(signal_op(x, y, op)?)
        }
        (Value::Laplace(x), Value::Laplace(y)) => Value::Laplace(delayed_op(x, y, op)?),
        (Value::Fourier(x), Value::Fourier(y)) => Value::Fourier(delayed_op(x, y, op)?),
        (Value::AngularFourier(x), Value::AngularFourier(y)) => {
            Value::AngularFourier(delayed_op(x, y, op)?)
        }
        (Value::Z(x), Value::Z(y)) => Value::Z(ratio_op(x, y, op)?),
        (Value::Constant(x), Value::Constant(y)) => Value::Constant(ratio_op(x, y, op)?),
        (Value::Phasor { omega: wa, value: x }, Value::Phasor { omega: wb, value: y }) => {
            if wa != wb {
                return Err(SymnodalError::IncompatibleOperands(format!(
                    "phasors at different angular frequencies ({} and {})",
                    wa, wb
                )));
            }
            Value::Phasor {
                omega: wa.clone(),
                value: ratio_op(x, y, op)?,
            }
        }
        (Value::Phasor { omega, value }, Value::Constant(c)) if op != Op::Add && op != Op::Sub => {
            Value::Phasor {
                omega: omega.clone(),
                value: ratio_op(value, c, op)?,
            }
        }
        (Value::Constant(c), Value::Phasor { omega, value }) if op == Op::Mul => Value::Phasor {
            omega: omega.clone(),
            value: c.mul(value),
        },
        (Value::NoiseF { nid: na, asd: x }, Value::NoiseF { nid: nb, asd: y })
        | (Value::NoiseOmega { nid: na, asd: x }, Value::NoiseOmega { nid: nb, asd: y })
            if matches!(op, Op::Add | Op::Sub) =>
        {
            if na != nb {
                return Err(SymnodalError::IncompatibleOperands(format!(
                    "independent noise terms {} and {} combine in quadrature; add them to a superposition",
                    na, nb
                )));
            }
            let asd = if op == Op::Add { x.add(y) } else { x.sub(y) };
            match a {
                Value::NoiseF { .. } => Value::NoiseF { nid: *na, asd },
                _ => Value::NoiseOmega { nid: *na, asd },
            }
        }
        (Value::NoiseF { nid, asd }, Value::Constant(c)) if matches!(op, Op::Mul | Op::Div) => {
            Value::NoiseF {
                nid: *nid,
                asd: density_op(asd, c, op)?,
            }
        }
        (Value::NoiseOmega { nid, asd }, Value::Constant(c)) if matches!(op, Op::Mul | Op::Div) => {
            Value::NoiseOmega {
                nid: *nid,
                asd: density_op(asd, c, op)?,
            }
        }
        (Value::Constant(c), Value::NoiseF { nid, asd }) if op == Op::Mul => Value::NoiseF {
            nid: *nid,
            asd: asd.mul_ratio(c),
        },
        (Value::Constant(c), Value::NoiseOmega { nid, asd }) if op == Op::Mul => Value::NoiseOmega {
            nid: *nid,
            asd: asd.mul_ratio(c),
        },
        _ => return Err(mismatch(a, b, op)),
    })
}

impl Add for &Expr {
    type Output = Result<Expr>;

    fn add(self, rhs: &Expr) -> Result<Expr> {
        self.binary(rhs, Op::Add)
    }
}

impl Sub for &Expr {
    type Output = Result<Expr>;

    fn sub(self, rhs: &Expr) -> Result<Expr> {
        self.binary(rhs, Op::Sub)
    }
}

impl Mul for &Expr {
    type Output = Result<Expr>;

    fn mul(self, rhs: &Expr) -> Result<Expr> {
        self.binary(rhs, Op::Mul)
    }
}

impl Div for &Expr {
    type Output = Result<Expr>;

    fn div(self, rhs: &Expr) -> Result<Expr> {
        self.binary(rhs, Op::Div)
    }
}

impl Neg for &Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        let value = match &self.value {
            Value::Time(s) => Value::Time(s.neg()),
            Value::DiscreteTime(s) => Value::DiscreteTime(s.neg()),
            Value::DiscreteFrequency(s) => Value::DiscreteFrequency(s.neg()),
            Value::Laplace(d) => Value::Laplace(d.neg()),
            Value::Fourier(d) => Value::Fourier(d.neg()),
            Value::AngularFourier(d) => Value::AngularFourier(d.neg()),
            Value::Z(r) => Value::Z(r.neg()),
            Value::Constant(r) => Value::Constant(r.neg()),
            Value::Phasor { omega, value } => Value::Phasor {
                omega: omega.clone(),
                value: value.neg(),
            },
            Value::NoiseF { nid, asd } => Value::NoiseF {
                nid: *nid,
                asd: asd.neg(),
            },
            Value::NoiseOmega { nid, asd } => Value::NoiseOmega {
                nid: *nid,
                asd: asd.neg(),
            },
        };
        Expr {
            quantity: self.quantity,
            value,
        }
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        -&self
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        match (&self.value, &other.value) {
            (Value::NoiseF { nid: a, asd: x }, Value::NoiseF { nid: b, asd: y })
            | (Value::NoiseOmega { nid: a, asd: x }, Value::NoiseOmega { nid: b, asd: y }) => {
                a == b && x == y
            }
            _ => matches!(self - other, Ok(d) if d.is_zero()),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::Time(s) | Value::DiscreteTime(s) | Value::DiscreteFrequency(s) => {
                write!(f, "{}", s)
            }
            Value::Laplace(d) => write!(f, "{}", d.fmt_with(|t| cparse::kernel_label(cas::S, t))),
            Value::Fourier(d) => write!(f, "{}", d.fmt_with(|t| cparse::kernel_label(cas::F, t))),
            Value::AngularFourier(d) => {
                write!(f, "{}", d.fmt_with(|t| cparse::kernel_label(cas::OMEGA, t)))
            }
            Value::Z(r) | Value::Constant(r) => write!(f, "{}", r),
            Value::Phasor { value, .. } => write!(f, "{}", value),
            Value::NoiseF { asd, .. } | Value::NoiseOmega { asd, .. } => write!(f, "{}", asd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_invariant_enforced() {
        let err = Expr::new(
            Quantity::Undefined,
            Value::Laplace(Delayed::from_ratio(Ratio::symbol("t"))),
        )
        .unwrap_err();
        assert!(matches!(err, SymnodalError::DomainInvariant { .. }));
        assert!(Expr::parse("1/(s + t)", Domain::Laplace).is_err());
    }

    #[test]
    fn test_mismatched_domains_rejected() {
        let a = Expr::parse("1/s", Domain::Laplace).unwrap();
        let b = Expr::parse("1/f", Domain::Fourier).unwrap();
        let err = (&a + &b).unwrap_err();
        assert!(matches!(err, SymnodalError::DomainMismatch { .. }));
    }

    #[test]
    fn test_constants_promote() {
        let a = Expr::parse("1/(s + 1)", Domain::Laplace).unwrap();
        let sum = (&a + &Expr::real(1.0)).unwrap();
        assert_eq!(sum.domain(), Domain::Laplace);
        assert_eq!(sum, Expr::parse("(s + 2)/(s + 1)", Domain::Laplace).unwrap());
    }

    #[test]
    fn test_quantity_follows_operations() {
        let v = Expr::parse("10", Domain::Constant).unwrap().as_voltage();
        let z = Expr::parse("2", Domain::Constant)
            .unwrap()
            .with_quantity(Quantity::Impedance);
        let i = (&v / &z).unwrap();
        assert_eq!(i.quantity(), Quantity::Current);
        assert_eq!(i.ratio().unwrap().as_real(), Some(5.0));
    }

    #[test]
    fn test_parse_any_classifies() {
        assert_eq!(Expr::parse_any("exp(-t)*u(t)").unwrap().domain(), Domain::Time);
        assert_eq!(Expr::parse_any("1/(s*C)").unwrap().domain(), Domain::Laplace);
        assert_eq!(Expr::parse_any("z/(z - 0.5)").unwrap().domain(), Domain::Z);
        assert_eq!(Expr::parse_any("R1 + R2").unwrap().domain(), Domain::Constant);
    }

    #[test]
    fn test_noise_same_nid_adds_algebraically() {
        let a = Expr::noise_f(Nid(1), Ratio::real(3.0)).unwrap();
        let b = Expr::noise_f(Nid(1), Ratio::real(4.0)).unwrap();
        assert_eq!((&a + &b).unwrap().ratio().unwrap().as_real(), Some(7.0));
        let c = Expr::noise_f(Nid(2), Ratio::real(4.0)).unwrap();
        assert!((&a + &c).is_err());
    }
}
