//! Impedances and admittances as rational functions of `s`.

use std::fmt;

use crate::cas::{self, Ratio};
use crate::error::{Result, SymnodalError};
use crate::expr::{Domain, Expr, Omega, Quantity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmittanceKind {
    Impedance,
    Admittance,
}

impl ImmittanceKind {
    pub fn quantity(self) -> Quantity {
        match self {
            ImmittanceKind::Impedance => Quantity::Impedance,
            ImmittanceKind::Admittance => Quantity::Admittance,
        }
    }
}

/// Recognised single-element immittances.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Resistor(Ratio),
    Inductor(Ratio),
    Capacitor(Ratio),
}

#[derive(Debug, Clone)]
pub struct Immittance {
    kind: ImmittanceKind,
    value: Ratio,
}

fn check_s_only(value: &Ratio) -> Result<()> {
    if let Some(bad) = value
        .free_symbols()
        .into_iter()
        .find(|v| cas::RESERVED.contains(&v.as_str()) && v != cas::S && v != cas::EPSILON)
    {
        return Err(SymnodalError::DomainInvariant {
            domain: "immittance",
            symbol: bad,
            expr: value.to_string(),
        });
    }
    Ok(())
}

impl Immittance {
    pub fn impedance(value: Ratio) -> Result<Self> {
        check_s_only(&value)?;
        Ok(Self {
            kind: ImmittanceKind::Impedance,
            value,
        })
    }

    pub fn admittance(value: Ratio) -> Result<Self> {
        check_s_only(&value)?;
        Ok(Self {
            kind: ImmittanceKind::Admittance,
            value,
        })
    }

    pub fn resistance(r: Ratio) -> Result<Self> {
        Self::impedance(r)
    }

    pub fn conductance(g: Ratio) -> Result<Self> {
        Self::admittance(g)
    }

    /// `Z = s·L`.
    pub fn inductance(l: Ratio) -> Result<Self> {
        Self::impedance(Ratio::symbol(cas::S).mul(&l))
    }

    /// `Y = s·C`.
    pub fn capacitance(c: Ratio) -> Result<Self> {
        Self::admittance(Ratio::symbol(cas::S).mul(&c))
    }

    /// From a Laplace or constant expression tagged as an impedance or admittance.
    pub fn from_expr(e: &Expr) -> Result<Self> {
        let value = match e.domain() {
            Domain::Laplace | Domain::Constant => e.ratio(),
            _ => None,
        }
        .ok_or_else(|| {
            SymnodalError::IncompatibleOperands(format!(
                "{} is not a rational function of s",
                e
            ))
        })?;
        match e.quantity() {
            Quantity::Admittance => Self::admittance(value),
            Quantity::Impedance | Quantity::Undefined => Self::impedance(value),
            q => Err(SymnodalError::IncompatibleOperands(format!(
                "a {} is not an immittance",
                q.name()
            ))),
        }
    }

    pub fn kind(&self) -> ImmittanceKind {
        self.kind
    }

    /// Stored value in its own kind.
    pub fn value(&self) -> &Ratio {
        &self.value
    }

    pub fn z(&self) -> Result<Ratio> {
        match self.kind {
            ImmittanceKind::Impedance => Ok(self.value.clone()),
            ImmittanceKind::Admittance => self.value.inv(),
        }
    }

    pub fn y(&self) -> Result<Ratio> {
        match self.kind {
            ImmittanceKind::Admittance => Ok(self.value.clone()),
            ImmittanceKind::Impedance => self.value.inv(),
        }
    }

    /// Same element expressed as the reciprocal immittance.
    pub fn invert(&self) -> Result<Self> {
        Ok(Self {
            kind: match self.kind {
                ImmittanceKind::Impedance => ImmittanceKind::Admittance,
                ImmittanceKind::Admittance => ImmittanceKind::Impedance,
            },
            value: self.value.inv()?,
        })
    }

    pub fn series(&self, other: &Immittance) -> Result<Self> {
        Self::impedance(self.z()?.add(&other.z()?))
    }

    pub fn parallel(&self, other: &Immittance) -> Result<Self> {
        Self::admittance(self.y()?.add(&other.y()?))
    }

    pub fn at_s(&self, s: &Ratio) -> Result<Ratio> {
        self.value.subs(cas::S, s)
    }

    pub fn at_omega(&self, omega: &Omega) -> Result<Ratio> {
        self.at_s(&omega.jw())
    }

    /// Value at DC; a pole at `s = 0` is an error.
    pub fn at_dc(&self) -> Result<Ratio> {
        self.at_s(&Ratio::zero()).map_err(|_| {
            SymnodalError::Algebra(format!("{} has a pole at DC", self))
        })
    }

    /// Recognises a pure resistor, inductor or capacitor.
    pub fn as_component(&self) -> Option<Element> {
        let z = self.z().ok()?;
        let y = self.y().ok()?;
        if !z.contains(cas::S) {
            return Some(Element::Resistor(z));
        }
        let s = Ratio::symbol(cas::S);
        let l = z.div(&s).ok()?;
        if !l.contains(cas::S) {
            return Some(Element::Inductor(l));
        }
        let c = y.div(&s).ok()?;
        if !c.contains(cas::S) {
            return Some(Element::Capacitor(c));
        }
        None
    }

    pub fn to_expr(&self) -> Result<Expr> {
        Ok(Expr::laplace_ratio(self.value.clone())?.with_quantity(self.kind.quantity()))
    }
}

impl PartialEq for Immittance {
    fn eq(&self, other: &Self) -> bool {
        match (self.z(), other.z()) {
            (Ok(a), Ok(b)) => a == b,
            _ => self.kind == other.kind && self.value == other.value,
        }
    }
}

impl fmt::Display for Immittance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str) -> Ratio {
        Ratio::symbol(name)
    }

    #[test]
    fn test_series_and_parallel_resistors() {
        let r1 = Immittance::resistance(sym("R1")).unwrap();
        let r2 = Immittance::resistance(sym("R2")).unwrap();
        let series = r1.series(&r2).unwrap();
        assert_eq!(series.z().unwrap(), sym("R1").add(&sym("R2")));
        let parallel = r1.parallel(&r2).unwrap();
        let expected = sym("R1")
            .mul(&sym("R2"))
            .div(&sym("R1").add(&sym("R2")))
            .unwrap();
        assert_eq!(parallel.z().unwrap(), expected);
    }

    #[test]
    fn test_conductances_add_in_parallel() {
        let g1 = Immittance::conductance(sym("G1")).unwrap();
        let g2 = Immittance::conductance(sym("G2")).unwrap();
        assert_eq!(g1.parallel(&g2).unwrap().y().unwrap(), sym("G1").add(&sym("G2")));
    }

    #[test]
    fn test_recognises_elements() {
        let l = Immittance::inductance(sym("L")).unwrap();
        assert_eq!(l.as_component(), Some(Element::Inductor(sym("L"))));
        let c = Immittance::capacitance(Ratio::real(2.0)).unwrap();
        assert_eq!(c.invert().unwrap().as_component(), Some(Element::Capacitor(Ratio::real(2.0))));
        let r = Immittance::resistance(Ratio::real(5.0)).unwrap();
        assert_eq!(r.as_component(), Some(Element::Resistor(Ratio::real(5.0))));
    }

    #[test]
    fn test_capacitor_has_no_dc_impedance() {
        let c = Immittance::capacitance(sym("C")).unwrap();
        assert!(c.invert().unwrap().at_dc().is_err());
        assert!(c.at_dc().unwrap().is_zero());
    }

    #[test]
    fn test_rejects_time_variable() {
        assert!(Immittance::impedance(sym("t")).is_err());
    }
}
