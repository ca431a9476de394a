//! Two-port networks in chain (ABCD) form.
//!
//! `V1 = A·V2 + B·I2` and `I1 = C·V2 + D·I2`, with `I2` leaving port 2.
//! The other parameter sets take both port currents as entering and are
//! derived on demand; the derivation divides by one pivot entry.

use std::fmt;

use tracing::warn;

use crate::cas::{Ratio, C64};
use crate::error::{Result, SymnodalError};

/// Two-port parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Chain parameters.
    A,
    /// Inverse chain parameters.
    B,
    /// Inverse hybrid parameters.
    G,
    /// Hybrid parameters.
    H,
    Y,
    Z,
}

impl ParamKind {
    pub fn from_char(c: char) -> Option<Self> {
        Some(match c.to_ascii_uppercase() {
            'A' => ParamKind::A,
            'B' => ParamKind::B,
            'G' => ParamKind::G,
            'H' => ParamKind::H,
            'Y' => ParamKind::Y,
            'Z' => ParamKind::Z,
            _ => return None,
        })
    }

    pub fn as_char(self) -> char {
        match self {
            ParamKind::A => 'A',
            ParamKind::B => 'B',
            ParamKind::G => 'G',
            ParamKind::H => 'H',
            ParamKind::Y => 'Y',
            ParamKind::Z => 'Z',
        }
    }
}

pub type Matrix2 = [[Ratio; 2]; 2];

/// A parameter matrix derived from the chain form.
#[derive(Debug, Clone)]
pub struct Derived {
    pub kind: ParamKind,
    pub m: Matrix2,
    /// The pivot was symbolic and may vanish for some parameter values.
    pub dodgy: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TwoPort {
    pub a: Ratio,
    pub b: Ratio,
    pub c: Ratio,
    pub d: Ratio,
}

fn det2(m: &Matrix2) -> Ratio {
    m[0][0].mul(&m[1][1]).sub(&m[0][1].mul(&m[1][0]))
}

/// Checks a pivot: zero is an error, a symbolic value is flagged.
fn pivot(p: &Ratio, target: ParamKind, what: &str) -> Result<(Ratio, bool)> {
    if p.is_zero() {
        return Err(SymnodalError::DegenerateTwoPort {
            target: target.as_char(),
            reason: format!("{} is zero", what),
        });
    }
    let dodgy = p.as_constant().is_none();
    if dodgy {
        warn!(
            params = %target.as_char(),
            pivot = %p,
            "two-port conversion divides by a symbolic {}, result may be degenerate",
            what
        );
    }
    Ok((p.inv()?, dodgy))
}

impl TwoPort {
    pub fn new(a: Ratio, b: Ratio, c: Ratio, d: Ratio) -> Self {
        Self { a, b, c, d }
    }

    pub fn identity() -> Self {
        Self::new(Ratio::one(), Ratio::zero(), Ratio::zero(), Ratio::one())
    }

    pub fn series_impedance(z: Ratio) -> Self {
        Self::new(Ratio::one(), z, Ratio::zero(), Ratio::one())
    }

    pub fn shunt_admittance(y: Ratio) -> Self {
        Self::new(Ratio::one(), Ratio::zero(), y, Ratio::one())
    }

    /// Ideal transformer with `V1 = k·V2` and `I1 = I2 / k`.
    pub fn transformer(k: Ratio) -> Result<Self> {
        let inv = k.inv()?;
        Ok(Self::new(k, Ratio::zero(), Ratio::zero(), inv))
    }

    /// Ideal gyrator with gyration resistance `r`.
    pub fn gyrator(r: Ratio) -> Result<Self> {
        let g = r.inv()?;
        Ok(Self::new(Ratio::zero(), r, g, Ratio::zero()))
    }

    /// Lossless line of characteristic impedance `z0` and delay `tau`, at
    /// angular frequency `omega`.
    pub fn transmission_line(z0: f64, tau: f64, omega: f64) -> Self {
        let gl = C64::new(0.0, omega * tau);
        let (ch, sh) = (gl.cosh(), gl.sinh());
        Self::new(
            Ratio::constant(ch),
            Ratio::constant(sh * z0),
            Ratio::constant(sh / z0),
            Ratio::constant(ch),
        )
    }

    pub fn as_matrix(&self) -> Matrix2 {
        [
            [self.a.clone(), self.b.clone()],
            [self.c.clone(), self.d.clone()],
        ]
    }

    /// `AD − BC`; one for reciprocal networks.
    pub fn determinant(&self) -> Ratio {
        det2(&self.as_matrix())
    }

    /// `self` followed by `rhs`.
    pub fn cascade(&self, rhs: &TwoPort) -> TwoPort {
        TwoPort {
            a: self.a.mul(&rhs.a).add(&self.b.mul(&rhs.c)),
            b: self.a.mul(&rhs.b).add(&self.b.mul(&rhs.d)),
            c: self.c.mul(&rhs.a).add(&self.d.mul(&rhs.c)),
            d: self.c.mul(&rhs.b).add(&self.d.mul(&rhs.d)),
        }
    }

    /// Series connection: impedance matrices add.
    pub fn series(&self, rhs: &TwoPort) -> Result<TwoPort> {
        let (za, zb) = (self.to_params(ParamKind::Z)?, rhs.to_params(ParamKind::Z)?);
        TwoPort::from_params(ParamKind::Z, &add2(&za.m, &zb.m))
    }

    /// Parallel connection: admittance matrices add.
    pub fn parallel(&self, rhs: &TwoPort) -> Result<TwoPort> {
        let (ya, yb) = (self.to_params(ParamKind::Y)?, rhs.to_params(ParamKind::Y)?);
        TwoPort::from_params(ParamKind::Y, &add2(&ya.m, &yb.m))
    }

    /// Derives another parameter set.
    pub fn to_params(&self, kind: ParamKind) -> Result<Derived> {
        let det = self.determinant();
        let (a, b, c, d) = (&self.a, &self.b, &self.c, &self.d);
        let (m, dodgy) = match kind {
            ParamKind::A => (self.as_matrix(), false),
            ParamKind::B => {
                let (k, dodgy) = pivot(&det, kind, "determinant AD - BC")?;
                (
                    [
                        [d.mul(&k), b.neg().mul(&k)],
                        [c.neg().mul(&k), a.mul(&k)],
                    ],
                    dodgy,
                )
            }
            ParamKind::Z => {
                let (k, dodgy) = pivot(c, kind, "C")?;
                ([[a.mul(&k), det.mul(&k)], [k.clone(), d.mul(&k)]], dodgy)
            }
            ParamKind::Y => {
                let (k, dodgy) = pivot(b, kind, "B")?;
                ([[d.mul(&k), det.neg().mul(&k)], [k.neg(), a.mul(&k)]], dodgy)
            }
            ParamKind::H => {
                let (k, dodgy) = pivot(d, kind, "D")?;
                ([[b.mul(&k), det.mul(&k)], [k.neg(), c.mul(&k)]], dodgy)
            }
            ParamKind::G => {
                let (k, dodgy) = pivot(a, kind, "A")?;
                ([[c.mul(&k), det.neg().mul(&k)], [k.clone(), b.mul(&k)]], dodgy)
            }
        };
        Ok(Derived { kind, m, dodgy })
    }

    /// Builds the chain form from another parameter set.
    pub fn from_params(kind: ParamKind, m: &Matrix2) -> Result<TwoPort> {
        let det = det2(m);
        let [[p11, p12], [p21, p22]] = m;
        let chain = |k: ParamKind| -> Result<Ratio> {
            let what = match k {
                ParamKind::G => "g21",
                ParamKind::H => "h21",
                ParamKind::Y => "y21",
                ParamKind::Z => "z21",
                _ => "p21",
            };
            Ok(pivot(p21, ParamKind::A, what)?.0)
        };
        Ok(match kind {
            ParamKind::A => TwoPort::new(p11.clone(), p12.clone(), p21.clone(), p22.clone()),
            ParamKind::B => {
                let k = pivot(&det, ParamKind::A, "determinant of the B matrix")?.0;
                TwoPort::new(p22.mul(&k), p12.neg().mul(&k), p21.neg().mul(&k), p11.mul(&k))
            }
            ParamKind::Z => {
                let k = chain(kind)?;
                TwoPort::new(p11.mul(&k), det.mul(&k), k.clone(), p22.mul(&k))
            }
            ParamKind::Y => {
                let k = chain(kind)?.neg();
                TwoPort::new(p22.mul(&k), k.clone(), det.mul(&k), p11.mul(&k))
            }
            ParamKind::H => {
                let k = chain(kind)?.neg();
                TwoPort::new(det.mul(&k), p11.mul(&k), p22.mul(&k), k.clone())
            }
            ParamKind::G => {
                let k = chain(kind)?;
                TwoPort::new(k.clone(), p22.mul(&k), p11.mul(&k), det.mul(&k))
            }
        })
    }
}

fn add2(x: &Matrix2, y: &Matrix2) -> Matrix2 {
    [
        [x[0][0].add(&y[0][0]), x[0][1].add(&y[0][1])],
        [x[1][0].add(&y[1][0]), x[1][1].add(&y[1][1])],
    ]
}

impl fmt::Display for TwoPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[[{}, {}], [{}, {}]]", self.a, self.b, self.c, self.d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sym(name: &str) -> Ratio {
        Ratio::symbol(name)
    }

    #[test]
    fn test_cascade_of_series_impedances_adds() {
        let t = TwoPort::series_impedance(sym("Z1")).cascade(&TwoPort::series_impedance(sym("Z2")));
        assert_eq!(t.b, sym("Z1").add(&sym("Z2")));
        assert_eq!(t.determinant(), Ratio::one());
    }

    #[test]
    fn test_params_round_trip() {
        let t = TwoPort::series_impedance(Ratio::real(2.0))
            .cascade(&TwoPort::shunt_admittance(Ratio::real(0.5)));
        for kind in [ParamKind::A, ParamKind::B, ParamKind::G, ParamKind::H, ParamKind::Y, ParamKind::Z] {
            let d = t.to_params(kind).unwrap();
            assert!(!d.dodgy);
            assert_eq!(TwoPort::from_params(kind, &d.m).unwrap(), t);
        }
    }

    #[test]
    fn test_z_params_of_tee() {
        // 1 ohm series, 2 S shunt, 1 ohm series
        let t = TwoPort::series_impedance(Ratio::real(1.0))
            .cascade(&TwoPort::shunt_admittance(Ratio::real(2.0)))
            .cascade(&TwoPort::series_impedance(Ratio::real(1.0)));
        let z = t.to_params(ParamKind::Z).unwrap().m;
        assert_abs_diff_eq!(z[0][0].as_real().unwrap(), 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(z[0][1].as_real().unwrap(), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(z[1][0].as_real().unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_series_element_has_no_z_matrix() {
        let err = TwoPort::series_impedance(sym("R")).to_params(ParamKind::Z).unwrap_err();
        assert!(matches!(err, SymnodalError::DegenerateTwoPort { target: 'Z', .. }));
    }

    #[test]
    fn test_symbolic_pivot_is_dodgy() {
        let d = TwoPort::shunt_admittance(sym("Y")).to_params(ParamKind::Z).unwrap();
        assert!(d.dodgy);
    }

    #[test]
    fn test_half_wave_line_inverts() {
        let t = TwoPort::transmission_line(50.0, 1.0, std::f64::consts::PI);
        let a = t.a.as_constant().unwrap();
        assert_abs_diff_eq!(a.re, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(t.b.as_constant().unwrap().norm(), 0.0, epsilon = 1e-9);
    }
}
