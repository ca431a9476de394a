//! Transforms between representation domains.
//!
//! Laplace and Z transforms are unilateral. Inverse transforms expand the
//! rational part in partial fractions around the poles; a polynomial part
//! becomes impulses.

use tracing::debug;

use super::domain::{Domain, Omega, Quantity};
use super::expression::{Expr, Value};
use crate::cas::signal::{exp_ratio, ExpTerm, Impulse};
use crate::cas::{self, series_div, Delayed, Family, Ratio, Root, Signal, Support, UPoly, C64};
use crate::error::{Result, SymnodalError};

fn factorial(n: u32) -> f64 {
    (1..=n).map(f64::from).product()
}

fn binomial(n: u32, k: u32) -> f64 {
    (0..k).fold(1.0, |acc, i| acc * f64::from(n - i) / f64::from(i + 1))
}

fn no_transform(from: Domain, to: &str) -> SymnodalError {
    SymnodalError::IncompatibleOperands(format!("no {} transform for a {} expression", to, from))
}

fn noise_refused(what: &str) -> SymnodalError {
    SymnodalError::IncompatibleOperands(format!(
        "a noise spectral density has no {} representation; use rms() or asd() instead",
        what
    ))
}

// ---------------------------------------------------------------------------
// Continuous time <-> Laplace
// ---------------------------------------------------------------------------

/// Unilateral Laplace transform of a continuous signal.
pub fn laplace_of(x: &Signal) -> Result<Delayed> {
    let s = Ratio::symbol(cas::S);
    let mut out = Delayed::zero();
    for t in x.terms() {
        let start = match t.support {
            Support::Eternal => 0.0,
            Support::Causal(at) => at.max(0.0),
        };
        let growth = exp_ratio(&t.rate, start)?;
        let pole = s.sub(&t.rate);
        let mut sum = Ratio::zero();
        for k in 0..=t.power {
            let weight = binomial(t.power, k) * start.powi((t.power - k) as i32) * factorial(k);
            if weight == 0.0 {
                continue;
            }
            sum = sum.add(&pole.powi(-(k as i32 + 1))?.scale(C64::new(weight, 0.0)));
        }
        out = out.add(&Delayed::delayed(t.coeff.mul(&growth).mul(&sum), start));
    }
    for d in x.impulses() {
        if d.at < 0.0 {
            continue;
        }
        out = out.add(&Delayed::delayed(d.coeff.mul(&s.powi(d.order as i32)?), d.at));
    }
    Ok(out)
}

/// Denominator polynomial with the pole removed, `D(x) / (x − p)^m`.
fn deflate(den: &UPoly, root: &Root, roots: &[Root]) -> Result<UPoly> {
    if den.is_numeric() {
        let others: Vec<(C64, u32)> = roots
            .iter()
            .filter(|r| !std::ptr::eq(*r, root))
            .filter_map(|r| r.numeric().map(|v| (v, r.multiplicity)))
            .collect();
        if others.len() + 1 == roots.len() {
            return Ok(UPoly::from_roots(den.var(), den.leading(), &others));
        }
    }
    let factor = UPoly::new(den.var(), vec![root.value.neg(), Ratio::one()]);
    let mut out = den.clone();
    for _ in 0..root.multiplicity {
        out = out.div_rem(&factor)?.0;
    }
    Ok(out)
}

/// Partial-fraction expansion of a proper rational `num / den` in one variable.
///
/// Returns `(pole, order, coefficient)` for each `c / (x − p)^order`.
pub fn expand(num: &UPoly, den: &UPoly) -> Result<Vec<(Ratio, u32, Ratio)>> {
    let roots = den.roots()?;
    let mut out = Vec::new();
    for root in &roots {
        let rest = deflate(den, root, &roots)?;
        let m = root.multiplicity as usize;
        let coeffs = series_div(&num.taylor_shift(&root.value), &rest.taylor_shift(&root.value), m)?;
        for (k, c) in coeffs.into_iter().enumerate() {
            if c.is_zero() {
                continue;
            }
            out.push((root.value.clone(), (m - k) as u32, c));
        }
    }
    Ok(out)
}

/// Splits a ratio in `var` into polynomial quotient and proper remainder.
pub fn split_proper(r: &Ratio, var: &str) -> Result<(UPoly, UPoly, UPoly)> {
    let num = UPoly::from_poly(r.num(), var);
    let den = UPoly::from_poly(r.den(), var);
    let (q, rem) = num.div_rem(&den)?;
    Ok((q, rem, den))
}

/// Causal inverse Laplace transform of a delayed sum.
pub fn inverse_laplace(x: &Delayed) -> Result<Signal> {
    let mut out = Signal::zero(Family::Continuous, cas::T);
    for (delay, r) in x.parts() {
        let mut part = Signal::zero(Family::Continuous, cas::T);
        let (q, rem, den) = split_proper(r, cas::S)?;
        for (m, c) in q.coeffs().iter().enumerate() {
            part.push_impulse(Impulse {
                coeff: c.clone(),
                order: m as u32,
                at: 0.0,
            });
        }
        if !rem.is_zero() {
            for (pole, order, c) in expand(&rem, &den)? {
                part.push_term(ExpTerm {
                    coeff: c.scale(C64::new(1.0 / factorial(order - 1), 0.0)),
                    power: order - 1,
                    rate: pole,
                    support: Support::Causal(0.0),
                });
            }
        }
        out = out.add(&part.delay(*delay)?)?;
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Discrete time <-> Z
// ---------------------------------------------------------------------------

/// `Z{m^k r^m u[m]} = (−z d/dz)^k [z / (z − r)]`.
fn z_of_power(k: u32, rate: &Ratio) -> Result<Ratio> {
    let z = Ratio::symbol(cas::Z);
    let mut x = z.div(&z.sub(rate))?;
    for _ in 0..k {
        x = x.derivative(cas::Z).mul(&z).neg();
    }
    Ok(x)
}

/// Unilateral Z transform of a discrete-time signal.
pub fn zt_of(x: &Signal) -> Result<Ratio> {
    let z = Ratio::symbol(cas::Z);
    let mut out = Ratio::zero();
    for t in x.terms() {
        let start = match t.support {
            Support::Eternal => 0.0,
            Support::Causal(at) => at.max(0.0).ceil(),
        };
        let shift = start as i32;
        let mut sum = Ratio::zero();
        for k in 0..=t.power {
            let weight = binomial(t.power, k) * start.powi((t.power - k) as i32);
            if weight == 0.0 {
                continue;
            }
            sum = sum.add(&z_of_power(k, &t.rate)?.scale(C64::new(weight, 0.0)));
        }
        let scaled = t.coeff.mul(&t.rate.powi(shift)?).mul(&sum);
        out = out.add(&scaled.mul(&z.powi(-shift)?));
    }
    for d in x.impulses() {
        out = out.add(&d.coeff.mul(&z.powi(-(d.at.round() as i32))?));
    }
    Ok(out)
}

/// Coefficients of the falling factorial `n (n − 1) … (n − m + 1)`, lowest power first.
fn falling_factorial(m: u32) -> Vec<f64> {
    let mut c = vec![1.0];
    for i in 0..m {
        let mut next = vec![0.0; c.len() + 1];
        for (p, v) in c.iter().enumerate() {
            next[p + 1] += v;
            next[p] -= v * f64::from(i);
        }
        c = next;
    }
    c
}

/// Causal inverse Z transform, expanding `X(z) / z`.
pub fn izt_of(x: &Ratio) -> Result<Signal> {
    let mut out = Signal::zero(Family::Discrete, cas::N);
    let over_z = x.div(&Ratio::symbol(cas::Z))?;
    let (q, rem, den) = split_proper(&over_z, cas::Z)?;
    // z·q_m·z^m is an impulse at n = −(m + 1)
    for (m, c) in q.coeffs().iter().enumerate() {
        out.push_impulse(Impulse {
            coeff: c.clone(),
            order: 0,
            at: -(m as f64 + 1.0),
        });
    }
    if rem.is_zero() {
        return Ok(out);
    }
    for (pole, order, c) in expand(&rem, &den)? {
        if pole.is_zero() {
            out.push_impulse(Impulse {
                coeff: c,
                order: 0,
                at: f64::from(order - 1),
            });
            continue;
        }
        let j = order - 1;
        let scale = c.mul(&pole.powi(-(j as i32))?);
        for (p, a) in falling_factorial(j).into_iter().enumerate() {
            if a == 0.0 {
                continue;
            }
            out.push_term(ExpTerm {
                coeff: scale.scale(C64::new(a / factorial(j), 0.0)),
                power: p as u32,
                rate: pole.clone(),
                support: Support::Causal(0.0),
            });
        }
    }
    Ok(out)
}

/// Sample of a discrete signal at an integer index, impulses included.
fn sample(x: &Signal, n: i64) -> Result<Ratio> {
    let mut v = x.value_symbolic(n as f64)?;
    for d in x.impulses() {
        if d.order == 0 && d.at.round() as i64 == n {
            v = v.add(&d.coeff);
        }
    }
    Ok(v)
}

/// `Σ_m x[m] · W^{±m·var}` over one period.
fn dft_core(x: &Signal, size: usize, sign: f64, var: &str) -> Result<Signal> {
    let mut out = Signal::zero(Family::Discrete, var);
    for m in 0..size {
        let c = sample(x, m as i64)?;
        let angle = sign * 2.0 * std::f64::consts::PI * m as f64 / size as f64;
        out.push_term(ExpTerm {
            coeff: c,
            power: 0,
            rate: Ratio::constant(C64::from_polar(1.0, angle)),
            support: Support::Eternal,
        });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Expression-level conversions
// ---------------------------------------------------------------------------

fn continuous_constant(c: &Ratio) -> Signal {
    Signal::constant(Family::Continuous, cas::T, c.clone())
}

impl Expr {
    fn rewrap(&self, value: Value) -> Result<Expr> {
        Expr::new(self.quantity(), value)
    }

    /// Continuous time-domain representation.
    pub fn time(&self) -> Result<Expr> {
        let signal = match self.value() {
            Value::Time(_) => return Ok(self.clone()),
            Value::Constant(c) => continuous_constant(c),
            Value::Laplace(d) => inverse_laplace(d)?,
            Value::Fourier(d) => {
                let f = Ratio::symbol(cas::S).scale(C64::new(0.0, -0.5 / std::f64::consts::PI));
                inverse_laplace(&d.subs(cas::F, &f)?)?
            }
            Value::AngularFourier(d) => {
                let w = Ratio::symbol(cas::S).scale(C64::new(0.0, -1.0));
                inverse_laplace(&d.subs(cas::OMEGA, &w)?)?
            }
            Value::Phasor { omega, value } => {
                let jw = omega.jw();
                let half = C64::new(0.5, 0.0);
                let mut s = Signal::zero(Family::Continuous, cas::T);
                for (coeff, rate) in [
                    (value.scale(half), jw.clone()),
                    (value.conj().scale(half), jw.neg()),
                ] {
                    s.push_term(ExpTerm {
                        coeff,
                        power: 0,
                        rate,
                        support: Support::Eternal,
                    });
                }
                s
            }
            Value::NoiseF { .. } | Value::NoiseOmega { .. } => return Err(noise_refused("time")),
            other => return Err(no_transform(other.domain(), "continuous-time")),
        };
        self.rewrap(Value::Time(signal))
    }

    /// Unilateral Laplace representation.
    pub fn laplace(&self) -> Result<Expr> {
        let value = match self.value() {
            Value::Laplace(_) => return Ok(self.clone()),
            Value::Time(s) => laplace_of(s)?,
            Value::Constant(c) => Delayed::from_ratio(c.div(&Ratio::symbol(cas::S))?),
            Value::Fourier(d) => {
                let f = Ratio::symbol(cas::S).scale(C64::new(0.0, -0.5 / std::f64::consts::PI));
                d.subs(cas::F, &f)?
            }
            Value::AngularFourier(d) => {
                d.subs(cas::OMEGA, &Ratio::symbol(cas::S).scale(C64::new(0.0, -1.0)))?
            }
            Value::Phasor { .. } => match self.time()?.value() {
                Value::Time(s) => laplace_of(s)?,
                _ => return Err(no_transform(Domain::Phasor, "Laplace")),
            },
            Value::NoiseF { .. } | Value::NoiseOmega { .. } => return Err(noise_refused("Laplace")),
            other => return Err(no_transform(other.domain(), "Laplace")),
        };
        self.rewrap(Value::Laplace(value))
    }

    /// Checks the Fourier integral exists for a Laplace-domain value.
    fn require_fourier(d: &Delayed) -> Result<()> {
        for (_, r) in d.parts() {
            for p in super::rational::roots_in(r.den(), cas::S)? {
                match p.numeric() {
                    Some(v) if v.re < 0.0 => {}
                    _ => {
                        return Err(SymnodalError::IncompatibleOperands(format!(
                            "Fourier transform needs poles in the open left half plane, {} has a pole at {}",
                            r, p.value
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn via_laplace(&self, var: &str, s_equiv: Ratio) -> Result<Delayed> {
        let d = match self.value() {
            Value::Time(x) => {
                if !x.is_causal() {
                    return Err(SymnodalError::IncompatibleOperands(
                        "Fourier transform of a non-causal signal".to_string(),
                    ));
                }
                laplace_of(x)?
            }
            Value::Laplace(d) => d.clone(),
            Value::Constant(c) if c.is_zero() => Delayed::zero(),
            other => return Err(no_transform(other.domain(), "Fourier")),
        };
        Expr::require_fourier(&d)?;
        debug!(var, "Fourier transform via the Laplace axis");
        d.subs(cas::S, &s_equiv)
    }

    /// Linear-frequency Fourier representation.
    pub fn fourier(&self) -> Result<Expr> {
        let value = match self.value() {
            Value::Fourier(_) => return Ok(self.clone()),
            Value::AngularFourier(d) => d.subs(
                cas::OMEGA,
                &Ratio::symbol(cas::F).scale(C64::new(2.0 * std::f64::consts::PI, 0.0)),
            )?,
            _ => self.via_laplace(cas::F, cas::j2pif())?,
        };
        self.rewrap(Value::Fourier(value))
    }

    /// Angular-frequency Fourier representation.
    pub fn angular_fourier(&self) -> Result<Expr> {
        let value = match self.value() {
            Value::AngularFourier(_) => return Ok(self.clone()),
            Value::Fourier(d) => d.subs(
                cas::F,
                &Ratio::symbol(cas::OMEGA).scale(C64::new(0.5 / std::f64::consts::PI, 0.0)),
            )?,
            _ => self.via_laplace(cas::OMEGA, cas::jomega())?,
        };
        self.rewrap(Value::AngularFourier(value))
    }

    /// Phasor at `omega`: a transfer function is evaluated at `jω`, an eternal
    /// sinusoid gives its complex amplitude.
    pub fn phasor(&self, omega: &Omega) -> Result<Expr> {
        let value = match self.value() {
            Value::Phasor { omega: w, value } if w == omega => value.clone(),
            Value::Constant(c) => c.clone(),
            Value::Laplace(d) => {
                let r = d.as_ratio().ok_or_else(|| {
                    SymnodalError::IncompatibleOperands(
                        "phasor of a delayed Laplace expression".to_string(),
                    )
                })?;
                r.subs(cas::S, &omega.jw())?
            }
            Value::AngularFourier(d) => d
                .as_ratio()
                .ok_or_else(|| no_transform(Domain::AngularFourier, "phasor"))?
                .subs(cas::OMEGA, omega.value())?,
            Value::Time(x) => {
                let jw = omega.jw();
                let mut amplitude = Ratio::zero();
                for t in x.terms() {
                    if t.power != 0 || t.support != Support::Eternal {
                        return Err(SymnodalError::IncompatibleOperands(format!(
                            "{} is not a steady-state sinusoid",
                            x
                        )));
                    }
                    if t.rate == jw {
                        amplitude = amplitude.add(&t.coeff.scale(C64::new(2.0, 0.0)));
                    } else if t.rate != jw.neg() {
                        return Err(SymnodalError::IncompatibleOperands(format!(
                            "{} has components away from omega = {}",
                            x, omega
                        )));
                    }
                }
                amplitude
            }
            other => return Err(no_transform(other.domain(), "phasor")),
        };
        self.rewrap(Value::Phasor {
            omega: omega.clone(),
            value,
        })
    }

    /// Z transform of a discrete-time sequence.
    pub fn zt(&self) -> Result<Expr> {
        let value = match self.value() {
            Value::Z(_) => return Ok(self.clone()),
            Value::DiscreteTime(x) => zt_of(x)?,
            Value::Constant(c) => {
                let z = Ratio::symbol(cas::Z);
                c.mul(&z.div(&z.sub(&Ratio::one()))?)
            }
            other => return Err(no_transform(other.domain(), "Z")),
        };
        self.rewrap(Value::Z(value))
    }

    /// Inverse Z transform.
    pub fn izt(&self) -> Result<Expr> {
        let value = match self.value() {
            Value::DiscreteTime(_) => return Ok(self.clone()),
            Value::Z(r) => izt_of(r)?,
            Value::Constant(c) => Signal::impulse(Family::Discrete, cas::N, c.clone(), 0, 0.0),
            other => return Err(no_transform(other.domain(), "inverse Z")),
        };
        self.rewrap(Value::DiscreteTime(value))
    }

    /// `size`-point discrete Fourier transform of `x[0..size]`.
    pub fn dft(&self, size: usize) -> Result<Expr> {
        let x = match self.value() {
            Value::DiscreteTime(x) => x,
            other => return Err(no_transform(other.domain(), "DFT")),
        };
        if size == 0 {
            return Err(SymnodalError::IncompatibleOperands("DFT of length zero".to_string()));
        }
        self.rewrap(Value::DiscreteFrequency(dft_core(x, size, -1.0, cas::K)?))
    }

    /// Inverse of [`Expr::dft`].
    pub fn idft(&self, size: usize) -> Result<Expr> {
        let x = match self.value() {
            Value::DiscreteFrequency(x) => x,
            other => return Err(no_transform(other.domain(), "inverse DFT")),
        };
        if size == 0 {
            return Err(SymnodalError::IncompatibleOperands("DFT of length zero".to_string()));
        }
        let inv = Ratio::real(1.0 / size as f64);
        self.rewrap(Value::DiscreteTime(dft_core(x, size, 1.0, cas::N)?.scale(&inv)))
    }

    /// Discrete-time Fourier transform sampled at normalised frequencies
    /// (cycles per sample).
    pub fn dtft_response(&self, freqs: &[f64]) -> Result<Vec<C64>> {
        let z = self.zt()?;
        let r = z
            .ratio()
            .ok_or_else(|| no_transform(self.domain(), "DTFT"))?;
        freqs
            .iter()
            .map(|f| {
                let zf = C64::from_polar(1.0, 2.0 * std::f64::consts::PI * f);
                r.eval_at(cas::Z, zf)?.as_constant().ok_or_else(|| {
                    SymnodalError::Algebra(format!("DTFT of {} has free symbols", r))
                })
            })
            .collect()
    }

    /// Canonical transform to the conjugate domain.
    pub fn conjugate(&self) -> Result<Expr> {
        match self.domain().conjugate() {
            Some(Domain::Laplace) => self.laplace(),
            Some(Domain::Time) => self.time(),
            Some(Domain::DiscreteTime) => self.izt(),
            Some(Domain::Z) => self.zt(),
            _ => Err(no_transform(self.domain(), "conjugate-domain")),
        }
    }

    /// `X·e^{-sT}`; the expression must be in the Laplace domain.
    pub fn delay(&self, by: f64) -> Result<Expr> {
        match self.value() {
            Value::Laplace(d) => self.rewrap(Value::Laplace(d.mul(&Delayed::delayed(Ratio::one(), by)))),
            Value::Time(x) => self.rewrap(Value::Time(x.delay(by)?)),
            Value::DiscreteTime(x) => self.rewrap(Value::DiscreteTime(x.delay(by)?)),
            other => Err(no_transform(other.domain(), "delay")),
        }
    }

    /// Voltage or current step of height `self` applied at `t = 0`.
    pub fn step_response_of(h: &Expr) -> Result<Expr> {
        let one_over_s = Expr::laplace_ratio(Ratio::symbol(cas::S).inv()?)?;
        let y = (&h.laplace()? * &one_over_s)?;
        Ok(y.time()?.with_quantity(Quantity::Undefined))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::collections::HashMap;

    fn at(x: &Expr, t: f64) -> f64 {
        x.signal().unwrap().value_at(t, &HashMap::new()).unwrap().re
    }

    #[test]
    fn test_inverse_laplace_first_order() {
        let h = Expr::parse("1/(s + 2)", Domain::Laplace).unwrap();
        let x = h.time().unwrap();
        assert_abs_diff_eq!(at(&x, 0.5), (-1.0f64).exp(), epsilon = 1e-9);
        assert_abs_diff_eq!(at(&x, -0.5), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_laplace_repeated_pole() {
        let h = Expr::parse("1/(s + 1)^2", Domain::Laplace).unwrap();
        let x = h.time().unwrap();
        assert_abs_diff_eq!(at(&x, 2.0), 2.0 * (-2.0f64).exp(), epsilon = 1e-9);
    }

    #[test]
    fn test_repeated_pole_round_trip() {
        for text in ["1/(s + 1)^2", "1/(s + 1)^3", "(s + 2)/((s + 1)^2*(s + 3))"] {
            let h = Expr::parse(text, Domain::Laplace).unwrap();
            assert_eq!(h.time().unwrap().laplace().unwrap(), h, "{}", text);
        }
    }

    #[test]
    fn test_step_response() {
        let h = Expr::parse("1/(s + 1)", Domain::Laplace).unwrap();
        let y = Expr::step_response_of(&h).unwrap();
        for t in [0.1, 1.0, 3.0] {
            assert_abs_diff_eq!(at(&y, t), 1.0 - (-t).exp(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_laplace_round_trip_with_delay() {
        let h = Expr::parse("exp(-2*s)/(s + 3)", Domain::Laplace).unwrap();
        let back = h.time().unwrap().laplace().unwrap();
        assert_eq!(back, h);
        assert_abs_diff_eq!(at(&h.time().unwrap(), 1.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_laplace_of_ramp() {
        let x = Expr::parse("t*u(t)", Domain::Time).unwrap();
        assert_eq!(x.laplace().unwrap(), Expr::parse("1/s^2", Domain::Laplace).unwrap());
    }

    #[test]
    fn test_inverse_laplace_improper_gives_impulse() {
        let h = Expr::parse("(s + 2)/(s + 1)", Domain::Laplace).unwrap();
        let x = h.time().unwrap();
        let sig = x.signal().unwrap();
        assert_eq!(sig.impulses().len(), 1);
        assert_abs_diff_eq!(at(&x, 1.0), (-1.0f64).exp(), epsilon = 1e-9);
    }

    #[test]
    fn test_z_round_trip() {
        let x = Expr::parse("0.5^n*u(n)", Domain::DiscreteTime).unwrap();
        let z = x.zt().unwrap();
        assert_eq!(z, Expr::parse("z/(z - 0.5)", Domain::Z).unwrap());
        assert_eq!(z.izt().unwrap(), x);
    }

    #[test]
    fn test_izt_of_delay_is_impulse() {
        let z = Expr::parse("1/z^2", Domain::Z).unwrap();
        let x = z.izt().unwrap();
        let sig = x.signal().unwrap();
        assert_eq!(sig.impulses().len(), 1);
        assert_abs_diff_eq!(sig.impulses()[0].at, 2.0);
    }

    #[test]
    fn test_dft_of_impulse_is_flat() {
        let x = Expr::parse("delta(n)", Domain::DiscreteTime).unwrap();
        let big_x = x.dft(4).unwrap();
        for k in 0..4 {
            let v = big_x.signal().unwrap().value_at(k as f64, &HashMap::new()).unwrap();
            assert_abs_diff_eq!(v.re, 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(v.im, 0.0, epsilon = 1e-12);
        }
        let back = big_x.idft(4).unwrap();
        let v0 = back.signal().unwrap().value_at(0.0, &HashMap::new()).unwrap();
        let v1 = back.signal().unwrap().value_at(1.0, &HashMap::new()).unwrap();
        assert_abs_diff_eq!(v0.re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v1.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fourier_requires_stability() {
        let stable = Expr::parse("exp(-t)*u(t)", Domain::Time).unwrap();
        let f = stable.fourier().unwrap();
        assert_eq!(f.domain(), Domain::Fourier);
        let unstable = Expr::parse("exp(t)*u(t)", Domain::Time).unwrap();
        assert!(unstable.fourier().is_err());
    }

    #[test]
    fn test_phasor_time_round_trip() {
        let w = Omega::numeric(3.0);
        let p = Expr::ac(w.clone(), Ratio::constant(C64::new(0.0, -2.0))).unwrap();
        let x = p.time().unwrap();
        // -2j·e^{j3t} real part is 2·sin(3t)
        assert_abs_diff_eq!(at(&x, 0.2), 2.0 * (0.6f64).sin(), epsilon = 1e-9);
        assert_eq!(x.phasor(&w).unwrap().ratio().unwrap(), p.ratio().unwrap());
    }

    #[test]
    fn test_noise_refuses_time() {
        let n = Expr::noise_f(crate::session::Nid(1), Ratio::real(1e-9)).unwrap();
        assert!(n.time().is_err());
        assert!(n.laplace().is_err());
    }

    #[test]
    fn test_dtft_of_first_order() {
        let x = Expr::parse("0.5^n*u(n)", Domain::DiscreteTime).unwrap();
        let h = x.dtft_response(&[0.0, 0.5]).unwrap();
        assert_abs_diff_eq!(h[0].re, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(h[1].re, 1.0 / 1.5, epsilon = 1e-9);
    }
}
