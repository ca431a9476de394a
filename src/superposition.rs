//! Voltages and currents as sums of DC, AC, transient and noise parts.
//!
//! Each part lives under its own key and is analysed independently; the
//! container recombines them on request. Noise terms with different
//! identities add in quadrature and are never folded into a waveform.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;
use std::sync::OnceLock;

use crate::cas::{self, Ratio, Signal, Support, C64};
use crate::error::{Result, SymnodalError};
use crate::expr::{Density, Domain, Expr, Omega, Quantity, Value};
use crate::immittance::Immittance;
use crate::session::Nid;

/// Key of one superposition part.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Dc,
    Ac(Omega),
    /// Transient held in the Laplace domain.
    S,
    /// Transient held in the time domain.
    T,
    Noise(Nid),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Dc => write!(f, "dc"),
            Key::Ac(w) => write!(f, "ac({})", w),
            Key::S => write!(f, "s"),
            Key::T => write!(f, "t"),
            Key::Noise(n) => write!(f, "noise({})", n),
        }
    }
}

#[derive(Debug, Default)]
pub struct Superposition {
    quantity: Option<Quantity>,
    terms: BTreeMap<Key, Expr>,
    decomposed: OnceLock<BTreeMap<Key, Expr>>,
}

impl Clone for Superposition {
    fn clone(&self) -> Self {
        Self {
            quantity: self.quantity,
            terms: self.terms.clone(),
            decomposed: OnceLock::new(),
        }
    }
}

fn key_of(e: &Expr) -> Result<Key> {
    Ok(match e.value() {
        Value::Constant(_) => Key::Dc,
        Value::Phasor { omega, .. } => Key::Ac(omega.clone()),
        Value::Laplace(_) | Value::Fourier(_) | Value::AngularFourier(_) => Key::S,
        Value::Time(_) => Key::T,
        Value::NoiseF { nid, .. } | Value::NoiseOmega { nid, .. } => Key::Noise(*nid),
        other => {
            return Err(SymnodalError::IncompatibleOperands(format!(
                "a {} expression cannot be part of a circuit superposition",
                other.domain()
            )));
        }
    })
}

/// Re-expresses a value in the representation its key stores.
fn normalise(e: &Expr) -> Result<Expr> {
    match e.value() {
        Value::Fourier(_) | Value::AngularFourier(_) => e.laplace(),
        Value::NoiseOmega { nid, asd } => {
            let w = Ratio::symbol(cas::F).scale(C64::new(2.0 * PI, 0.0));
            let asd = asd.map_ratios(|r| r.subs(cas::OMEGA, &w))?;
            Ok(Expr::noise_density(*nid, asd)?.with_quantity(e.quantity()))
        }
        _ => Ok(e.clone()),
    }
}

fn zero_for(key: &Key, quantity: Quantity) -> Result<Expr> {
    let e = match key {
        Key::Dc => Expr::constant(Ratio::zero())?,
        Key::Ac(w) => Expr::ac(w.clone(), Ratio::zero())?,
        Key::S => Expr::zero(Domain::Laplace)?,
        Key::T => Expr::zero(Domain::Time)?,
        Key::Noise(nid) => Expr::noise_f(*nid, Ratio::zero())?,
    };
    Ok(e.with_quantity(quantity))
}

/// `ω` if `rate = jω` with `ω > 0` (or a symbolic `ω` not printed with a sign).
fn positive_frequency(rate: &Ratio) -> Option<Omega> {
    let w = rate.mul(&Ratio::imag(-1.0));
    match w.as_constant() {
        Some(c) if c.im.abs() <= 1e-12 * c.re.abs() && c.re > 0.0 => Some(Omega::numeric(c.re)),
        Some(_) => None,
        None if w.is_real() && !w.to_string().starts_with('-') => Omega::new(w).ok(),
        None => None,
    }
}

/// Splits a time-domain waveform into DC, steady-state AC and transient parts.
fn split_time(x: &Signal) -> Result<(Ratio, Vec<(Omega, Ratio)>, Signal)> {
    let mut dc = Ratio::zero();
    let mut ac: Vec<(Omega, Ratio)> = Vec::new();
    let mut rest = Signal::zero(x.family(), x.var());
    let eternal: Vec<_> = x
        .terms()
        .iter()
        .filter(|t| t.support == Support::Eternal && t.power == 0)
        .collect();
    for t in x.terms() {
        if t.support != Support::Eternal || t.power != 0 {
            rest.push_term(t.clone());
            continue;
        }
        if t.rate.is_zero() {
            dc = dc.add(&t.coeff);
            continue;
        }
        let partner = |rate: &Ratio, coeff: &Ratio| {
            eternal
                .iter()
                .any(|u| u.rate == rate.neg() && u.coeff == coeff.conj())
        };
        if let Some(w) = positive_frequency(&t.rate) {
            if partner(&t.rate, &t.coeff) {
                let x2 = t.coeff.scale(C64::new(2.0, 0.0));
                match ac.iter_mut().find(|(k, _)| *k == w) {
                    Some((_, v)) => *v = v.add(&x2),
                    None => ac.push((w, x2)),
                }
                continue;
            }
        } else if positive_frequency(&t.rate.neg()).is_some() && partner(&t.rate, &t.coeff) {
            continue;
        }
        rest.push_term(t.clone());
    }
    for d in x.impulses() {
        rest.push_impulse(d.clone());
    }
    Ok((dc, ac, rest))
}

impl Superposition {
    pub fn new(quantity: Quantity) -> Self {
        Self {
            quantity: Some(quantity),
            ..Self::default()
        }
    }

    pub fn voltage() -> Self {
        Self::new(Quantity::Voltage)
    }

    pub fn current() -> Self {
        Self::new(Quantity::Current)
    }

    pub fn from_expr(e: Expr) -> Result<Self> {
        let mut out = Self::new(e.quantity());
        out.add_expr(e)?;
        Ok(out)
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity.unwrap_or(Quantity::Undefined)
    }

    /// Merges a value into the part its domain selects, summing on collision.
    pub fn add_expr(&mut self, e: Expr) -> Result<()> {
        let quantity = self.quantity().add(e.quantity())?;
        self.quantity = Some(quantity);
        let e = normalise(&e)?.with_quantity(quantity);
        let has_s = self.terms.contains_key(&Key::S);
        let has_t = self.terms.contains_key(&Key::T);
        // one transient part only, in whichever form arrived first
        let (key, e) = match key_of(&e)? {
            Key::S if has_t => (Key::T, e.time()?.with_quantity(quantity)),
            Key::T if has_s => (Key::S, self.steady_then_laplace(&e, quantity)?),
            key => (key, e),
        };
        let merged = match self.terms.remove(&key) {
            Some(prev) => (&prev + &e)?,
            None => e,
        };
        if !merged.is_zero() {
            self.terms.insert(key, merged);
        }
        self.decomposed = OnceLock::new();
        Ok(())
    }

    /// Adds the DC and AC content of a time value and returns the rest as a
    /// Laplace value.
    fn steady_then_laplace(&mut self, e: &Expr, quantity: Quantity) -> Result<Expr> {
        let Some(x) = e.signal() else {
            return Ok(e.laplace()?.with_quantity(quantity));
        };
        let (dc, ac, rest) = split_time(x)?;
        self.add_expr(Expr::constant(dc)?.with_quantity(quantity))?;
        for (w, v) in ac {
            self.add_expr(Expr::ac(w, v)?.with_quantity(quantity))?;
        }
        Ok(Expr::from_signal(rest)?.laplace()?.with_quantity(quantity))
    }

    /// Parses and adds; the domain is chosen from the variables used.
    pub fn add_str(&mut self, text: &str) -> Result<()> {
        self.add_expr(Expr::parse_any(text)?)
    }

    /// Stored parts, as added.
    pub fn terms(&self) -> &BTreeMap<Key, Expr> {
        &self.terms
    }

    /// Parts with the time-domain term split into DC, AC and transient.
    pub fn decompose(&self) -> Result<&BTreeMap<Key, Expr>> {
        if let Some(d) = self.decomposed.get() {
            return Ok(d);
        }
        let d = self.compute_decomposition()?;
        Ok(self.decomposed.get_or_init(|| d))
    }

    fn compute_decomposition(&self) -> Result<BTreeMap<Key, Expr>> {
        let mut out = Superposition::new(self.quantity());
        for (key, e) in &self.terms {
            if *key != Key::T {
                out.add_expr(e.clone())?;
                continue;
            }
            let Some(x) = e.signal() else {
                out.add_expr(e.clone())?;
                continue;
            };
            let (dc, ac, rest) = split_time(x)?;
            out.add_expr(Expr::constant(dc)?)?;
            for (w, v) in ac {
                out.add_expr(Expr::ac(w, v)?)?;
            }
            out.add_expr(Expr::from_signal(rest)?)?;
        }
        Ok(out.terms)
    }

    /// One part; a zero of the matching domain when absent.
    pub fn select(&self, key: &Key) -> Result<Expr> {
        match self.decompose()?.get(key) {
            Some(e) => Ok(e.clone()),
            None => zero_for(key, self.quantity()),
        }
    }

    pub fn dc(&self) -> Result<Expr> {
        self.select(&Key::Dc)
    }

    pub fn ac(&self) -> Result<Vec<(Omega, Expr)>> {
        Ok(self
            .decompose()?
            .iter()
            .filter_map(|(k, e)| match k {
                Key::Ac(w) => Some((w.clone(), e.clone())),
                _ => None,
            })
            .collect())
    }

    /// Transient part in the Laplace domain.
    pub fn s(&self) -> Result<Expr> {
        let d = self.decompose()?;
        let mut acc = zero_for(&Key::S, self.quantity())?;
        for key in [Key::S, Key::T] {
            if let Some(e) = d.get(&key) {
                acc = (&acc + &e.laplace()?)?;
            }
        }
        Ok(acc)
    }

    /// Transient part in the time domain.
    pub fn t(&self) -> Result<Expr> {
        let d = self.decompose()?;
        let mut acc = zero_for(&Key::T, self.quantity())?;
        for key in [Key::S, Key::T] {
            if let Some(e) = d.get(&key) {
                acc = (&acc + &e.time()?)?;
            }
        }
        Ok(acc)
    }

    pub fn noise_terms(&self) -> Vec<(Nid, Expr)> {
        self.terms
            .iter()
            .filter_map(|(k, e)| match k {
                Key::Noise(n) => Some((*n, e.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn kinds(&self) -> Result<Vec<Key>> {
        Ok(self.decompose()?.keys().cloned().collect())
    }

    pub fn is_dc(&self) -> Result<bool> {
        Ok(self.kinds()?.iter().all(|k| *k == Key::Dc))
    }

    pub fn is_ac(&self) -> Result<bool> {
        let kinds = self.kinds()?;
        Ok(!kinds.is_empty() && kinds.iter().all(|k| matches!(k, Key::Ac(_))))
    }

    pub fn is_transient(&self) -> Result<bool> {
        let kinds = self.kinds()?;
        Ok(!kinds.is_empty() && kinds.iter().all(|k| matches!(k, Key::S | Key::T)))
    }

    pub fn has_noise(&self) -> bool {
        self.terms.keys().any(|k| matches!(k, Key::Noise(_)))
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// Deterministic waveform; noise parts are excluded.
    pub fn time(&self) -> Result<Expr> {
        let mut acc = zero_for(&Key::T, self.quantity())?;
        for (key, e) in &self.terms {
            if !matches!(key, Key::Noise(_)) {
                acc = (&acc + &e.time()?)?;
            }
        }
        Ok(acc)
    }

    /// Unilateral Laplace transform of the deterministic waveform.
    pub fn laplace(&self) -> Result<Expr> {
        let mut acc = zero_for(&Key::S, self.quantity())?;
        for (key, e) in &self.terms {
            if !matches!(key, Key::Noise(_)) {
                acc = (&acc + &e.laplace()?)?;
            }
        }
        Ok(acc)
    }

    /// Fourier transform of the deterministic waveform; DC and AC parts have
    /// no rational Fourier transform and are rejected.
    pub fn fourier(&self) -> Result<Expr> {
        let mut acc = Expr::zero(Domain::Fourier)?.with_quantity(self.quantity());
        for (key, e) in self.decompose()? {
            match key {
                Key::Noise(_) => {}
                Key::Dc | Key::Ac(_) => {
                    return Err(SymnodalError::IncompatibleOperands(format!(
                        "the {} part has an impulsive Fourier transform",
                        key
                    )));
                }
                Key::S | Key::T => acc = (&acc + &e.fourier()?)?,
            }
        }
        Ok(acc)
    }

    /// Power spectral density of the noise at `f` hertz.
    pub fn noise_psd(&self, f: f64) -> Result<f64> {
        let mut acc = 0.0;
        for (_, e) in self.noise_terms() {
            acc += e.evaluate_at(C64::new(f, 0.0))?.norm_sqr();
        }
        Ok(acc)
    }

    /// Amplitude spectral density of the noise at `f` hertz.
    pub fn noise_asd_at(&self, f: f64) -> Result<f64> {
        Ok(self.noise_psd(f)?.sqrt())
    }

    /// Combined amplitude of frequency-independent noise densities.
    pub fn noise_rms(&self) -> Result<f64> {
        let mut acc = 0.0;
        for (nid, e) in self.noise_terms() {
            let asd = e.density().and_then(Density::as_real).ok_or_else(|| {
                SymnodalError::IncompatibleOperands(format!(
                    "noise {} depends on frequency or symbols; use noise_rms_over",
                    nid
                ))
            })?;
            acc += asd * asd;
        }
        Ok(acc.sqrt())
    }

    /// RMS noise over `[f_lo, f_hi]` by Simpson integration of the PSD.
    pub fn noise_rms_over(&self, f_lo: f64, f_hi: f64, intervals: usize) -> Result<f64> {
        let n = (intervals.max(2) + 1) & !1;
        let h = (f_hi - f_lo) / n as f64;
        let mut acc = self.noise_psd(f_lo)? + self.noise_psd(f_hi)?;
        for i in 1..n {
            let w = if i % 2 == 1 { 4.0 } else { 2.0 };
            acc += w * self.noise_psd(f_lo + h * i as f64)?;
        }
        Ok((acc * h / 3.0).sqrt())
    }

    /// RMS of the steady-state parts: DC, AC and noise.
    pub fn rms(&self) -> Result<f64> {
        let mut acc = 0.0;
        for (key, e) in self.decompose()? {
            let v = match e.ratio().and_then(|r| r.as_constant()) {
                Some(v) => v,
                None => {
                    return Err(SymnodalError::IncompatibleOperands(format!(
                        "the {} part {} has no numeric RMS value",
                        key, e
                    )));
                }
            };
            acc += match key {
                Key::Dc => v.norm_sqr(),
                Key::Ac(_) => v.norm_sqr() / 2.0,
                Key::Noise(_) => v.norm_sqr(),
                Key::S | Key::T => {
                    return Err(SymnodalError::IncompatibleOperands(
                        "a transient has no RMS value".to_string(),
                    ));
                }
            };
        }
        Ok(acc.sqrt())
    }

    pub fn add(&self, other: &Superposition) -> Result<Superposition> {
        let mut out = self.clone();
        for e in other.terms.values() {
            out.add_expr(e.clone())?;
        }
        Ok(out)
    }

    pub fn sub(&self, other: &Superposition) -> Result<Superposition> {
        self.add(&other.neg())
    }

    pub fn neg(&self) -> Superposition {
        Superposition {
            quantity: self.quantity,
            terms: self.terms.iter().map(|(k, e)| (k.clone(), -e)).collect(),
            decomposed: OnceLock::new(),
        }
    }

    /// Scales every part by a constant.
    pub fn scale(&self, k: &Ratio) -> Result<Superposition> {
        let mut out = Superposition::new(self.quantity());
        for e in self.terms.values() {
            out.add_expr(e.scale(k)?)?;
        }
        Ok(out)
    }

    /// Multiplies by a frequency-dependent immittance part by part:
    /// DC at `s = 0`, AC at `s = jω`, noise by the magnitude at `s = j2πf`,
    /// and the transient exactly in `s`.
    pub fn mul_immittance(&self, z: &Immittance) -> Result<Superposition> {
        let quantity = self.quantity().mul(z.kind().quantity());
        self.apply(z.value(), quantity)
    }

    /// Divides by an immittance, e.g. a voltage by an impedance.
    pub fn div_immittance(&self, z: &Immittance) -> Result<Superposition> {
        let quantity = self.quantity().div(z.kind().quantity());
        self.apply(&z.value().inv()?, quantity)
    }

    /// Applies a transfer function in `s`.
    pub fn apply(&self, h: &Ratio, quantity: Quantity) -> Result<Superposition> {
        let mut out = Superposition::new(quantity);
        for (key, e) in self.decompose()? {
            let product = match (key, e.value()) {
                (Key::Dc, Value::Constant(c)) => {
                    let h0 = h.subs(cas::S, &Ratio::zero()).map_err(|_| {
                        SymnodalError::Algebra(format!("{} has a pole at DC", h))
                    })?;
                    Expr::constant(c.mul(&h0))?
                }
                (Key::Ac(w), Value::Phasor { value, .. }) => {
                    Expr::ac(w.clone(), value.mul(&h.subs(cas::S, &w.jw())?))?
                }
                (Key::Noise(nid), Value::NoiseF { asd, .. }) => {
                    let hf = h.subs(cas::S, &cas::j2pif())?;
                    Expr::noise_density(*nid, asd.mul_magnitude(&hf))?
                }
                (Key::S | Key::T, _) => {
                    let hs = Expr::laplace_ratio(h.clone())?;
                    (&e.laplace()?.with_quantity(Quantity::Undefined) * &hs)?
                }
                _ => {
                    return Err(SymnodalError::Algebra(format!(
                        "unexpected {} value under key {}",
                        e.domain(),
                        key
                    )));
                }
            };
            out.add_expr(product.with_quantity(quantity))?;
        }
        Ok(out)
    }

    /// Product of superpositions; only a pure DC factor is accepted.
    pub fn mul(&self, other: &Superposition) -> Result<Superposition> {
        let (lhs, factor) = if other.is_dc()? {
            (self, other)
        } else if self.is_dc()? {
            (other, self)
        } else {
            return Err(SymnodalError::IncompatibleOperands(
                "cannot multiply two superpositions; extract a part with .s() or take a full transform with .laplace() first"
                    .to_string(),
            ));
        };
        let k = factor.dc()?.ratio().unwrap_or_default();
        let mut out = lhs.scale(&k)?;
        out.quantity = Some(lhs.quantity().mul(factor.quantity()));
        Ok(out)
    }

    /// Printable parts, for export.
    pub fn summary(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .decompose()?
            .iter()
            .map(|(k, e)| (k.to_string(), e.to_string()))
            .collect())
    }
}

impl PartialEq for Superposition {
    fn eq(&self, other: &Self) -> bool {
        let (Ok(a), Ok(b)) = (self.decompose(), other.decompose()) else {
            return false;
        };
        let keys: std::collections::BTreeSet<&Key> = a
            .keys()
            .chain(b.keys())
            .filter(|k| !matches!(k, Key::S | Key::T))
            .collect();
        let steady = keys.into_iter().all(|k| match (a.get(k), b.get(k)) {
            (Some(x), Some(y)) => x == y,
            (Some(x), None) | (None, Some(x)) => x.is_zero(),
            (None, None) => true,
        });
        // the transient compares in one domain whichever form each side holds
        steady && matches!((self.s(), other.s()), (Ok(x), Ok(y)) if x == y)
    }
}

impl fmt::Display for Superposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        let parts: Vec<String> = self
            .terms
            .iter()
            .map(|(k, e)| format!("{}: {}", k, e))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn dc(v: f64) -> Superposition {
        Superposition::from_expr(Expr::real(v).as_voltage()).unwrap()
    }

    fn ac(v: f64, w: f64) -> Superposition {
        Superposition::from_expr(Expr::ac(Omega::numeric(w), Ratio::real(v)).unwrap().as_voltage())
            .unwrap()
    }

    fn noise(nid: u64, v: f64) -> Superposition {
        Superposition::from_expr(Expr::noise_f(Nid(nid), Ratio::real(v)).unwrap().as_voltage())
            .unwrap()
    }

    #[test]
    fn test_add_then_subtract_is_identity() {
        let sum = dc(5.0).add(&ac(3.0, 2.0)).unwrap();
        let back = sum.sub(&ac(3.0, 2.0)).unwrap();
        assert_eq!(back, dc(5.0));
        assert!(back.is_dc().unwrap());
    }

    #[test]
    fn test_independent_noise_in_quadrature() {
        let n = noise(1, 3.0).add(&noise(2, 4.0)).unwrap();
        assert_abs_diff_eq!(n.noise_rms().unwrap(), 5.0, epsilon = 1e-12);
        let same = noise(1, 3.0).add(&noise(1, 4.0)).unwrap();
        assert_abs_diff_eq!(same.noise_rms().unwrap(), 7.0, epsilon = 1e-12);
    }

    #[test]
    fn test_different_realisations_do_not_cancel() {
        let d = noise(1, 3.0).sub(&noise(2, 3.0)).unwrap();
        assert!(!d.is_zero());
        assert_abs_diff_eq!(d.noise_rms().unwrap(), 18f64.sqrt(), epsilon = 1e-12);
        assert!(noise(1, 3.0).sub(&noise(1, 3.0)).unwrap().is_zero());
    }

    #[test]
    fn test_select_missing_part_is_zero() {
        let v = dc(1.0);
        let s = v.select(&Key::S).unwrap();
        assert_eq!(s.domain(), Domain::Laplace);
        assert!(s.is_zero());
        let a = v.select(&Key::Ac(Omega::numeric(1.0))).unwrap();
        assert_eq!(a.domain(), Domain::Phasor);
    }

    #[test]
    fn test_time_term_decomposes() {
        let mut v = Superposition::voltage();
        v.add_str("2 + 3*cos(5*t) + exp(-t)*u(t)").unwrap();
        assert_abs_diff_eq!(v.dc().unwrap().ratio().unwrap().as_real().unwrap(), 2.0, epsilon = 1e-12);
        let ac = v.ac().unwrap();
        assert_eq!(ac.len(), 1);
        assert_eq!(ac[0].0, Omega::numeric(5.0));
        assert_abs_diff_eq!(ac[0].1.ratio().unwrap().as_real().unwrap(), 3.0, epsilon = 1e-12);
        assert_eq!(v.s().unwrap(), Expr::parse("1/(s + 1)", Domain::Laplace).unwrap());
    }

    #[test]
    fn test_single_transient_part() {
        let mut v = Superposition::voltage();
        v.add_str("exp(-t)*u(t)").unwrap();
        v.add_str("1/(s + 2)").unwrap();
        assert_eq!(v.terms().keys().collect::<Vec<_>>(), vec![&Key::T]);
        assert_eq!(
            v.s().unwrap(),
            Expr::parse("1/(s + 1) + 1/(s + 2)", Domain::Laplace).unwrap()
        );

        let mut w = Superposition::voltage();
        w.add_str("1/(s + 2)").unwrap();
        w.add_str("2 + exp(-t)*u(t)").unwrap();
        assert!(w.terms().contains_key(&Key::S));
        assert!(!w.terms().contains_key(&Key::T));
        assert_abs_diff_eq!(w.dc().unwrap().ratio().unwrap().as_real().unwrap(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_transient_compares_across_forms() {
        let mut t = Superposition::voltage();
        t.add_str("exp(-t)*u(t)").unwrap();
        let mut s = Superposition::voltage();
        s.add_str("1/(s + 1)").unwrap();
        assert_eq!(t, s);

        let mut other = Superposition::voltage();
        other.add_str("1/(s + 2)").unwrap();
        assert_ne!(t, other);
    }

    #[test]
    fn test_noise_scaled_by_magnitude_response() {
        let i = Superposition::from_expr(Expr::noise_f(Nid(7), Ratio::one()).unwrap().as_current())
            .unwrap();
        let lowpass =
            Immittance::impedance(Expr::parse("1/(1 + s)", Domain::Laplace).unwrap().ratio().unwrap())
                .unwrap();
        let v = i.mul_immittance(&lowpass).unwrap();
        let f = 0.5 / PI;
        assert_abs_diff_eq!(v.noise_asd_at(f).unwrap(), 0.5f64.sqrt(), epsilon = 1e-12);

        // the same process through 1 ohm adds in magnitude
        let unit = Immittance::impedance(Ratio::one()).unwrap();
        let total = v.add(&i.mul_immittance(&unit).unwrap()).unwrap();
        assert_abs_diff_eq!(
            total.noise_psd(f).unwrap(),
            (1.0 + 0.5f64.sqrt()).powi(2),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_noise_rms_over_odd_interval_count() {
        let n = noise(1, 1.0);
        assert_abs_diff_eq!(n.noise_rms_over(0.0, 1.0, 1).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(n.noise_rms_over(0.0, 4.0, 3).unwrap(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rms_of_dc_and_ac() {
        let v = dc(3.0).add(&ac(4.0 * 2f64.sqrt(), 1.0)).unwrap();
        assert_abs_diff_eq!(v.rms().unwrap(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_multiply_by_impedance_per_part() {
        let i = Superposition::from_expr(Expr::real(2.0).as_current())
            .unwrap()
            .add(&Superposition::from_expr(
                Expr::ac(Omega::numeric(1.0), Ratio::real(1.0)).unwrap().as_current(),
            ).unwrap())
            .unwrap();
        // R + sL with R = 1, L = 1
        let z = Immittance::impedance(Expr::parse("1 + s", Domain::Laplace).unwrap().ratio().unwrap()).unwrap();
        let v = i.mul_immittance(&z).unwrap();
        assert_eq!(v.quantity(), Quantity::Voltage);
        assert_abs_diff_eq!(v.dc().unwrap().ratio().unwrap().as_real().unwrap(), 2.0, epsilon = 1e-12);
        let (_, x) = &v.ac().unwrap()[0];
        let c = x.ratio().unwrap().as_constant().unwrap();
        assert_abs_diff_eq!(c.re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(c.im, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_dc_through_capacitor_impedance_fails() {
        let z = Immittance::impedance(Expr::parse("1/s", Domain::Laplace).unwrap().ratio().unwrap()).unwrap();
        assert!(Superposition::from_expr(Expr::real(1.0).as_current())
            .unwrap()
            .mul_immittance(&z)
            .is_err());
    }

    #[test]
    fn test_superposition_product_rejected() {
        let a = ac(1.0, 1.0);
        let b = ac(2.0, 1.0);
        let err = a.mul(&b).unwrap_err();
        assert!(matches!(err, SymnodalError::IncompatibleOperands(_)));
        assert!(a.mul(&dc(2.0)).is_ok());
    }

    #[test]
    fn test_mixing_voltage_and_current_fails() {
        let i = Superposition::from_expr(Expr::real(1.0).as_current()).unwrap();
        assert!(dc(1.0).add(&i).is_err());
    }
}
