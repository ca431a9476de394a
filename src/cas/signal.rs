//! Exponential-polynomial signals for continuous and discrete time.
//!
//! A continuous signal is a sum of terms `c · t^p · e^{r·t} · u(t − T)` plus
//! impulses `c · δ^{(m)}(t − T)`. A discrete signal uses the same shape with
//! `c · n^p · r^n · u[n − N]` and `c · δ[n − N]`. One type carries both
//! families; only the rate algebra and the display differ.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use super::poly::{fmt_real, C64};
use super::ratio::Ratio;
use crate::error::{Result, SymnodalError};

const SHIFT_TOL: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Continuous,
    Discrete,
}

impl Family {
    /// Rate of a constant term: `e^{0·t}` or `1^n`.
    pub fn unit_rate(self) -> Ratio {
        match self {
            Family::Continuous => Ratio::zero(),
            Family::Discrete => Ratio::one(),
        }
    }

    fn combine_rates(self, a: &Ratio, b: &Ratio) -> Ratio {
        match self {
            Family::Continuous => a.add(b),
            Family::Discrete => a.mul(b),
        }
    }
}

/// Region where a term is active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Support {
    /// Active for all time.
    Eternal,
    /// Multiplied by a unit step starting at the given shift.
    Causal(f64),
}

impl Support {
    fn intersect(self, other: Support) -> Support {
        match (self, other) {
            (Support::Eternal, s) | (s, Support::Eternal) => s,
            (Support::Causal(a), Support::Causal(b)) => Support::Causal(a.max(b)),
        }
    }

    fn same(self, other: Support) -> bool {
        match (self, other) {
            (Support::Eternal, Support::Eternal) => true,
            (Support::Causal(a), Support::Causal(b)) => (a - b).abs() <= SHIFT_TOL,
            _ => false,
        }
    }

    /// Unit step value at `x`, with `u(0) = 1`.
    fn active_at(self, x: f64) -> bool {
        match self {
            Support::Eternal => true,
            Support::Causal(shift) => x >= shift - SHIFT_TOL,
        }
    }

    fn shifted(self, by: f64) -> Support {
        match self {
            Support::Eternal => Support::Eternal,
            Support::Causal(s) => Support::Causal(s + by),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExpTerm {
    pub coeff: Ratio,
    pub power: u32,
    pub rate: Ratio,
    pub support: Support,
}

#[derive(Debug, Clone)]
pub struct Impulse {
    pub coeff: Ratio,
    pub order: u32,
    pub at: f64,
}

#[derive(Debug, Clone)]
pub struct Signal {
    family: Family,
    var: String,
    terms: Vec<ExpTerm>,
    impulses: Vec<Impulse>,
}

/// `e^{r·x}` as a ratio; symbolic rates only at `x = 0`.
pub fn exp_ratio(rate: &Ratio, x: f64) -> Result<Ratio> {
    if x == 0.0 || rate.is_zero() {
        return Ok(Ratio::one());
    }
    match rate.as_constant() {
        Some(r) => Ok(Ratio::constant((r * x).exp())),
        None => Err(SymnodalError::Algebra(format!(
            "exp(({})*{}) needs a numeric rate",
            rate,
            fmt_real(x)
        ))),
    }
}

fn binomial(n: u32, k: u32) -> f64 {
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

impl Signal {
    pub fn zero(family: Family, var: &str) -> Self {
        Self {
            family,
            var: var.to_string(),
            terms: Vec::new(),
            impulses: Vec::new(),
        }
    }

    pub fn constant(family: Family, var: &str, c: Ratio) -> Self {
        Self::exponential(family, var, c, 0, family.unit_rate(), Support::Eternal)
    }

    /// The domain variable itself.
    pub fn variable(family: Family, var: &str) -> Self {
        Self::exponential(family, var, Ratio::one(), 1, family.unit_rate(), Support::Eternal)
    }

    pub fn step(family: Family, var: &str, at: f64) -> Self {
        Self::exponential(family, var, Ratio::one(), 0, family.unit_rate(), Support::Causal(at))
    }

    pub fn exponential(
        family: Family,
        var: &str,
        coeff: Ratio,
        power: u32,
        rate: Ratio,
        support: Support,
    ) -> Self {
        let mut s = Self::zero(family, var);
        s.push_term(ExpTerm {
            coeff,
            power,
            rate,
            support,
        });
        s
    }

    pub fn impulse(family: Family, var: &str, coeff: Ratio, order: u32, at: f64) -> Self {
        let mut s = Self::zero(family, var);
        s.push_impulse(Impulse { coeff, order, at });
        s
    }

    pub fn push_term(&mut self, term: ExpTerm) {
        if term.coeff.is_zero() {
            return;
        }
        if let Some(i) = self.terms.iter().position(|t| {
            t.power == term.power && t.support.same(term.support) && t.rate == term.rate
        }) {
            let sum = self.terms[i].coeff.add(&term.coeff);
            if sum.is_zero() {
                self.terms.remove(i);
            } else {
                self.terms[i].coeff = sum;
            }
        } else {
            self.terms.push(term);
        }
    }

    pub fn push_impulse(&mut self, imp: Impulse) {
        if imp.coeff.is_zero() {
            return;
        }
        if let Some(i) = self
            .impulses
            .iter()
            .position(|d| d.order == imp.order && (d.at - imp.at).abs() <= SHIFT_TOL)
        {
            let sum = self.impulses[i].coeff.add(&imp.coeff);
            if sum.is_zero() {
                self.impulses.remove(i);
            } else {
                self.impulses[i].coeff = sum;
            }
        } else {
            self.impulses.push(imp);
        }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn var(&self) -> &str {
        &self.var
    }

    pub fn terms(&self) -> &[ExpTerm] {
        &self.terms
    }

    pub fn impulses(&self) -> &[Impulse] {
        &self.impulses
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty() && self.impulses.is_empty()
    }

    /// Same family with a renamed independent variable.
    pub fn with_var(&self, var: &str) -> Signal {
        Signal {
            var: var.to_string(),
            ..self.clone()
        }
    }

    /// The value if the signal is a time-invariant constant.
    pub fn as_constant(&self) -> Option<Ratio> {
        if !self.impulses.is_empty() {
            return None;
        }
        let unit = self.family.unit_rate();
        let mut acc = Ratio::zero();
        for t in &self.terms {
            if t.power != 0 || t.support != Support::Eternal || t.rate != unit {
                return None;
            }
            acc = acc.add(&t.coeff);
        }
        Some(acc)
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for t in &self.terms {
            out.extend(t.coeff.free_symbols());
            out.extend(t.rate.free_symbols());
        }
        for d in &self.impulses {
            out.extend(d.coeff.free_symbols());
        }
        out
    }

    fn check_family(&self, other: &Signal) -> Result<()> {
        if self.family != other.family || self.var != other.var {
            return Err(SymnodalError::Algebra(format!(
                "cannot combine signals in {} and {}",
                self.var, other.var
            )));
        }
        Ok(())
    }

    pub fn add(&self, other: &Signal) -> Result<Signal> {
        self.check_family(other)?;
        let mut out = self.clone();
        for t in &other.terms {
            out.push_term(t.clone());
        }
        for d in &other.impulses {
            out.push_impulse(d.clone());
        }
        Ok(out)
    }

    pub fn sub(&self, other: &Signal) -> Result<Signal> {
        self.add(&other.neg())
    }

    pub fn neg(&self) -> Signal {
        self.scale(&Ratio::real(-1.0))
    }

    pub fn scale(&self, k: &Ratio) -> Signal {
        let mut out = Signal::zero(self.family, &self.var);
        for t in &self.terms {
            out.push_term(ExpTerm {
                coeff: t.coeff.mul(k),
                ..t.clone()
            });
        }
        for d in &self.impulses {
            out.push_impulse(Impulse {
                coeff: d.coeff.mul(k),
                ..d.clone()
            });
        }
        out
    }

    /// Value of one term at a numeric point, with symbolic coefficients kept.
    fn term_at(&self, t: &ExpTerm, x: f64) -> Result<Ratio> {
        if !t.support.active_at(x) {
            return Ok(Ratio::zero());
        }
        let growth = match self.family {
            Family::Continuous => exp_ratio(&t.rate, x)?,
            Family::Discrete => t.rate.powi(x.round() as i32)?,
        };
        Ok(t.coeff.mul(&Ratio::real(x.powi(t.power as i32))).mul(&growth))
    }

    /// Value at a point, impulses excluded.
    pub fn value_symbolic(&self, x: f64) -> Result<Ratio> {
        let mut acc = Ratio::zero();
        for t in &self.terms {
            acc = acc.add(&self.term_at(t, x)?);
        }
        Ok(acc)
    }

    /// Numeric value at a point, impulses excluded.
    pub fn value_at(&self, x: f64, values: &HashMap<String, C64>) -> Result<C64> {
        let mut acc = C64::new(0.0, 0.0);
        for t in &self.terms {
            if !t.support.active_at(x) {
                continue;
            }
            let c = t.coeff.evaluate(values)?;
            let r = t.rate.evaluate(values)?;
            let growth = match self.family {
                Family::Continuous => (r * x).exp(),
                Family::Discrete => r.powi(x.round() as i32),
            };
            acc += c * x.powi(t.power as i32) * growth;
        }
        Ok(acc)
    }

    pub fn mul(&self, other: &Signal) -> Result<Signal> {
        self.check_family(other)?;
        let mut out = Signal::zero(self.family, &self.var);
        for a in &self.terms {
            for b in &other.terms {
                out.push_term(ExpTerm {
                    coeff: a.coeff.mul(&b.coeff),
                    power: a.power + b.power,
                    rate: self.family.combine_rates(&a.rate, &b.rate),
                    support: a.support.intersect(b.support),
                });
            }
        }
        for (imps, signal) in [(&self.impulses, other), (&other.impulses, self)] {
            for d in imps.iter() {
                if d.order == 0 {
                    let at = signal.value_symbolic(d.at)?;
                    out.push_impulse(Impulse {
                        coeff: d.coeff.mul(&at),
                        ..d.clone()
                    });
                } else if let Some(c) = signal.partition(|_| true).0.as_constant() {
                    out.push_impulse(Impulse {
                        coeff: d.coeff.mul(&c),
                        ..d.clone()
                    });
                } else {
                    return Err(SymnodalError::Algebra(
                        "product of an impulse derivative and a time-varying signal".to_string(),
                    ));
                }
            }
        }
        if !self.impulses.is_empty() && !other.impulses.is_empty() {
            for a in &self.impulses {
                for b in &other.impulses {
                    let coincide = (a.at - b.at).abs() <= SHIFT_TOL;
                    match self.family {
                        Family::Discrete if coincide => {
                            out.push_impulse(Impulse {
                                coeff: a.coeff.mul(&b.coeff),
                                order: 0,
                                at: a.at,
                            });
                        }
                        Family::Discrete => {}
                        Family::Continuous => {
                            return Err(SymnodalError::Algebra(
                                "product of two continuous-time impulses is undefined".to_string(),
                            ));
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    /// `x(var − by)`.
    pub fn delay(&self, by: f64) -> Result<Signal> {
        if by == 0.0 {
            return Ok(self.clone());
        }
        if self.family == Family::Discrete && by.fract() != 0.0 {
            return Err(SymnodalError::Algebra(format!(
                "discrete delay must be an integer, got {}",
                by
            )));
        }
        let mut out = Signal::zero(self.family, &self.var);
        for t in &self.terms {
            let factor = match self.family {
                Family::Continuous => exp_ratio(&t.rate, -by)?,
                Family::Discrete => t.rate.powi(-(by as i32))?,
            };
            for k in 0..=t.power {
                let c = binomial(t.power, k) * (-by).powi((t.power - k) as i32);
                out.push_term(ExpTerm {
                    coeff: t.coeff.mul(&factor).scale(C64::new(c, 0.0)),
                    power: k,
                    rate: t.rate.clone(),
                    support: t.support.shifted(by),
                });
            }
        }
        for d in &self.impulses {
            out.push_impulse(Impulse {
                at: d.at + by,
                ..d.clone()
            });
        }
        Ok(out)
    }

    pub fn map_ratios<F>(&self, f: F) -> Result<Signal>
    where
        F: Fn(&Ratio) -> Result<Ratio>,
    {
        let mut out = Signal::zero(self.family, &self.var);
        for t in &self.terms {
            out.push_term(ExpTerm {
                coeff: f(&t.coeff)?,
                rate: f(&t.rate)?,
                ..t.clone()
            });
        }
        for d in &self.impulses {
            out.push_impulse(Impulse {
                coeff: f(&d.coeff)?,
                ..d.clone()
            });
        }
        Ok(out)
    }

    pub fn subs(&self, var: &str, value: &Ratio) -> Result<Signal> {
        self.map_ratios(|r| r.subs(var, value))
    }

    pub fn eval(&self, values: &HashMap<String, C64>) -> Result<Signal> {
        self.map_ratios(|r| r.eval(values))
    }

    /// True when every term and impulse starts at or after zero.
    pub fn is_causal(&self) -> bool {
        self.terms
            .iter()
            .all(|t| matches!(t.support, Support::Causal(s) if s >= -SHIFT_TOL))
            && self.impulses.iter().all(|d| d.at >= -SHIFT_TOL)
    }

    /// True when every term decays; symbolic rates are not provably stable.
    pub fn is_decaying(&self) -> bool {
        self.terms.iter().all(|t| match t.rate.as_constant() {
            Some(r) => match self.family {
                Family::Continuous => r.re < 0.0,
                Family::Discrete => r.norm() < 1.0,
            },
            None => false,
        })
    }

    /// Latest start among the causal terms and impulses.
    pub fn settles_after(&self) -> f64 {
        let terms = self.terms.iter().filter_map(|t| match t.support {
            Support::Causal(s) => Some(s),
            Support::Eternal => None,
        });
        terms
            .chain(self.impulses.iter().map(|d| d.at))
            .fold(0.0, f64::max)
    }

    /// Splits terms by a predicate, impulses go with the rejected part.
    pub fn partition<F>(&self, keep: F) -> (Signal, Signal)
    where
        F: Fn(&ExpTerm) -> bool,
    {
        let mut yes = Signal::zero(self.family, &self.var);
        let mut no = Signal::zero(self.family, &self.var);
        for t in &self.terms {
            if keep(t) {
                yes.push_term(t.clone());
            } else {
                no.push_term(t.clone());
            }
        }
        for d in &self.impulses {
            no.push_impulse(d.clone());
        }
        (yes, no)
    }
}

impl PartialEq for Signal {
    fn eq(&self, other: &Self) -> bool {
        matches!(self.sub(other), Ok(d) if d.is_zero())
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Formats `factor` as a product prefix; `None` for a unit factor.
fn coeff_prefix(c: &Ratio) -> (bool, Option<String>) {
    if let Some(v) = c.as_real() {
        let neg = v < 0.0;
        let mag = v.abs();
        if (mag - 1.0).abs() < 1e-12 {
            return (neg, None);
        }
        return (neg, Some(fmt_real(mag)));
    }
    let s = c.to_string();
    if let Some(rest) = s.strip_prefix('-') {
        if !rest.contains(' ') {
            return (true, Some(rest.to_string()));
        }
    }
    if s.contains(' ') {
        (false, Some(format!("({})", s)))
    } else {
        (false, Some(s))
    }
}

fn scaled_var(r: &Ratio, var: &str) -> String {
    match r.as_real() {
        Some(v) if (v - 1.0).abs() < 1e-12 => var.to_string(),
        Some(v) if (v + 1.0).abs() < 1e-12 => format!("-{}", var),
        Some(v) => format!("{}*{}", fmt_real(v), var),
        None => {
            let s = r.to_string();
            if s.contains(' ') {
                format!("({})*{}", s, var)
            } else {
                format!("{}*{}", s, var)
            }
        }
    }
}

fn shifted_arg(var: &str, at: f64) -> String {
    if at == 0.0 {
        var.to_string()
    } else if at > 0.0 {
        format!("{} - {}", var, fmt_real(at))
    } else {
        format!("{} + {}", var, fmt_real(-at))
    }
}

impl Signal {
    fn step_str(&self, at: f64) -> String {
        match self.family {
            Family::Continuous => format!("u({})", shifted_arg(&self.var, at)),
            Family::Discrete => format!("u[{}]", shifted_arg(&self.var, at)),
        }
    }

    fn power_str(&self, p: u32) -> Option<String> {
        match p {
            0 => None,
            1 => Some(self.var.clone()),
            _ => Some(format!("{}^{}", self.var, p)),
        }
    }

    fn growth_str(&self, rate: &Ratio) -> Option<String> {
        match self.family {
            Family::Continuous => {
                if rate.is_zero() {
                    None
                } else {
                    Some(format!("exp({})", scaled_var(rate, &self.var)))
                }
            }
            Family::Discrete => {
                if rate.is_one() {
                    None
                } else {
                    let r = match rate.as_real() {
                        Some(v) if v >= 0.0 => fmt_real(v),
                        _ => format!("({})", rate),
                    };
                    Some(format!("{}^{}", r, self.var))
                }
            }
        }
    }

    /// Renders a conjugate pair `c·e^{r·t} + c̄·e^{r̄·t}` as damped sinusoids.
    fn pair_parts(&self, t: &ExpTerm) -> Option<Vec<(bool, String)>> {
        let cc = t.coeff.conj();
        let a = t.coeff.add(&cc);
        let b = t.coeff.sub(&cc).mul(&Ratio::imag(1.0));
        let (sigma_str, omega_str) = match self.family {
            Family::Continuous => {
                let rc = t.rate.conj();
                let sigma = t.rate.add(&rc).scale(C64::new(0.5, 0.0));
                let omega = t.rate.sub(&rc).scale(C64::new(0.0, -0.5));
                (self.growth_str(&sigma), scaled_var(&omega, &self.var))
            }
            Family::Discrete => {
                let r = t.rate.as_constant()?;
                let rho = Ratio::real(r.norm());
                (self.growth_str(&rho), scaled_var(&Ratio::real(r.arg()), &self.var))
            }
        };
        let mut out = Vec::new();
        for (k, trig) in [(a, "cos"), (b, "sin")] {
            if k.is_zero() {
                continue;
            }
            let (neg, prefix) = coeff_prefix(&k);
            let factors: Vec<String> = prefix
                .into_iter()
                .chain(self.power_str(t.power))
                .chain(sigma_str.clone())
                .chain(std::iter::once(format!("{}({})", trig, omega_str)))
                .collect();
            out.push((neg, factors.join("*")));
        }
        Some(out)
    }

    fn group_parts(&self, terms: &[&ExpTerm]) -> Vec<(bool, String)> {
        let mut parts = Vec::new();
        let mut used = vec![false; terms.len()];
        for i in 0..terms.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            let t = terms[i];
            let rc = t.rate.conj();
            if t.rate != rc {
                let partner = (0..terms.len()).find(|&j| {
                    !used[j]
                        && terms[j].power == t.power
                        && terms[j].rate == rc
                        && terms[j].coeff == t.coeff.conj()
                });
                if let Some(j) = partner {
                    if let Some(p) = self.pair_parts(t) {
                        used[j] = true;
                        parts.extend(p);
                        continue;
                    }
                }
            }
            let (neg, prefix) = coeff_prefix(&t.coeff);
            let factors: Vec<String> = prefix
                .into_iter()
                .chain(self.power_str(t.power))
                .chain(self.growth_str(&t.rate))
                .collect();
            let body = if factors.is_empty() {
                "1".to_string()
            } else {
                factors.join("*")
            };
            parts.push((neg, body));
        }
        parts
    }
}

fn join_parts(parts: &[(bool, String)]) -> String {
    let mut out = String::new();
    for (i, (neg, body)) in parts.iter().enumerate() {
        match (i, neg) {
            (0, true) => out.push('-'),
            (0, false) => {}
            (_, true) => out.push_str(" - "),
            (_, false) => out.push_str(" + "),
        }
        out.push_str(body);
    }
    out
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        let mut groups: Vec<(Support, Vec<&ExpTerm>)> = Vec::new();
        for t in &self.terms {
            match groups.iter_mut().find(|(s, _)| s.same(t.support)) {
                Some((_, g)) => g.push(t),
                None => groups.push((t.support, vec![t])),
            }
        }
        groups.sort_by(|a, b| {
            let key = |s: &Support| match s {
                Support::Eternal => f64::NEG_INFINITY,
                Support::Causal(x) => *x,
            };
            key(&a.0).partial_cmp(&key(&b.0)).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut parts: Vec<(bool, String)> = Vec::new();
        for (support, terms) in &groups {
            let inner = self.group_parts(terms);
            match support {
                Support::Eternal => parts.extend(inner),
                Support::Causal(at) => {
                    let step = self.step_str(*at);
                    if inner.len() == 1 {
                        let (neg, body) = &inner[0];
                        if body == "1" {
                            parts.push((*neg, step));
                        } else {
                            parts.push((*neg, format!("{}*{}", body, step)));
                        }
                    } else {
                        parts.push((false, format!("({})*{}", join_parts(&inner), step)));
                    }
                }
            }
        }
        for d in &self.impulses {
            let (neg, prefix) = coeff_prefix(&d.coeff);
            let arg = shifted_arg(&self.var, d.at);
            let delta = match (self.family, d.order) {
                (Family::Discrete, _) => format!("delta[{}]", arg),
                (Family::Continuous, 0) => format!("delta({})", arg),
                (Family::Continuous, m) => format!("delta({}, {})", arg, m),
            };
            let body = match prefix {
                Some(p) => format!("{}*{}", p, delta),
                None => delta,
            };
            parts.push((neg, body));
        }
        write!(f, "{}", join_parts(&parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const C: Family = Family::Continuous;

    fn decay(rate: f64) -> Signal {
        Signal::exponential(C, "t", Ratio::one(), 0, Ratio::real(rate), Support::Causal(0.0))
    }

    #[test]
    fn test_step_response_display_and_value() {
        let y = Signal::step(C, "t", 0.0).sub(&decay(-1.0)).unwrap();
        assert_eq!(y.to_string(), "(1 - exp(-t))*u(t)");
        let v = y.value_at(1.0, &HashMap::new()).unwrap();
        assert!((v.re - (1.0 - (-1.0f64).exp())).abs() < 1e-12);
        assert_eq!(y.value_at(-1.0, &HashMap::new()).unwrap().re, 0.0);
    }

    #[test]
    fn test_cosine_pair_display() {
        let w = Ratio::symbol("omega");
        let half = Ratio::real(0.5);
        let pos = Signal::exponential(C, "t", half.clone(), 0, w.mul(&Ratio::imag(1.0)), Support::Eternal);
        let neg = Signal::exponential(C, "t", half, 0, w.mul(&Ratio::imag(-1.0)), Support::Eternal);
        let cos = pos.add(&neg).unwrap();
        assert_eq!(cos.to_string(), "cos(omega*t)");
    }

    #[test]
    fn test_mul_combines_rates_and_support() {
        let a = decay(-1.0);
        let b = Signal::exponential(C, "t", Ratio::real(2.0), 1, Ratio::real(-2.0), Support::Causal(1.0));
        let p = a.mul(&b).unwrap();
        assert_eq!(p.terms().len(), 1);
        let t = &p.terms()[0];
        assert_eq!(t.power, 1);
        assert_eq!(t.rate.as_real(), Some(-3.0));
        assert_eq!(t.support, Support::Causal(1.0));
    }

    #[test]
    fn test_impulse_sifting() {
        let d = Signal::impulse(C, "t", Ratio::one(), 0, 0.0);
        let p = d.mul(&decay(-1.0)).unwrap();
        assert!(p.terms().is_empty());
        assert!(p.impulses()[0].coeff.is_one());
    }

    #[test]
    fn test_delay_shifts_polynomial_terms() {
        // t·u(t) delayed by 1 is (t - 1)·u(t - 1)
        let ramp = Signal::exponential(C, "t", Ratio::one(), 1, Ratio::zero(), Support::Causal(0.0));
        let d = ramp.delay(1.0).unwrap();
        let v = d.value_at(3.0, &HashMap::new()).unwrap();
        assert!((v.re - 2.0).abs() < 1e-12);
        assert_eq!(d.value_at(0.5, &HashMap::new()).unwrap().re, 0.0);
    }

    #[test]
    fn test_discrete_geometric() {
        let g = Signal::exponential(
            Family::Discrete,
            "n",
            Ratio::one(),
            0,
            Ratio::real(0.5),
            Support::Causal(0.0),
        );
        assert_eq!(g.to_string(), "0.5^n*u[n]");
        let v = g.value_at(3.0, &HashMap::new()).unwrap();
        assert!((v.re - 0.125).abs() < 1e-12);
    }
}
