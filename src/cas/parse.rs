//! Expression grammar.
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := ('-' | '+') unary | power
//! power  := atom (('^' | '**') unary)?
//! atom   := number | call | ident | '(' expr ')'
//! call   := ident '(' expr (',' expr)* ')' | ident '[' expr ']'
//! ```
//!
//! Numbers take SPICE engineering suffixes (T, G, MEG, K, M, U, N, P, F)
//! when the suffix is not followed by further identifier characters.

use nom::branch::alt;
use nom::bytes::complete::{tag, tag_no_case, take_while, take_while1};
use nom::character::complete::{char, multispace0, one_of};
use nom::combinator::{map, not, opt, peek, recognize, value};
use nom::multi::{many0, separated_list1};
use nom::number::complete::double;
use nom::sequence::{delimited, preceded};
use nom::{IResult, Parser};

use super::delayed::Delayed;
use super::poly::{fmt_real, C64};
use super::ratio::Ratio;
use super::signal::{Family, Signal, Support};
use crate::error::{Result, SymnodalError};

#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Num(f64),
    Imag,
    Pi,
    Sym(String),
    Neg(Box<Ast>),
    Add(Box<Ast>, Box<Ast>),
    Sub(Box<Ast>, Box<Ast>),
    Mul(Box<Ast>, Box<Ast>),
    Div(Box<Ast>, Box<Ast>),
    Pow(Box<Ast>, Box<Ast>),
    Call(String, Vec<Ast>),
}

impl Ast {
    /// Symbol names referenced by the expression, excluding `j` and `pi`.
    pub fn symbols(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_symbols(&mut out);
        out.sort();
        out.dedup();
        out
    }

    fn collect_symbols(&self, out: &mut Vec<String>) {
        match self {
            Ast::Sym(name) => out.push(name.clone()),
            Ast::Neg(a) => a.collect_symbols(out),
            Ast::Add(a, b) | Ast::Sub(a, b) | Ast::Mul(a, b) | Ast::Div(a, b) | Ast::Pow(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
            Ast::Call(_, args) => args.iter().for_each(|a| a.collect_symbols(out)),
            Ast::Num(_) | Ast::Imag | Ast::Pi => {}
        }
    }

    pub fn has_symbol(&self, name: &str) -> bool {
        self.symbols().iter().any(|s| s == name)
    }
}

// ---------------------------------------------------------------------------
// Grammar
// ---------------------------------------------------------------------------

fn ws<'a, O, P>(inner: P) -> impl Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>
where
    P: Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Match an engineering suffix and return its multiplier.
fn eng_suffix(input: &str) -> IResult<&str, f64> {
    // MEG before M
    let (rest, mult) = alt((
        value(1e6, tag_no_case("MEG")),
        value(1e12, tag_no_case("T")),
        value(1e9, tag_no_case("G")),
        value(1e3, tag_no_case("K")),
        value(1e-3, tag_no_case("M")),
        value(1e-6, tag_no_case("U")),
        value(1e-9, tag_no_case("N")),
        value(1e-12, tag_no_case("P")),
        value(1e-15, tag_no_case("F")),
    ))
    .parse(input)?;
    let (rest, _) = not(peek(take_while1(is_ident_char))).parse(rest)?;
    Ok((rest, mult))
}

/// Unsigned number with an optional engineering suffix.
pub fn eng_number(input: &str) -> IResult<&str, f64> {
    // double also takes a sign and nan/inf
    let (rest, _) = peek(one_of("0123456789.")).parse(input)?;
    let (rest, num) = double(rest)?;
    let (rest, suffix) = opt(eng_suffix).parse(rest)?;
    Ok((rest, num * suffix.unwrap_or(1.0)))
}

/// Signed number with an optional engineering suffix, e.g. `-4.7u`, `10k`, `1MEG`.
pub fn eng_value(input: &str) -> IResult<&str, f64> {
    let (rest, sign) = opt(one_of("+-")).parse(input)?;
    let (rest, v) = eng_number(rest)?;
    Ok((rest, if sign == Some('-') { -v } else { v }))
}

fn ident(input: &str) -> IResult<&str, &str> {
    recognize((
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))
    .parse(input)
}

fn call(input: &str) -> IResult<&str, Ast> {
    let (rest, name) = ident(input)?;
    let (rest, args) = alt((
        delimited(ws(char('(')), separated_list1(ws(char(',')), expr), ws(char(')'))),
        map(delimited(ws(char('[')), expr, ws(char(']'))), |a| vec![a]),
    ))
    .parse(rest)?;
    Ok((rest, Ast::Call(name.to_string(), args)))
}

fn atom(input: &str) -> IResult<&str, Ast> {
    ws(alt((
        map(eng_number, Ast::Num),
        call,
        map(ident, |name: &str| match name {
            "j" => Ast::Imag,
            "pi" => Ast::Pi,
            _ => Ast::Sym(name.to_string()),
        }),
        delimited(char('('), expr, char(')')),
        delimited(char('{'), expr, char('}')),
    )))
    .parse(input)
}

fn power(input: &str) -> IResult<&str, Ast> {
    let (rest, base) = atom(input)?;
    let (rest, exponent) = opt(preceded(ws(alt((tag("**"), tag("^")))), unary)).parse(rest)?;
    Ok(match exponent {
        Some(e) => (rest, Ast::Pow(Box::new(base), Box::new(e))),
        None => (rest, base),
    })
}

fn unary(input: &str) -> IResult<&str, Ast> {
    alt((
        map(preceded(ws(char('-')), unary), |a| Ast::Neg(Box::new(a))),
        preceded(ws(char('+')), unary),
        power,
    ))
    .parse(input)
}

fn term(input: &str) -> IResult<&str, Ast> {
    let (rest, first) = unary(input)?;
    let (rest, ops) = many0((ws(alt((char('*'), char('/')))), unary)).parse(rest)?;
    let ast = ops.into_iter().fold(first, |acc, (op, rhs)| match op {
        '*' => Ast::Mul(Box::new(acc), Box::new(rhs)),
        _ => Ast::Div(Box::new(acc), Box::new(rhs)),
    });
    Ok((rest, ast))
}

pub fn expr(input: &str) -> IResult<&str, Ast> {
    let (rest, first) = term(input)?;
    let (rest, ops) = many0((ws(alt((char('+'), char('-')))), term)).parse(rest)?;
    let ast = ops.into_iter().fold(first, |acc, (op, rhs)| match op {
        '+' => Ast::Add(Box::new(acc), Box::new(rhs)),
        _ => Ast::Sub(Box::new(acc), Box::new(rhs)),
    });
    Ok((rest, ast))
}

/// Parses a complete expression.
pub fn parse(text: &str) -> Result<Ast> {
    match expr(text) {
        Ok((rest, ast)) if rest.trim().is_empty() => Ok(ast),
        Ok((rest, _)) => Err(SymnodalError::Parse(format!(
            "unexpected trailing input '{}' in expression '{}'",
            rest.trim(),
            text
        ))),
        Err(e) => Err(SymnodalError::Parse(format!(
            "invalid expression '{}': {}",
            text, e
        ))),
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn unsupported(what: &str, ast: &Ast) -> SymnodalError {
    SymnodalError::Parse(format!("{} not supported in {:?}", what, ast))
}

fn integer_exponent(e: &Ratio) -> Option<i32> {
    let v = e.as_real()?;
    (v.fract() == 0.0 && v.abs() < 1e6).then_some(v as i32)
}

/// Evaluates an expression that contains no time functions.
pub fn to_ratio(ast: &Ast) -> Result<Ratio> {
    match ast {
        Ast::Num(x) => Ok(Ratio::real(*x)),
        Ast::Imag => Ok(Ratio::imag(1.0)),
        Ast::Pi => Ok(Ratio::real(std::f64::consts::PI)),
        Ast::Sym(name) => Ok(Ratio::symbol(name)),
        Ast::Neg(a) => Ok(to_ratio(a)?.neg()),
        Ast::Add(a, b) => Ok(to_ratio(a)?.add(&to_ratio(b)?)),
        Ast::Sub(a, b) => Ok(to_ratio(a)?.sub(&to_ratio(b)?)),
        Ast::Mul(a, b) => Ok(to_ratio(a)?.mul(&to_ratio(b)?)),
        Ast::Div(a, b) => to_ratio(a)?.div(&to_ratio(b)?),
        Ast::Pow(a, b) => pow_ratio(&to_ratio(a)?, &to_ratio(b)?, ast),
        Ast::Call(name, args) => {
            let [arg] = args.as_slice() else {
                return Err(unsupported("multi-argument call", ast));
            };
            apply_numeric(name, &to_ratio(arg)?, ast)
        }
    }
}

fn pow_ratio(base: &Ratio, exp: &Ratio, ast: &Ast) -> Result<Ratio> {
    if let Some(n) = integer_exponent(exp) {
        return base.powi(n);
    }
    match (base.as_constant(), exp.as_constant()) {
        (Some(x), Some(y)) => Ok(Ratio::constant(x.powc(y))),
        _ => Err(unsupported("symbolic non-integer power", ast)),
    }
}

/// Elementary function of a numeric argument.
fn apply_numeric(name: &str, x: &Ratio, ast: &Ast) -> Result<Ratio> {
    let c = x
        .as_constant()
        .ok_or_else(|| unsupported("function of a symbolic argument", ast))?;
    let v = match name {
        "exp" => c.exp(),
        "cos" => c.cos(),
        "sin" => c.sin(),
        "sqrt" => c.sqrt(),
        "abs" => C64::new(c.norm(), 0.0),
        _ => return Err(unsupported("function", ast)),
    };
    Ok(Ratio::constant(v))
}

/// `a·var + b` for an affine signal, `None` otherwise.
fn affine(s: &Signal) -> Option<(Ratio, Ratio)> {
    if !s.impulses().is_empty() {
        return None;
    }
    let unit = s.family().unit_rate();
    let mut a = Ratio::zero();
    let mut b = Ratio::zero();
    for t in s.terms() {
        if t.support != Support::Eternal || t.rate != unit {
            return None;
        }
        match t.power {
            0 => b = b.add(&t.coeff),
            1 => a = a.add(&t.coeff),
            _ => return None,
        }
    }
    Some((a, b))
}

fn numeric_shift(a: &Ratio, b: &Ratio, ast: &Ast) -> Result<(f64, f64)> {
    match (a.as_real(), b.as_real()) {
        (Some(a), Some(b)) if a != 0.0 => Ok((a, b)),
        _ => Err(unsupported("non-numeric or constant step/impulse argument", ast)),
    }
}

/// Evaluates an expression in the time (or sample) variable `var`.
pub fn to_signal(ast: &Ast, family: Family, var: &str) -> Result<Signal> {
    let rec = |a: &Ast| to_signal(a, family, var);
    match ast {
        Ast::Sym(name) if name == var => Ok(Signal::variable(family, var)),
        Ast::Num(_) | Ast::Imag | Ast::Pi | Ast::Sym(_) => {
            Ok(Signal::constant(family, var, to_ratio(ast)?))
        }
        Ast::Neg(a) => Ok(rec(a)?.neg()),
        Ast::Add(a, b) => rec(a)?.add(&rec(b)?),
        Ast::Sub(a, b) => rec(a)?.sub(&rec(b)?),
        Ast::Mul(a, b) => rec(a)?.mul(&rec(b)?),
        Ast::Div(a, b) => {
            let den = rec(b)?
                .as_constant()
                .ok_or_else(|| unsupported("division by a time-varying signal", ast))?;
            Ok(rec(a)?.scale(&den.inv()?))
        }
        Ast::Pow(a, b) => {
            let base = rec(a)?;
            let exp = rec(b)?;
            match (base.as_constant(), exp.as_constant()) {
                (Some(c), Some(e)) => Ok(Signal::constant(family, var, pow_ratio(&c, &e, ast)?)),
                (Some(c), None) => {
                    // c^(k·var + b0) = c^b0 · (c^k)^var
                    let (k, b0) = affine(&exp).ok_or_else(|| unsupported("non-affine exponent", ast))?;
                    let scale = pow_ratio(&c, &b0, ast)?;
                    let rate = match family {
                        Family::Discrete => pow_ratio(&c, &k, ast)?,
                        Family::Continuous => {
                            let ln = c
                                .as_constant()
                                .ok_or_else(|| unsupported("symbolic base of an exponential", ast))?
                                .ln();
                            k.mul(&Ratio::constant(ln))
                        }
                    };
                    Ok(Signal::exponential(family, var, scale, 0, rate, Support::Eternal))
                }
                (None, Some(e)) => {
                    let n = integer_exponent(&e)
                        .filter(|n| *n >= 0)
                        .ok_or_else(|| unsupported("non-integer power of a signal", ast))?;
                    let mut out = Signal::constant(family, var, Ratio::one());
                    for _ in 0..n {
                        out = out.mul(&base)?;
                    }
                    Ok(out)
                }
                (None, None) => Err(unsupported("signal raised to a signal", ast)),
            }
        }
        Ast::Call(name, args) => {
            let [arg] = args.as_slice() else {
                return Err(unsupported("multi-argument call", ast));
            };
            let x = rec(arg)?;
            if let Some(c) = x.as_constant() {
                if !matches!(name.as_str(), "u" | "H" | "heaviside" | "step" | "delta") {
                    return Ok(Signal::constant(family, var, apply_numeric(name, &c, ast)?));
                }
            }
            let (a, b) = affine(&x).ok_or_else(|| unsupported("non-affine argument", ast))?;
            match name.as_str() {
                "exp" => exp_signal(family, var, &a, &b, ast),
                "cos" | "sin" => {
                    let j = Ratio::imag(1.0);
                    let pos = exp_signal(family, var, &a.mul(&j), &b.mul(&j), ast)?;
                    let neg = exp_signal(family, var, &a.mul(&j).neg(), &b.mul(&j).neg(), ast)?;
                    if name == "cos" {
                        Ok(pos.add(&neg)?.scale(&Ratio::real(0.5)))
                    } else {
                        Ok(pos.sub(&neg)?.scale(&Ratio::imag(-0.5)))
                    }
                }
                "u" | "H" | "heaviside" | "step" => {
                    let (a, b) = numeric_shift(&a, &b, ast)?;
                    if a < 0.0 {
                        return Err(unsupported("time-reversed step", ast));
                    }
                    Ok(Signal::step(family, var, -b / a))
                }
                "delta" => {
                    let (a, b) = numeric_shift(&a, &b, ast)?;
                    let weight = match family {
                        Family::Continuous => 1.0 / a.abs(),
                        Family::Discrete => 1.0,
                    };
                    Ok(Signal::impulse(family, var, Ratio::real(weight), 0, -b / a))
                }
                _ => Err(unsupported("function", ast)),
            }
        }
    }
}

fn exp_signal(family: Family, var: &str, a: &Ratio, b: &Ratio, ast: &Ast) -> Result<Signal> {
    let scale = if b.is_zero() {
        Ratio::one()
    } else {
        let c = b
            .as_constant()
            .ok_or_else(|| unsupported("symbolic offset inside exp", ast))?;
        Ratio::constant(c.exp())
    };
    let rate = match family {
        Family::Continuous => a.clone(),
        Family::Discrete => {
            let c = a
                .as_constant()
                .ok_or_else(|| unsupported("symbolic discrete exponential", ast))?;
            Ratio::constant(c.exp())
        }
    };
    Ok(Signal::exponential(family, var, scale, 0, rate, Support::Eternal))
}

/// Evaluates an expression in a transform variable whose delay kernel is
/// `exp(-kernel·var·T)`: `kernel` is 1 for `s`, `2πj` for `f`, `j` for `omega`.
pub fn to_delayed(ast: &Ast, var: &str, kernel: C64) -> Result<Delayed> {
    let rec = |a: &Ast| to_delayed(a, var, kernel);
    match ast {
        Ast::Num(_) | Ast::Imag | Ast::Pi | Ast::Sym(_) => Ok(Delayed::from_ratio(to_ratio(ast)?)),
        Ast::Neg(a) => Ok(rec(a)?.neg()),
        Ast::Add(a, b) => Ok(rec(a)?.add(&rec(b)?)),
        Ast::Sub(a, b) => Ok(rec(a)?.sub(&rec(b)?)),
        Ast::Mul(a, b) => Ok(rec(a)?.mul(&rec(b)?)),
        Ast::Div(a, b) => rec(a)?.div(&rec(b)?),
        Ast::Pow(a, b) => {
            let base = rec(a)?;
            let exp = to_ratio(b)?;
            if let Some(r) = base.as_ratio() {
                return Ok(Delayed::from_ratio(pow_ratio(&r, &exp, ast)?));
            }
            let n = integer_exponent(&exp)
                .filter(|n| *n >= 0)
                .ok_or_else(|| unsupported("non-integer power of a delayed term", ast))?;
            let mut out = Delayed::from_ratio(Ratio::one());
            for _ in 0..n {
                out = out.mul(&base);
            }
            Ok(out)
        }
        Ast::Call(name, args) if name == "exp" && args.len() == 1 && args[0].has_symbol(var) => {
            let arg = to_ratio(&args[0])?;
            let k = arg.linear_coefficient(var)?;
            let offset = arg.subs(var, &Ratio::zero())?;
            let coeff = k
                .as_constant()
                .ok_or_else(|| unsupported("symbolic delay", ast))?;
            let delay = -coeff / kernel;
            if delay.im.abs() > 1e-12 * delay.norm().max(1.0) {
                return Err(unsupported("complex delay", ast));
            }
            let scale = match offset.as_constant() {
                Some(c) => Ratio::constant(c.exp()),
                None => return Err(unsupported("symbolic offset inside exp", ast)),
            };
            Ok(Delayed::delayed(scale, delay.re))
        }
        Ast::Call(..) => Ok(Delayed::from_ratio(to_ratio(ast)?)),
    }
}

/// Formats a delay kernel for display.
pub fn kernel_label(var: &str, delay: f64) -> String {
    match var {
        "f" => format!("exp(-2*j*pi*f*{})", fmt_real(delay)),
        "omega" => format!("exp(-j*omega*{})", fmt_real(delay)),
        _ => format!("exp(-{}*{})", var, fmt_real(delay)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_eng_values() {
        assert_eq!(eng_value("10k").unwrap().1, 10e3);
        assert_eq!(eng_value("1MEG").unwrap().1, 1e6);
        assert!((eng_value("4.7u").unwrap().1 - 4.7e-6).abs() < 1e-20);
        assert_eq!(eng_value("-3.3").unwrap().1, -3.3);
        assert_eq!(eng_value("0.5"), Ok(("", 0.5)));
        assert_eq!(eng_value("2.5"), Ok(("", 2.5)));
        assert_eq!(eng_value(".25"), Ok(("", 0.25)));
        assert_eq!(eng_value("1.5k").unwrap().1, 1500.0);
        assert!(eng_value("inf").is_err());
        // identifier characters after a suffix letter are not a suffix
        let (rest, v) = eng_value("2pi").unwrap();
        assert_eq!(v, 2.0);
        assert_eq!(rest, "pi");
    }

    #[test]
    fn test_precedence() {
        let r = to_ratio(&parse("1 + 2*3^2 - -4/2").unwrap()).unwrap();
        assert!((r.as_real().unwrap() - 21.0).abs() < 1e-12);
    }

    #[test]
    fn test_symbolic_ratio() {
        let r = to_ratio(&parse("1/(s*R*C + 1)").unwrap()).unwrap();
        assert_eq!(r.den_degree("s"), 1);
        assert!(r.contains("R"));
    }

    #[test]
    fn test_signal_functions() {
        let s = to_signal(&parse("(1 - exp(-t))*u(t)").unwrap(), Family::Continuous, "t").unwrap();
        let v = s.value_at(2.0, &HashMap::new()).unwrap();
        assert!((v.re - (1.0 - (-2.0f64).exp())).abs() < 1e-12);

        let c = to_signal(&parse("3*cos(2*t)").unwrap(), Family::Continuous, "t").unwrap();
        assert_eq!(c.to_string(), "3*cos(2*t)");
    }

    #[test]
    fn test_delayed_exponential() {
        let d = to_delayed(&parse("exp(-2*s)/s").unwrap(), "s", C64::new(1.0, 0.0)).unwrap();
        assert_eq!(d.parts().len(), 1);
        assert!((d.parts()[0].0 - 2.0).abs() < 1e-15);
    }

    #[test]
    fn test_trailing_input_rejected() {
        assert!(parse("1 +").is_err());
        assert!(parse("2 3").is_err());
    }
}
