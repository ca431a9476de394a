//! Netlist parser.
//!
//! Parses component descriptors into the netlist IR.
//!
//! # Supported syntax
//!
//! ```text
//! * comment line            (also # comment)
//! Rname n+ n- [value [ic]]  (resistor; value defaults to the name)
//! Lname n+ n- [value [ic]]  (inductor, initial current)
//! Cname n+ n- [value [ic]]  (capacitor, initial voltage)
//! Zname n+ n- value         (impedance in s)
//! Yname n+ n- value         (admittance in s)
//! Vname n+ n- [spec...]     (voltage source)
//! Iname n+ n- [spec...]     (current source, drives current out of n+)
//!     spec := dc x | ac mag [phase_deg [omega]] | s expr | step x | noise asd | expr
//! Ename o+ o- c+ c- gain    (VCVS)
//! Ename o+ o- opamp c+ c- [gain]
//! Gname o+ o- c+ c- gm      (VCCS, drives current out of o+)
//! Fname o+ o- Vctrl gain    (CCCS)
//! Hname o+ o- Vctrl r       (CCVS)
//! TFname p+ p- s+ s- k      (ideal transformer, V(p) = k V(s))
//! GYname p+ p- s+ s- r      (gyrator)
//! TPname p+ p- s+ s- A|B|G|H|Y|Z p11 p12 p21 p22
//! TLname p+ p- s+ s- z0 delay
//! Kname L1 L2 k             (mutual coupling)
//! SWname n1 n2 no|nc [time]
//! SWname n1 n2 n3 spdt [time]
//! Oname n1 n2 / Wname n1 n2 / Pname n1 n2
//! .END
//! ```
//!
//! Anything after `;` is a comma-separated list of `key=value` options.
//! Values are expressions; `{...}` groups one containing spaces.

use nom::branch::alt;
use nom::bytes::complete::{is_not, take_while1};
use nom::character::complete::{char, space0, space1};
use nom::combinator::{all_consuming, recognize};
use nom::multi::{many0, separated_list0};
use nom::sequence::delimited;
use nom::IResult;
use nom::Parser;

use crate::cas::{self, parse as cparse, Ratio, Signal, C64};
use crate::catalog::{self, Kind};
use crate::error::{Result, SymnodalError};
use crate::expr::{Domain, Expr, Omega, Quantity};
use crate::immittance::Immittance;
use crate::ir::{Component, Netlist, Params, SwitchMode};
use crate::session::Session;
use crate::superposition::Superposition;
use crate::twoport::ParamKind;

/// Parse a netlist string. Noise sources draw their identities from `session`.
pub fn parse(input: &str, session: &Session) -> Result<Netlist> {
    let mut components: Vec<Component> = Vec::new();

    for (line_num, raw_line) in input.lines().enumerate() {
        let line = raw_line.trim();

        // Skip blank lines and comments
        if line.is_empty() || line.starts_with('*') || line.starts_with('#') {
            continue;
        }

        if line.eq_ignore_ascii_case(".END") {
            break;
        }
        if line.starts_with('.') {
            return Err(parse_err(line_num, raw_line, "unsupported directive"));
        }

        let comp = parse_line(line, session).map_err(|e| parse_err(line_num, raw_line, &e))?;
        if components.iter().any(|c| c.name == comp.name) {
            return Err(parse_err(
                line_num,
                raw_line,
                &format!("duplicate component name '{}'", comp.name),
            ));
        }
        components.push(comp);
    }

    Ok(Netlist { components })
}

/// Parse one descriptor line.
pub fn parse_line(line: &str, session: &Session) -> std::result::Result<Component, String> {
    let (body, options) = split_options(line)?;
    let tokens = tokenize(body)?;
    let (name, args) = tokens
        .split_first()
        .ok_or_else(|| "empty descriptor".to_string())?;
    let entry = catalog::lookup(name).ok_or_else(|| format!("unknown element '{}'", name))?;

    let mut comp = match entry.kind {
        Kind::Resistor | Kind::Inductor | Kind::Capacitor => parse_rlc(name, entry.kind, args)?,
        Kind::Impedance | Kind::Admittance => parse_immittance(name, entry.kind, args)?,
        Kind::VoltageSource | Kind::CurrentSource => parse_source(name, entry.kind, args, session)?,
        Kind::Vcvs | Kind::Opamp => parse_vcvs(name, args)?,
        Kind::Vccs | Kind::Transformer | Kind::Gyrator => parse_four_terminal(name, entry.kind, args)?,
        Kind::Cccs | Kind::Ccvs => parse_controlled(name, entry.kind, args)?,
        Kind::TwoPort => parse_two_port(name, args)?,
        Kind::TransmissionLine => parse_line_params(name, args)?,
        Kind::Coupling => parse_coupling(name, args)?,
        Kind::Switch => parse_switch(name, args)?,
        Kind::Open | Kind::Wire | Kind::Port => {
            let nodes = take_nodes(args, 2)?;
            expect_end(&args[2..])?;
            component(name, entry.kind, nodes, Params::None)
        }
        Kind::Diode | Kind::Bjt | Kind::Mosfet | Kind::Jfet | Kind::Logic => {
            let nodes = args.iter().map(|t| t.to_string()).collect();
            component(name, entry.kind, nodes, Params::None)
        }
    };
    comp.options = options;
    Ok(comp)
}

fn parse_err(line_num: usize, raw_line: &str, detail: &str) -> SymnodalError {
    SymnodalError::Parse(format!("line {}: {} in: {}", line_num + 1, detail, raw_line))
}

fn component(name: &str, kind: Kind, nodes: Vec<String>, params: Params) -> Component {
    Component {
        name: name.to_string(),
        kind,
        nodes,
        params,
        options: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Token parsers
// ---------------------------------------------------------------------------

/// A `{...}` group, nesting allowed.
fn braced(input: &str) -> IResult<&str, &str> {
    recognize(delimited(
        char('{'),
        many0(alt((braced, is_not("{}")))),
        char('}'),
    ))
    .parse(input)
}

fn token(input: &str) -> IResult<&str, &str> {
    alt((braced, take_while1(|c: char| !c.is_whitespace()))).parse(input)
}

fn tokenize(body: &str) -> std::result::Result<Vec<&str>, String> {
    let (_, tokens) = all_consuming(delimited(
        space0,
        separated_list0(space1, token),
        space0,
    ))
    .parse(body)
    .map_err(|_| "unbalanced braces".to_string())?;
    Ok(tokens)
}

/// Parse a node identifier (e.g. "0", "GND", "out", "sub.n1").
fn node_id(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '.').parse(input)
}

fn take_nodes(args: &[&str], n: usize) -> std::result::Result<Vec<String>, String> {
    if args.len() < n {
        return Err(format!("expected {} nodes, found {}", n, args.len()));
    }
    args[..n]
        .iter()
        .map(|t| match all_consuming(node_id).parse(t) {
            Ok((_, id)) => Ok(id.to_string()),
            Err(_) => Err(format!("invalid node name '{}'", t)),
        })
        .collect()
}

fn expect_end(rest: &[&str]) -> std::result::Result<(), String> {
    match rest.first() {
        Some(t) => Err(format!("unexpected argument '{}'", t)),
        None => Ok(()),
    }
}

/// Splits `body ; opt=val, flag` at the first `;` outside braces.
fn split_options(line: &str) -> std::result::Result<(&str, Vec<(String, Option<String>)>), String> {
    let mut depth = 0i32;
    let mut cut = None;
    for (i, c) in line.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth -= 1,
            ';' if depth == 0 => {
                cut = Some(i);
                break;
            }
            _ => {}
        }
    }
    let Some(i) = cut else {
        return Ok((line, Vec::new()));
    };
    let options = line[i + 1..]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|opt| match opt.split_once('=') {
            Some((k, v)) => (k.trim().to_string(), Some(v.trim().to_string())),
            None => (opt.to_string(), None),
        })
        .collect();
    Ok((&line[..i], options))
}

/// Strips one level of grouping braces.
fn unbrace(tok: &str) -> &str {
    tok.strip_prefix('{')
        .and_then(|t| t.strip_suffix('}'))
        .unwrap_or(tok)
}

fn ratio(tok: &str) -> std::result::Result<Ratio, String> {
    let text = unbrace(tok);
    cparse::parse(text)
        .and_then(|ast| cparse::to_ratio(&ast))
        .map_err(|e| format!("bad value '{}': {}", text, e))
}

/// A value that must not use any domain variable.
fn constant(tok: &str) -> std::result::Result<Ratio, String> {
    let r = ratio(tok)?;
    match r
        .free_symbols()
        .into_iter()
        .find(|s| cas::RESERVED.contains(&s.as_str()))
    {
        Some(v) => Err(format!("value '{}' cannot depend on '{}'", tok, v)),
        None => Ok(r),
    }
}

fn number(tok: &str) -> std::result::Result<f64, String> {
    constant(tok)?
        .as_real()
        .ok_or_else(|| format!("expected a real number, found '{}'", tok))
}

// ---------------------------------------------------------------------------
// Passive components
// ---------------------------------------------------------------------------

/// Rname n+ n- [value [ic]]
fn parse_rlc(name: &str, kind: Kind, args: &[&str]) -> std::result::Result<Component, String> {
    let nodes = take_nodes(args, 2)?;
    let rest = &args[2..];
    let value = match rest.first() {
        Some(t) => constant(t)?,
        None => Ratio::symbol(name),
    };
    let ic = match rest.get(1) {
        Some(t) if kind == Kind::Resistor => return Err(format!("unexpected argument '{}'", t)),
        Some(t) => Some(constant(t)?),
        None => None,
    };
    expect_end(rest.get(2..).unwrap_or(&[]))?;
    Ok(component(name, kind, nodes, Params::Value { value, ic }))
}

/// Zname n+ n- value
fn parse_immittance(name: &str, kind: Kind, args: &[&str]) -> std::result::Result<Component, String> {
    let nodes = take_nodes(args, 2)?;
    let rest = &args[2..];
    let value = match rest.first() {
        Some(t) => ratio(t)?,
        None => Ratio::symbol(name),
    };
    Immittance::impedance(value.clone()).map_err(|e| e.to_string())?;
    expect_end(rest.get(1..).unwrap_or(&[]))?;
    Ok(component(name, kind, nodes, Params::Value { value, ic: None }))
}

// ---------------------------------------------------------------------------
// Independent sources
// ---------------------------------------------------------------------------

const SOURCE_KEYWORDS: [&str; 5] = ["dc", "ac", "s", "step", "noise"];

fn is_keyword(tok: &str) -> bool {
    SOURCE_KEYWORDS.iter().any(|k| tok.eq_ignore_ascii_case(k))
}

/// Vname n+ n- [dc x] [ac mag [phase [omega]]] [s expr] [step x] [noise asd] [expr]
fn parse_source(
    name: &str,
    kind: Kind,
    args: &[&str],
    session: &Session,
) -> std::result::Result<Component, String> {
    let nodes = take_nodes(args, 2)?;
    let quantity = match kind {
        Kind::VoltageSource => Quantity::Voltage,
        _ => Quantity::Current,
    };
    let mut value = Superposition::new(quantity);
    let mut add = |e: Expr| value.add_expr(e.with_quantity(quantity)).map_err(|e| e.to_string());

    let mut rest = &args[2..];
    if rest.is_empty() {
        add(Expr::constant(Ratio::symbol(name)).map_err(|e| e.to_string())?)?;
    }
    while let Some((head, tail)) = rest.split_first() {
        let keyword = head.to_ascii_lowercase();
        let operand = |i: usize| -> std::result::Result<&str, String> {
            tail.get(i)
                .copied()
                .ok_or_else(|| format!("'{}' needs a value", keyword))
        };
        rest = match keyword.as_str() {
            "dc" => {
                add(Expr::constant(constant(operand(0)?)?).map_err(|e| e.to_string())?)?;
                &tail[1..]
            }
            "ac" => {
                let mag = constant(operand(0)?)?;
                let extra: Vec<&str> = tail[1..]
                    .iter()
                    .take(2)
                    .take_while(|t| !is_keyword(t))
                    .copied()
                    .collect();
                let phase = match extra.first() {
                    Some(p) => number(p)?,
                    None => 0.0,
                };
                let omega = match extra.get(1) {
                    Some(w) => Omega::new(ratio(w)?).map_err(|e| e.to_string())?,
                    None => Omega::symbolic(),
                };
                let rot = Ratio::constant(C64::from_polar(1.0, phase.to_radians()));
                add(Expr::ac(omega, mag.mul(&rot)).map_err(|e| e.to_string())?)?;
                &tail[1 + extra.len()..]
            }
            "s" => {
                let text = unbrace(operand(0)?);
                add(Expr::parse(text, Domain::Laplace).map_err(|e| e.to_string())?)?;
                &tail[1..]
            }
            "step" => {
                let x = constant(operand(0)?)?;
                let step = Signal::step(cas::Family::Continuous, cas::T, 0.0).scale(&x);
                add(Expr::from_signal(step).map_err(|e| e.to_string())?)?;
                &tail[1..]
            }
            "noise" => {
                let asd = ratio(operand(0)?)?;
                add(Expr::noise_f(session.next_nid(), asd).map_err(|e| e.to_string())?)?;
                &tail[1..]
            }
            _ => {
                let e = Expr::parse_any(unbrace(head)).map_err(|e| e.to_string())?;
                add(e)?;
                tail
            }
        };
    }
    Ok(component(name, kind, nodes, Params::Source(value)))
}

// ---------------------------------------------------------------------------
// Controlled sources and two-ports
// ---------------------------------------------------------------------------

/// Ename o+ o- c+ c- gain | Ename o+ o- opamp c+ c- [gain]
fn parse_vcvs(name: &str, args: &[&str]) -> std::result::Result<Component, String> {
    let is_opamp = args.get(2).is_some_and(|t| t.eq_ignore_ascii_case("opamp"));
    if !is_opamp {
        return parse_four_terminal(name, Kind::Vcvs, args);
    }
    let mut nodes = take_nodes(args, 2)?;
    nodes.extend(take_nodes(&args[3..], 2)?);
    let rest = &args[5..];
    let gain = rest.first().map(|t| constant(t)).transpose()?;
    expect_end(rest.get(1..).unwrap_or(&[]))?;
    Ok(component(name, Kind::Opamp, nodes, Params::Opamp { gain }))
}

/// Xname n1 n2 n3 n4 value
fn parse_four_terminal(name: &str, kind: Kind, args: &[&str]) -> std::result::Result<Component, String> {
    let nodes = take_nodes(args, 4)?;
    let rest = &args[4..];
    let value = match rest.first() {
        Some(t) => constant(t)?,
        None => Ratio::symbol(name),
    };
    expect_end(rest.get(1..).unwrap_or(&[]))?;
    Ok(component(name, kind, nodes, Params::Value { value, ic: None }))
}

/// Fname o+ o- Vctrl gain
fn parse_controlled(name: &str, kind: Kind, args: &[&str]) -> std::result::Result<Component, String> {
    let nodes = take_nodes(args, 2)?;
    let control = args
        .get(2)
        .ok_or_else(|| "missing controlling component".to_string())?
        .to_string();
    let gain = match args.get(3) {
        Some(t) => constant(t)?,
        None => Ratio::symbol(name),
    };
    expect_end(args.get(4..).unwrap_or(&[]))?;
    Ok(component(name, kind, nodes, Params::Controlled { control, gain }))
}

/// TPname p+ p- s+ s- kind p11 p12 p21 p22
fn parse_two_port(name: &str, args: &[&str]) -> std::result::Result<Component, String> {
    let nodes = take_nodes(args, 4)?;
    let rest = &args[4..];
    let params = rest
        .first()
        .and_then(|t| {
            let mut chars = t.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => ParamKind::from_char(c),
                _ => None,
            }
        })
        .ok_or_else(|| "expected parameter kind A, B, G, H, Y or Z".to_string())?;
    if rest.len() != 5 {
        return Err(format!("expected four parameters, found {}", rest.len().saturating_sub(1)));
    }
    let p: Vec<Ratio> = rest[1..].iter().map(|t| ratio(t)).collect::<std::result::Result<_, _>>()?;
    let m = [[p[0].clone(), p[1].clone()], [p[2].clone(), p[3].clone()]];
    Ok(component(name, Kind::TwoPort, nodes, Params::TwoPort { params, m }))
}

/// TLname p+ p- s+ s- z0 delay
fn parse_line_params(name: &str, args: &[&str]) -> std::result::Result<Component, String> {
    let nodes = take_nodes(args, 4)?;
    let rest = &args[4..];
    if rest.len() != 2 {
        return Err("expected characteristic impedance and delay".to_string());
    }
    let z0 = number(rest[0])?;
    let delay = number(rest[1])?;
    if z0 <= 0.0 || delay < 0.0 {
        return Err("characteristic impedance must be positive and delay non-negative".to_string());
    }
    Ok(component(name, Kind::TransmissionLine, nodes, Params::Line { z0, delay }))
}

/// Kname L1 L2 k
fn parse_coupling(name: &str, args: &[&str]) -> std::result::Result<Component, String> {
    let [l1, l2, rest @ ..] = args else {
        return Err("expected two inductor names".to_string());
    };
    let k = match rest.first() {
        Some(t) => constant(t)?,
        None => Ratio::symbol(name),
    };
    expect_end(rest.get(1..).unwrap_or(&[]))?;
    Ok(component(
        name,
        Kind::Coupling,
        Vec::new(),
        Params::Coupling {
            l1: l1.to_string(),
            l2: l2.to_string(),
            k,
        },
    ))
}

/// SWname n1 n2 no|nc [time] | SWname n1 n2 n3 spdt [time]
fn parse_switch(name: &str, args: &[&str]) -> std::result::Result<Component, String> {
    let mode_at = args
        .iter()
        .position(|t| ["no", "nc", "spdt"].iter().any(|m| t.eq_ignore_ascii_case(m)))
        .ok_or_else(|| "expected switch mode no, nc or spdt".to_string())?;
    let mode = match args[mode_at].to_ascii_lowercase().as_str() {
        "no" => SwitchMode::NormallyOpen,
        "nc" => SwitchMode::NormallyClosed,
        _ => SwitchMode::Changeover,
    };
    let n_nodes = if mode == SwitchMode::Changeover { 3 } else { 2 };
    if mode_at != n_nodes {
        return Err(format!("{} switch needs {} nodes", args[mode_at], n_nodes));
    }
    let nodes = take_nodes(args, n_nodes)?;
    let rest = &args[mode_at + 1..];
    let at = match rest.first() {
        Some(t) => number(t)?,
        None => 0.0,
    };
    expect_end(rest.get(1..).unwrap_or(&[]))?;
    Ok(component(name, Kind::Switch, nodes, Params::Switch { mode, at }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::superposition::Key;
    use approx::assert_abs_diff_eq;

    fn one(line: &str) -> Component {
        parse_line(line, &Session::new()).unwrap()
    }

    #[test]
    fn test_parse_resistor() {
        let c = one("R1 1 2 10k");
        assert_eq!(c.kind, Kind::Resistor);
        assert_eq!(c.nodes, vec!["1", "2"]);
        assert_abs_diff_eq!(c.value().unwrap().as_real().unwrap(), 1e4, epsilon = 1e-9);
    }

    #[test]
    fn test_default_value_is_name() {
        let c = one("Rload out 0");
        assert_eq!(c.value().unwrap(), &Ratio::symbol("Rload"));
    }

    #[test]
    fn test_capacitor_initial_condition() {
        let c = one("C1 out 0 1u 2.5");
        assert_abs_diff_eq!(c.initial_condition().unwrap().as_real().unwrap(), 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_braced_expression() {
        let c = one("Z1 a b {R + 1 / (s * C)}");
        assert!(c.value().unwrap().contains("s"));
        assert!(c.value().unwrap().contains("C"));
    }

    #[test]
    fn test_options_after_semicolon() {
        let c = one("R1 1 0 5; right, color=blue");
        assert_eq!(c.options.len(), 2);
        assert_eq!(c.options[1], ("color".to_string(), Some("blue".to_string())));
    }

    #[test]
    fn test_source_specs() {
        let c = one("V1 1 0 dc 5 ac 2 90 100");
        let src = c.source().unwrap();
        assert_eq!(src.dc().unwrap(), Expr::real(5.0));
        let ac = src.ac().unwrap();
        assert_eq!(ac.len(), 1);
        assert_eq!(ac[0].0, Omega::numeric(100.0));
        let v = ac[0].1.ratio().unwrap().as_constant().unwrap();
        assert_abs_diff_eq!(v.im, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bare_source_value_is_dc() {
        let c = one("I1 0 1 2m");
        assert!(c.source().unwrap().is_dc().unwrap());
    }

    #[test]
    fn test_step_source() {
        let c = one("V1 1 0 step 1");
        let src = c.source().unwrap();
        assert!(src.terms().contains_key(&Key::T));
    }

    #[test]
    fn test_noise_sources_get_distinct_ids() {
        let session = Session::new();
        let a = parse_line("I1 1 0 noise 3", &session).unwrap();
        let b = parse_line("I2 1 0 noise 4", &session).unwrap();
        let na = a.source().unwrap().noise_terms()[0].0;
        let nb = b.source().unwrap().noise_terms()[0].0;
        assert_ne!(na, nb);
    }

    #[test]
    fn test_two_letter_kinds() {
        assert_eq!(one("TF1 1 0 2 0 3").kind, Kind::Transformer);
        assert_eq!(one("GY1 1 0 2 0 50").kind, Kind::Gyrator);
        assert_eq!(one("TL1 1 0 2 0 50 1n").kind, Kind::TransmissionLine);
        assert_eq!(one("TP1 1 0 2 0 Z 1 2 3 4").kind, Kind::TwoPort);
    }

    #[test]
    fn test_opamp() {
        let c = one("E1 out 0 opamp p m");
        assert_eq!(c.kind, Kind::Opamp);
        assert_eq!(c.nodes, vec!["out", "0", "p", "m"]);
        assert!(matches!(c.params, Params::Opamp { gain: None }));
    }

    #[test]
    fn test_controlled_and_coupling() {
        let f = one("F1 2 0 V1 10");
        assert!(matches!(&f.params, Params::Controlled { control, .. } if control == "V1"));
        let k = one("K1 L1 L2 0.5");
        assert!(k.nodes.is_empty());
    }

    #[test]
    fn test_switch() {
        let c = one("SW1 1 2 no 1m");
        assert!(matches!(
            c.params,
            Params::Switch { mode: SwitchMode::NormallyOpen, at } if (at - 1e-3).abs() < 1e-15
        ));
        assert!(parse_line("SW2 1 2 3 spdt", &Session::new()).is_ok());
        assert!(parse_line("SW3 1 2 3 no", &Session::new()).is_err());
    }

    #[test]
    fn test_netlist_and_errors() {
        let session = Session::new();
        let n = parse("* divider\nV1 1 0 10\nR1 1 2 1\n\n# bottom\nR2 2 0 1\n.end\nR3 9 9 1", &session)
            .unwrap();
        assert_eq!(n.components.len(), 3);

        let err = parse("R1 1 0 1\nR1 2 0 1", &session).unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(parse("X1 1 0 1", &session).is_err());
        assert!(parse("R1 1 0 {1 + 2", &session).is_err());
        assert!(parse("R1 1 0 t", &session).is_err());
    }

    #[test]
    fn test_nonlinear_parses_for_later_rejection() {
        assert_eq!(one("D1 a k dmod").kind, Kind::Diode);
    }
}
