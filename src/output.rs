//! Results output formatting (CSV).

use std::io::Write;

use crate::cas::C64;
use crate::error::Result;
use crate::statespace::StateSpace;
use crate::superposition::Superposition;

/// Quotes a field when it holds a separator or a quote.
fn field(text: &str) -> String {
    if text.contains([',', '"', '\n']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// Write every part of each named superposition as CSV.
///
/// Format:
/// ```csv
/// Variable,Part,Expression
/// V(1),dc,5
/// V(2),s,1/(s + 1)
/// ```
pub fn write_parts_csv<W: Write>(rows: &[(String, Superposition)], writer: &mut W) -> Result<()> {
    writeln!(writer, "Variable,Part,Expression")?;
    for (name, value) in rows {
        let parts = value.summary()?;
        if parts.is_empty() {
            writeln!(writer, "{},dc,0", field(name))?;
        }
        for (part, expr) in parts {
            writeln!(writer, "{},{},{}", field(name), part, field(&expr))?;
        }
    }
    Ok(())
}

/// Write single expressions as CSV.
///
/// Format:
/// ```csv
/// Variable,Expression
/// v(2),1 - exp(-t)
/// ```
pub fn write_expressions_csv<W: Write>(rows: &[(String, String)], writer: &mut W) -> Result<()> {
    writeln!(writer, "Variable,Expression")?;
    for (name, expr) in rows {
        writeln!(writer, "{},{}", field(name), field(expr))?;
    }
    Ok(())
}

/// Write sampled time responses as CSV.
///
/// Format:
/// ```csv
/// Time,V(1),V(2)
/// 0,1,0
/// 0.1,1,0.095
/// ```
pub fn write_time_csv<W: Write>(
    times: &[f64],
    series: &[(String, Vec<f64>)],
    writer: &mut W,
) -> Result<()> {
    write!(writer, "Time")?;
    for (name, _) in series {
        write!(writer, ",{}", field(name))?;
    }
    writeln!(writer)?;

    for (ti, t) in times.iter().enumerate() {
        write!(writer, "{}", t)?;
        for (_, values) in series {
            write!(writer, ",{}", values[ti])?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Write sampled frequency responses as CSV.
///
/// Format:
/// ```csv
/// Frequency,V(2)_mag,V(2)_phase_deg
/// 0.1,0.998,-3.6
/// ```
pub fn write_frequency_csv<W: Write>(
    freqs: &[f64],
    series: &[(String, Vec<C64>)],
    writer: &mut W,
) -> Result<()> {
    write!(writer, "Frequency")?;
    for (name, _) in series {
        write!(writer, ",{}_mag,{}_phase_deg", field(name), field(name))?;
    }
    writeln!(writer)?;

    for (fi, freq) in freqs.iter().enumerate() {
        write!(writer, "{}", freq)?;
        for (_, values) in series {
            let v = values[fi];
            write!(writer, ",{},{}", v.norm(), v.arg().to_degrees())?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Write state and output equations as CSV.
///
/// Format:
/// ```csv
/// Equation,Expression
/// d/dt i_L1,-2*i_L1 - v_C1 + v_V1
/// v_1,v_V1
/// ```
pub fn write_state_space_csv<W: Write>(ss: &StateSpace, writer: &mut W) -> Result<()> {
    writeln!(writer, "Equation,Expression")?;
    for (x, rhs) in ss.state_equations() {
        writeln!(writer, "d/dt {},{}", field(&x), field(&rhs.to_string()))?;
    }
    for (y, rhs) in ss.output_equations() {
        writeln!(writer, "{},{}", field(&y), field(&rhs.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Circuit;
    use crate::session::Session;

    fn text(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_parts_csv() {
        let c = Circuit::parse("V1 1 0 10\nR1 1 2 1\nR2 2 0 1", Session::new()).unwrap();
        let mut buf = Vec::new();
        write_parts_csv(&c.node_voltages().unwrap(), &mut buf).unwrap();
        let out = text(buf);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Variable,Part,Expression");
        assert_eq!(lines[1], "1,dc,10");
        assert_eq!(lines[2], "2,dc,5");
    }

    #[test]
    fn test_time_csv() {
        let mut buf = Vec::new();
        let series = vec![("V(1)".to_string(), vec![1.0, 2.0])];
        write_time_csv(&[0.0, 0.5], &series, &mut buf).unwrap();
        assert_eq!(text(buf), "Time,V(1)\n0,1\n0.5,2\n");
    }

    #[test]
    fn test_frequency_csv() {
        let mut buf = Vec::new();
        let series = vec![("H".to_string(), vec![C64::new(2.0, 0.0)])];
        write_frequency_csv(&[1.0], &series, &mut buf).unwrap();
        assert_eq!(text(buf), "Frequency,H_mag,H_phase_deg\n1,2,0\n");
    }

    #[test]
    fn test_fields_are_quoted() {
        assert_eq!(field("a,b"), "\"a,b\"");
        assert_eq!(field("plain"), "plain");
    }

    #[test]
    fn test_state_space_csv() {
        let c = Circuit::parse("V1 1 0 1\nR1 1 2 1\nC1 2 0 1", Session::new()).unwrap();
        let mut buf = Vec::new();
        write_state_space_csv(&c.state_space().unwrap(), &mut buf).unwrap();
        let out = text(buf);
        assert!(out.starts_with("Equation,Expression\nd/dt v_C1,"));
        assert_eq!(out.lines().count(), 5);
    }
}
