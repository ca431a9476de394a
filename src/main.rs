use std::collections::HashMap;
use std::io::{self, Write};

use clap::{Parser, ValueEnum};
use symnodal::cas::parse::eng_value;
use symnodal::circuit::Circuit;
use symnodal::error::{Result, SymnodalError};
use symnodal::output;
use symnodal::session::Session;
use symnodal::superposition::Superposition;

/// Symbolic linear circuit analysis
#[derive(Parser)]
#[command(name = "symnodal", version)]
struct Cli {
    /// Netlist file to analyse
    netlist: String,

    /// Node to report; repeat for several, all nodes when omitted
    #[arg(long = "node")]
    nodes: Vec<String>,

    /// Domain the node voltages are reported in
    #[arg(long, value_enum, default_value_t = DomainArg::Parts)]
    domain: DomainArg,

    /// Symbol values as name=value pairs, e.g. R1=1k,C1=10u
    #[arg(long, value_delimiter = ',')]
    values: Vec<String>,

    /// Print the state-space equations instead of node voltages
    #[arg(long)]
    state_space: bool,

    /// Sample time-domain voltages at start:stop:count and write them as CSV
    #[arg(long)]
    csv: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum DomainArg {
    /// Superposition parts: dc, ac, s, t and noise
    Parts,
    /// Laplace domain
    S,
    /// Time domain
    T,
}

fn parse_values(pairs: &[String]) -> Result<HashMap<String, f64>> {
    pairs
        .iter()
        .map(|pair| {
            let bad = || SymnodalError::Parse(format!("expected name=value, got '{}'", pair));
            let (name, value) = pair.split_once('=').ok_or_else(bad)?;
            match eng_value(value.trim()) {
                Ok(("", v)) => Ok((name.trim().to_string(), v)),
                _ => Err(bad()),
            }
        })
        .collect()
}

fn parse_samples(spec: &str) -> Result<Vec<f64>> {
    let bad = || SymnodalError::Parse(format!("expected start:stop:count, got '{}'", spec));
    let parts: Vec<&str> = spec.split(':').collect();
    let [start, stop, count] = parts.as_slice() else {
        return Err(bad());
    };
    let number = |s: &str| match eng_value(s.trim()) {
        Ok(("", v)) => Ok(v),
        _ => Err(bad()),
    };
    let (start, stop) = (number(start)?, number(stop)?);
    let count: usize = count.trim().parse().map_err(|_| bad())?;
    if count < 2 {
        return Ok(vec![start]);
    }
    let step = (stop - start) / (count - 1) as f64;
    Ok((0..count).map(|i| start + step * i as f64).collect())
}

fn run(cli: &Cli) -> Result<()> {
    let input = std::fs::read_to_string(&cli.netlist)?;
    let circuit = Circuit::parse(&input, Session::new())?;
    let circuit = circuit.with_values(&parse_values(&cli.values)?)?;
    let mut stdout = io::stdout().lock();

    if cli.state_space {
        let ss = circuit.state_space()?;
        return output::write_state_space_csv(&ss, &mut stdout);
    }

    let nodes: Vec<String> = if cli.nodes.is_empty() {
        circuit.netlist().node_names()
    } else {
        cli.nodes.clone()
    };
    let voltages: Vec<(String, Superposition)> = nodes
        .iter()
        .map(|n| Ok((format!("V({})", n), circuit.node_voltage(n)?)))
        .collect::<Result<_>>()?;

    if let Some(spec) = &cli.csv {
        let times = parse_samples(spec)?;
        let series = voltages
            .iter()
            .map(|(name, v)| Ok((name.clone(), v.time()?.transient_response(&times)?)))
            .collect::<Result<Vec<_>>>()?;
        return output::write_time_csv(&times, &series, &mut stdout);
    }

    match cli.domain {
        DomainArg::Parts => output::write_parts_csv(&voltages, &mut stdout)?,
        DomainArg::S | DomainArg::T => {
            let rows = voltages
                .iter()
                .map(|(name, v)| {
                    let e = match cli.domain {
                        DomainArg::S => v.laplace()?,
                        _ => v.time()?,
                    };
                    Ok((name.clone(), e.to_string()))
                })
                .collect::<Result<Vec<_>>>()?;
            output::write_expressions_csv(&rows, &mut stdout)?;
        }
    }
    stdout.flush()?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
