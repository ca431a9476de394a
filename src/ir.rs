//! Netlist intermediate representation.
//!
//! The parser produces a `Netlist` of component descriptors. Descriptors are
//! values: substitution, killing a source or resolving a switch builds a new
//! descriptor instead of mutating one in place.

use std::collections::BTreeSet;

use crate::cas::{self, Ratio};
use crate::catalog::{Flags, Kind};
use crate::error::{Result, SymnodalError};
use crate::expr::Expr;
use crate::superposition::Superposition;
use crate::twoport::{Matrix2, ParamKind};

/// Node identifier in the netlist (e.g., "0", "1", "out", "sub.3").
/// Ground is "0" or "GND"; the compiler maps these to the reference node.
pub type NodeId = String;

/// Returns true if the node identifier represents ground.
pub fn is_ground(node: &str) -> bool {
    node == "0" || node.eq_ignore_ascii_case("GND")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchMode {
    /// Normally open: closes at the switching time.
    NormallyOpen,
    /// Normally closed: opens at the switching time.
    NormallyClosed,
    /// Common node 1 moves from node 2 to node 3 at the switching time.
    Changeover,
}

/// Kind-specific arguments of a component.
#[derive(Debug, Clone)]
pub enum Params {
    None,
    /// R, L, C, Z, Y and the single-coefficient two-ports (TF, GY) and
    /// voltage-controlled sources (E, G).
    Value { value: Ratio, ic: Option<Ratio> },
    /// Independent source waveform.
    Source(Superposition),
    /// F and H: gain and the name of the component whose current controls it.
    Controlled { control: String, gain: Ratio },
    /// Op-amp open-loop gain; `None` is the ideal (nullor) limit.
    Opamp { gain: Option<Ratio> },
    TwoPort { params: ParamKind, m: Matrix2 },
    Line { z0: f64, delay: f64 },
    Coupling { l1: String, l2: String, k: Ratio },
    Switch { mode: SwitchMode, at: f64 },
}

/// A component descriptor parsed from one netlist line.
#[derive(Debug, Clone)]
pub struct Component {
    pub name: String,
    pub kind: Kind,
    pub nodes: Vec<NodeId>,
    pub params: Params,
    /// Free-form `key=value` annotations after `;`.
    pub options: Vec<(String, Option<String>)>,
}

impl Component {
    pub fn flags(&self) -> Flags {
        self.kind.flags()
    }

    /// Primary value of R, L, C, Z, Y, E, G, TF and GY.
    pub fn value(&self) -> Result<&Ratio> {
        match &self.params {
            Params::Value { value, .. } => Ok(value),
            Params::Controlled { gain, .. } => Ok(gain),
            _ => Err(SymnodalError::Compile(format!(
                "{} {} has no scalar value",
                self.kind, self.name
            ))),
        }
    }

    pub fn initial_condition(&self) -> Option<&Ratio> {
        match &self.params {
            Params::Value { ic, .. } => ic.as_ref(),
            _ => None,
        }
    }

    pub fn source(&self) -> Option<&Superposition> {
        match &self.params {
            Params::Source(s) => Some(s),
            _ => None,
        }
    }

    /// Positive and negative terminal.
    pub fn terminals(&self) -> Result<(&str, &str)> {
        match self.nodes.as_slice() {
            [p, m, ..] => Ok((p.as_str(), m.as_str())),
            _ => Err(SymnodalError::Compile(format!(
                "{} {} has fewer than two nodes",
                self.kind, self.name
            ))),
        }
    }

    /// Ports of a four-terminal component: `(p1+, p1-, p2+, p2-)`.
    pub fn ports(&self) -> Result<(&str, &str, &str, &str)> {
        match self.nodes.as_slice() {
            [a, b, c, d] => Ok((a, b, c, d)),
            _ => Err(SymnodalError::Compile(format!(
                "{} {} needs four nodes, has {}",
                self.kind,
                self.name,
                self.nodes.len()
            ))),
        }
    }

    /// Symbols used by the component's values.
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.for_each_ratio(|r| out.extend(r.free_symbols()));
        if let Params::Source(s) = &self.params {
            for e in s.terms().values() {
                out.extend(e.free_symbols());
            }
        }
        out
    }

    fn for_each_ratio(&self, mut f: impl FnMut(&Ratio)) {
        match &self.params {
            Params::Value { value, ic } => {
                f(value);
                if let Some(ic) = ic {
                    f(ic);
                }
            }
            Params::Controlled { gain, .. } | Params::Opamp { gain: Some(gain) } => f(gain),
            Params::TwoPort { m, .. } => m.iter().flatten().for_each(f),
            Params::Coupling { k, .. } => f(k),
            _ => {}
        }
    }

    /// Any value depends on the Laplace variable.
    pub fn depends_on_s(&self) -> bool {
        let mut found = false;
        self.for_each_ratio(|r| found |= r.contains(cas::S));
        found || matches!(self.kind, Kind::TransmissionLine)
    }

    /// Same component with every ratio mapped through `f`.
    pub fn map_values<F>(&self, f: F) -> Result<Component>
    where
        F: Fn(&Ratio) -> Result<Ratio>,
    {
        let params = match &self.params {
            Params::Value { value, ic } => Params::Value {
                value: f(value)?,
                ic: ic.as_ref().map(&f).transpose()?,
            },
            Params::Controlled { control, gain } => Params::Controlled {
                control: control.clone(),
                gain: f(gain)?,
            },
            Params::Opamp { gain } => Params::Opamp {
                gain: gain.as_ref().map(&f).transpose()?,
            },
            Params::TwoPort { params, m } => Params::TwoPort {
                params: *params,
                m: [
                    [f(&m[0][0])?, f(&m[0][1])?],
                    [f(&m[1][0])?, f(&m[1][1])?],
                ],
            },
            Params::Coupling { l1, l2, k } => Params::Coupling {
                l1: l1.clone(),
                l2: l2.clone(),
                k: f(k)?,
            },
            Params::Source(s) => {
                let mut out = Superposition::new(s.quantity());
                for e in s.terms().values() {
                    out.add_expr(Expr::new(e.quantity(), e.value().map_ratios(&f)?)?)?;
                }
                Params::Source(out)
            }
            other => other.clone(),
        };
        Ok(Component {
            params,
            ..self.clone()
        })
    }

    /// Same component with its initial condition replaced.
    pub fn with_initial_condition(&self, ic: Option<Ratio>) -> Result<Component> {
        match &self.params {
            Params::Value { value, .. } if self.flags().reactive => Ok(Component {
                params: Params::Value {
                    value: value.clone(),
                    ic,
                },
                ..self.clone()
            }),
            _ => Err(SymnodalError::Compile(format!(
                "{} {} takes no initial condition",
                self.kind, self.name
            ))),
        }
    }
}

/// A parsed circuit.
#[derive(Debug, Clone, Default)]
pub struct Netlist {
    pub components: Vec<Component>,
}

impl Netlist {
    pub fn find(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn get(&self, name: &str) -> Result<&Component> {
        self.find(name).ok_or_else(|| SymnodalError::UnknownName {
            what: "component",
            name: name.to_string(),
        })
    }

    /// Non-ground nodes in first-use order.
    pub fn node_names(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for c in &self.components {
            for n in &c.nodes {
                if !is_ground(n) && seen.insert(n.clone()) {
                    out.push(n.clone());
                }
            }
        }
        out
    }

    pub fn has_node(&self, node: &str) -> bool {
        is_ground(node) || self.components.iter().any(|c| c.nodes.iter().any(|n| n == node))
    }

    /// Some inductor or capacitor carries an initial condition.
    pub fn has_initial_conditions(&self) -> bool {
        self.components.iter().any(|c| c.initial_condition().is_some())
    }

    /// No component stores energy or depends on `s`.
    pub fn is_memoryless(&self) -> bool {
        self.components
            .iter()
            .all(|c| !c.flags().reactive && !c.depends_on_s())
    }

    pub fn sources(&self) -> impl Iterator<Item = &Component> {
        self.components
            .iter()
            .filter(|c| c.flags().independent_source)
    }

    pub fn with_components(components: Vec<Component>) -> Self {
        Self { components }
    }
}
