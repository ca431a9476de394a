//! Component catalog.
//!
//! Every component kind maps to one static entry: its name prefix, the
//! number of nodes and auxiliary branch currents it needs, its capability
//! flags and the function that stamps it into the MNA system. The parser
//! picks the entry from the component name; the compiler only ever looks
//! at the entry.

use std::fmt;

use crate::compiler::{self, StampFn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Resistor,
    Inductor,
    Capacitor,
    /// Generic impedance, a rational function of `s`.
    Impedance,
    /// Generic admittance, a rational function of `s`.
    Admittance,
    VoltageSource,
    CurrentSource,
    Vcvs,
    /// Op-amp output driven by the differential input voltage.
    Opamp,
    Vccs,
    Cccs,
    Ccvs,
    Transformer,
    Gyrator,
    TwoPort,
    TransmissionLine,
    Coupling,
    Switch,
    Open,
    Wire,
    Port,
    Diode,
    Bjt,
    Mosfet,
    Jfet,
    Logic,
}

/// Capability flags of a component kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
    /// Stores energy; a state variable candidate.
    pub reactive: bool,
    pub independent_source: bool,
    pub dependent_source: bool,
    pub needs_branch_current: bool,
    pub is_switch: bool,
    pub is_transformer: bool,
    pub is_port: bool,
    pub is_wire: bool,
    pub is_open_circuit: bool,
    pub linear: bool,
}

const PASSIVE: Flags = Flags {
    reactive: false,
    independent_source: false,
    dependent_source: false,
    needs_branch_current: false,
    is_switch: false,
    is_transformer: false,
    is_port: false,
    is_wire: false,
    is_open_circuit: false,
    linear: true,
};

const NONLINEAR: Flags = Flags {
    linear: false,
    ..PASSIVE
};

/// One catalog row.
pub struct Entry {
    pub kind: Kind,
    /// Name prefix, upper case.
    pub prefix: &'static str,
    pub description: &'static str,
    /// Node count; `None` for kinds that take any number.
    pub nodes: Option<usize>,
    /// Auxiliary branch-current unknowns.
    pub branches: usize,
    pub flags: Flags,
    pub stamp: StampFn,
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("kind", &self.kind)
            .field("prefix", &self.prefix)
            .field("branches", &self.branches)
            .field("flags", &self.flags)
            .finish()
    }
}

/// Multi-letter prefixes come first so that `TF1` is not read as `T`.
static CATALOG: &[Entry] = &[
    Entry {
        kind: Kind::Transformer,
        prefix: "TF",
        description: "ideal transformer",
        nodes: Some(4),
        branches: 2,
        flags: Flags {
            needs_branch_current: true,
            is_transformer: true,
            ..PASSIVE
        },
        stamp: compiler::stamp_two_port,
    },
    Entry {
        kind: Kind::TransmissionLine,
        prefix: "TL",
        description: "lossless transmission line",
        nodes: Some(4),
        branches: 2,
        flags: Flags {
            needs_branch_current: true,
            ..PASSIVE
        },
        stamp: compiler::stamp_two_port,
    },
    Entry {
        kind: Kind::TwoPort,
        prefix: "TP",
        description: "two-port parameter block",
        nodes: Some(4),
        branches: 2,
        flags: Flags {
            needs_branch_current: true,
            ..PASSIVE
        },
        stamp: compiler::stamp_two_port,
    },
    Entry {
        kind: Kind::Gyrator,
        prefix: "GY",
        description: "gyrator",
        nodes: Some(4),
        branches: 2,
        flags: Flags {
            needs_branch_current: true,
            ..PASSIVE
        },
        stamp: compiler::stamp_two_port,
    },
    Entry {
        kind: Kind::Switch,
        prefix: "SW",
        description: "switch",
        nodes: None,
        branches: 0,
        flags: Flags {
            is_switch: true,
            ..PASSIVE
        },
        stamp: compiler::stamp_unresolved_switch,
    },
    Entry {
        kind: Kind::Resistor,
        prefix: "R",
        description: "resistor",
        nodes: Some(2),
        branches: 0,
        flags: PASSIVE,
        stamp: compiler::stamp_admittance,
    },
    Entry {
        kind: Kind::Inductor,
        prefix: "L",
        description: "inductor",
        nodes: Some(2),
        branches: 1,
        flags: Flags {
            reactive: true,
            needs_branch_current: true,
            ..PASSIVE
        },
        stamp: compiler::stamp_inductor,
    },
    Entry {
        kind: Kind::Capacitor,
        prefix: "C",
        description: "capacitor",
        nodes: Some(2),
        branches: 0,
        flags: Flags {
            reactive: true,
            ..PASSIVE
        },
        stamp: compiler::stamp_capacitor,
    },
    Entry {
        kind: Kind::Impedance,
        prefix: "Z",
        description: "impedance",
        nodes: Some(2),
        branches: 0,
        flags: PASSIVE,
        stamp: compiler::stamp_admittance,
    },
    Entry {
        kind: Kind::Admittance,
        prefix: "Y",
        description: "admittance",
        nodes: Some(2),
        branches: 0,
        flags: PASSIVE,
        stamp: compiler::stamp_admittance,
    },
    Entry {
        kind: Kind::VoltageSource,
        prefix: "V",
        description: "voltage source",
        nodes: Some(2),
        branches: 1,
        flags: Flags {
            independent_source: true,
            needs_branch_current: true,
            ..PASSIVE
        },
        stamp: compiler::stamp_voltage_source,
    },
    Entry {
        kind: Kind::CurrentSource,
        prefix: "I",
        description: "current source",
        nodes: Some(2),
        branches: 0,
        flags: Flags {
            independent_source: true,
            ..PASSIVE
        },
        stamp: compiler::stamp_current_source,
    },
    Entry {
        kind: Kind::Vcvs,
        prefix: "E",
        description: "voltage-controlled voltage source",
        nodes: Some(4),
        branches: 1,
        flags: Flags {
            dependent_source: true,
            needs_branch_current: true,
            ..PASSIVE
        },
        stamp: compiler::stamp_vcvs,
    },
    Entry {
        kind: Kind::Opamp,
        prefix: "E",
        description: "op-amp",
        nodes: Some(4),
        branches: 1,
        flags: Flags {
            dependent_source: true,
            needs_branch_current: true,
            ..PASSIVE
        },
        stamp: compiler::stamp_vcvs,
    },
    Entry {
        kind: Kind::Vccs,
        prefix: "G",
        description: "voltage-controlled current source",
        nodes: Some(4),
        branches: 0,
        flags: Flags {
            dependent_source: true,
            ..PASSIVE
        },
        stamp: compiler::stamp_vccs,
    },
    Entry {
        kind: Kind::Cccs,
        prefix: "F",
        description: "current-controlled current source",
        nodes: Some(2),
        branches: 0,
        flags: Flags {
            dependent_source: true,
            ..PASSIVE
        },
        stamp: compiler::stamp_cccs,
    },
    Entry {
        kind: Kind::Ccvs,
        prefix: "H",
        description: "current-controlled voltage source",
        nodes: Some(2),
        branches: 1,
        flags: Flags {
            dependent_source: true,
            needs_branch_current: true,
            ..PASSIVE
        },
        stamp: compiler::stamp_ccvs,
    },
    Entry {
        kind: Kind::Coupling,
        prefix: "K",
        description: "mutual inductance",
        nodes: Some(0),
        branches: 0,
        flags: PASSIVE,
        stamp: compiler::stamp_coupling,
    },
    Entry {
        kind: Kind::Open,
        prefix: "O",
        description: "open circuit",
        nodes: Some(2),
        branches: 0,
        flags: Flags {
            is_open_circuit: true,
            ..PASSIVE
        },
        stamp: compiler::stamp_nothing,
    },
    Entry {
        kind: Kind::Wire,
        prefix: "W",
        description: "wire",
        nodes: Some(2),
        branches: 1,
        flags: Flags {
            is_wire: true,
            needs_branch_current: true,
            ..PASSIVE
        },
        stamp: compiler::stamp_voltage_source,
    },
    Entry {
        kind: Kind::Port,
        prefix: "P",
        description: "port",
        nodes: Some(2),
        branches: 0,
        flags: Flags {
            is_port: true,
            is_open_circuit: true,
            ..PASSIVE
        },
        stamp: compiler::stamp_nothing,
    },
    Entry {
        kind: Kind::Diode,
        prefix: "D",
        description: "diode",
        nodes: None,
        branches: 0,
        flags: NONLINEAR,
        stamp: compiler::stamp_unsupported,
    },
    Entry {
        kind: Kind::Bjt,
        prefix: "Q",
        description: "bipolar transistor",
        nodes: None,
        branches: 0,
        flags: NONLINEAR,
        stamp: compiler::stamp_unsupported,
    },
    Entry {
        kind: Kind::Mosfet,
        prefix: "M",
        description: "MOSFET",
        nodes: None,
        branches: 0,
        flags: NONLINEAR,
        stamp: compiler::stamp_unsupported,
    },
    Entry {
        kind: Kind::Jfet,
        prefix: "J",
        description: "JFET",
        nodes: None,
        branches: 0,
        flags: NONLINEAR,
        stamp: compiler::stamp_unsupported,
    },
    Entry {
        kind: Kind::Logic,
        prefix: "U",
        description: "logic gate",
        nodes: None,
        branches: 0,
        flags: NONLINEAR,
        stamp: compiler::stamp_unsupported,
    },
];

/// Entry whose prefix starts `name`, ignoring case.
pub fn lookup(name: &str) -> Option<&'static Entry> {
    let upper = name.to_ascii_uppercase();
    CATALOG.iter().find(|e| upper.starts_with(e.prefix))
}

impl Kind {
    pub fn entry(self) -> &'static Entry {
        match CATALOG.iter().find(|e| e.kind == self) {
            Some(e) => e,
            // Every variant has a row.
            None => unreachable!("no catalog entry for {:?}", self),
        }
    }

    pub fn flags(self) -> Flags {
        self.entry().flags
    }

    pub fn branches(self) -> usize {
        self.entry().branches
    }

    pub fn description(self) -> &'static str {
        self.entry().description
    }

    /// Current is defined out of the positive node rather than into it.
    pub fn is_source(self) -> bool {
        let f = self.flags();
        f.independent_source || f.dependent_source
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_letter_prefixes_win() {
        assert_eq!(lookup("TF1").map(|e| e.kind), Some(Kind::Transformer));
        assert_eq!(lookup("GY1").map(|e| e.kind), Some(Kind::Gyrator));
        assert_eq!(lookup("G1").map(|e| e.kind), Some(Kind::Vccs));
        assert_eq!(lookup("sw3").map(|e| e.kind), Some(Kind::Switch));
        assert_eq!(lookup("Rload").map(|e| e.kind), Some(Kind::Resistor));
    }

    #[test]
    fn test_unknown_prefix() {
        assert!(lookup("X1").is_none());
    }

    #[test]
    fn test_flags() {
        assert!(Kind::Inductor.flags().reactive);
        assert!(Kind::Inductor.flags().needs_branch_current);
        assert!(Kind::Capacitor.flags().reactive);
        assert!(!Kind::Capacitor.flags().needs_branch_current);
        assert!(Kind::VoltageSource.flags().independent_source);
        assert!(Kind::Cccs.flags().dependent_source);
        assert!(!Kind::Diode.flags().linear);
        assert!(Kind::Wire.flags().is_wire);
        assert!(Kind::Port.flags().is_port);
    }

    #[test]
    fn test_branch_counts_match_flags() {
        for e in CATALOG {
            assert_eq!(e.branches > 0, e.flags.needs_branch_current, "{:?}", e.kind);
        }
    }

    #[test]
    fn test_every_kind_has_entry() {
        for k in [Kind::Resistor, Kind::Opamp, Kind::Coupling, Kind::Logic, Kind::Port] {
            assert_eq!(k.entry().kind, k);
        }
    }
}
