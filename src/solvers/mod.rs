//! Coloring backends for the component pipeline.

use std::fmt;
use std::str::FromStr;

use log::warn;

use crate::color::ColoringSolver;

/// branch-and-bound exact coloring of small graphs
pub mod backtrack;

/// greedy DSATUR with conflict repair (always-accepting fallback)
pub mod dsatur;

/** Backend selector. Backends without a linked implementation in this
build resolve to the backtracking backend. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmType {
    /// branch-and-bound backtracking
    Backtrack,
    /// integer linear programming
    Ilp,
    /// linear programming relaxation
    Lp,
    /// semidefinite programming relaxation
    Sdp,
    /// dancing-links exact cover
    DancingLinks,
}

impl FromStr for AlgorithmType {
    type Err = String;

    fn from_str(s:&str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BACKTRACK" => Ok(Self::Backtrack),
            "ILP" => Ok(Self::Ilp),
            "LP" => Ok(Self::Lp),
            "SDP" => Ok(Self::Sdp),
            "DANCING_LINKS" => Ok(Self::DancingLinks),
            _ => Err(format!(
                "unknown algorithm '{}' (valid: BACKTRACK, ILP, LP, SDP, DANCING_LINKS)", s
            )),
        }
    }
}

impl fmt::Display for AlgorithmType {
    fn fmt(&self, f:&mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Backtrack => "BACKTRACK",
            Self::Ilp => "ILP",
            Self::Lp => "LP",
            Self::Sdp => "SDP",
            Self::DancingLinks => "DANCING_LINKS",
        };
        write!(f, "{}", s)
    }
}

/** creates a coloring backend for the selected algorithm */
pub fn create_solver(algo:AlgorithmType, color_num:i8) -> Box<dyn ColoringSolver> {
    match algo {
        AlgorithmType::Backtrack => Box::new(backtrack::BacktrackSolver::new(color_num)),
        other => {
            warn!("algorithm {} not linked in this build, using BACKTRACK", other);
            Box::new(backtrack::BacktrackSolver::new(color_num))
        }
    }
}
