//! Function bodies handed to the engine.
//!
//! A `Program` is a small structured language: assignments, `if`, counted
//! `for` loops, `while`, `return` and `raise`, over tensor and host values.
//! Control-flow statements carry a `RegionId`, assigned in pre-order when
//! the program is built.
mod expr;
mod stmt;

pub use expr::{boolean, call, call_with, float, int, item, len, list, lit, var, BinOp, CmpOp, Expr};
pub use stmt::{assigned_names, read_names, RegionId, RegionKind, Stmt};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A named function body with positional parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    name: String,
    params: Vec<String>,
    body: Vec<Stmt>,
    region_count: u32,
}

impl Program {
    /// Build a program and number its control-flow regions.
    ///
    /// # Example
    /// ```no_run
    /// # use graftjit::program::{var, Program, Stmt};
    /// let body = vec![Stmt::ret(vec![var("x") + var("x")])];
    /// let program = Program::new("double", ["x"], body);
    /// ```
    pub fn new<I, S>(name: impl Into<String>, params: I, mut body: Vec<Stmt>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next = 0u32;
        stmt::number_regions(&mut body, &mut next);
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
            body,
            region_count: next,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn body(&self) -> &[Stmt] {
        &self.body
    }

    pub fn region_count(&self) -> u32 {
        self.region_count
    }

    /// Names assigned anywhere in the body, parameters excluded.
    pub fn locals(&self) -> BTreeSet<String> {
        let mut out = assigned_names(&self.body);
        for param in &self.params {
            out.remove(param);
        }
        out
    }
}
