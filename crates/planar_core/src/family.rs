use crate::equation_engine::{Bytecode, Compiler, OpCode, VM};
use crate::error::{PlanarError, Result};
use crate::symbolic::parse;
use crate::system::LinearSystem;

/// A one-parameter family of linear systems `x' = A(μ) x + B(μ)`.
///
/// Entries are expressions in the single parameter, compiled to bytecode once
/// and evaluated per sample.
#[derive(Debug, Clone)]
pub struct LinearFamily {
    dim: usize,
    parameter: String,
    a: Vec<Bytecode>,
    b: Option<Vec<Bytecode>>,
}

impl LinearFamily {
    /// `a_entries` are row-major; `b_entries`, when given, has `dim` entries.
    pub fn parse(
        dim: usize,
        a_entries: &[&str],
        b_entries: Option<&[&str]>,
        parameter: &str,
    ) -> Result<Self> {
        if dim == 0 || a_entries.len() != dim * dim {
            return Err(PlanarError::shape(
                "family matrix A",
                format!("{} entries", dim * dim),
                format!("{} entries", a_entries.len()),
            ));
        }
        if let Some(b) = b_entries {
            if b.len() != dim {
                return Err(PlanarError::shape(
                    "family vector B",
                    format!("{} entries", dim),
                    format!("{} entries", b.len()),
                ));
            }
        }

        let compiler = Compiler::new(&[], &[parameter.to_string()]);
        let compile_all = |entries: &[&str]| -> Result<Vec<Bytecode>> {
            entries
                .iter()
                .map(|text| compiler.compile(&parse(text)?))
                .collect()
        };
        let a = compile_all(a_entries)?;
        let b = b_entries.map(compile_all).transpose()?;
        Ok(Self {
            dim,
            parameter: parameter.to_string(),
            a,
            b,
        })
    }

    /// `A(μ) = [[μ, -2], [2, 2]]` with no `B`.
    pub fn default_planar() -> Self {
        let constant = |value: f64| Bytecode {
            ops: vec![OpCode::LoadConst(value)],
        };
        Self {
            dim: 2,
            parameter: "mu".to_string(),
            a: vec![
                Bytecode {
                    ops: vec![OpCode::LoadParam(0)],
                },
                constant(-2.0),
                constant(2.0),
                constant(2.0),
            ],
            b: None,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    /// The member of the family at `value`.
    pub fn system_at(&self, value: f64) -> Result<LinearSystem> {
        let params = [value];
        let mut stack = Vec::with_capacity(16);
        let mut eval = |code: &Bytecode| VM::execute(code, &[], &params, &mut stack);
        let a: Vec<f64> = self.a.iter().map(&mut eval).collect();
        let b: Option<Vec<f64>> = self.b.as_ref().map(|b| b.iter().map(&mut eval).collect());
        LinearSystem::from_row_slice(self.dim, &a, b.as_deref())
    }
}
