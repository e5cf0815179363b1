use crate::error::{PlanarError, Result};
use crate::symbolic::{Expr, Function};
use crate::traits::{Scalar, VectorField};
use std::collections::HashMap;

/// OpCodes for the Stack-based Virtual Machine.
/// The VM operates on a stack of `Scalar` values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    /// Pushes a constant `f64` value onto the stack.
    LoadConst(f64),
    /// Pushes the value of a state variable (by index) onto the stack.
    /// Indices correspond to the order variables were defined (e.g., 0=x, 1=y).
    LoadVar(usize),
    /// Pushes the value of a parameter (by index) onto the stack.
    LoadParam(usize),
    /// Pops top two values (b, a), pushes (a + b).
    Add,
    /// Pops top two values (b, a), pushes (a * b).
    Mul,
    /// Pops top two values (b, a), pushes (a / b).
    Div,
    /// Pops top two values (b, a), pushes (a ^ b).
    Pow,
    /// Pops top value (a), pushes a^n for a fixed integer n.
    PowI(i32),
    /// Pops top value (a), pushes sqrt(a).
    Sqrt,
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    /// Pops top value (a), pushes -a.
    Neg,
}

/// Represents a compiled sequence of operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bytecode {
    pub ops: Vec<OpCode>,
}

/// Stack-based Virtual Machine for evaluating compiled expressions.
///
/// The VM is stateless; `execute` takes all necessary context:
/// - `bytecode`: Instructions to run.
/// - `vars`: Current state vector (read-only).
/// - `params`: Parameter vector (read-only).
/// - `stack`: A mutable buffer for intermediate computations.
///
/// Returns the value left on the stack. Bytecode produced by `Compiler` never
/// underflows; malformed bytecode evaluates to NaN.
pub struct VM;

impl VM {
    pub fn execute<T: Scalar>(bytecode: &Bytecode, vars: &[T], params: &[T], stack: &mut Vec<T>) -> T {
        stack.clear();

        for op in &bytecode.ops {
            match op {
                OpCode::LoadConst(val) => {
                    stack.push(T::from_f64(*val).unwrap_or_else(T::nan));
                }
                OpCode::LoadVar(idx) => {
                    stack.push(vars.get(*idx).copied().unwrap_or_else(T::nan));
                }
                OpCode::LoadParam(idx) => {
                    stack.push(params.get(*idx).copied().unwrap_or_else(T::nan));
                }
                OpCode::Add | OpCode::Mul | OpCode::Div | OpCode::Pow => {
                    let b = pop(stack);
                    let a = pop(stack);
                    stack.push(match op {
                        OpCode::Add => a + b,
                        OpCode::Mul => a * b,
                        OpCode::Div => a / b,
                        _ => a.powf(b),
                    });
                }
                OpCode::PowI(n) => {
                    let a = pop(stack);
                    stack.push(a.powi(*n));
                }
                OpCode::Sqrt => {
                    let a = pop(stack);
                    stack.push(a.sqrt());
                }
                OpCode::Sin => {
                    let a = pop(stack);
                    stack.push(a.sin());
                }
                OpCode::Cos => {
                    let a = pop(stack);
                    stack.push(a.cos());
                }
                OpCode::Tan => {
                    let a = pop(stack);
                    stack.push(a.tan());
                }
                OpCode::Exp => {
                    let a = pop(stack);
                    stack.push(a.exp());
                }
                OpCode::Ln => {
                    let a = pop(stack);
                    stack.push(a.ln());
                }
                OpCode::Neg => {
                    let a = pop(stack);
                    stack.push(-a);
                }
            }
        }

        pop(stack)
    }
}

fn pop<T: Scalar>(stack: &mut Vec<T>) -> T {
    stack.pop().unwrap_or_else(T::nan)
}

/// Compiles a symbolic `Expr` into `Bytecode`.
/// Resolves variable and parameter names to indices.
pub struct Compiler {
    pub var_map: HashMap<String, usize>,
    pub param_map: HashMap<String, usize>,
}

impl Compiler {
    pub fn new(var_names: &[String], param_names: &[String]) -> Self {
        let mut var_map = HashMap::new();
        for (i, name) in var_names.iter().enumerate() {
            var_map.insert(name.clone(), i);
        }

        let mut param_map = HashMap::new();
        for (i, name) in param_names.iter().enumerate() {
            param_map.insert(name.clone(), i);
        }

        Self { var_map, param_map }
    }

    pub fn compile(&self, expr: &Expr) -> Result<Bytecode> {
        let mut ops = Vec::new();
        self.compile_recursive(expr, &mut ops)?;
        Ok(Bytecode { ops })
    }

    fn compile_recursive(&self, expr: &Expr, ops: &mut Vec<OpCode>) -> Result<()> {
        match expr {
            Expr::Number(n) => ops.push(OpCode::LoadConst(n.to_f64())),
            Expr::Symbol(name) => {
                if let Some(&idx) = self.var_map.get(name) {
                    ops.push(OpCode::LoadVar(idx));
                } else if let Some(&idx) = self.param_map.get(name) {
                    ops.push(OpCode::LoadParam(idx));
                } else {
                    return Err(PlanarError::Parse(format!(
                        "Unknown variable or parameter '{}'.",
                        name
                    )));
                }
            }
            Expr::ImaginaryUnit => {
                return Err(PlanarError::Unsupported(
                    "The imaginary unit cannot be compiled to real bytecode.".to_string(),
                ))
            }
            Expr::Add(terms) => self.compile_chain(terms, OpCode::Add, ops)?,
            Expr::Mul(factors) => self.compile_chain(factors, OpCode::Mul, ops)?,
            Expr::Pow(base, exponent) => match exponent.as_number() {
                Some(e) if e.is_integer() && e.numer() == -1 => {
                    ops.push(OpCode::LoadConst(1.0));
                    self.compile_recursive(base, ops)?;
                    ops.push(OpCode::Div);
                }
                Some(e) if e.is_integer() && i32::try_from(e.numer()).is_ok() => {
                    self.compile_recursive(base, ops)?;
                    ops.push(OpCode::PowI(e.numer() as i32));
                }
                Some(e) if e.numer() == 1 && e.denom() == 2 => {
                    self.compile_recursive(base, ops)?;
                    ops.push(OpCode::Sqrt);
                }
                _ => {
                    self.compile_recursive(base, ops)?;
                    self.compile_recursive(exponent, ops)?;
                    ops.push(OpCode::Pow);
                }
            },
            Expr::Call(function, arg) => {
                self.compile_recursive(arg, ops)?;
                ops.push(match function {
                    Function::Sin => OpCode::Sin,
                    Function::Cos => OpCode::Cos,
                    Function::Tan => OpCode::Tan,
                    Function::Exp => OpCode::Exp,
                    Function::Ln => OpCode::Ln,
                });
            }
        }
        Ok(())
    }

    fn compile_chain(&self, items: &[Expr], op: OpCode, ops: &mut Vec<OpCode>) -> Result<()> {
        for (idx, item) in items.iter().enumerate() {
            // Fold a leading -1 coefficient into a negation.
            if op == OpCode::Mul && idx == 0 && items.len() > 1 {
                if let Some(r) = item.as_number() {
                    if r.numer() == -1 && r.denom() == 1 {
                        self.compile_chain(&items[1..], op, ops)?;
                        ops.push(OpCode::Neg);
                        return Ok(());
                    }
                }
            }
            self.compile_recursive(item, ops)?;
            if idx > 0 {
                ops.push(op);
            }
        }
        Ok(())
    }
}

/// A compiled vector field: one bytecode expression per state variable.
#[derive(Debug, Clone)]
pub struct EquationSystem<T: Scalar> {
    pub equations: Vec<Bytecode>,
    pub params: Vec<T>,
}

impl<T: Scalar> EquationSystem<T> {
    pub fn new(equations: Vec<Bytecode>, params: Vec<T>) -> Self {
        Self { equations, params }
    }
}

impl<T: Scalar> VectorField<T> for EquationSystem<T> {
    fn dimension(&self) -> usize {
        self.equations.len()
    }

    fn apply(&self, x: &[T], out: &mut [T]) {
        let mut stack = Vec::with_capacity(64);
        for (i, eq) in self.equations.iter().enumerate() {
            out[i] = VM::execute(eq, x, &self.params, &mut stack);
        }
    }
}
