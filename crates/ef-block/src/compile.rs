//! Compilation of a block into a positional residual function.
//!
//! Every residual is first rewritten so that its only leaves are numbers and
//! solver slots (known quantities are folded to their current values), then
//! lowered to a small stack bytecode. The compiled block owns no quantity
//! handles and can be shared across threads.

use ef_core::Quantity;
use ef_expr::{BinaryOp, Expr, Slot, UnaryOp};
use nalgebra::DVector;
use tracing::debug;

use crate::block::EquationBlock;
use crate::error::{BlockError, BlockResult};

/// Signature requested from [`EquationBlock::compile`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompileMode {
    /// `f(state) -> residual`
    Algebraic,
    /// `f(time, state, rate) -> residual`
    DifferentialAlgebraic,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Opcode {
    LoadConstant { id: u32 },
    LoadState { off: u32 },
    LoadRate { off: u32 },
    LoadTime,
    Unary(UnaryOp),
    Binary(BinaryOp),
}

/// Bytecode for one residual.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    pub code: Vec<Opcode>,
    max_depth: usize,
}

#[derive(Default)]
struct ProgramBuilder {
    code: Vec<Opcode>,
    depth: usize,
    max_depth: usize,
}

impl ProgramBuilder {
    fn push(&mut self, op: Opcode) {
        match op {
            Opcode::Binary(_) => self.depth -= 1,
            Opcode::Unary(_) => {}
            _ => {
                self.depth += 1;
                self.max_depth = self.max_depth.max(self.depth);
            }
        }
        self.code.push(op);
    }

    fn finish(self) -> Program {
        Program {
            code: self.code,
            max_depth: self.max_depth,
        }
    }
}

/// A block compiled to bytecode.
#[derive(Clone, Debug)]
pub struct CompiledBlock {
    mode: CompileMode,
    literals: Vec<f64>,
    programs: Vec<Program>,
    equation_names: Vec<String>,
    n_state: usize,
    n_rate: usize,
    /// rate slot -> state slot of the differentiated variable
    rate_states: Vec<Option<usize>>,
}

struct Args<'a> {
    time: f64,
    state: &'a [f64],
    rate: &'a [f64],
}

impl CompiledBlock {
    pub fn mode(&self) -> CompileMode {
        self.mode
    }

    /// Number of residuals (one per block equation).
    pub fn n_equations(&self) -> usize {
        self.programs.len()
    }

    pub fn n_state(&self) -> usize {
        self.n_state
    }

    pub fn n_rate(&self) -> usize {
        self.n_rate
    }

    pub fn equation_names(&self) -> &[String] {
        &self.equation_names
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    /// For each rate slot, the state slot of the variable it differentiates.
    pub fn rate_states(&self) -> &[Option<usize>] {
        &self.rate_states
    }

    fn check_len(&self, what: &str, got: usize, expected: usize) -> BlockResult<()> {
        if got == expected {
            Ok(())
        } else {
            Err(BlockError::InvalidArg {
                what: format!("{what} has length {got}, expected {expected}"),
            })
        }
    }

    /// Algebraic residuals at `state`.
    pub fn eval(&self, state: &[f64]) -> BlockResult<DVector<f64>> {
        if self.mode != CompileMode::Algebraic {
            return Err(BlockError::InvalidArg {
                what: "block was compiled for f(time, state, rate)".into(),
            });
        }
        self.check_len("state", state.len(), self.n_state)?;
        Ok(self.run(&Args {
            time: 0.0,
            state,
            rate: &[],
        }))
    }

    /// Differential-algebraic residuals at `(time, state, rate)`.
    pub fn eval_dae(&self, time: f64, state: &[f64], rate: &[f64]) -> BlockResult<DVector<f64>> {
        if self.mode != CompileMode::DifferentialAlgebraic {
            return Err(BlockError::InvalidArg {
                what: "block was compiled for f(state)".into(),
            });
        }
        self.check_len("state", state.len(), self.n_state)?;
        self.check_len("rate", rate.len(), self.n_rate)?;
        Ok(self.run(&Args { time, state, rate }))
    }

    fn run(&self, args: &Args<'_>) -> DVector<f64> {
        let depth = self.programs.iter().map(|p| p.max_depth).max().unwrap_or(0);
        let mut stack: Vec<f64> = Vec::with_capacity(depth);
        DVector::from_iterator(
            self.programs.len(),
            self.programs.iter().map(|p| {
                stack.clear();
                self.exec(p, args, &mut stack)
            }),
        )
    }

    fn exec(&self, program: &Program, args: &Args<'_>, stack: &mut Vec<f64>) -> f64 {
        for op in &program.code {
            match *op {
                Opcode::LoadConstant { id } => stack.push(self.literals[id as usize]),
                Opcode::LoadState { off } => stack.push(args.state[off as usize]),
                Opcode::LoadRate { off } => stack.push(args.rate[off as usize]),
                Opcode::LoadTime => stack.push(args.time),
                Opcode::Unary(op) => {
                    let a = stack.pop().unwrap_or(f64::NAN);
                    stack.push(op.apply(a));
                }
                Opcode::Binary(op) => {
                    let b = stack.pop().unwrap_or(f64::NAN);
                    let a = stack.pop().unwrap_or(f64::NAN);
                    stack.push(op.apply(a, b));
                }
            }
        }
        stack.pop().unwrap_or(f64::NAN)
    }
}

struct Lowering<'a> {
    literals: &'a mut Vec<f64>,
    builder: ProgramBuilder,
}

impl Lowering<'_> {
    fn literal(&mut self, v: f64) -> u32 {
        let id = match self.literals.iter().position(|&x| x.to_bits() == v.to_bits()) {
            Some(id) => id,
            None => {
                self.literals.push(v);
                self.literals.len() - 1
            }
        };
        id as u32
    }

    fn emit(&mut self, expr: &Expr) -> BlockResult<()> {
        match expr {
            Expr::Num(v) => {
                let id = self.literal(*v);
                self.builder.push(Opcode::LoadConstant { id });
            }
            Expr::Slot(Slot::State(i)) => self.builder.push(Opcode::LoadState { off: *i as u32 }),
            Expr::Slot(Slot::Rate(j)) => self.builder.push(Opcode::LoadRate { off: *j as u32 }),
            Expr::Slot(Slot::Time) => self.builder.push(Opcode::LoadTime),
            Expr::Unary(op, arg) => {
                self.emit(arg)?;
                self.builder.push(Opcode::Unary(*op));
            }
            Expr::Binary(op, lhs, rhs) => {
                self.emit(lhs)?;
                self.emit(rhs)?;
                self.builder.push(Opcode::Binary(*op));
            }
            Expr::Quantity(q) => {
                return Err(BlockError::Classification {
                    what: format!("{} left unbound after substitution", q.key()),
                });
            }
            Expr::Derivative(d) => {
                return Err(BlockError::Classification {
                    what: format!("{d} left unbound after substitution"),
                });
            }
        }
        Ok(())
    }
}

impl EquationBlock {
    /// Compile every equation's residual into one positional function.
    ///
    /// The block must be classified, and for
    /// [`CompileMode::DifferentialAlgebraic`] its differential equations
    /// must already be in residual form.
    pub fn compile(&self, mode: CompileMode) -> BlockResult<CompiledBlock> {
        self.ensure_classified()?;
        let has_differential = !self.groups().differential.is_empty();
        match mode {
            CompileMode::Algebraic if has_differential => {
                return Err(BlockError::Classification {
                    what: "algebraic compilation requested for a block with differential equations"
                        .into(),
                });
            }
            CompileMode::DifferentialAlgebraic if !has_differential => {
                return Err(BlockError::Classification {
                    what: "differential-algebraic compilation requested for a block without differential equations"
                        .into(),
                });
            }
            _ => {}
        }
        if mode == CompileMode::DifferentialAlgebraic {
            if let Some(eq) = self
                .equations()
                .iter()
                .find(|eq| eq.is_differential() && eq.form() != ef_model::Form::Residual)
            {
                return Err(BlockError::Classification {
                    what: format!("{} is not in residual form", eq.name()),
                });
            }
        }

        let mut literals = Vec::new();
        let mut programs = Vec::with_capacity(self.equations().len());
        for eq in self.equations() {
            let bound = eq.residual().try_rewrite(&mut |node| self.bind(node, mode, eq.name()))?;
            let mut lowering = Lowering {
                literals: &mut literals,
                builder: ProgramBuilder::default(),
            };
            lowering.emit(&bound)?;
            programs.push(lowering.builder.finish());
        }

        let compiled = CompiledBlock {
            mode,
            literals,
            programs,
            equation_names: self.equations().iter().map(|e| e.name().to_owned()).collect(),
            n_state: self.variable_index_map().len(),
            n_rate: 0,
            rate_states: Vec::new(),
        };
        let compiled = match mode {
            CompileMode::Algebraic => compiled,
            CompileMode::DifferentialAlgebraic => CompiledBlock {
                n_rate: self.derivative_index_map().len(),
                rate_states: self
                    .derivative_index_map()
                    .iter()
                    .map(|d| self.variable_index_map().index_of(&d.of))
                    .collect(),
                ..compiled
            },
        };
        debug!(
            ?mode,
            residuals = compiled.n_equations(),
            state = compiled.n_state,
            rate = compiled.n_rate,
            literals = compiled.literals.len(),
            "equation block compiled"
        );
        Ok(compiled)
    }

    fn bind(&self, node: &Expr, mode: CompileMode, equation: &str) -> BlockResult<Option<Expr>> {
        let unknown = |q: &Quantity| BlockError::UnknownQuantity {
            quantity: q.key(),
            equation: equation.to_owned(),
        };
        let dae = mode == CompileMode::DifferentialAlgebraic;
        match node {
            Expr::Quantity(q) if q.is_constant() => Ok(Some(Expr::Num(q.value()))),
            Expr::Quantity(q) if q.is_parameter() => {
                if self.knows_parameter(q) {
                    Ok(Some(Expr::Num(q.value())))
                } else {
                    Err(unknown(q))
                }
            }
            Expr::Quantity(q) => {
                if dae && self.is_time_variable(q) {
                    return Ok(Some(Expr::Slot(Slot::Time)));
                }
                self.variable_index_map()
                    .index_of(q)
                    .map(|i| Some(Expr::Slot(Slot::State(i))))
                    .ok_or_else(|| unknown(q))
            }
            Expr::Derivative(d) if dae => {
                // The operand needs a state slot and the variable of
                // integration must be a declared time variable.
                if self.variable_index_map().index_of(&d.of).is_none() {
                    return Err(unknown(&d.of));
                }
                if !self.is_time_variable(&d.wrt) {
                    return Err(unknown(&d.wrt));
                }
                self.derivative_index_map()
                    .index_of(d)
                    .map(|j| Some(Expr::Slot(Slot::Rate(j))))
                    .ok_or_else(|| BlockError::Classification {
                        what: format!("{d} in {equation} has no rate slot"),
                    })
            }
            Expr::Derivative(d) => Err(BlockError::Classification {
                what: format!("{d} in {equation} cannot be compiled algebraically"),
            }),
            _ => Ok(None),
        }
    }
}
