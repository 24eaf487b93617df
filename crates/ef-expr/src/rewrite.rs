//! Structural substitution.

use std::convert::Infallible;
use std::rc::Rc;

use crate::expr::Expr;

impl Expr {
    /// Rebuild the tree, offering every node to `f` parents first.
    ///
    /// `Ok(Some(e))` replaces the node (its children are not visited),
    /// `Ok(None)` keeps it and descends. Untouched subtrees are shared with
    /// the original.
    pub fn try_rewrite<E, F>(&self, f: &mut F) -> Result<Expr, E>
    where
        F: FnMut(&Expr) -> Result<Option<Expr>, E>,
    {
        if let Some(replacement) = f(self)? {
            return Ok(replacement);
        }
        Ok(match self {
            Expr::Unary(op, arg) => {
                let new_arg = arg.try_rewrite(f)?;
                if new_arg == **arg {
                    self.clone()
                } else {
                    Expr::Unary(*op, Rc::new(new_arg))
                }
            }
            Expr::Binary(op, lhs, rhs) => {
                let new_lhs = lhs.try_rewrite(f)?;
                let new_rhs = rhs.try_rewrite(f)?;
                if new_lhs == **lhs && new_rhs == **rhs {
                    self.clone()
                } else {
                    Expr::Binary(*op, Rc::new(new_lhs), Rc::new(new_rhs))
                }
            }
            Expr::Num(_) | Expr::Quantity(_) | Expr::Slot(_) | Expr::Derivative(_) => {
                self.clone()
            }
        })
    }

    /// Infallible form of [`Expr::try_rewrite`].
    pub fn rewrite<F>(&self, mut f: F) -> Expr
    where
        F: FnMut(&Expr) -> Option<Expr>,
    {
        let result: Result<Expr, Infallible> = self.try_rewrite(&mut |node| Ok(f(node)));
        match result {
            Ok(expr) => expr,
            Err(never) => match never {},
        }
    }
}
