//! Structured formula representation.
//!
//! Formulas are trees of variable references, constant references, numbers
//! and arithmetic operators. Renaming happens node by node, so a name that is
//! a substring of another name can never be corrupted. The textual form the
//! solver logs is produced by `Display`.
//!
//! Besides printing, a formula can be:
//! - differentiated symbolically with respect to a constant (`derivative`)
//! - compiled against a fixed symbol layout for fast row-wise evaluation (`compile`)

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    /// Reference to a bound data column.
    Var(String),
    /// Reference to a free constant estimated by the fit.
    Const(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, i32),
}

impl Expr {
    pub fn num(value: f64) -> Self {
        Expr::Num(value)
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Expr::Const(name.into())
    }

    pub fn powi(self, n: i32) -> Self {
        Expr::Pow(Box::new(self), n)
    }

    /// Variable names in order of first appearance.
    pub fn variables(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        self.visit(&mut |e| {
            if let Expr::Var(name) = e {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
        });
        out
    }

    /// Constant names in order of first appearance.
    pub fn constants(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        self.visit(&mut |e| {
            if let Expr::Const(name) = e {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
        });
        out
    }

    fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match self {
            Expr::Num(_) | Expr::Var(_) | Expr::Const(_) => {}
            Expr::Neg(a) | Expr::Pow(a, _) => a.visit(f),
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
                a.visit(f);
                b.visit(f);
            }
        }
    }

    /// Rename every variable reference with `f`. Constants are untouched.
    pub fn rename_vars(&self, f: &impl Fn(&str) -> String) -> Expr {
        let bx = |e: &Expr| Box::new(e.rename_vars(f));
        match self {
            Expr::Num(v) => Expr::Num(*v),
            Expr::Var(name) => Expr::Var(f(name)),
            Expr::Const(name) => Expr::Const(name.clone()),
            Expr::Neg(a) => Expr::Neg(bx(a)),
            Expr::Add(a, b) => Expr::Add(bx(a), bx(b)),
            Expr::Sub(a, b) => Expr::Sub(bx(a), bx(b)),
            Expr::Mul(a, b) => Expr::Mul(bx(a), bx(b)),
            Expr::Div(a, b) => Expr::Div(bx(a), bx(b)),
            Expr::Pow(a, n) => Expr::Pow(bx(a), *n),
        }
    }

    /// Partial derivative with respect to the constant `name`.
    ///
    /// Zero and unit terms are folded while building the result, so the
    /// derivative of a term that does not mention `name` is exactly `Num(0)`.
    pub fn derivative(&self, name: &str) -> Expr {
        match self {
            Expr::Num(_) | Expr::Var(_) => Expr::Num(0.0),
            Expr::Const(c) => Expr::Num(if c == name { 1.0 } else { 0.0 }),
            Expr::Neg(a) => neg(a.derivative(name)),
            Expr::Add(a, b) => add(a.derivative(name), b.derivative(name)),
            Expr::Sub(a, b) => sub(a.derivative(name), b.derivative(name)),
            Expr::Mul(a, b) => add(
                mul(a.derivative(name), (**b).clone()),
                mul((**a).clone(), b.derivative(name)),
            ),
            Expr::Div(a, b) => div(
                sub(
                    mul(a.derivative(name), (**b).clone()),
                    mul((**a).clone(), b.derivative(name)),
                ),
                pow((**b).clone(), 2),
            ),
            Expr::Pow(a, n) => mul(
                mul(Expr::Num(f64::from(*n)), pow((**a).clone(), n - 1)),
                a.derivative(name),
            ),
        }
    }

    /// Resolve symbol names to positions in `vars` / `consts`.
    ///
    /// Fails with the offending name if a reference is not in the layout.
    pub fn compile(&self, vars: &[String], consts: &[String]) -> Result<Compiled, String> {
        Ok(Compiled {
            root: self.lower(vars, consts)?,
        })
    }

    fn lower(&self, vars: &[String], consts: &[String]) -> Result<Node, String> {
        let bx = |e: &Expr| e.lower(vars, consts).map(Box::new);
        Ok(match self {
            Expr::Num(v) => Node::Num(*v),
            Expr::Var(name) => Node::Var(
                vars.iter()
                    .position(|v| v == name)
                    .ok_or_else(|| name.clone())?,
            ),
            Expr::Const(name) => Node::Const(
                consts
                    .iter()
                    .position(|c| c == name)
                    .ok_or_else(|| name.clone())?,
            ),
            Expr::Neg(a) => Node::Neg(bx(a)?),
            Expr::Add(a, b) => Node::Add(bx(a)?, bx(b)?),
            Expr::Sub(a, b) => Node::Sub(bx(a)?, bx(b)?),
            Expr::Mul(a, b) => Node::Mul(bx(a)?, bx(b)?),
            Expr::Div(a, b) => Node::Div(bx(a)?, bx(b)?),
            Expr::Pow(a, n) => Node::Pow(bx(a)?, *n),
        })
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(..) | Expr::Sub(..) => 1,
            Expr::Mul(..) | Expr::Div(..) => 2,
            Expr::Neg(_) => 3,
            Expr::Pow(..) => 4,
            Expr::Num(_) | Expr::Var(_) | Expr::Const(_) => 5,
        }
    }
}

impl Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        Expr::Add(Box::new(self), Box::new(rhs))
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }
}

impl Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }
}

impl Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        Expr::Div(Box::new(self), Box::new(rhs))
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}

// Folding constructors used by `derivative`.

fn add(a: Expr, b: Expr) -> Expr {
    match (a, b) {
        (Expr::Num(x), Expr::Num(y)) => Expr::Num(x + y),
        (Expr::Num(x), e) | (e, Expr::Num(x)) if x == 0.0 => e,
        (a, b) => a + b,
    }
}

fn sub(a: Expr, b: Expr) -> Expr {
    match (a, b) {
        (Expr::Num(x), Expr::Num(y)) => Expr::Num(x - y),
        (e, Expr::Num(y)) if y == 0.0 => e,
        (Expr::Num(x), e) if x == 0.0 => neg(e),
        (a, b) => a - b,
    }
}

fn mul(a: Expr, b: Expr) -> Expr {
    match (a, b) {
        (Expr::Num(x), Expr::Num(y)) => Expr::Num(x * y),
        (Expr::Num(x), _) | (_, Expr::Num(x)) if x == 0.0 => Expr::Num(0.0),
        (Expr::Num(x), e) | (e, Expr::Num(x)) if x == 1.0 => e,
        (a, b) => a * b,
    }
}

fn div(a: Expr, b: Expr) -> Expr {
    match (a, b) {
        (Expr::Num(x), Expr::Num(y)) if y != 0.0 => Expr::Num(x / y),
        (Expr::Num(x), _) if x == 0.0 => Expr::Num(0.0),
        (e, Expr::Num(y)) if y == 1.0 => e,
        (a, b) => a / b,
    }
}

fn neg(a: Expr) -> Expr {
    match a {
        Expr::Num(x) => Expr::Num(-x),
        Expr::Neg(inner) => *inner,
        e => -e,
    }
}

fn pow(a: Expr, n: i32) -> Expr {
    match (a, n) {
        (_, 0) => Expr::Num(1.0),
        (e, 1) => e,
        (Expr::Num(x), n) => Expr::Num(x.powi(n)),
        (e, n) => e.powi(n),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Wrap `e` in parentheses when it binds looser than `min` requires.
        let child = |f: &mut fmt::Formatter<'_>, e: &Expr, min: u8| -> fmt::Result {
            if e.precedence() < min {
                write!(f, "({e})")
            } else {
                write!(f, "{e}")
            }
        };
        match self {
            Expr::Num(v) if *v < 0.0 => write!(f, "({v})"),
            Expr::Num(v) => write!(f, "{v}"),
            Expr::Var(name) | Expr::Const(name) => write!(f, "{name}"),
            Expr::Neg(a) => {
                write!(f, "-")?;
                child(f, a, 4)
            }
            Expr::Add(a, b) => {
                child(f, a, 1)?;
                write!(f, "+")?;
                child(f, b, 2)
            }
            Expr::Sub(a, b) => {
                child(f, a, 1)?;
                write!(f, "-")?;
                child(f, b, 2)
            }
            Expr::Mul(a, b) => {
                child(f, a, 2)?;
                write!(f, "*")?;
                child(f, b, 3)
            }
            Expr::Div(a, b) => {
                child(f, a, 2)?;
                write!(f, "/")?;
                child(f, b, 3)
            }
            Expr::Pow(a, n) => {
                child(f, a, 5)?;
                if *n < 0 {
                    write!(f, "^({n})")
                } else {
                    write!(f, "^{n}")
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Num(f64),
    Var(usize),
    Const(usize),
    Neg(Box<Node>),
    Add(Box<Node>, Box<Node>),
    Sub(Box<Node>, Box<Node>),
    Mul(Box<Node>, Box<Node>),
    Div(Box<Node>, Box<Node>),
    Pow(Box<Node>, i32),
}

/// An expression with symbols resolved to slice positions.
#[derive(Debug, Clone)]
pub struct Compiled {
    root: Node,
}

impl Compiled {
    /// Evaluate with variable values `x` and constant values `theta`.
    pub fn eval(&self, x: &[f64], theta: &[f64]) -> f64 {
        eval_node(&self.root, x, theta)
    }
}

fn eval_node(node: &Node, x: &[f64], theta: &[f64]) -> f64 {
    match node {
        Node::Num(v) => *v,
        Node::Var(i) => x[*i],
        Node::Const(i) => theta[*i],
        Node::Neg(a) => -eval_node(a, x, theta),
        Node::Add(a, b) => eval_node(a, x, theta) + eval_node(b, x, theta),
        Node::Sub(a, b) => eval_node(a, x, theta) - eval_node(b, x, theta),
        Node::Mul(a, b) => eval_node(a, x, theta) * eval_node(b, x, theta),
        Node::Div(a, b) => eval_node(a, x, theta) / eval_node(b, x, theta),
        Node::Pow(a, n) => eval_node(a, x, theta).powi(*n),
    }
}
