use super::real::Real;
use std::cell::RefCell;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

#[derive(Debug, Clone, Copy)]
struct Node {
    parents: [(usize, f64); 2],
    arity: u8,
}

impl Node {
    #[inline]
    fn parents(&self) -> &[(usize, f64)] {
        &self.parents[..self.arity as usize]
    }
}

/// Append-only record of the operations performed on [`Var`]s.
///
/// Every recorded node stores the indices of its operands together with the local partial
/// derivatives, so the backward pass in [`Tape::gradient`] is a single reverse sweep.
#[derive(Default)]
pub struct Tape {
    nodes: RefCell<Vec<Node>>,
}

impl fmt::Debug for Tape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tape").field("len", &self.len()).finish()
    }
}

impl Tape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: RefCell::new(Vec::with_capacity(capacity)),
        }
    }

    /// Registers an independent input variable.
    pub fn var(&self, value: f64) -> Var<'_> {
        let index = self.push(&[]);
        Var {
            node: Some((self, index)),
            value,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, parents: &[(usize, f64)]) -> usize {
        let mut node = Node {
            parents: [(0, 0.0); 2],
            arity: parents.len() as u8,
        };
        node.parents[..parents.len()].copy_from_slice(parents);
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(node);
        nodes.len() - 1
    }

    /// Runs the backward pass from `output` and returns the adjoint of every recorded node.
    ///
    /// A constant output (one that never touched a tape variable) yields all-zero adjoints.
    pub fn gradient(&self, output: Var<'_>) -> Adjoints {
        let nodes = self.nodes.borrow();
        let mut adjoints = vec![0.0; nodes.len()];

        if let Some((tape, root)) = output.node {
            debug_assert!(std::ptr::eq(tape, self), "output was recorded on another tape");
            adjoints[root] = 1.0;
            for index in (0..=root).rev() {
                let adjoint = adjoints[index];
                if adjoint == 0.0 {
                    continue;
                }
                for &(parent, partial) in nodes[index].parents() {
                    adjoints[parent] += partial * adjoint;
                }
            }
        }

        Adjoints { values: adjoints }
    }
}

/// Result of a backward pass: d(output)/d(node) for every node on the tape.
#[derive(Debug, Clone)]
pub struct Adjoints {
    values: Vec<f64>,
}

impl Adjoints {
    /// Gradient of the differentiated output with respect to `var`. Zero for constants.
    pub fn wrt(&self, var: Var<'_>) -> f64 {
        var.node
            .and_then(|(_, index)| self.values.get(index).copied())
            .unwrap_or(0.0)
    }
}

/// A scalar that records its computational history on a [`Tape`].
///
/// Constants created through [`Real::constant`] are not recorded and act as literals.
#[derive(Clone, Copy)]
pub struct Var<'t> {
    node: Option<(&'t Tape, usize)>,
    value: f64,
}

impl fmt::Debug for Var<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node {
            Some((_, index)) => write!(f, "Var({} @ {})", self.value, index),
            None => write!(f, "Var({})", self.value),
        }
    }
}

impl<'t> Var<'t> {
    pub fn is_constant(&self) -> bool {
        self.node.is_none()
    }

    #[inline]
    fn unary(self, value: f64, partial: f64) -> Self {
        match self.node {
            Some((tape, index)) => Var {
                node: Some((tape, tape.push(&[(index, partial)]))),
                value,
            },
            None => Var { node: None, value },
        }
    }

    #[inline]
    fn binary(lhs: Self, rhs: Self, value: f64, d_lhs: f64, d_rhs: f64) -> Self {
        let node = match (lhs.node, rhs.node) {
            (Some((tape, i)), Some((other, j))) => {
                debug_assert!(std::ptr::eq(tape, other), "mixing variables from two tapes");
                Some((tape, tape.push(&[(i, d_lhs), (j, d_rhs)])))
            }
            (Some((tape, i)), None) => Some((tape, tape.push(&[(i, d_lhs)]))),
            (None, Some((tape, j))) => Some((tape, tape.push(&[(j, d_rhs)]))),
            (None, None) => None,
        };
        Var { node, value }
    }
}

impl Real for Var<'_> {
    #[inline]
    fn constant(value: f64) -> Self {
        Var { node: None, value }
    }

    #[inline]
    fn value(&self) -> f64 {
        self.value
    }

    #[inline]
    fn sqrt(self) -> Self {
        let root = self.value.sqrt();
        let partial = if root > 0.0 { 0.5 / root } else { 0.0 };
        self.unary(root, partial)
    }

    #[inline]
    fn powi(self, n: i32) -> Self {
        let partial = match n {
            0 => 0.0,
            _ => f64::from(n) * self.value.powi(n - 1),
        };
        self.unary(self.value.powi(n), partial)
    }

    #[inline]
    fn recip(self) -> Self {
        let inv = self.value.recip();
        self.unary(inv, -inv * inv)
    }

    #[inline]
    fn sin(self) -> Self {
        self.unary(self.value.sin(), self.value.cos())
    }

    #[inline]
    fn cos(self) -> Self {
        self.unary(self.value.cos(), -self.value.sin())
    }

    #[inline]
    fn acos(self) -> Self {
        let one_minus_sq = 1.0 - self.value * self.value;
        let partial = if one_minus_sq > 0.0 {
            -1.0 / one_minus_sq.sqrt()
        } else {
            0.0
        };
        self.unary(self.value.acos(), partial)
    }

    #[inline]
    fn atan2(self, other: Self) -> Self {
        let (y, x) = (self.value, other.value);
        let r2 = x * x + y * y;
        let (d_y, d_x) = if r2 > 0.0 { (x / r2, -y / r2) } else { (0.0, 0.0) };
        Var::binary(self, other, y.atan2(x), d_y, d_x)
    }

    #[inline]
    fn clamp(self, lo: f64, hi: f64) -> Self {
        if self.value < lo {
            self.unary(lo, 0.0)
        } else if self.value > hi {
            self.unary(hi, 0.0)
        } else {
            self
        }
    }
}

impl<'t> Add for Var<'t> {
    type Output = Var<'t>;
    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Var::binary(self, rhs, self.value + rhs.value, 1.0, 1.0)
    }
}

impl<'t> Sub for Var<'t> {
    type Output = Var<'t>;
    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Var::binary(self, rhs, self.value - rhs.value, 1.0, -1.0)
    }
}

impl<'t> Mul for Var<'t> {
    type Output = Var<'t>;
    #[inline]
    fn mul(self, rhs: Self) -> Self::Output {
        Var::binary(self, rhs, self.value * rhs.value, rhs.value, self.value)
    }
}

impl<'t> Div for Var<'t> {
    type Output = Var<'t>;
    #[inline]
    fn div(self, rhs: Self) -> Self::Output {
        let inv = rhs.value.recip();
        let quotient = self.value * inv;
        Var::binary(self, rhs, quotient, inv, -quotient * inv)
    }
}

impl<'t> Neg for Var<'t> {
    type Output = Var<'t>;
    #[inline]
    fn neg(self) -> Self::Output {
        self.unary(-self.value, -1.0)
    }
}

impl<'t> Add<f64> for Var<'t> {
    type Output = Var<'t>;
    #[inline]
    fn add(self, rhs: f64) -> Self::Output {
        self.unary(self.value + rhs, 1.0)
    }
}

impl<'t> Sub<f64> for Var<'t> {
    type Output = Var<'t>;
    #[inline]
    fn sub(self, rhs: f64) -> Self::Output {
        self.unary(self.value - rhs, 1.0)
    }
}

impl<'t> Mul<f64> for Var<'t> {
    type Output = Var<'t>;
    #[inline]
    fn mul(self, rhs: f64) -> Self::Output {
        self.unary(self.value * rhs, rhs)
    }
}

impl<'t> Div<f64> for Var<'t> {
    type Output = Var<'t>;
    #[inline]
    fn div(self, rhs: f64) -> Self::Output {
        self.unary(self.value / rhs, rhs.recip())
    }
}
