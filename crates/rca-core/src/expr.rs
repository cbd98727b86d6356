//! Guard expressions as they appear in a contract, by name.
//!
//! Expressions are resolved against a signature into [`crate::guard::Guard`]s
//! when the monitor is built; nothing here is evaluated directly.
//!
//! On the wire every node is an object tagged by `op`:
//!
//! ```json
//! {"op": "and", "args": [
//!     {"op": "var", "name": "HW"},
//!     {"op": "lt", "lhs": {"op": "clock", "name": "tP"}, "rhs": {"op": "var", "name": "d"}}
//! ]}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::ClockKind;

/// Literal constant. Symbols name an enumerator of some enumerated variable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Sym(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireExpr", into = "WireExpr")]
pub enum Expr {
    Const(Literal),
    /// Current value of a non-clock variable.
    Var(String),
    /// Value of a non-clock variable `depth` samples back (0 = current).
    Hist { name: String, depth: usize },
    /// Current reading of a clock.
    Clock { name: String, kind: ClockKind },
    /// Reading of a clock `depth` windows back (0 = current).
    ClockHist {
        name: String,
        kind: ClockKind,
        depth: usize,
    },
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Implies(Box<Expr>, Box<Expr>),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
}

impl Expr {
    pub fn truth(b: bool) -> Self {
        Expr::Const(Literal::Bool(b))
    }

    pub fn int(i: i64) -> Self {
        Expr::Const(Literal::Int(i))
    }

    pub fn sym(label: &str) -> Self {
        Expr::Const(Literal::Sym(label.to_string()))
    }

    pub fn var(name: &str) -> Self {
        Expr::Var(name.to_string())
    }

    pub fn hist(name: &str, depth: usize) -> Self {
        Expr::Hist {
            name: name.to_string(),
            depth,
        }
    }

    pub fn clock(name: &str) -> Self {
        Self::clock_kind(name, ClockKind::Total)
    }

    pub fn clock_kind(name: &str, kind: ClockKind) -> Self {
        Expr::Clock {
            name: name.to_string(),
            kind,
        }
    }

    pub fn clock_hist(name: &str, kind: ClockKind, depth: usize) -> Self {
        Expr::ClockHist {
            name: name.to_string(),
            kind,
            depth,
        }
    }

    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn and(self, rhs: Expr) -> Self {
        Expr::And(vec![self, rhs])
    }

    pub fn or(self, rhs: Expr) -> Self {
        Expr::Or(vec![self, rhs])
    }

    pub fn implies(self, rhs: Expr) -> Self {
        Expr::Implies(Box::new(self), Box::new(rhs))
    }

    pub fn cmp(self, op: CmpOp, rhs: Expr) -> Self {
        Expr::Cmp(op, Box::new(self), Box::new(rhs))
    }

    pub fn eq(self, rhs: Expr) -> Self {
        self.cmp(CmpOp::Eq, rhs)
    }

    pub fn lt(self, rhs: Expr) -> Self {
        self.cmp(CmpOp::Lt, rhs)
    }

    pub fn le(self, rhs: Expr) -> Self {
        self.cmp(CmpOp::Le, rhs)
    }

    pub fn gt(self, rhs: Expr) -> Self {
        self.cmp(CmpOp::Gt, rhs)
    }

    pub fn ge(self, rhs: Expr) -> Self {
        self.cmp(CmpOp::Ge, rhs)
    }

    pub fn arith(self, op: ArithOp, rhs: Expr) -> Self {
        Expr::Arith(op, Box::new(self), Box::new(rhs))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(Literal::Bool(b)) => write!(f, "{b}"),
            Expr::Const(Literal::Int(i)) => write!(f, "{i}"),
            Expr::Const(Literal::Sym(s)) => write!(f, "{s}"),
            Expr::Var(name) => write!(f, "{name}"),
            Expr::Hist { name, depth } => write!(f, "h_{name}_{depth}"),
            Expr::Clock { name, kind } => write!(f, "{name}{}", kind_suffix(*kind)),
            Expr::ClockHist { name, kind, depth } => {
                write!(f, "h_{name}{}_{depth}", kind_suffix(*kind))
            }
            Expr::Not(arg) => write!(f, "!{arg}"),
            Expr::And(args) => write_joined(f, args, " && ", "true"),
            Expr::Or(args) => write_joined(f, args, " || ", "false"),
            Expr::Implies(lhs, rhs) => write!(f, "({lhs} -> {rhs})"),
            Expr::Cmp(op, lhs, rhs) => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Expr::Arith(op, lhs, rhs) => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Expr::Neg(arg) => write!(f, "-{arg}"),
        }
    }
}

fn kind_suffix(kind: ClockKind) -> &'static str {
    match kind {
        ClockKind::Total => "",
        ClockKind::Env => crate::constants::ENV_SUFFIX,
        ClockKind::Sys => crate::constants::SYS_SUFFIX,
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, args: &[Expr], sep: &str, empty: &str) -> fmt::Result {
    if args.is_empty() {
        return write!(f, "{empty}");
    }
    write!(f, "(")?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        write!(f, "{arg}")?;
    }
    write!(f, ")")
}

// --- Wire form ---

fn total() -> ClockKind {
    ClockKind::Total
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum WireExpr {
    Const {
        value: Literal,
    },
    Var {
        name: String,
    },
    Hist {
        name: String,
        depth: usize,
    },
    Clock {
        name: String,
        #[serde(default = "total")]
        kind: ClockKind,
    },
    #[serde(rename = "clock_hist", alias = "clockhist")]
    ClockHist {
        name: String,
        #[serde(default = "total")]
        kind: ClockKind,
        depth: usize,
    },
    Not {
        arg: Box<WireExpr>,
    },
    And {
        args: Vec<WireExpr>,
    },
    Or {
        args: Vec<WireExpr>,
    },
    Implies {
        lhs: Box<WireExpr>,
        rhs: Box<WireExpr>,
    },
    Eq {
        lhs: Box<WireExpr>,
        rhs: Box<WireExpr>,
    },
    Ne {
        lhs: Box<WireExpr>,
        rhs: Box<WireExpr>,
    },
    Lt {
        lhs: Box<WireExpr>,
        rhs: Box<WireExpr>,
    },
    Le {
        lhs: Box<WireExpr>,
        rhs: Box<WireExpr>,
    },
    Gt {
        lhs: Box<WireExpr>,
        rhs: Box<WireExpr>,
    },
    Ge {
        lhs: Box<WireExpr>,
        rhs: Box<WireExpr>,
    },
    Add {
        lhs: Box<WireExpr>,
        rhs: Box<WireExpr>,
    },
    Sub {
        lhs: Box<WireExpr>,
        rhs: Box<WireExpr>,
    },
    Mul {
        lhs: Box<WireExpr>,
        rhs: Box<WireExpr>,
    },
    Div {
        lhs: Box<WireExpr>,
        rhs: Box<WireExpr>,
    },
    Mod {
        lhs: Box<WireExpr>,
        rhs: Box<WireExpr>,
    },
    Neg {
        arg: Box<WireExpr>,
    },
}

impl TryFrom<WireExpr> for Expr {
    type Error = String;

    fn try_from(wire: WireExpr) -> Result<Self, Self::Error> {
        Ok(from_wire(wire))
    }
}

fn boxed(wire: Box<WireExpr>) -> Box<Expr> {
    Box::new(from_wire(*wire))
}

fn from_wire(wire: WireExpr) -> Expr {
    use WireExpr as W;
    let cmp = |op, lhs, rhs| Expr::Cmp(op, boxed(lhs), boxed(rhs));
    let arith = |op, lhs, rhs| Expr::Arith(op, boxed(lhs), boxed(rhs));
    match wire {
        W::Const { value } => Expr::Const(value),
        W::Var { name } => Expr::Var(name),
        W::Hist { name, depth } => Expr::Hist { name, depth },
        W::Clock { name, kind } => Expr::Clock { name, kind },
        W::ClockHist { name, kind, depth } => Expr::ClockHist { name, kind, depth },
        W::Not { arg } => Expr::Not(boxed(arg)),
        W::And { args } => Expr::And(args.into_iter().map(from_wire).collect()),
        W::Or { args } => Expr::Or(args.into_iter().map(from_wire).collect()),
        W::Implies { lhs, rhs } => Expr::Implies(boxed(lhs), boxed(rhs)),
        W::Eq { lhs, rhs } => cmp(CmpOp::Eq, lhs, rhs),
        W::Ne { lhs, rhs } => cmp(CmpOp::Ne, lhs, rhs),
        W::Lt { lhs, rhs } => cmp(CmpOp::Lt, lhs, rhs),
        W::Le { lhs, rhs } => cmp(CmpOp::Le, lhs, rhs),
        W::Gt { lhs, rhs } => cmp(CmpOp::Gt, lhs, rhs),
        W::Ge { lhs, rhs } => cmp(CmpOp::Ge, lhs, rhs),
        W::Add { lhs, rhs } => arith(ArithOp::Add, lhs, rhs),
        W::Sub { lhs, rhs } => arith(ArithOp::Sub, lhs, rhs),
        W::Mul { lhs, rhs } => arith(ArithOp::Mul, lhs, rhs),
        W::Div { lhs, rhs } => arith(ArithOp::Div, lhs, rhs),
        W::Mod { lhs, rhs } => arith(ArithOp::Mod, lhs, rhs),
        W::Neg { arg } => Expr::Neg(boxed(arg)),
    }
}

fn wire_box(expr: Box<Expr>) -> Box<WireExpr> {
    Box::new(WireExpr::from(*expr))
}

impl From<Expr> for WireExpr {
    fn from(expr: Expr) -> Self {
        use WireExpr as W;
        match expr {
            Expr::Const(value) => W::Const { value },
            Expr::Var(name) => W::Var { name },
            Expr::Hist { name, depth } => W::Hist { name, depth },
            Expr::Clock { name, kind } => W::Clock { name, kind },
            Expr::ClockHist { name, kind, depth } => W::ClockHist { name, kind, depth },
            Expr::Not(arg) => W::Not { arg: wire_box(arg) },
            Expr::And(args) => W::And {
                args: args.into_iter().map(WireExpr::from).collect(),
            },
            Expr::Or(args) => W::Or {
                args: args.into_iter().map(WireExpr::from).collect(),
            },
            Expr::Implies(lhs, rhs) => W::Implies {
                lhs: wire_box(lhs),
                rhs: wire_box(rhs),
            },
            Expr::Cmp(op, lhs, rhs) => {
                let (lhs, rhs) = (wire_box(lhs), wire_box(rhs));
                match op {
                    CmpOp::Eq => W::Eq { lhs, rhs },
                    CmpOp::Ne => W::Ne { lhs, rhs },
                    CmpOp::Lt => W::Lt { lhs, rhs },
                    CmpOp::Le => W::Le { lhs, rhs },
                    CmpOp::Gt => W::Gt { lhs, rhs },
                    CmpOp::Ge => W::Ge { lhs, rhs },
                }
            }
            Expr::Arith(op, lhs, rhs) => {
                let (lhs, rhs) = (wire_box(lhs), wire_box(rhs));
                match op {
                    ArithOp::Add => W::Add { lhs, rhs },
                    ArithOp::Sub => W::Sub { lhs, rhs },
                    ArithOp::Mul => W::Mul { lhs, rhs },
                    ArithOp::Div => W::Div { lhs, rhs },
                    ArithOp::Mod => W::Mod { lhs, rhs },
                }
            }
            Expr::Neg(arg) => W::Neg { arg: wire_box(arg) },
        }
    }
}
