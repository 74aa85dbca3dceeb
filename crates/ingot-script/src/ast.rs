//! Minimal syntax tree for query scripts.
//!
//! The tree is deliberately small: literals stay as raw source slices
//! (strings keep their quotes and unresolved escapes, numbers keep their
//! spelling, regex literals keep `/.../flags`), and everything the emitter
//! does not need is left out. It sits between the token stream and the Lua
//! emitter the way crucible-query's IR sits between syntax and render.

use serde::Serialize;

/// Binary operators, in source spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    /// `==` and `===` (both emit Lua `==`)
    Eq,
    /// `!=` and `!==` (both emit Lua `~=`)
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    /// `!`
    Not,
    /// Unary `-`
    Neg,
    /// `typeof`
    TypeOf,
}

/// `=`, `+=`, `-=`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
}

/// `++` / `--`, prefix or postfix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOp {
    Increment,
    Decrement,
}

/// One segment of a template literal after parsing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSegment {
    /// Literal text, escapes still unresolved
    Text(String),
    /// A parsed `${...}` hole
    Expr(Expr),
}

/// Object literal keys: `{name: v}` or `{"name": v}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropKey {
    Ident(String),
    /// Raw string literal, quotes included
    Str(String),
}

/// Arrow function body: a bare expression or a braced block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Ident(String),
    /// Numeric literal, source spelling preserved
    Number(String),
    /// String literal, quotes and escapes preserved
    Str(String),
    /// Regex literal, `/.../flags` preserved
    Regex(String),
    Template(Vec<TemplateSegment>),
    Bool(bool),
    /// `null` and `undefined`
    Nil,
    Array(Vec<Expr>),
    Object(Vec<(PropKey, Expr)>),
    Paren(Box<Expr>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Arrow {
        params: Vec<String>,
        body: ArrowBody,
    },
    Member {
        obj: Box<Expr>,
        prop: String,
    },
    Index {
        obj: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    New {
        callee: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// True when this expression is literally a string: a string or
    /// template literal, possibly through parens or a concatenation.
    /// Drives the `+` → `..` choice.
    pub fn is_stringish(&self) -> bool {
        match self {
            Expr::Str(_) | Expr::Template(_) => true,
            Expr::Paren(inner) => inner.is_stringish(),
            Expr::Binary {
                op: BinaryOp::Add,
                lhs,
                rhs,
            } => lhs.is_stringish() || rhs.is_stringish(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    /// `const`/`let`/`var` declaration
    Local {
        name: String,
        init: Option<Expr>,
    },
    /// Named function declaration
    Function {
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
    },
    If {
        /// `(condition, body)` for `if` and each `else if`
        arms: Vec<(Expr, Vec<Stmt>)>,
        otherwise: Option<Vec<Stmt>>,
    },
    /// `for (const x of e)`
    ForOf {
        var: String,
        iter: Expr,
        body: Vec<Stmt>,
    },
    /// `for (x in e)`
    ForIn {
        var: String,
        iter: Expr,
        body: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Expr(Expr),
    /// Source comment carried through to the output
    Comment {
        text: String,
        block: bool,
    },
    /// A construct the transpiler deliberately does not support; emits an
    /// inert diagnostic comment and nothing else
    Unsupported {
        reason: String,
    },
    /// Blank line marker preserving the source's paragraph structure
    Blank,
}
