//! HIR expressions. Every expression already carries its resolved type
//! (possibly `error`) as produced by the typechecker, or folded in by
//! lowering itself (e.g. `sizeof`, enum-value identifiers).

use mlc_intern::Symbol;
use mlc_span::FileSpan;
use mlc_ty::Type;

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
    pub span: FileSpan,
}

#[derive(Debug, Clone)]
pub enum Literal {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Char(char),
    String(String),
    Void,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
    Deref,
    AddrOf,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

#[derive(Debug, Clone)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub guard: Option<Box<Expr>>,
    pub body: Box<Expr>,
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Literal(Literal),
    EnumVariant { enum_name: Symbol, variant: Symbol, tag: i64 },
    Variable(Symbol),
    Wildcard,
}

#[derive(Debug, Clone)]
pub struct StructFieldInit {
    pub field: Symbol,
    pub value: Box<Expr>,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    VarRef { name: Symbol, is_function_ref: bool, is_closure: bool },
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Unary { op: UnOp, operand: Box<Expr> },
    Call { func_name: Symbol, args: Vec<Expr>, is_indirect: bool },
    Index { object: Box<Expr>, index: Box<Expr> },
    Slice { object: Box<Expr>, start: Option<Box<Expr>>, end: Option<Box<Expr>>, step: Option<Box<Expr>> },
    Member { object: Box<Expr>, field_or_method: Symbol, args: Option<Vec<Expr>>, is_method_call: bool },
    Ternary { cond: Box<Expr>, then_branch: Box<Expr>, else_branch: Box<Expr> },
    Match { scrutinee: Box<Expr>, arms: Vec<MatchArm> },
    StructLiteral { struct_name: Symbol, fields: Vec<StructFieldInit> },
    ArrayLiteral { elements: Vec<Expr> },
    Cast { operand: Box<Expr>, target: Type },
    EnumConstruct { enum_name: Symbol, variant: Symbol, tag: i64, args: Vec<Expr> },
    EnumPayload { scrutinee: Box<Expr>, variant: Symbol, field_index: usize },
    Lambda { params: Vec<(Symbol, Type)>, return_type: Type, body: Box<crate::stmt::Block> },
    /// An expression-positioned block: runs `stmts` for side effects, then
    /// evaluates to `value`. Used by match-arm desugaring to bind a
    /// variable pattern (`let name = scrutinee; <arm body>`) without
    /// needing a separate "let expression" node.
    Block { stmts: Vec<crate::stmt::Stmt>, value: Box<Expr> },
    /// Marks an expression the typechecker (or lowering itself) could not
    /// give a concrete type: `ty` above is `Type::Primitive(Error)`.
    Error,
}

impl Expr {
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.ty.is_error() || matches!(self.kind, ExprKind::Error)
    }
}
