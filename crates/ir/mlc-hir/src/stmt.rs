//! HIR statements.

use mlc_intern::Symbol;
use mlc_span::FileSpan;
use mlc_ty::Type;

use crate::expr::Expr;

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: FileSpan,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub value: Expr,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Let {
        name: Symbol,
        ty: Type,
        init: Option<Expr>,
        is_const: bool,
        is_static: bool,
        /// `let y = move x` registers `y` as a zero-cost alias of `x`
        /// rather than allocating a fresh local, when `init` is a plain
        /// variable reference.
        is_move: bool,
    },
    Assign {
        target: Expr,
        op: Option<crate::expr::BinOp>,
        value: Expr,
    },
    Return(Option<Expr>),
    If {
        cond: Expr,
        then_branch: Block,
        else_branch: Option<Block>,
    },
    While {
        cond: Expr,
        body: Block,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        update: Option<Expr>,
        body: Block,
    },
    Loop {
        body: Block,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
        default: Option<Block>,
    },
    Break,
    Continue,
    Block(Block),
    Defer {
        body: Block,
    },
    Asm {
        code: String,
        operands: Vec<AsmOperand>,
        clobbers: Vec<String>,
        is_must: bool,
    },
    MustBlock {
        body: Block,
    },
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub struct AsmOperand {
    pub name: Symbol,
    pub constraint: String,
    pub value: Option<Expr>,
}
