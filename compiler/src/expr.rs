// expr.rs — Expression AST and target renderer
//
// Join key functions and map functions are small expressions over
// positional parameters. The parser produces `Expr`; code generation renders
// it into target syntax given the ordered parameter names of the enclosing
// anonymous function.
//
// Preconditions: expressions come from `parser::parse_expr`.
// Postconditions: `render` output is a single-line target expression.
// Failure modes: none (rendering is total; parameter ranges are checked by
//                IR validation before code generation).
// Side effects: none.

use std::fmt::Write as _;

use chumsky::span::SimpleSpan;

/// Byte-offset span (alias for chumsky's `SimpleSpan`).
pub type Span = SimpleSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    NotEq,
    And,
    Or,
}

impl BinaryOp {
    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 6,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => 4,
            BinaryOp::Eq | BinaryOp::NotEq => 3,
            BinaryOp::And => 2,
            BinaryOp::Or => 1,
        }
    }

    fn target_symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Eq => "===",
            BinaryOp::NotEq => "!==",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Lit(Literal),
    /// Positional parameter of the enclosing function.
    Param(u32),
    /// Free name, rendered verbatim.
    Ident(String),
    Tuple(Vec<Expr>),
    Index(Box<Expr>, Box<Expr>),
    Field(Box<Expr>, String),
    Call(Box<Expr>, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// `$index` with a zero-width span, for programmatically built IR.
    pub fn param(index: u32) -> Self {
        Self::new(ExprKind::Param(index), (0..0).into())
    }

    /// Every parameter reference in the expression, with its span, in
    /// source order.
    pub fn param_refs(&self) -> Vec<(u32, Span)> {
        let mut out = Vec::new();
        self.visit(&mut |e| {
            if let ExprKind::Param(i) = e.kind {
                out.push((i, e.span));
            }
        });
        out
    }

    /// Free identifiers, in source order. Field names are not included.
    pub fn free_names(&self) -> Vec<(&str, Span)> {
        let mut out = Vec::new();
        self.visit(&mut |e| {
            if let ExprKind::Ident(name) = &e.kind {
                out.push((name.as_str(), e.span));
            }
        });
        out
    }

    /// Pre-order walk.
    fn visit<'a, F: FnMut(&'a Expr)>(&'a self, f: &mut F) {
        f(self);
        match &self.kind {
            ExprKind::Param(_) | ExprKind::Lit(_) | ExprKind::Ident(_) => {}
            ExprKind::Tuple(items) => items.iter().for_each(|e| e.visit(f)),
            ExprKind::Index(base, idx) => {
                base.visit(f);
                idx.visit(f);
            }
            ExprKind::Field(base, _) => base.visit(f),
            ExprKind::Call(callee, args) => {
                callee.visit(f);
                args.iter().for_each(|e| e.visit(f));
            }
            ExprKind::Unary(_, e) => e.visit(f),
            ExprKind::Binary(_, l, r) => {
                l.visit(f);
                r.visit(f);
            }
        }
    }

    /// Render into target syntax. `params[i]` is the name bound to `$i`.
    ///
    /// Out-of-range parameters render as `undefined`; validation rejects
    /// them before code generation runs.
    pub fn render(&self, params: &[String]) -> String {
        let mut out = String::new();
        self.render_into(params, &mut out);
        out
    }

    fn render_into(&self, params: &[String], out: &mut String) {
        match &self.kind {
            ExprKind::Lit(lit) => render_literal(lit, out),
            ExprKind::Param(i) => match params.get(*i as usize) {
                Some(name) => out.push_str(name),
                None => out.push_str("undefined"),
            },
            ExprKind::Ident(name) => out.push_str(name),
            ExprKind::Tuple(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.render_into(params, out);
                }
                out.push(']');
            }
            ExprKind::Index(base, idx) => {
                base.render_postfix_base(params, out);
                out.push('[');
                idx.render_into(params, out);
                out.push(']');
            }
            ExprKind::Field(base, name) => {
                base.render_postfix_base(params, out);
                out.push('.');
                out.push_str(name);
            }
            ExprKind::Call(callee, args) => {
                callee.render_postfix_base(params, out);
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    arg.render_into(params, out);
                }
                out.push(')');
            }
            ExprKind::Unary(op, operand) => {
                out.push(match op {
                    UnaryOp::Neg => '-',
                    UnaryOp::Not => '!',
                });
                let wrap = matches!(operand.kind, ExprKind::Binary(..) | ExprKind::Unary(..));
                render_wrapped(operand, params, wrap, out);
            }
            ExprKind::Binary(op, lhs, rhs) => {
                let lhs_wrap = matches!(&lhs.kind, ExprKind::Binary(l, ..) if l.precedence() < op.precedence());
                // Left associativity: an equal-precedence right operand needs parens.
                let rhs_wrap = matches!(&rhs.kind, ExprKind::Binary(r, ..) if r.precedence() <= op.precedence());
                render_wrapped(lhs, params, lhs_wrap, out);
                let _ = write!(out, " {} ", op.target_symbol());
                render_wrapped(rhs, params, rhs_wrap, out);
            }
        }
    }

    /// Postfix operators bind tighter than anything but atoms. An integer
    /// base is wrapped too: `5.x` would lex as a malformed number.
    fn render_postfix_base(&self, params: &[String], out: &mut String) {
        let wrap = matches!(
            self.kind,
            ExprKind::Binary(..) | ExprKind::Unary(..) | ExprKind::Lit(Literal::Int(_))
        );
        render_wrapped(self, params, wrap, out);
    }
}

fn render_wrapped(expr: &Expr, params: &[String], wrap: bool, out: &mut String) {
    if wrap {
        out.push('(');
        expr.render_into(params, out);
        out.push(')');
    } else {
        expr.render_into(params, out);
    }
}

fn render_literal(lit: &Literal, out: &mut String) {
    match lit {
        Literal::Int(v) => {
            let _ = write!(out, "{v}");
        }
        Literal::Float(v) => {
            if v.fract() == 0.0 && v.is_finite() {
                let _ = write!(out, "{v:.1}");
            } else {
                let _ = write!(out, "{v}");
            }
        }
        Literal::Str(s) => out.push_str(&crate::doc::quote_str(s)),
        Literal::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Literal::Null => out.push_str("null"),
    }
}
