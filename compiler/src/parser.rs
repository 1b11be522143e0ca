// Parser for key and map function expressions.
//
// Parses a token stream (from the lexer) into an `Expr`. Uses chumsky
// combinators. Precedence, loosest first: `||`, `&&`, `== !=`,
// `< <= > >=`, `+ -`, `* / %`, unary `- !`, postfix `[i] .f (args)`.
//
// Preconditions: input is an expression string from an IR document.
// Postconditions: returns an expression plus any parse errors.
// Failure modes: syntax errors produce `Rich` errors; no partial tree is used.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::expr::*;
use crate::lexer::Token;

/// Result of parsing: expression plus any errors.
#[derive(Debug)]
pub struct ParseResult {
    pub expr: Option<Expr>,
    pub errors: Vec<Rich<'static, Token, SimpleSpan>>,
}

impl ParseResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty() && self.expr.is_some()
    }
}

/// Parse an expression string. Lexes then parses.
pub fn parse_expr(source: &str) -> ParseResult {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    // Convert lexer output to chumsky stream.
    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let parser = expr_parser(source);
    let (expr, parse_errors) = parser.parse(stream).into_output_errors();

    // Merge lex errors + parse errors.
    let mut all_errors: Vec<Rich<'static, Token, SimpleSpan>> = lex_result
        .errors
        .into_iter()
        .map(|e| {
            let span: SimpleSpan = (e.span.start..e.span.end).into();
            Rich::custom(span, e.message)
        })
        .collect();
    all_errors.extend(parse_errors.into_iter().map(|e| e.into_owned()));

    ParseResult {
        expr,
        errors: all_errors,
    }
}

// ── Postfix operations ──

enum Postfix {
    Index(Expr),
    Field(String),
    Call(Vec<Expr>),
}

// ── Parser builder ──

fn expr_parser<'tokens, 'src: 'tokens, I>(
    source: &'src str,
) -> impl Parser<'tokens, I, Expr, extra::Err<Rich<'tokens, Token, SimpleSpan>>> + 'src
where
    'tokens: 'src,
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    let ident_text = just(Token::Ident).map_with(move |_, e| {
        let span: SimpleSpan = e.span();
        source[span.start..span.end].to_string()
    });

    let expr = recursive(|expr| {
        let literal = select! {
            Token::Int(v) => Literal::Int(v),
            Token::Float(v) => Literal::Float(v),
            Token::Str(s) => Literal::Str(s),
            Token::True => Literal::Bool(true),
            Token::False => Literal::Bool(false),
            Token::Null => Literal::Null,
        }
        .map_with(|lit, e| Expr::new(ExprKind::Lit(lit), e.span()));

        let param = select! { Token::Param(i) => i }
            .map_with(|i, e| Expr::new(ExprKind::Param(i), e.span()));

        let ident = ident_text
            .clone()
            .map_with(|name, e| Expr::new(ExprKind::Ident(name), e.span()));

        let items = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>();

        let tuple = items
            .clone()
            .delimited_by(just(Token::LBracket), just(Token::RBracket))
            .map_with(|items, e| Expr::new(ExprKind::Tuple(items), e.span()));

        let parens = expr
            .clone()
            .delimited_by(just(Token::LParen), just(Token::RParen));

        let atom = choice((literal, param, ident, tuple, parens));

        // ── Postfix: index, field, call ──

        let postfix_op = choice((
            expr.clone()
                .delimited_by(just(Token::LBracket), just(Token::RBracket))
                .map(Postfix::Index),
            just(Token::Dot)
                .ignore_then(ident_text.clone())
                .map(Postfix::Field),
            items
                .delimited_by(just(Token::LParen), just(Token::RParen))
                .map(Postfix::Call),
        ));

        let postfix = atom.foldl_with(postfix_op.repeated(), |base: Expr, op, e| {
            let kind = match op {
                Postfix::Index(idx) => ExprKind::Index(Box::new(base), Box::new(idx)),
                Postfix::Field(name) => ExprKind::Field(Box::new(base), name),
                Postfix::Call(args) => ExprKind::Call(Box::new(base), args),
            };
            Expr::new(kind, e.span())
        });

        // ── Unary ──

        let unary_op = select! {
            Token::Minus => UnaryOp::Neg,
            Token::Bang => UnaryOp::Not,
        };
        let unary = unary_op
            .repeated()
            .foldr_with(postfix, |op, operand: Expr, e| {
                Expr::new(ExprKind::Unary(op, Box::new(operand)), e.span())
            });

        // ── Binary levels (left-associative) ──

        let product = unary.clone().foldl_with(
            select! {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Rem,
            }
            .then(unary)
            .repeated(),
            |lhs, (op, rhs), e| make_binary(lhs, op, rhs, e.span()),
        );
        let sum = product.clone().foldl_with(
            select! {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
            }
            .then(product)
            .repeated(),
            |lhs, (op, rhs), e| make_binary(lhs, op, rhs, e.span()),
        );
        let comparison = sum.clone().foldl_with(
            select! {
                Token::Lt => BinaryOp::Lt,
                Token::LtEq => BinaryOp::LtEq,
                Token::Gt => BinaryOp::Gt,
                Token::GtEq => BinaryOp::GtEq,
            }
            .then(sum)
            .repeated(),
            |lhs, (op, rhs), e| make_binary(lhs, op, rhs, e.span()),
        );
        let equality = comparison.clone().foldl_with(
            select! {
                Token::EqEq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
            }
            .then(comparison)
            .repeated(),
            |lhs, (op, rhs), e| make_binary(lhs, op, rhs, e.span()),
        );
        let conjunction = equality.clone().foldl_with(
            just(Token::AndAnd)
                .to(BinaryOp::And)
                .then(equality)
                .repeated(),
            |lhs, (op, rhs), e| make_binary(lhs, op, rhs, e.span()),
        );
        conjunction
            .clone()
            .foldl_with(
                just(Token::OrOr)
                    .to(BinaryOp::Or)
                    .then(conjunction)
                    .repeated(),
                |lhs, (op, rhs), e| make_binary(lhs, op, rhs, e.span()),
            )
            .boxed()
    });

    expr.then_ignore(end())
}

fn make_binary(lhs: Expr, op: BinaryOp, rhs: Expr, span: SimpleSpan) -> Expr {
    Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), span)
}

// ── Tests ──
