// Parser for isoc .adl declaration files.
//
// Parses a token stream (from the lexer) into an AST per the declaration
// language grammar. Uses chumsky combinators.
//
// Preconditions: input is a valid token stream from `lexer::lex()`.
// Postconditions: returns an AST plus any parse errors (non-fatal).
// Failure modes: syntax errors produce `Rich` diagnostics.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::ast::*;
use crate::lexer::Token;

/// Result of parsing: AST plus any errors.
#[derive(Debug)]
pub struct ParseResult {
    pub program: Option<Program>,
    pub errors: Vec<Rich<'static, Token, SimpleSpan>>,
}

/// Parse a declaration source string. Lexes then parses.
pub fn parse(source: &str) -> ParseResult {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    // Convert lexer output to chumsky stream.
    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let parser = program_parser();
    let (program, parse_errors) = parser.parse(stream).into_output_errors();

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
        program,
        errors: all_errors,
    }
}

/// Parts shared by every member form before attributes are attached.
type MemberParts = (
    MemberKind,
    bool,
    Ident,
    Vec<Param>,
    Option<TypeRef>,
    Option<Block>,
);

// ── Main parser builder ──

fn program_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Program, extra::Err<Rich<'tokens, Token, SimpleSpan>>>
where
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    // ── Identifier ──

    let ident = select! {
        Token::Ident(name) = e => Ident { name, span: e.span() },
    };

    // Unnamed members get a synthesized name spanning their keyword.
    let keyword_name = |tok: Token, name: &'static str| {
        just(tok).map_with(move |_, e| Ident {
            name: name.to_string(),
            span: e.span(),
        })
    };

    // ── Reference: IDENT ('.' IDENT)? ──

    let reference = ident
        .clone()
        .then(just(Token::Dot).ignore_then(ident.clone()).or_not())
        .map_with(|(first, second), e| match second {
            Some(name) => Ref {
                base: Some(first),
                name,
                span: e.span(),
            },
            None => Ref {
                base: None,
                name: first,
                span: e.span(),
            },
        });

    // ── Type reference ──

    let closure_ty = choice((
        just(Token::Fn).to(Escapability::NonEscaping),
        just(Token::Escaping)
            .then(just(Token::Fn))
            .to(Escapability::Escaping),
        just(Token::Concurrent)
            .then(just(Token::Fn))
            .to(Escapability::Concurrent),
    ))
    .map_with(|esc, e| TypeRef::Closure(esc, e.span()));

    let type_ref = closure_ty.or(ident.clone().map(TypeRef::Named));

    // ── Blocks and statements (closures nest) ──

    let block = recursive(|block| {
        let expr = block
            .clone()
            .map(Expr::Closure)
            .or(reference.clone().map(Expr::Ref));

        let arg = just(Token::Amp)
            .ignore_then(reference.clone())
            .map(Arg::Inout)
            .or(expr.clone().map(Arg::Value));

        let args = arg
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LParen), just(Token::RParen));

        let read = just(Token::Read)
            .ignore_then(reference.clone())
            .map(StmtKind::Read);

        let write = just(Token::Write)
            .ignore_then(reference.clone())
            .map(StmtKind::Write);

        let call = just(Token::Call)
            .to(false)
            .or(just(Token::Await).to(true))
            .then(reference.clone())
            .then(args.or_not())
            .map(|((is_await, callee), args)| StmtKind::Call {
                callee,
                args: args.unwrap_or_default(),
                is_await,
            });

        let let_stmt = just(Token::Let)
            .ignore_then(ident.clone())
            .then_ignore(just(Token::Equals))
            .then(expr.clone())
            .map(|(name, value)| StmtKind::Let { name, value });

        let return_stmt = just(Token::Return).ignore_then(expr).map(StmtKind::Return);

        let stmt = choice((read, write, call, let_stmt, return_stmt)).map_with(|kind, e| Stmt {
            kind,
            span: e.span(),
        });

        stmt.repeated()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LBrace), just(Token::RBrace))
            .map_with(|stmts, e| Block {
                stmts,
                span: e.span(),
            })
    });

    // ── Attributes: '@' IDENT ('(' IDENT ')')? ──

    let attr = just(Token::At)
        .ignore_then(ident.clone())
        .then(
            ident
                .clone()
                .delimited_by(just(Token::LParen), just(Token::RParen))
                .or_not(),
        )
        .map_with(|(name, arg), e| Attribute {
            name,
            arg,
            span: e.span(),
        });

    let attrs = attr.repeated().collect::<Vec<_>>();

    // ── Members ──

    let params = ident
        .clone()
        .then_ignore(just(Token::Colon))
        .then(type_ref.clone())
        .map(|(name, ty)| Param { name, ty })
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LParen), just(Token::RParen));

    let func = just(Token::Async)
        .or_not()
        .then_ignore(just(Token::Func))
        .then(ident.clone())
        .then(params.clone())
        .then(block.clone().or_not())
        .map(|(((is_async, name), params), body)| -> MemberParts {
            (MemberKind::Func, is_async.is_some(), name, params, None, body)
        });

    let init = just(Token::Async)
        .or_not()
        .then(keyword_name(Token::Init, "init"))
        .then(params.clone())
        .then(block.clone().or_not())
        .map(|(((is_async, name), params), body)| -> MemberParts {
            (MemberKind::Init, is_async.is_some(), name, params, None, body)
        });

    let deinit = keyword_name(Token::Deinit, "deinit")
        .then(block.clone().or_not())
        .map(|(name, body)| -> MemberParts {
            (MemberKind::Deinit, false, name, Vec::new(), None, body)
        });

    let subscript = keyword_name(Token::Subscript, "subscript")
        .then(params)
        .then_ignore(just(Token::Colon))
        .then(type_ref.clone())
        .then(block.clone().or_not())
        .map(|(((name, params), ty), body)| -> MemberParts {
            (MemberKind::Subscript, false, name, params, Some(ty), body)
        });

    let getter = just(Token::LBrace)
        .then(just(Token::Get))
        .then(just(Token::RBrace))
        .ignored();

    let property = just(Token::Let)
        .to(true)
        .or(just(Token::Var).to(false))
        .then(ident.clone())
        .then_ignore(just(Token::Colon))
        .then(type_ref)
        .then(getter.or_not())
        .map(|(((is_let, name), ty), getter)| -> MemberParts {
            let kind = match (getter.is_some(), is_let) {
                (true, _) => MemberKind::ComputedVar,
                (false, true) => MemberKind::Let,
                (false, false) => MemberKind::Var,
            };
            (kind, false, name, Vec::new(), Some(ty), None)
        });

    let bare_member = just(Token::Static)
        .or_not()
        .then(choice((func, init, deinit, subscript, property)))
        .map_with(
            |(is_static, (kind, is_async, name, params, ty, body)), e| Member {
                attrs: Vec::new(),
                is_static: is_static.is_some(),
                is_async,
                kind,
                name,
                params,
                ty,
                body,
                span: e.span(),
            },
        );

    let member = attrs
        .clone()
        .then(bare_member.clone())
        .map(|(attrs, mut member)| {
            member.attrs = attrs;
            member
        });

    let member_list = member
        .repeated()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LBrace), just(Token::RBrace));

    // ── Type declarations and extensions ──

    let inherits = just(Token::Colon)
        .ignore_then(
            ident
                .clone()
                .separated_by(just(Token::Comma))
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .or_not()
        .map(Option::unwrap_or_default);

    let type_kind = choice((
        just(Token::Global)
            .then(just(Token::Actor))
            .to(TypeKind::GlobalActor),
        just(Token::Actor).to(TypeKind::Actor),
        just(Token::Class).to(TypeKind::Class),
        just(Token::Struct).to(TypeKind::Struct),
        just(Token::Protocol).to(TypeKind::Protocol),
    ));

    let type_decl = type_kind
        .then(ident.clone())
        .then(inherits.clone())
        .then(member_list.clone().or_not())
        .map(|(((kind, name), inherits), members)| {
            ItemKind::Type(TypeDecl {
                kind,
                name,
                inherits,
                members: members.unwrap_or_default(),
            })
        });

    let extension = just(Token::Extension)
        .ignore_then(ident.clone())
        .then(inherits)
        .then(member_list)
        .map(|((target, conforms), members)| {
            ItemKind::Extension(ExtensionDecl {
                target,
                conforms,
                members,
            })
        });

    let item = attrs
        .then(choice((
            type_decl,
            extension,
            bare_member.map(ItemKind::Member),
        )))
        .map_with(|(attrs, kind), e| {
            // Attributes written before a top-level function belong to it.
            let (attrs, kind) = match kind {
                ItemKind::Member(mut member) => {
                    member.attrs = attrs;
                    (Vec::new(), ItemKind::Member(member))
                }
                other => (attrs, other),
            };
            Item {
                attrs,
                kind,
                span: e.span(),
            }
        });

    // ── Program ──

    just(Token::Module)
        .ignore_then(ident)
        .or_not()
        .then(item.repeated().collect::<Vec<_>>())
        .map_with(|(module, items), e| Program {
            module,
            items,
            span: e.span(),
        })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Program {
        let result = parse(source);
        assert!(
            result.errors.is_empty(),
            "unexpected errors: {:#?}",
            result.errors
        );
        result.program.expect("expected program")
    }

    fn parse_one_type(source: &str) -> (Vec<Attribute>, TypeDecl) {
        let prog = parse_ok(source);
        assert_eq!(prog.items.len(), 1, "expected 1 item");
        let item = prog.items.into_iter().next().unwrap();
        match item.kind {
            ItemKind::Type(t) => (item.attrs, t),
            other => panic!("expected type, got {:?}", other),
        }
    }

    #[test]
    fn empty_program() {
        let prog = parse_ok("");
        assert!(prog.module.is_none());
        assert!(prog.items.is_empty());
    }

    #[test]
    fn module_header() {
        let prog = parse_ok("module Bank\nstruct Money");
        assert_eq!(prog.module.unwrap().name, "Bank");
        assert_eq!(prog.items.len(), 1);
    }

    #[test]
    fn actor_with_members() {
        let (_, t) = parse_one_type(
            "actor BankAccount {\n  let accountNumber: Int\n  var balance: Double\n  async func deposit(amount: Double) { write self.balance }\n}",
        );
        assert_eq!(t.kind, TypeKind::Actor);
        assert_eq!(t.name.name, "BankAccount");
        assert_eq!(t.members.len(), 3);
        assert_eq!(t.members[0].kind, MemberKind::Let);
        assert_eq!(t.members[1].kind, MemberKind::Var);
        let deposit = &t.members[2];
        assert_eq!(deposit.kind, MemberKind::Func);
        assert!(deposit.is_async);
        assert_eq!(deposit.params.len(), 1);
        assert_eq!(deposit.body.as_ref().unwrap().stmts.len(), 1);
    }

    #[test]
    fn global_actor_and_attributes() {
        let prog = parse_ok(
            "global actor UIActor { static let shared: UIActor }\n@UIActor class View : NSObject, Drawable { @actorIndependent(unsafe) func peek() }",
        );
        assert_eq!(prog.items.len(), 2);
        match &prog.items[0].kind {
            ItemKind::Type(t) => {
                assert_eq!(t.kind, TypeKind::GlobalActor);
                assert!(t.members[0].is_static);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(prog.items[1].attrs.len(), 1);
        assert_eq!(prog.items[1].attrs[0].name.name, "UIActor");
        match &prog.items[1].kind {
            ItemKind::Type(t) => {
                assert_eq!(t.inherits.len(), 2);
                let attr = &t.members[0].attrs[0];
                assert_eq!(attr.name.name, "actorIndependent");
                assert_eq!(attr.arg.as_ref().unwrap().name, "unsafe");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn top_level_function_takes_item_attributes() {
        let prog = parse_ok("@UIActor func refresh() { }");
        assert!(prog.items[0].attrs.is_empty());
        match &prog.items[0].kind {
            ItemKind::Member(m) => {
                assert_eq!(m.attrs.len(), 1);
                assert_eq!(m.name.name, "refresh");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn computed_property_subscript_init_deinit() {
        let (_, t) = parse_one_type(
            "class C { var total: Int { get } subscript(i: Int): Int init() { } deinit { } }",
        );
        let kinds: Vec<_> = t.members.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![
                MemberKind::ComputedVar,
                MemberKind::Subscript,
                MemberKind::Init,
                MemberKind::Deinit,
            ]
        );
        assert_eq!(t.members[2].name.name, "init");
    }

    #[test]
    fn closure_parameter_types() {
        let (_, t) = parse_one_type(
            "class Seq { func each(body: fn) func store(body: escaping fn) func par(body: concurrent fn) }",
        );
        let escs: Vec<_> = t
            .members
            .iter()
            .map(|m| match &m.params[0].ty {
                TypeRef::Closure(esc, _) => *esc,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(
            escs,
            vec![
                Escapability::NonEscaping,
                Escapability::Escaping,
                Escapability::Concurrent,
            ]
        );
    }

    #[test]
    fn statements_and_nested_closures() {
        let prog = parse_ok(
            "func f(seq: Seq) {\n  let c = { write self.balance call g({ read x }) }\n  call seq.each(c)\n  await other.deposit(&self.balance, amount)\n  return { read y }\n}",
        );
        let body = match &prog.items[0].kind {
            ItemKind::Member(m) => m.body.clone().unwrap(),
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(body.stmts.len(), 4);
        match &body.stmts[0].kind {
            StmtKind::Let {
                value: Expr::Closure(inner),
                ..
            } => assert_eq!(inner.stmts.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        match &body.stmts[2].kind {
            StmtKind::Call {
                is_await, args, ..
            } => {
                assert!(*is_await);
                assert!(matches!(args[0], Arg::Inout(_)));
                assert!(matches!(args[1], Arg::Value(Expr::Ref(_))));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(body.stmts[3].kind, StmtKind::Return(Expr::Closure(_))));
    }

    #[test]
    fn extension_with_conformance() {
        let prog = parse_ok("extension View : Drawable { func draw() }");
        match &prog.items[0].kind {
            ItemKind::Extension(ext) => {
                assert_eq!(ext.target.name, "View");
                assert_eq!(ext.conforms[0].name, "Drawable");
                assert_eq!(ext.members.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn syntax_error_reported() {
        let result = parse("actor { }");
        assert!(!result.errors.is_empty());
    }
}
