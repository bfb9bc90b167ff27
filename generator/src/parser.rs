// Parser for Go declaration sources.
//
// Parses a token stream (from the lexer) into a `SourceFile`. Only the
// declaration surface is modelled: package clause, imports, type declarations
// and function signatures. Function bodies and `var`/`const` declarations are
// skipped as balanced token trees. Uses chumsky combinators.
//
// Preconditions: input is a valid token stream from `lexer::lex()`.
// Postconditions: returns a source file plus any parse errors (non-fatal).
// Failure modes: syntax errors produce `Rich` diagnostics.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::ast::*;
use crate::lexer::Token;

type Extra<'tokens> = extra::Err<Rich<'tokens, Token, SimpleSpan>>;

/// Result of parsing: source file plus any errors.
#[derive(Debug)]
pub struct ParseResult {
    pub file: Option<SourceFile>,
    pub errors: Vec<Rich<'static, Token, SimpleSpan>>,
}

/// Parse a Go source string. Lexes then parses.
///
/// Returns a source file (if parsing succeeded) plus any errors.
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

    let parser = file_parser(source);
    let (file, parse_errors) = parser.parse(stream).into_output_errors();

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
        file,
        errors: all_errors,
    }
}

// ── Parameter grouping ──
//
// Go parameter lists are either fully named (`a, b int, c string`) or fully
// unnamed (`int, string`). Entries are parsed permissively and grouped here,
// where a bare identifier becomes a name once any entry proves the list is
// named.

#[derive(Debug, Clone)]
enum ParamEntry {
    Named(Ident, TypeExpr),
    Bare(TypeExpr, SimpleSpan),
}

fn group_params(entries: Vec<ParamEntry>, allow_variadic: bool) -> Result<Vec<ParamGroup>, String> {
    let named = entries.iter().any(|e| matches!(e, ParamEntry::Named(..)));
    let mut groups = Vec::new();

    if named {
        let mut pending: Vec<Ident> = Vec::new();
        for entry in entries {
            match entry {
                ParamEntry::Named(name, ty) => {
                    pending.push(name);
                    groups.push(ParamGroup {
                        names: std::mem::take(&mut pending),
                        ty,
                    });
                }
                ParamEntry::Bare(
                    TypeExpr::Named {
                        package: None,
                        name,
                    },
                    span,
                ) => pending.push(Ident::new(name, span)),
                ParamEntry::Bare(..) => {
                    return Err("mixed named and unnamed parameters".to_string());
                }
            }
        }
        if let Some(dangling) = pending.first() {
            return Err(format!("missing type for parameter '{}'", dangling.name));
        }
    } else {
        groups = entries
            .into_iter()
            .map(|e| match e {
                ParamEntry::Bare(ty, _) | ParamEntry::Named(_, ty) => ParamGroup {
                    names: Vec::new(),
                    ty,
                },
            })
            .collect();
    }

    let last = groups.len().saturating_sub(1);
    for (i, group) in groups.iter().enumerate() {
        if !group.ty.is_variadic() {
            continue;
        }
        if !allow_variadic {
            return Err("unexpected '...' in result list".to_string());
        }
        if i != last || group.names.len() > 1 {
            return Err("can only use '...' with the final parameter".to_string());
        }
    }

    Ok(groups)
}

/// Function signature: `(params) results?`.
///
/// Shared by function types, interface methods and function declarations.
fn signature<'tokens, I, P, T>(ident: P, ty: T) -> impl Parser<'tokens, I, FuncSig, Extra<'tokens>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
    P: Parser<'tokens, I, Ident, Extra<'tokens>> + Clone,
    T: Parser<'tokens, I, TypeExpr, Extra<'tokens>> + Clone,
{
    let param_type = just(Token::Ellipsis)
        .ignore_then(ty.clone())
        .map(|t| TypeExpr::Ellipsis(Box::new(t)))
        .or(ty.clone());

    let entry = ident
        .then(param_type.clone())
        .map(|(name, t)| ParamEntry::Named(name, t))
        .or(param_type.map_with(|t, e| ParamEntry::Bare(t, e.span())));

    let entry_list = entry
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::LParen), just(Token::RParen));

    // Grouping errors are emitted without failing the parse, so they surface
    // as-is instead of being shadowed by alternatives tried afterwards.
    let params = entry_list.clone().validate(|entries, e, emitter| {
        group_params(entries, true).unwrap_or_else(|m| {
            emitter.emit(Rich::custom(e.span(), m));
            Vec::new()
        })
    });

    let results = entry_list
        .or(ty.map_with(|t, e| vec![ParamEntry::Bare(t, e.span())]))
        .validate(|entries, e, emitter| {
            group_params(entries, false).unwrap_or_else(|m| {
                emitter.emit(Rich::custom(e.span(), m));
                Vec::new()
            })
        })
        .or_not()
        .map(Option::unwrap_or_default);

    params
        .then(results)
        .map(|(params, results)| FuncSig { params, results })
}

// ── Main parser builder ──
//
// All grammar rules are built inside `file_parser` so that the `source`
// reference is captured once and shared by all combinators.

#[derive(Debug)]
enum Item {
    Package(Ident),
    Imports(Vec<ImportSpec>),
    Decls(Vec<Decl>),
}

fn file_parser<'tokens, 'src: 'tokens, I>(
    source: &'src str,
) -> impl Parser<'tokens, I, SourceFile, Extra<'tokens>> + 'src
where
    'tokens: 'src,
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    // ── Separators ──

    let semis = just(Token::Semi).repeated();
    let semis1 = just(Token::Semi).repeated().at_least(1);

    // ── Identifier ──

    let ident = just(Token::Ident).map_with(move |_, e| {
        let span: SimpleSpan = e.span();
        Ident {
            name: source[span.start()..span.end()].to_string(),
            span,
        }
    });

    let string_lit = select! { Token::StringLit(s) => s };

    // ── Balanced token tree (skipped bodies) ──

    let token_tree = recursive(|tt| {
        let group = |open: Token, close: Token| {
            tt.clone()
                .repeated()
                .delimited_by(just(open), just(close))
        };
        choice((
            group(Token::LParen, Token::RParen),
            group(Token::LBracket, Token::RBracket),
            group(Token::LBrace, Token::RBrace),
            any()
                .filter(|t: &Token| {
                    !matches!(
                        t,
                        Token::LParen
                            | Token::RParen
                            | Token::LBracket
                            | Token::RBracket
                            | Token::LBrace
                            | Token::RBrace
                    )
                })
                .ignored(),
        ))
    });

    let block = token_tree
        .clone()
        .repeated()
        .delimited_by(just(Token::LBrace), just(Token::RBrace));

    // ── Type expressions ──

    let ty = recursive(|ty| {
        let qualified_name = ident
            .clone()
            .then(just(Token::Dot).ignore_then(ident.clone()).or_not())
            .map(|(first, second)| match second {
                Some(name) => TypeExpr::Named {
                    package: Some(first.name),
                    name: name.name,
                },
                None => TypeExpr::Named {
                    package: None,
                    name: first.name,
                },
            });

        let pointer = just(Token::Star)
            .ignore_then(ty.clone())
            .map(|t| TypeExpr::Pointer(Box::new(t)));

        let slice = just(Token::LBracket)
            .then(just(Token::RBracket))
            .ignore_then(ty.clone())
            .map(|t| TypeExpr::Slice(Box::new(t)));

        // `[16]`, `[N]`, `[pkg.N]` or `[...]`.
        let array_len = any()
            .filter(|t: &Token| matches!(t, Token::Number | Token::Ident | Token::Ellipsis))
            .then(just(Token::Dot).then(just(Token::Ident)).or_not())
            .map_with(move |_, e| {
                let span: SimpleSpan = e.span();
                source[span.start()..span.end()].to_string()
            });

        let array = array_len
            .delimited_by(just(Token::LBracket), just(Token::RBracket))
            .then(ty.clone())
            .map(|(len, t)| TypeExpr::Array {
                len,
                elem: Box::new(t),
            });

        let map = just(Token::Map)
            .ignore_then(
                ty.clone()
                    .delimited_by(just(Token::LBracket), just(Token::RBracket)),
            )
            .then(ty.clone())
            .map(|(key, value)| TypeExpr::Map {
                key: Box::new(key),
                value: Box::new(value),
            });

        let recv_chan = just(Token::Arrow)
            .then(just(Token::Chan))
            .ignore_then(ty.clone())
            .map(|t| TypeExpr::Chan {
                dir: ChanDir::Recv,
                elem: Box::new(t),
            });

        let send_chan = just(Token::Chan)
            .then(just(Token::Arrow))
            .ignore_then(ty.clone())
            .map(|t| TypeExpr::Chan {
                dir: ChanDir::Send,
                elem: Box::new(t),
            });

        let chan = just(Token::Chan)
            .ignore_then(ty.clone())
            .map(|t| TypeExpr::Chan {
                dir: ChanDir::Both,
                elem: Box::new(t),
            });

        let func = just(Token::Func)
            .ignore_then(signature(ident.clone(), ty.clone()))
            .map(TypeExpr::Func);

        // ── interface { elems } ──

        let method_spec = ident
            .clone()
            .then(signature(ident.clone(), ty.clone()))
            .map(|(name, sig)| InterfaceElem::Method(MethodSpec { name, sig }));

        let embed = ident
            .clone()
            .then(just(Token::Dot).ignore_then(ident.clone()).or_not())
            .map(|(first, second)| match second {
                Some(name) => InterfaceElem::Embed(EmbedRef {
                    package: Some(first),
                    name,
                }),
                None => InterfaceElem::Embed(EmbedRef {
                    package: None,
                    name: first,
                }),
            });

        let interface = just(Token::Interface)
            .ignore_then(
                semis
                    .clone()
                    .ignore_then(
                        method_spec
                            .or(embed)
                            .separated_by(semis1.clone())
                            .allow_trailing()
                            .collect::<Vec<_>>(),
                    )
                    .delimited_by(just(Token::LBrace), just(Token::RBrace)),
            )
            .map(|elems| TypeExpr::Interface(InterfaceType { elems }));

        // ── struct { fields } ──

        let named_field = ident
            .clone()
            .separated_by(just(Token::Comma))
            .at_least(1)
            .collect::<Vec<_>>()
            .then(ty.clone())
            .then(string_lit.or_not())
            .map(|((names, ty), tag)| FieldDecl { names, ty, tag });

        let embedded_field = just(Token::Star)
            .or_not()
            .then(qualified_name.clone())
            .then(string_lit.or_not())
            .map(|((star, named), tag)| FieldDecl {
                names: Vec::new(),
                ty: match star {
                    Some(_) => TypeExpr::Pointer(Box::new(named)),
                    None => named,
                },
                tag,
            });

        let structure = just(Token::Struct)
            .ignore_then(
                semis
                    .clone()
                    .ignore_then(
                        named_field
                            .or(embedded_field)
                            .separated_by(semis1.clone())
                            .allow_trailing()
                            .collect::<Vec<_>>(),
                    )
                    .delimited_by(just(Token::LBrace), just(Token::RBrace)),
            )
            .map(|fields| TypeExpr::Struct(StructType { fields }));

        let parenthesized = ty
            .clone()
            .delimited_by(just(Token::LParen), just(Token::RParen));

        choice((
            pointer,
            slice,
            array,
            map,
            recv_chan,
            send_chan,
            chan,
            func,
            interface,
            structure,
            parenthesized,
            qualified_name,
        ))
        .boxed()
    });

    // ── package / import ──

    let package_clause = just(Token::Package)
        .ignore_then(ident.clone())
        .map(Item::Package);

    let import_alias = ident.clone().or(just(Token::Dot).map_with(|_, e| Ident {
        name: ".".to_string(),
        span: e.span(),
    }));

    let import_spec = import_alias
        .or_not()
        .then(string_lit)
        .map_with(|(alias, path), e| ImportSpec {
            alias,
            path,
            span: e.span(),
        });

    let import_decl = just(Token::Import)
        .ignore_then(
            import_spec.clone().map(|spec| vec![spec]).or(semis
                .clone()
                .ignore_then(
                    import_spec
                        .separated_by(semis1.clone())
                        .allow_trailing()
                        .collect::<Vec<_>>(),
                )
                .delimited_by(just(Token::LParen), just(Token::RParen))),
        )
        .map(Item::Imports);

    // ── type declarations ──

    let type_spec = ident
        .clone()
        .then(just(Token::Assign).or_not())
        .then(ty.clone())
        .map_with(|((name, assign), ty), e| {
            Decl::Type(TypeDecl {
                name,
                alias: assign.is_some(),
                ty,
                span: e.span(),
            })
        });

    let type_decl = just(Token::Type)
        .ignore_then(
            type_spec.clone().map(|d| vec![d]).or(semis
                .clone()
                .ignore_then(
                    type_spec
                        .separated_by(semis1.clone())
                        .allow_trailing()
                        .collect::<Vec<_>>(),
                )
                .delimited_by(just(Token::LParen), just(Token::RParen))),
        )
        .map(Item::Decls);

    // ── func declarations ──

    let named_receiver = ident
        .clone()
        .then(just(Token::Star).or_not())
        .then(ident.clone())
        .map(|((name, star), type_name)| Receiver {
            name: Some(name),
            type_name,
            pointer: star.is_some(),
        });

    let unnamed_receiver = just(Token::Star)
        .or_not()
        .then(ident.clone())
        .map(|(star, type_name)| Receiver {
            name: None,
            type_name,
            pointer: star.is_some(),
        });

    let receiver = named_receiver
        .or(unnamed_receiver)
        .delimited_by(just(Token::LParen), just(Token::RParen));

    let func_decl = just(Token::Func)
        .ignore_then(receiver.or_not())
        .then(ident.clone())
        .then(signature(ident.clone(), ty))
        .then_ignore(block.or_not())
        .map_with(|((receiver, name), sig), e| {
            Item::Decls(vec![Decl::Func(FuncDecl {
                receiver,
                name,
                sig,
                span: e.span(),
            })])
        });

    // ── var / const (skipped) ──

    let other_decl = just(Token::Var)
        .or(just(Token::Const))
        .ignore_then(
            just(Token::Semi)
                .not()
                .ignore_then(token_tree)
                .repeated(),
        )
        .map_with(|_, e| Item::Decls(vec![Decl::Other(e.span())]));

    // ── File ──

    let item = choice((package_clause, import_decl, type_decl, func_decl, other_decl));

    semis
        .ignore_then(
            item.separated_by(semis1)
                .allow_trailing()
                .collect::<Vec<_>>(),
        )
        .map_with(|items, e| {
            let mut file = SourceFile {
                package: None,
                imports: Vec::new(),
                decls: Vec::new(),
                span: e.span(),
            };
            for item in items {
                match item {
                    Item::Package(name) => {
                        file.package.get_or_insert(name);
                    }
                    Item::Imports(specs) => file.imports.extend(specs),
                    Item::Decls(decls) => file.decls.extend(decls),
                }
            }
            file
        })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> SourceFile {
        let result = parse(source);
        assert!(
            result.errors.is_empty(),
            "unexpected errors: {:#?}",
            result.errors
        );
        result.file.expect("expected source file")
    }

    fn parse_errors(source: &str) -> Vec<String> {
        parse(source)
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect()
    }

    fn type_decl<'a>(file: &'a SourceFile, name: &str) -> &'a TypeDecl {
        file.decls
            .iter()
            .find_map(|d| match d {
                Decl::Type(t) if t.name.name == name => Some(t),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no type decl '{}'", name))
    }

    fn methods(decl: &TypeDecl) -> Vec<&MethodSpec> {
        let TypeExpr::Interface(iface) = &decl.ty else {
            panic!("expected interface")
        };
        iface
            .elems
            .iter()
            .filter_map(|e| match e {
                InterfaceElem::Method(m) => Some(m),
                InterfaceElem::Embed(_) => None,
            })
            .collect()
    }

    // ── Empty / package ──

    #[test]
    fn empty_file() {
        let file = parse_ok("");
        assert!(file.package.is_none());
        assert!(file.decls.is_empty());
    }

    #[test]
    fn package_clause() {
        let file = parse_ok("package store\n");
        assert_eq!(file.package.unwrap().name, "store");
    }

    // ── Imports ──

    #[test]
    fn single_and_grouped_imports() {
        let file = parse_ok(
            "package p\n\nimport \"io\"\n\nimport (\n\tctx \"context\"\n\t\"net/http\"\n\t_ \"embed\"\n)\n",
        );
        let names: Vec<&str> = file.imports.iter().map(|i| i.local_name()).collect();
        assert_eq!(names, vec!["io", "ctx", "http", "_"]);
        assert_eq!(file.imports[2].path, "net/http");
    }

    // ── Interfaces ──

    #[test]
    fn simple_interface() {
        let file = parse_ok("package p\n\ntype Store interface {\n\tGet(key string) ([]byte, error)\n\tClose()\n}\n");
        let decl = type_decl(&file, "Store");
        assert!(!decl.alias);
        let ms = methods(decl);
        assert_eq!(ms.len(), 2);
        assert_eq!(ms[0].name.name, "Get");
        assert_eq!(ms[0].sig.params.len(), 1);
        assert_eq!(ms[0].sig.params[0].names[0].name, "key");
        assert_eq!(ms[0].sig.params[0].ty, TypeExpr::named("string"));
        assert_eq!(ms[0].sig.results.len(), 2);
        assert_eq!(ms[0].sig.results[0].ty, TypeExpr::slice(TypeExpr::named("byte")));
        assert!(ms[1].sig.params.is_empty());
        assert!(ms[1].sig.results.is_empty());
    }

    #[test]
    fn empty_interface() {
        let file = parse_ok("type Any interface{}");
        assert_eq!(type_decl(&file, "Any").ty, TypeExpr::empty_interface());
    }

    #[test]
    fn semicolon_separated_methods() {
        let file = parse_ok("type T interface { A(); B() int }");
        assert_eq!(methods(type_decl(&file, "T")).len(), 2);
    }

    #[test]
    fn embedded_interfaces() {
        let file = parse_ok("type RW interface {\n\tReader\n\tio.Writer\n\tFlush() error\n}\n");
        let TypeExpr::Interface(iface) = &type_decl(&file, "RW").ty else {
            panic!("expected interface")
        };
        assert_eq!(iface.elems.len(), 3);
        assert!(
            matches!(&iface.elems[0], InterfaceElem::Embed(e) if e.package.is_none() && e.name.name == "Reader")
        );
        assert!(
            matches!(&iface.elems[1], InterfaceElem::Embed(e) if e.package.as_ref().unwrap().name == "io" && e.name.name == "Writer")
        );
        assert!(matches!(&iface.elems[2], InterfaceElem::Method(m) if m.name.name == "Flush"));
    }

    // ── Parameter grouping ──

    #[test]
    fn multi_named_group() {
        let file = parse_ok("type T interface { Put(a, b int, c string) }");
        let sig = &methods(type_decl(&file, "T"))[0].sig;
        assert_eq!(sig.params.len(), 2);
        let names: Vec<&str> = sig.params[0].names.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(sig.params[0].ty, TypeExpr::named("int"));
        assert_eq!(sig.params[1].names[0].name, "c");
    }

    #[test]
    fn unnamed_params() {
        let file = parse_ok("type T interface { Put(int, string, context.Context) }");
        let sig = &methods(type_decl(&file, "T"))[0].sig;
        assert_eq!(sig.params.len(), 3);
        assert!(sig.params.iter().all(|g| g.names.is_empty()));
        assert_eq!(sig.params[2].ty, TypeExpr::qualified("context", "Context"));
    }

    #[test]
    fn variadic_param() {
        let file = parse_ok("type T interface { Log(format string, args ...interface{}) }");
        let sig = &methods(type_decl(&file, "T"))[0].sig;
        assert_eq!(
            sig.params[1].ty,
            TypeExpr::Ellipsis(Box::new(TypeExpr::empty_interface()))
        );
    }

    #[test]
    fn unnamed_variadic() {
        let file = parse_ok("type T interface { Log(...string) }");
        let sig = &methods(type_decl(&file, "T"))[0].sig;
        assert!(sig.params[0].ty.is_variadic());
        assert!(sig.params[0].names.is_empty());
    }

    #[test]
    fn named_results_kept_as_groups() {
        let file = parse_ok("type T interface { Size() (n, m int, err error) }");
        let sig = &methods(type_decl(&file, "T"))[0].sig;
        assert_eq!(sig.results.len(), 2);
        assert_eq!(sig.results[0].arity(), 2);
    }

    #[test]
    fn mixed_named_and_unnamed_rejected() {
        let errs = parse_errors("type T interface { Put(a int, []byte) }");
        assert!(
            errs.iter().any(|e| e.contains("mixed named and unnamed parameters")),
            "{:?}",
            errs
        );
    }

    #[test]
    fn variadic_must_be_last() {
        let errs = parse_errors("type T interface { Put(a ...int, b string) }");
        assert!(
            errs.iter().any(|e| e.contains("final parameter")),
            "{:?}",
            errs
        );
    }

    // ── Type expressions ──

    #[test]
    fn composite_types() {
        let file = parse_ok(
            "type T interface {\n\tM(p *Thing, s [4]byte, m map[string][]int, c <-chan error, d chan<- int, f func(int) (bool, error))\n}\n",
        );
        let sig = &methods(type_decl(&file, "T"))[0].sig;
        assert_eq!(sig.params.len(), 6);
        assert_eq!(
            sig.params[0].ty,
            TypeExpr::Pointer(Box::new(TypeExpr::named("Thing")))
        );
        assert!(matches!(&sig.params[1].ty, TypeExpr::Array { len, .. } if len == "4"));
        assert!(matches!(&sig.params[2].ty, TypeExpr::Map { .. }));
        assert!(matches!(&sig.params[3].ty, TypeExpr::Chan { dir: ChanDir::Recv, .. }));
        assert!(matches!(&sig.params[4].ty, TypeExpr::Chan { dir: ChanDir::Send, .. }));
        let TypeExpr::Func(inner) = &sig.params[5].ty else {
            panic!("expected func type")
        };
        assert_eq!(inner.results.len(), 2);
    }

    #[test]
    fn struct_type_with_tags_and_embedding() {
        let file = parse_ok(
            "type S struct {\n\tsync.Mutex\n\tName, Alias string `json:\"name\"`\n\tnext *S\n}\n",
        );
        let TypeExpr::Struct(st) = &type_decl(&file, "S").ty else {
            panic!("expected struct")
        };
        assert_eq!(st.fields.len(), 3);
        assert!(st.fields[0].is_embedded());
        assert_eq!(st.fields[1].names.len(), 2);
        assert_eq!(st.fields[1].tag.as_deref(), Some(r#"json:"name""#));
    }

    #[test]
    fn alias_and_grouped_types() {
        let file = parse_ok("type (\n\tID string\n\tStore = Backend\n)\n");
        assert!(!type_decl(&file, "ID").alias);
        assert!(type_decl(&file, "Store").alias);
    }

    // ── Skipped declarations ──

    #[test]
    fn func_decls_with_bodies() {
        let file = parse_ok(concat!(
            "package p\n\n",
            "type S struct{}\n\n",
            "func (s *S) Get(key string) (string, error) {\n",
            "\tif key == \"\" {\n\t\treturn \"\", nil\n\t}\n",
            "\treturn key, nil\n",
            "}\n\n",
            "func helper() {}\n",
        ));
        let funcs: Vec<&FuncDecl> = file
            .decls
            .iter()
            .filter_map(|d| match d {
                Decl::Func(f) => Some(f),
                _ => None,
            })
            .collect();
        assert_eq!(funcs.len(), 2);
        let recv = funcs[0].receiver.as_ref().unwrap();
        assert!(recv.pointer);
        assert_eq!(recv.type_name.name, "S");
        assert_eq!(recv.name.as_ref().unwrap().name, "s");
        assert!(funcs[1].receiver.is_none());
    }

    #[test]
    fn var_and_const_skipped() {
        let file = parse_ok(concat!(
            "package p\n",
            "var x = map[string]int{\"a\": 1}\n",
            "const (\n\tA = iota\n\tB\n)\n",
            "type I interface{ M() }\n",
        ));
        assert_eq!(
            file.decls
                .iter()
                .filter(|d| matches!(d, Decl::Other(_)))
                .count(),
            2
        );
        assert_eq!(methods(type_decl(&file, "I")).len(), 1);
    }

    #[test]
    fn unnamed_receiver() {
        let file = parse_ok("func (S) Name() string { return \"s\" }");
        let Decl::Func(f) = &file.decls[0] else {
            panic!("expected func")
        };
        let recv = f.receiver.as_ref().unwrap();
        assert!(recv.name.is_none());
        assert!(!recv.pointer);
    }

    // ── Errors ──

    #[test]
    fn generic_interface_is_an_error() {
        assert!(!parse_errors("type Box[T any] interface { Get() T }").is_empty());
    }

    #[test]
    fn lex_errors_are_reported() {
        let errs = parse_errors("type T interface { M() } $");
        assert!(errs.iter().any(|e| e.contains("unexpected character")));
    }
}
