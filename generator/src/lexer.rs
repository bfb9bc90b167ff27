// Lexer for Go declaration sources.
//
// Tokenizes Go source text well enough to recover package, import, type and
// func declarations. Uses the `logos` crate for DFA-based lexing, then applies
// Go's automatic semicolon insertion so the parser never sees line breaks.
//
// Preconditions: input is valid UTF-8.
// Postconditions: returns all tokens with byte-offset spans, plus any lex errors.
// Failure modes: unrecognized characters produce `LexError`; lexing continues.
// Side effects: none.

use logos::Logos;
use std::fmt;

/// Byte-offset span in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A lexer error with location.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

/// Result of lexing: tokens plus any errors (non-fatal).
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<(Token, Span)>,
    pub errors: Vec<LexError>,
}

/// Go token types.
///
/// Only the keywords that open declarations are distinguished; every other
/// word (`return`, `if`, `string`, ...) is an identifier. Identifiers and
/// numbers carry no value; use the span to retrieve the text.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\f]+|//[^\n]*")]
pub enum Token {
    // ── Keywords ──
    #[token("package")]
    Package,
    #[token("import")]
    Import,
    #[token("type")]
    Type,
    #[token("func")]
    Func,
    #[token("interface")]
    Interface,
    #[token("struct")]
    Struct,
    #[token("map")]
    Map,
    #[token("chan")]
    Chan,
    #[token("var")]
    Var,
    #[token("const")]
    Const,

    // ── Punctuation ──
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(".")]
    Dot,
    #[token("...")]
    Ellipsis,
    #[token("*")]
    Star,
    #[token("<-")]
    Arrow,
    #[token("=")]
    Assign,

    /// Any other operator run (`:=`, `==`, `&&`, `++`, ...). Only appears
    /// inside declarations the parser skips. `/` never continues a run, so
    /// `a+//c` still starts a comment; fixed tokens win ties.
    #[regex(r"[+\-%&|^<>=!:~]+|/=?", |lex| lex.slice().to_string(), priority = 1)]
    Op(String),

    // ── Literals ──
    /// Interpreted or raw string literal, decoded to the value it denotes.
    #[regex(r#""([^"\\\n]|\\.)*""#, interpreted)]
    #[regex(r"`[^`]*`", raw)]
    StringLit(String),

    #[regex(r"'([^'\\\n]|\\.)*'")]
    Rune,

    #[regex(r"[0-9][0-9a-zA-Z_]*(\.[0-9a-zA-Z_]*)?")]
    Number,

    // ── Identifier ──
    //
    // logos prioritises fixed `#[token]` matches over regex for the same
    // length, so `map` matches Map, not Ident.
    #[regex(r"[\p{L}_][\p{L}\p{N}_]*")]
    Ident,

    // ── Structure (consumed by semicolon insertion) ──
    #[token("\n")]
    Newline,

    /// `/* ... */`; the flag records whether the comment spans lines.
    #[token("/*", block_comment)]
    BlockComment(bool),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Package => write!(f, "package"),
            Token::Import => write!(f, "import"),
            Token::Type => write!(f, "type"),
            Token::Func => write!(f, "func"),
            Token::Interface => write!(f, "interface"),
            Token::Struct => write!(f, "struct"),
            Token::Map => write!(f, "map"),
            Token::Chan => write!(f, "chan"),
            Token::Var => write!(f, "var"),
            Token::Const => write!(f, "const"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Comma => write!(f, ","),
            Token::Semi => write!(f, ";"),
            Token::Dot => write!(f, "."),
            Token::Ellipsis => write!(f, "..."),
            Token::Star => write!(f, "*"),
            Token::Arrow => write!(f, "<-"),
            Token::Assign => write!(f, "="),
            Token::Op(op) => write!(f, "{op}"),
            Token::StringLit(s) => write!(f, "\"{s}\""),
            Token::Rune => write!(f, "<rune>"),
            Token::Number => write!(f, "<number>"),
            Token::Ident => write!(f, "<ident>"),
            Token::Newline => write!(f, "<newline>"),
            Token::BlockComment(_) => write!(f, "<comment>"),
        }
    }
}

// ── Callbacks ──

fn interpreted(lex: &mut logos::Lexer<'_, Token>) -> Option<String> {
    let slice = lex.slice();
    decode_escapes(&slice[1..slice.len() - 1])
}

/// Carriage returns are discarded from raw string values.
fn raw(lex: &mut logos::Lexer<'_, Token>) -> String {
    let slice = lex.slice();
    slice[1..slice.len() - 1].replace('\r', "")
}

/// Consumes through the closing `*/`. An unterminated comment is a lex error.
fn block_comment(lex: &mut logos::Lexer<'_, Token>) -> Option<bool> {
    let end = lex.remainder().find("*/")?;
    let spans_lines = lex.remainder()[..end].contains('\n');
    lex.bump(end + 2);
    Some(spans_lines)
}

/// Decodes the escapes of an interpreted string body. Byte escapes above
/// 0x7F have no `char` form and are rejected.
fn decode_escapes(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let decoded = match chars.next()? {
            'a' => '\u{07}',
            'b' => '\u{08}',
            'f' => '\u{0C}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'v' => '\u{0B}',
            '\\' => '\\',
            '"' => '"',
            'x' => ascii(digits(&mut chars, 2, 16)?)?,
            'u' => char::from_u32(digits(&mut chars, 4, 16)?)?,
            'U' => char::from_u32(digits(&mut chars, 8, 16)?)?,
            d @ '0'..='7' => ascii(d.to_digit(8)? * 64 + digits(&mut chars, 2, 8)?)?,
            _ => return None,
        };
        out.push(decoded);
    }
    Some(out)
}

fn digits(chars: &mut std::str::Chars<'_>, count: usize, radix: u32) -> Option<u32> {
    let mut value = 0;
    for _ in 0..count {
        value = value * radix + chars.next()?.to_digit(radix)?;
    }
    Some(value)
}

fn ascii(value: u32) -> Option<char> {
    u8::try_from(value).ok().filter(u8::is_ascii).map(char::from)
}

// ── Semicolon insertion ──

/// Whether a line break directly after `token` terminates a statement
/// (The Go Programming Language, "Semicolons", rule 1).
fn ends_statement(token: &Token) -> bool {
    match token {
        Token::Ident
        | Token::Number
        | Token::Rune
        | Token::StringLit(_)
        | Token::RParen
        | Token::RBracket
        | Token::RBrace => true,
        Token::Op(op) => op.ends_with("++") || op.ends_with("--"),
        _ => false,
    }
}

// ── Public API ──

/// Lex a Go source string into tokens.
///
/// Line breaks are replaced by `Semi` tokens where Go would insert a
/// semicolon, and dropped elsewhere. Lexing is non-fatal: errors are
/// collected and the lexer continues past bad characters.
pub fn lex(source: &str) -> LexResult {
    let lexer = Token::lexer(source);
    let mut tokens: Vec<(Token, Span)> = Vec::new();
    let mut errors = Vec::new();

    let line_break = |tokens: &mut Vec<(Token, Span)>, span: Span| {
        if tokens.last().is_some_and(|(t, _)| ends_statement(t)) {
            tokens.push((Token::Semi, span));
        }
    };

    for (result, range) in lexer.spanned() {
        let span = Span {
            start: range.start,
            end: range.end,
        };
        match result {
            Ok(Token::Newline) | Ok(Token::BlockComment(true)) => line_break(&mut tokens, span),
            Ok(Token::BlockComment(false)) => {}
            Ok(token) => tokens.push((token, span)),
            Err(()) => errors.push(LexError {
                span,
                message: format!("unexpected character: {:?}", &source[span.start..span.end]),
            }),
        }
    }

    let eof = Span {
        start: source.len(),
        end: source.len(),
    };
    line_break(&mut tokens, eof);

    LexResult { tokens, errors }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: lex and assert no errors, return token list.
    fn lex_ok(source: &str) -> Vec<Token> {
        let result = lex(source);
        assert!(
            result.errors.is_empty(),
            "unexpected lex errors: {:?}",
            result.errors
        );
        result.tokens.into_iter().map(|(t, _)| t).collect()
    }

    // ── Keywords ──

    #[test]
    fn keywords() {
        let tokens = lex_ok("package import type func interface struct map chan var const");
        assert_eq!(
            tokens,
            vec![
                Token::Package,
                Token::Import,
                Token::Type,
                Token::Func,
                Token::Interface,
                Token::Struct,
                Token::Map,
                Token::Chan,
                Token::Var,
                Token::Const,
            ]
        );
    }

    #[test]
    fn keyword_prefix_is_ident() {
        // `mapper` is an identifier, not keyword `map` + `per`
        let tokens = lex_ok("map mapper");
        assert_eq!(tokens, vec![Token::Map, Token::Ident, Token::Semi]);
    }

    #[test]
    fn unicode_identifiers() {
        let tokens = lex_ok("Ärger _x9");
        assert_eq!(tokens, vec![Token::Ident, Token::Ident, Token::Semi]);
    }

    // ── Punctuation ──

    #[test]
    fn punctuation() {
        let tokens = lex_ok("( [ { , ; . ... * <- =");
        assert_eq!(
            tokens,
            vec![
                Token::LParen,
                Token::LBracket,
                Token::LBrace,
                Token::Comma,
                Token::Semi,
                Token::Dot,
                Token::Ellipsis,
                Token::Star,
                Token::Arrow,
                Token::Assign,
            ]
        );
    }

    #[test]
    fn double_pointer_is_two_stars() {
        let tokens = lex_ok("**T");
        assert_eq!(tokens, vec![Token::Star, Token::Star, Token::Ident, Token::Semi]);
    }

    #[test]
    fn other_operators_are_opaque() {
        let tokens = lex_ok("x := a == b");
        assert_eq!(
            tokens,
            vec![
                Token::Ident,
                Token::Op(":=".into()),
                Token::Ident,
                Token::Op("==".into()),
                Token::Ident,
                Token::Semi,
            ]
        );
    }

    // ── Literals ──

    #[test]
    fn string_literals() {
        let tokens = lex_ok(r#""sync" `json:"name"`"#);
        assert_eq!(
            tokens,
            vec![
                Token::StringLit("sync".into()),
                Token::StringLit(r#"json:"name""#.into()),
                Token::Semi,
            ]
        );
    }

    #[test]
    fn numbers_and_runes() {
        let tokens = lex_ok("16 0x1F 'a'");
        assert_eq!(
            tokens,
            vec![Token::Number, Token::Number, Token::Rune, Token::Semi]
        );
    }

    // ── Semicolon insertion ──

    #[test]
    fn semicolon_after_closing_paren() {
        let tokens = lex_ok("Close() error\nName()\n");
        assert_eq!(
            tokens,
            vec![
                Token::Ident,
                Token::LParen,
                Token::RParen,
                Token::Ident,
                Token::Semi,
                Token::Ident,
                Token::LParen,
                Token::RParen,
                Token::Semi,
            ]
        );
    }

    #[test]
    fn no_semicolon_after_open_brace() {
        let tokens = lex_ok("interface {\n}\n");
        assert_eq!(
            tokens,
            vec![Token::Interface, Token::LBrace, Token::RBrace, Token::Semi]
        );
    }

    #[test]
    fn blank_lines_insert_one_semicolon() {
        let tokens = lex_ok("a\n\n\nb");
        assert_eq!(
            tokens,
            vec![Token::Ident, Token::Semi, Token::Ident, Token::Semi]
        );
    }

    #[test]
    fn increment_ends_statement() {
        let tokens = lex_ok("i++\n");
        assert_eq!(
            tokens,
            vec![Token::Ident, Token::Op("++".into()), Token::Semi]
        );
    }

    // ── Comments ──

    #[test]
    fn line_comment_skipped() {
        let tokens = lex_ok("Read() // reads\nWrite()");
        assert_eq!(
            tokens,
            vec![
                Token::Ident,
                Token::LParen,
                Token::RParen,
                Token::Semi,
                Token::Ident,
                Token::LParen,
                Token::RParen,
                Token::Semi,
            ]
        );
    }

    #[test]
    fn multiline_block_comment_acts_as_newline() {
        let tokens = lex_ok("a /* one\ntwo */ b");
        assert_eq!(
            tokens,
            vec![Token::Ident, Token::Semi, Token::Ident, Token::Semi]
        );
    }

    #[test]
    fn inline_block_comment_skipped() {
        let tokens = lex_ok("a /* note */ b");
        assert_eq!(tokens, vec![Token::Ident, Token::Ident, Token::Semi]);
    }

    #[test]
    fn interpreted_string_escapes_decoded() {
        let tokens = lex_ok(r#""json:\"x\"" "a\tb\x41\101\u00e9" `raw\n`"#);
        assert_eq!(
            tokens,
            vec![
                Token::StringLit(r#"json:"x""#.into()),
                Token::StringLit("a\tbAAé".into()),
                Token::StringLit(r"raw\n".into()),
                Token::Semi,
            ]
        );
    }

    #[test]
    fn invalid_escape_is_error() {
        let result = lex(r#"x "\q""#);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn division_before_line_comment() {
        let tokens = lex_ok("a+//c\nb /= 2");
        assert_eq!(
            tokens,
            vec![
                Token::Ident,
                Token::Op("+".into()),
                Token::Ident,
                Token::Op("/=".into()),
                Token::Number,
                Token::Semi,
            ]
        );
    }

    #[test]
    fn assign_is_not_an_operator_run() {
        let tokens = lex_ok("type A = B\nx == y");
        assert_eq!(tokens[2], Token::Assign);
        assert_eq!(tokens[6], Token::Op("==".into()));
    }

    #[test]
    fn block_comment_with_stars_and_license_header() {
        let src = "/* Copyright 2024 **Acme** */\npackage p /** doc **/\n";
        let tokens = lex_ok(src);
        assert_eq!(tokens, vec![Token::Package, Token::Ident, Token::Semi]);
    }

    #[test]
    fn unterminated_block_comment_is_error() {
        let result = lex("a /* never closed");
        assert!(!result.errors.is_empty());
        assert_eq!(result.errors[0].span, Span { start: 2, end: 4 });
    }

    // ── Spans ──

    #[test]
    fn spans_correct() {
        let result = lex("type Foo");
        assert!(result.errors.is_empty());
        assert_eq!(result.tokens[0].1, Span { start: 0, end: 4 });
        assert_eq!(result.tokens[1].1, Span { start: 5, end: 8 });
        // Inserted semicolon sits at end of input.
        assert_eq!(result.tokens[2], (Token::Semi, Span { start: 8, end: 8 }));
    }

    // ── Error recovery ──

    #[test]
    fn error_recovery() {
        let result = lex("foo $ bar");
        let tokens: Vec<Token> = result.tokens.into_iter().map(|(t, _)| t).collect();
        assert_eq!(tokens, vec![Token::Ident, Token::Ident, Token::Semi]);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].span, Span { start: 4, end: 5 });
    }
}
