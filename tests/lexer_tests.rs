// tests/lexer_tests.rs

use odata_uri::ast::{LiteralKind, TokenKind};
use odata_uri::lexer::{tokenize, LexError, Lexer};
use rstest::rstest;

fn kinds(text: &str) -> Vec<TokenKind> {
    tokenize(text).unwrap().into_iter().map(|t| t.kind).collect()
}

// ============================================================================
// Literals
// ============================================================================

#[rstest]
#[case("42", LiteralKind::Int32)]
#[case("-42", LiteralKind::Int32)]
#[case("2147483648", LiteralKind::Int64)]
#[case("42L", LiteralKind::Int64)]
#[case("9223372036854775808", LiteralKind::Decimal)]
#[case("1.5", LiteralKind::Single)]
#[case("3.14159265358979", LiteralKind::Double)]
#[case("1.5d", LiteralKind::Double)]
#[case("1.5M", LiteralKind::Decimal)]
#[case("2F", LiteralKind::Single)]
#[case("INF", LiteralKind::Double)]
#[case("-INF", LiteralKind::Double)]
#[case("NaN", LiteralKind::Double)]
#[case("true", LiteralKind::Boolean)]
#[case("null", LiteralKind::Null)]
#[case("'O''Neil'", LiteralKind::String)]
#[case("2012-09-01", LiteralKind::Date)]
#[case("2012-09-01T10:00:00Z", LiteralKind::DateTimeOffset)]
#[case("2012-09-01T10:00:00.123+02:00", LiteralKind::DateTimeOffset)]
#[case("19:30:05", LiteralKind::TimeOfDay)]
#[case("01234567-89ab-cdef-0123-456789abcdef", LiteralKind::Guid)]
#[case("duration'P1DT2H'", LiteralKind::Duration)]
#[case("binary'AQID'", LiteralKind::Binary)]
#[case("X'0102'", LiteralKind::Binary)]
#[case("geography'SRID=4326;POINT(1 2)'", LiteralKind::Geography)]
#[case("geometry'POINT(1 2)'", LiteralKind::Geometry)]
#[case("NS.Color'Red,Green'", LiteralKind::Typed)]
fn test_literal_kind(#[case] text: &str, #[case] expected: LiteralKind) {
    let tokens = tokenize(text).unwrap();
    assert_eq!(tokens.len(), 1, "{text}");
    assert_eq!(tokens[0].kind, TokenKind::Literal(expected), "{text}");
    assert_eq!(tokens[0].text, text);
}

#[test]
fn test_number_followed_by_letters() {
    let err = tokenize("42abc").unwrap_err();
    assert!(matches!(
        err,
        LexError::InvalidCharacter {
            ch: 'a',
            position: 2,
            ..
        }
    ));
}

// ============================================================================
// Expression tokens
// ============================================================================

#[test]
fn test_filter_tokens() {
    assert_eq!(
        kinds("Name eq 'Bob' and Age gt 3"),
        vec![
            TokenKind::Identifier,
            TokenKind::Operator,
            TokenKind::Literal(LiteralKind::String),
            TokenKind::Operator,
            TokenKind::Identifier,
            TokenKind::Operator,
            TokenKind::Literal(LiteralKind::Int32),
        ]
    );
}

#[test]
fn test_punctuation() {
    assert_eq!(
        kinds("f(a=1;b)/c,*:"),
        vec![
            TokenKind::Identifier,
            TokenKind::OpenParen,
            TokenKind::Identifier,
            TokenKind::Equal,
            TokenKind::Literal(LiteralKind::Int32),
            TokenKind::Semicolon,
            TokenKind::Identifier,
            TokenKind::CloseParen,
            TokenKind::Slash,
            TokenKind::Identifier,
            TokenKind::Comma,
            TokenKind::Star,
            TokenKind::Colon,
        ]
    );
}

#[test]
fn test_minus_before_name_is_an_operator() {
    assert_eq!(kinds("- Price"), vec![TokenKind::Minus, TokenKind::Identifier]);
    assert_eq!(kinds("-Price"), vec![TokenKind::Minus, TokenKind::Identifier]);
}

#[test]
fn test_names() {
    let tokens = tokenize("@p1 $it NS.Person NS.*").unwrap();
    let pairs: Vec<(TokenKind, &str)> = tokens.iter().map(|t| (t.kind, t.text.as_str())).collect();
    assert_eq!(
        pairs,
        vec![
            (TokenKind::ParameterAlias, "@p1"),
            (TokenKind::Identifier, "$it"),
            (TokenKind::Identifier, "NS.Person"),
            (TokenKind::Identifier, "NS.*"),
        ]
    );
}

#[test]
fn test_json_is_one_token() {
    let tokens = tokenize(r#"["a]", {"b": [1, 2]}]"#).unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::Bracketed);
}

#[test]
fn test_peek_does_not_consume() {
    let mut lexer = Lexer::new("a b");
    assert_eq!(lexer.peek_token().unwrap().text, "a");
    assert_eq!(lexer.next_token().unwrap().text, "a");
    assert_eq!(lexer.next_token().unwrap().text, "b");
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::End);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unterminated_string() {
    let err = tokenize("Name eq 'abc").unwrap_err();
    assert!(matches!(
        err,
        LexError::UnterminatedStringLiteral { position: 8, .. }
    ));
}

#[test]
fn test_invalid_character() {
    let err = tokenize("Name # 1").unwrap_err();
    assert_eq!(err.position(), 5);
    assert!(matches!(err, LexError::InvalidCharacter { ch: '#', .. }));
    assert!(err.to_string().contains("'Name # 1'"));
}

#[test]
fn test_unbalanced_bracket() {
    let err = tokenize("[1, 2").unwrap_err();
    assert!(matches!(err, LexError::UnbalancedBracket { position: 0, .. }));
}

#[test]
fn test_iterator_stops_after_error() {
    let results: Vec<_> = Lexer::new("a 'b").collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
}

// ============================================================================
// Search mode
// ============================================================================

#[test]
fn test_search_tokens() {
    let mut lexer = Lexer::for_search(r#""blue sky" AND NOT (red)"#);
    let mut found = Vec::new();
    loop {
        let token = lexer.next_token().unwrap();
        if token.kind == TokenKind::End {
            break;
        }
        found.push((token.kind, token.text));
    }
    assert_eq!(
        found,
        vec![
            (TokenKind::SearchTerm, "\"blue sky\"".to_string()),
            (TokenKind::Operator, "AND".to_string()),
            (TokenKind::Operator, "NOT".to_string()),
            (TokenKind::OpenParen, "(".to_string()),
            (TokenKind::SearchTerm, "red".to_string()),
            (TokenKind::CloseParen, ")".to_string()),
        ]
    );
}

#[test]
fn test_search_bad_escape() {
    let mut lexer = Lexer::for_search(r#""a\x""#);
    let err = lexer.next_token().unwrap_err();
    assert!(matches!(
        err,
        LexError::InvalidEscapeSequence { ref sequence, position: 2, .. } if sequence == "\\x"
    ));
}
