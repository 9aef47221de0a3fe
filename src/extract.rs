//! Branch extraction from source control flow
//!
//! The structural extractor lexes a C-like surface syntax with `logos` and
//! walks `if (..) { .. } else if (..) { .. } else { .. }` chains, emitting
//! one `Branch` per reachable decision body in source order. Predicate
//! connectives accept both symbol (`&&`, `||`, `!`) and word (`and`, `or`,
//! `not`) spellings, and `elif` is recognized as a chain link.
//!
//! When the input cannot be parsed structurally, a line-pattern fallback
//! scans for `if (<expr>)`-shaped text and extracts an `if`-only branch set
//! with no inferred `else`.

use std::collections::BTreeSet;

use logos::Logos;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::condition::{Branch, CompareOp, Condition};
use crate::errors::{CovminError, CovminResult};

/// Lexer tokens for the supported surface syntax
#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token<'a> {
    #[token("if", priority = 10)]
    If,
    #[token("elif", priority = 10)]
    Elif,
    #[token("else", priority = 10)]
    Else,
    #[token("true", priority = 10)]
    #[token("True", priority = 10)]
    True,
    #[token("false", priority = 10)]
    #[token("False", priority = 10)]
    False,
    #[token("&&")]
    #[token("and", priority = 10)]
    And,
    #[token("||")]
    #[token("or", priority = 10)]
    Or,
    #[token("!")]
    #[token("not", priority = 10)]
    Not,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("-")]
    Minus,

    // Identifiers may carry attribute access, e.g. `user.age`
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*", priority = 3)]
    Ident(&'a str),

    #[regex(r"[0-9]+\.[0-9]+", priority = 5)]
    Float(&'a str),
    #[regex(r"[0-9]+", priority = 5)]
    Int(&'a str),
    #[regex(r#""[^"]*""#)]
    #[regex(r"'[^']*'")]
    Str(&'a str),

    #[regex(r"//[^\n]*", logos::skip)]
    #[regex(r"#[^\n]*", logos::skip)]
    #[regex(r"/\*([^*]|\*[^/])*\*/", logos::skip)]
    #[regex(r"[ \t\r\n]+", logos::skip)]
    /// Placeholder for input the lexer does not recognize; a clause
    /// containing one is simply not atomic
    Junk,
}

/// Result of one extraction run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Branches in source order, ids unique within this run
    pub branches: Vec<Branch>,
    /// De-duplicated variable names referenced by any extracted condition
    pub variables: BTreeSet<String>,
}

/// Extract branches and referenced variables from source text
///
/// Tries the structural extractor first; on failure falls back to the
/// `if (<expr>)` pattern scan. Fails with `ParseFailure` only when neither
/// pass produces anything usable.
pub fn extract(source: &str) -> CovminResult<Extraction> {
    match structural_extract(source) {
        Ok(extraction) => Ok(extraction),
        Err(err) => {
            debug!(error = %err, "structural parse failed, trying pattern fallback");
            pattern_extract(source)
        }
    }
}

fn tokenize(source: &str) -> Vec<Token<'_>> {
    Token::lexer(source)
        .map(|result| result.unwrap_or(Token::Junk))
        .collect()
}

/// Walks the token stream, emitting branches for every if/elif/else chain
///
/// Variable names accumulate in an explicit context here and are returned
/// with the branches; there is no shared parser state between runs.
struct Extractor<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    branches: Vec<Branch>,
    variables: FxHashSet<String>,
    counter: usize,
}

impl<'a> Extractor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            tokens: tokenize(source),
            pos: 0,
            branches: Vec::new(),
            variables: FxHashSet::default(),
            counter: 0,
        }
    }

    fn current(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn expect(&mut self, expected: Token<'a>) -> CovminResult<()> {
        match self.current() {
            Some(token) if *token == expected => {
                self.advance();
                Ok(())
            }
            other => Err(CovminError::ParseFailure(format!(
                "expected {expected:?}, found {other:?}"
            ))),
        }
    }

    fn next_branch_id(&mut self, kind: &str) -> String {
        let id = format!("{kind}_{}", self.counter);
        self.counter += 1;
        id
    }

    /// Walk statements until end of input (or the closing brace of the
    /// current block). Anything that is not an `if` chain or a block is
    /// skipped; nested chains start fresh since branch conditions only
    /// accumulate along one if/elif/else chain.
    fn walk(&mut self, inside_block: bool) -> CovminResult<()> {
        loop {
            match self.current() {
                None => {
                    if inside_block {
                        return Err(CovminError::ParseFailure(
                            "unterminated block: missing '}'".to_string(),
                        ));
                    }
                    return Ok(());
                }
                Some(Token::RBrace) => {
                    self.advance();
                    if inside_block {
                        return Ok(());
                    }
                }
                Some(Token::If) => {
                    self.advance();
                    self.parse_chain(Vec::new())?;
                }
                Some(Token::LBrace) => {
                    self.advance();
                    self.walk(true)?;
                }
                Some(_) => self.advance(),
            }
        }
    }

    /// Parse one chain link after its `if`/`elif` keyword was consumed.
    ///
    /// `inherited` holds the conditions accumulated from the top of the
    /// chain: every earlier sibling test, negated. The `else` of the final
    /// link inherits those plus the negation of the final test.
    fn parse_chain(&mut self, inherited: Vec<Condition>) -> CovminResult<()> {
        self.expect(Token::LParen)?;
        let predicate = self.collect_predicate()?;
        let conditions = parse_predicate(&predicate, &mut self.variables)?;

        let mut branch_conditions = inherited.clone();
        branch_conditions.extend(conditions.iter().cloned());
        let id = self.next_branch_id("if");
        self.branches.push(Branch::new(id, branch_conditions));

        self.expect(Token::LBrace)?;
        self.walk(true)?;

        // A predicate that yielded exactly one atomic condition has a
        // well-defined negation; otherwise later links inherit unchanged.
        let mut next_inherited = inherited;
        if let [single] = conditions.as_slice() {
            next_inherited.push(single.negated());
        }

        match self.current() {
            Some(Token::Elif) => {
                self.advance();
                self.parse_chain(next_inherited)?;
            }
            Some(Token::Else) => {
                self.advance();
                match self.current() {
                    Some(Token::If) => {
                        self.advance();
                        self.parse_chain(next_inherited)?;
                    }
                    Some(Token::LBrace) => {
                        self.advance();
                        let id = self.next_branch_id("else");
                        self.branches.push(Branch::new(id, next_inherited));
                        self.walk(true)?;
                    }
                    other => {
                        return Err(CovminError::ParseFailure(format!(
                            "expected block or 'if' after 'else', found {other:?}"
                        )))
                    }
                }
            }
            // No else: the implicit fall-through is not a coverage
            // obligation.
            _ => {}
        }
        Ok(())
    }

    /// Collect predicate tokens up to the matching close paren
    fn collect_predicate(&mut self) -> CovminResult<Vec<Token<'a>>> {
        let mut depth = 0usize;
        let mut collected = Vec::new();
        loop {
            match self.current() {
                None => {
                    return Err(CovminError::ParseFailure(
                        "unterminated predicate: missing ')'".to_string(),
                    ))
                }
                Some(Token::LParen) => {
                    depth += 1;
                    collected.push(Token::LParen);
                    self.advance();
                }
                Some(Token::RParen) => {
                    if depth == 0 {
                        self.advance();
                        return Ok(collected);
                    }
                    depth -= 1;
                    collected.push(Token::RParen);
                    self.advance();
                }
                Some(token) => {
                    collected.push(token.clone());
                    self.advance();
                }
            }
        }
    }
}

fn structural_extract(source: &str) -> CovminResult<Extraction> {
    let mut extractor = Extractor::new(source);
    extractor.walk(false)?;
    let variables = extractor.variables.into_iter().collect();
    Ok(Extraction {
        branches: extractor.branches,
        variables,
    })
}

/// Parse a predicate into its atomic conditions
///
/// The predicate's top-level AND-joined clauses each yield one condition
/// when they are atomic: a comparison `var op literal` or a bare (possibly
/// negated) identifier. Clauses containing a top-level OR, or otherwise
/// non-atomic shapes, yield none — a deliberate fidelity limit.
fn parse_predicate(
    tokens: &[Token<'_>],
    variables: &mut FxHashSet<String>,
) -> CovminResult<Vec<Condition>> {
    let mut conditions = Vec::new();
    for clause in split_top_level(tokens, &Token::And) {
        if let Some(condition) = parse_atomic(clause) {
            variables.insert(condition.variable().to_string());
            conditions.push(condition);
        }
    }
    Ok(conditions)
}

/// Split a token slice at top-level (paren depth zero) occurrences of `sep`
fn split_top_level<'t, 'a>(tokens: &'t [Token<'a>], sep: &Token<'a>) -> Vec<&'t [Token<'a>]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            t if depth == 0 && t == sep => {
                parts.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);
    parts
}

/// Try to read one clause as an atomic condition
fn parse_atomic(clause: &[Token<'_>]) -> Option<Condition> {
    let clause = strip_outer_parens(clause);
    if clause.is_empty() {
        return None;
    }
    // A top-level connective means the clause is not atomic.
    if split_top_level(clause, &Token::Or).len() > 1
        || split_top_level(clause, &Token::And).len() > 1
    {
        return None;
    }
    if clause[0] == Token::Not {
        return parse_atomic(&clause[1..]).map(|c| c.negated());
    }
    match clause {
        [Token::Ident(name)] => Some(Condition::boolean_test(*name)),
        [Token::Ident(name), op, rest @ ..] => {
            let op = comparison_op(op)?;
            let literal = literal_text(rest)?;
            Some(Condition::comparison(*name, op, literal))
        }
        _ => None,
    }
}

fn strip_outer_parens<'t, 'a>(mut clause: &'t [Token<'a>]) -> &'t [Token<'a>] {
    while clause.len() >= 2
        && clause.first() == Some(&Token::LParen)
        && clause.last() == Some(&Token::RParen)
        && parens_match_whole(clause)
    {
        clause = &clause[1..clause.len() - 1];
    }
    clause
}

/// True when the opening paren at index 0 closes at the final index
fn parens_match_whole(clause: &[Token<'_>]) -> bool {
    let mut depth = 0usize;
    for (i, token) in clause.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth -= 1;
                if depth == 0 {
                    return i == clause.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

fn comparison_op(token: &Token<'_>) -> Option<CompareOp> {
    match token {
        Token::EqEq => Some(CompareOp::Eq),
        Token::NotEq => Some(CompareOp::Ne),
        Token::Lt => Some(CompareOp::Lt),
        Token::Le => Some(CompareOp::Le),
        Token::Gt => Some(CompareOp::Gt),
        Token::Ge => Some(CompareOp::Ge),
        _ => None,
    }
}

/// Render the right-hand side of a comparison as literal text
fn literal_text(tokens: &[Token<'_>]) -> Option<String> {
    match tokens {
        [Token::Int(text)] | [Token::Float(text)] | [Token::Ident(text)] => {
            Some((*text).to_string())
        }
        [Token::Minus, Token::Int(text)] | [Token::Minus, Token::Float(text)] => {
            Some(format!("-{text}"))
        }
        [Token::True] => Some("true".to_string()),
        [Token::False] => Some("false".to_string()),
        [Token::Str(text)] => Some(text.trim_matches(|c| c == '"' || c == '\'').to_string()),
        _ => None,
    }
}

/// Pattern-based fallback: find `if (<expr>)` shapes anywhere in the text
///
/// Lower fidelity than the structural pass: `if` only, no inferred `else`
/// branches, no chain negation.
fn pattern_extract(source: &str) -> CovminResult<Extraction> {
    let mut branches = Vec::new();
    let mut variables = FxHashSet::default();
    for (index, predicate) in scan_if_predicates(source).into_iter().enumerate() {
        let tokens = tokenize(predicate);
        let conditions = parse_predicate(&tokens, &mut variables)?;
        if !conditions.is_empty() {
            branches.push(Branch::new(format!("branch_{index}"), conditions));
        }
    }
    if branches.is_empty() {
        return Err(CovminError::ParseFailure(
            "no recognizable if(...) conditions found".to_string(),
        ));
    }
    Ok(Extraction {
        branches,
        variables: variables.into_iter().collect(),
    })
}

/// Find the text between the parentheses of every `if (...)` occurrence
fn scan_if_predicates(source: &str) -> Vec<&str> {
    let bytes = source.as_bytes();
    let mut predicates = Vec::new();
    let mut i = 0usize;
    while let Some(offset) = source[i..].find("if") {
        let at = i + offset;
        let before_ok = at == 0 || !is_word_byte(bytes[at - 1]);
        let mut j = at + 2;
        while j < bytes.len() && (bytes[j] == b' ' || bytes[j] == b'\t') {
            j += 1;
        }
        if before_ok && j < bytes.len() && bytes[j] == b'(' {
            let mut depth = 0usize;
            let open = j;
            let mut close = None;
            for (k, &b) in bytes.iter().enumerate().skip(open) {
                match b {
                    b'(' => depth += 1,
                    b')' => {
                        depth -= 1;
                        if depth == 0 {
                            close = Some(k);
                            break;
                        }
                    }
                    _ => {}
                }
            }
            if let Some(close) = close {
                predicates.push(&source[open + 1..close]);
                i = close + 1;
                continue;
            }
        }
        i = at + 2;
    }
    predicates
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_simple_if_else() {
        let source = "if (x > 5) { go(); } else { stop(); }";
        let extraction = extract(source).unwrap();
        assert_eq!(extraction.branches.len(), 2);
        assert_eq!(
            extraction.branches[0].conditions,
            vec![Condition::comparison("x", CompareOp::Gt, "5")]
        );
        assert_eq!(
            extraction.branches[1].conditions,
            vec![Condition::comparison("x", CompareOp::Le, "5")]
        );
        assert_eq!(extraction.branches[0].id, "if_0");
        assert_eq!(extraction.branches[1].id, "else_1");
        assert!(extraction.variables.contains("x"));
    }

    #[test]
    fn test_no_else_emits_single_branch() {
        let extraction = extract("if (ready) { run(); }").unwrap();
        assert_eq!(extraction.branches.len(), 1);
        assert_eq!(
            extraction.branches[0].conditions,
            vec![Condition::boolean_test("ready")]
        );
    }

    #[test]
    fn test_elif_chain_accumulates_negations() {
        let source = r#"
            if (x > 10) { a(); }
            else if (x > 5) { b(); }
            else { c(); }
        "#;
        let extraction = extract(source).unwrap();
        assert_eq!(extraction.branches.len(), 3);
        assert_eq!(
            extraction.branches[1].conditions,
            vec![
                Condition::comparison("x", CompareOp::Le, "10"),
                Condition::comparison("x", CompareOp::Gt, "5"),
            ]
        );
        assert_eq!(
            extraction.branches[2].conditions,
            vec![
                Condition::comparison("x", CompareOp::Le, "10"),
                Condition::comparison("x", CompareOp::Le, "5"),
            ]
        );
    }

    #[test]
    fn test_python_style_elif_keyword() {
        let source = "if (a) { x(); } elif (b) { y(); } else { z(); }";
        let extraction = extract(source).unwrap();
        assert_eq!(extraction.branches.len(), 3);
        let negated_a = Condition::boolean_test("a").negated();
        assert_eq!(
            extraction.branches[1].conditions,
            vec![negated_a.clone(), Condition::boolean_test("b")]
        );
        assert_eq!(
            extraction.branches[2].conditions,
            vec![negated_a, Condition::boolean_test("b").negated()]
        );
    }

    #[test]
    fn test_and_clauses_split_into_conditions() {
        let extraction = extract("if (x >= 1 && y != 0) { f(); }").unwrap();
        assert_eq!(
            extraction.branches[0].conditions,
            vec![
                Condition::comparison("x", CompareOp::Ge, "1"),
                Condition::comparison("y", CompareOp::Ne, "0"),
            ]
        );
        let variables: Vec<_> = extraction.variables.iter().cloned().collect();
        assert_eq!(variables, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_word_connectives_and_not() {
        let extraction = extract("if (a and not b) { f(); }").unwrap();
        assert_eq!(
            extraction.branches[0].conditions,
            vec![
                Condition::boolean_test("a"),
                Condition::boolean_test("b").negated(),
            ]
        );
    }

    #[test]
    fn test_or_clause_contributes_no_condition() {
        let extraction = extract("if ((a || b) && c) { f(); }").unwrap();
        // The OR clause is non-atomic; only `c` survives.
        assert_eq!(
            extraction.branches[0].conditions,
            vec![Condition::boolean_test("c")]
        );
    }

    #[test]
    fn test_multi_condition_predicate_else_inherits_unchanged() {
        let source = "if (a && b) { f(); } else { g(); }";
        let extraction = extract(source).unwrap();
        assert_eq!(extraction.branches.len(), 2);
        // No single negatable test, so the else carries no conditions.
        assert!(extraction.branches[1].conditions.is_empty());
    }

    #[test]
    fn test_negated_comparison_uses_complement() {
        let extraction = extract("if (!(x > 5)) { f(); }").unwrap();
        assert_eq!(
            extraction.branches[0].conditions,
            vec![Condition::comparison("x", CompareOp::Le, "5")]
        );
    }

    #[test]
    fn test_nested_if_starts_fresh_chain() {
        let source = "if (a) { if (b) { f(); } } else { g(); }";
        let extraction = extract(source).unwrap();
        assert_eq!(extraction.branches.len(), 3);
        assert_eq!(
            extraction.branches[0].conditions,
            vec![Condition::boolean_test("a")]
        );
        // Nested chain does not inherit the outer condition.
        assert_eq!(
            extraction.branches[1].conditions,
            vec![Condition::boolean_test("b")]
        );
        assert_eq!(
            extraction.branches[2].conditions,
            vec![Condition::boolean_test("a").negated()]
        );
    }

    #[test]
    fn test_string_literal_comparison() {
        let extraction = extract(r#"if (role == "admin") { f(); }"#).unwrap();
        assert_eq!(
            extraction.branches[0].conditions,
            vec![Condition::comparison("role", CompareOp::Eq, "admin")]
        );
    }

    #[test]
    fn test_negative_number_literal() {
        let extraction = extract("if (t >= -5) { f(); }").unwrap();
        assert_eq!(
            extraction.branches[0].conditions,
            vec![Condition::comparison("t", CompareOp::Ge, "-5")]
        );
    }

    #[test]
    fn test_pattern_fallback_on_unbraced_source() {
        // No block braces, so the structural pass fails and the pattern
        // scan takes over: if-only, no else branch.
        let source = "when ready: if (x > 3 && y == 1) run();";
        let extraction = extract(source).unwrap();
        assert_eq!(extraction.branches.len(), 1);
        assert_eq!(extraction.branches[0].id, "branch_0");
        assert_eq!(
            extraction.branches[0].conditions,
            vec![
                Condition::comparison("x", CompareOp::Gt, "3"),
                Condition::comparison("y", CompareOp::Eq, "1"),
            ]
        );
    }

    #[test]
    fn test_parse_failure_when_nothing_matches() {
        let err = extract("if x > 5: pass").unwrap_err();
        assert!(matches!(err, CovminError::ParseFailure(_)));
    }

    #[test]
    fn test_empty_source_is_ok_with_no_branches() {
        let extraction = extract("let x = compute();").unwrap();
        assert!(extraction.branches.is_empty());
        assert!(extraction.variables.is_empty());
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let source = "if (x > 10) { a(); } else if (y) { b(); } else { c(); }";
        let first = extract(source).unwrap();
        let second = extract(source).unwrap();
        assert_eq!(first, second);
    }
}
