//! Datalog source parser
//!
//! Grammar:
//!
//! ```text
//! program   := statement*
//! statement := literal "."                        insert fact
//!            | literal ":-" literal ("," literal)* "."   insert rule
//!            | literal ("," literal)* "?"          query
//!            | literal ("," literal)* "~"          delete
//! literal   := ["not"] ( name "(" [term ("," term)*] ")" | term op term )
//! op        := "=" | "!=" | "<>" | "<" | "<=" | ">" | ">="
//! term      := quoted string | number | identifier
//! ```
//!
//! `%` starts a comment that runs to the end of the line. Numbers are
//! normalised, so `1.0` and `1` denote the same constant.

use crate::datalog::{format_number, parse_number, CompareOp, Literal, Rule, Term};
use crate::error::{Result, StrataError};
use crate::statement::Statement;
use nom::branch::alt;
use nom::bytes::complete::{escaped_transform, is_not, tag, tag_no_case, take_while, take_while1};
use nom::character::complete::{char as pchar, digit1, multispace1, not_line_ending, one_of, satisfy};
use nom::combinator::{cut, map, map_opt, not, opt, peek, recognize, value};
use nom::error::{context, VerboseError, VerboseErrorKind};
use nom::multi::{many0, separated_list0, separated_list1};
use nom::sequence::{delimited, pair, preceded, terminated, tuple};
use nom::IResult;

type Res<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// A statement together with the 1-based line it starts on
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    /// Source line of the statement's first token
    pub line: usize,
    /// The statement itself
    pub statement: Statement,
}

/// Whitespace and `%` comments
fn sp(input: &str) -> Res<'_, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(pchar('%'), not_line_ending)),
        ))),
    )(input)
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> Res<'a, O>
where
    F: FnMut(&'a str) -> Res<'a, O>,
{
    delimited(sp, inner, sp)
}

fn is_word_start(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_word_char(c: char) -> bool {
    is_word_start(c) || c == '-'
}

fn identifier(input: &str) -> Res<'_, &str> {
    recognize(pair(take_while1(is_word_start), take_while(is_word_char)))(input)
}

fn number(input: &str) -> Res<'_, String> {
    let digits = recognize(tuple((
        opt(one_of("+-")),
        digit1,
        opt(pair(pchar('.'), digit1)),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )));
    map_opt(
        terminated(digits, not(peek(satisfy(is_word_char)))),
        |text: &str| parse_number(text).map(format_number),
    )(input)
}

fn double_quoted(input: &str) -> Res<'_, String> {
    let body = escaped_transform(
        is_not("\\\""),
        '\\',
        alt((
            value("\\", tag("\\")),
            value("\"", tag("\"")),
            value("'", tag("'")),
            value("\n", tag("n")),
            value("\t", tag("t")),
            value("\r", tag("r")),
        )),
    );
    map(delimited(pchar('"'), opt(body), pchar('"')), Option::unwrap_or_default)(input)
}

fn single_quoted(input: &str) -> Res<'_, String> {
    let body = escaped_transform(
        is_not("\\'"),
        '\\',
        alt((
            value("\\", tag("\\")),
            value("'", tag("'")),
            value("\"", tag("\"")),
            value("\n", tag("n")),
            value("\t", tag("t")),
            value("\r", tag("r")),
        )),
    );
    map(delimited(pchar('\''), opt(body), pchar('\'')), Option::unwrap_or_default)(input)
}

fn term(input: &str) -> Res<'_, Term> {
    context(
        "term",
        alt((
            map(alt((double_quoted, single_quoted)), Term::constant),
            map(number, Term::constant),
            map(identifier, Term::parse),
        )),
    )(input)
}

fn operator(input: &str) -> Res<'_, CompareOp> {
    map_opt(
        alt((
            tag("<="),
            tag(">="),
            tag("<>"),
            tag("!="),
            tag("<"),
            tag(">"),
            tag("="),
        )),
        CompareOp::from_symbol,
    )(input)
}

fn infix(input: &str) -> Res<'_, Literal> {
    map(tuple((term, ws(operator), term)), |(left, op, right)| {
        Literal::compare(op, left, right)
    })(input)
}

fn atom(input: &str) -> Res<'_, Literal> {
    let terms = delimited(
        pair(pchar('('), sp),
        separated_list0(ws(pchar(',')), term),
        pair(sp, context("')'", pchar(')'))),
    );
    map(pair(identifier, preceded(sp, terms)), |(predicate, terms)| {
        Literal::new(predicate, terms)
    })(input)
}

fn literal(input: &str) -> Res<'_, Literal> {
    context(
        "literal",
        map(
            pair(
                opt(terminated(tag_no_case("not"), multispace1)),
                alt((infix, atom)),
            ),
            |(negation, literal)| match negation {
                Some(_) => literal.negate(),
                None => literal,
            },
        ),
    )(input)
}

fn literal_list(input: &str) -> Res<'_, Vec<Literal>> {
    separated_list1(ws(pchar(',')), literal)(input)
}

fn rule(input: &str) -> Res<'_, Statement> {
    map(
        pair(
            terminated(literal, ws(tag(":-"))),
            cut(context(
                "rule body ending in '.'",
                terminated(literal_list, ws(pchar('.'))),
            )),
        ),
        |(head, body)| Statement::InsertRule(Rule::new(head, body)),
    )(input)
}

fn goals(input: &str) -> Res<'_, Statement> {
    let (rest, mut goals) = literal_list(input)?;
    let (rest, terminator) = context("'.', '?' or '~'", ws(one_of(".?~")))(rest)?;
    match terminator {
        '?' => Ok((rest, Statement::Query(goals))),
        '~' => Ok((rest, Statement::Delete(goals))),
        _ if goals.len() == 1 => Ok((rest, Statement::InsertFact(goals.remove(0)))),
        _ => Err(nom::Err::Failure(VerboseError {
            errors: vec![(input, VerboseErrorKind::Context("'?' or '~' after a list of goals"))],
        })),
    }
}

fn statement(input: &str) -> Res<'_, Statement> {
    context("statement", alt((rule, goals)))(input)
}

fn line_of(source: &str, rest: &str) -> usize {
    let offset = source.len() - rest.len();
    source[..offset].matches('\n').count() + 1
}

fn describe<'a>(source: &'a str, error: VerboseError<&'a str>) -> StrataError {
    let (at, expected) = error
        .errors
        .iter()
        .find_map(|(at, kind)| match kind {
            VerboseErrorKind::Context(ctx) => Some((*at, *ctx)),
            _ => None,
        })
        .or_else(|| error.errors.first().map(|(at, _)| (*at, "statement")))
        .unwrap_or((source, "statement"));

    let near: String = at.lines().next().unwrap_or("").chars().take(24).collect();
    let near = if near.is_empty() {
        "end of input".to_string()
    } else {
        format!("'{}'", near)
    };

    StrataError::Parse {
        line: line_of(source, at),
        message: format!("expected {} near {}", expected, near),
    }
}

/// Parse a whole program
pub fn parse_program(source: &str) -> Result<Vec<ParsedStatement>> {
    let mut statements = Vec::new();
    let mut rest = source;

    loop {
        rest = match sp(rest) {
            Ok((remaining, ())) => remaining,
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => return Err(describe(source, e)),
            Err(nom::Err::Incomplete(_)) => break,
        };
        if rest.is_empty() {
            break;
        }

        let line = line_of(source, rest);
        match statement(rest) {
            Ok((remaining, statement)) => {
                statements.push(ParsedStatement { line, statement });
                rest = remaining;
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => return Err(describe(source, e)),
            Err(nom::Err::Incomplete(_)) => {
                return Err(StrataError::Parse {
                    line,
                    message: "unexpected end of input".to_string(),
                })
            }
        }
    }

    Ok(statements)
}

/// Parse exactly one statement
pub fn parse_statement(source: &str) -> Result<Statement> {
    let mut statements = parse_program(source)?;
    match statements.len() {
        1 => Ok(statements.remove(0).statement),
        0 => Err(StrataError::Parse {
            line: 1,
            message: "expected a statement".to_string(),
        }),
        _ => Err(StrataError::Parse {
            line: statements[1].line,
            message: "expected a single statement".to_string(),
        }),
    }
}

/// Parse a comma-separated list of literals such as `parent(X, Y), X <> Y`
pub fn parse_goals(source: &str) -> Result<Vec<Literal>> {
    match delimited(sp, literal_list, sp)(source) {
        Ok(("", goals)) => Ok(goals),
        Ok((rest, _)) => Err(StrataError::Parse {
            line: line_of(source, rest),
            message: format!("unexpected input '{}'", rest.trim()),
        }),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(describe(source, e)),
        Err(nom::Err::Incomplete(_)) => Err(StrataError::Parse {
            line: 1,
            message: "unexpected end of input".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datalog::LiteralKind;

    #[test]
    fn test_parse_fact() {
        let statement = parse_statement("parent(alice, \"Bob Smith\").").unwrap();
        assert_eq!(
            statement,
            Statement::InsertFact(Literal::new(
                "parent",
                vec![Term::constant("alice"), Term::constant("Bob Smith")]
            ))
        );
    }

    #[test]
    fn test_parse_rule_with_negation_and_builtins() {
        let statement =
            parse_statement("adult(N) :- not minor(N), person(N, A), A >= 18.").unwrap();
        let Statement::InsertRule(rule) = statement else {
            panic!("expected a rule");
        };
        assert_eq!(rule.head().to_string(), "adult(N)");
        assert_eq!(rule.body().len(), 3);
        assert_eq!(rule.body()[0].to_string(), "person(N, A)");
        assert!(rule.body()[1].is_negated());
        assert!(matches!(rule.body()[2].kind(), LiteralKind::Compare(CompareOp::Ge)));
    }

    #[test]
    fn test_parse_query_and_delete() {
        assert!(matches!(
            parse_statement("ancestor(a, X), X <> b?").unwrap(),
            Statement::Query(goals) if goals.len() == 2
        ));
        assert!(matches!(
            parse_statement("edge(a, X)~").unwrap(),
            Statement::Delete(goals) if goals.len() == 1
        ));
    }

    #[test]
    fn test_numbers_are_normalised() {
        let Statement::InsertFact(fact) = parse_statement("n(1.0, -2, 2.5e1, 007).").unwrap() else {
            panic!("expected a fact");
        };
        assert_eq!(fact.to_string(), "n(1, -2, 25, 7)");
    }

    #[test]
    fn test_trailing_number_before_terminator() {
        let Statement::InsertRule(rule) = parse_statement("q(X) :- p(X), X = 5.").unwrap() else {
            panic!("expected a rule");
        };
        assert_eq!(rule.body()[1].terms()[1], Term::constant("5"));
    }

    #[test]
    fn test_quoted_terms() {
        let Statement::InsertFact(fact) = parse_statement(r#"says('Ann', "a \"b\"", "")."#).unwrap() else {
            panic!("expected a fact");
        };
        assert_eq!(fact.terms()[0], Term::constant("Ann"));
        assert_eq!(fact.terms()[1], Term::constant("a \"b\""));
        assert_eq!(fact.terms()[2], Term::constant(""));
    }

    #[test]
    fn test_program_lines_and_comments() {
        let source = "% family\nparent(a, b).\n\n% rules\nancestor(X, Y) :-\n    parent(X, Y).\nancestor(a, Y)?\n";
        let statements = parse_program(source).unwrap();
        let lines: Vec<usize> = statements.iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![2, 5, 7]);
    }

    #[test]
    fn test_not_prefix_requires_separator() {
        let Statement::InsertFact(fact) = parse_statement("nothing(x).").unwrap() else {
            panic!("expected a fact");
        };
        assert!(!fact.is_negated());
        assert_eq!(fact.predicate(), "nothing");
    }

    #[test]
    fn test_parse_errors_report_line() {
        let err = parse_program("a(1).\nb(2).\nc(3 d).\n").unwrap_err();
        match err {
            StrataError::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error {:?}", other),
        }

        assert!(parse_program("p(X) :- q(X)").is_err());
        assert!(parse_program("p(a), q(b).").is_err());
        assert!(parse_statement("a(1). b(2).").is_err());
    }

    #[test]
    fn test_parse_goals() {
        let goals = parse_goals("edge(X, Y), not edge(Y, X)").unwrap();
        assert_eq!(goals.len(), 2);
        assert!(goals[1].is_negated());
        assert!(parse_goals("edge(X, Y) junk").is_err());
    }
}
