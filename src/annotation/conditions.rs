//! Condition-clause grammar.
//!
//! Parses clauses of the shape
//! `if [the] [field] '<ref>' <operator> '<value>' then <action> [otherwise <action>]`
//! out of free annotation text. A regex locates candidate `if` keywords;
//! nom combinators parse the clause structure from there. Anything that
//! fails to parse is simply not a clause — this module never errors.

use std::sync::LazyLock;

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_till1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, opt},
    sequence::{delimited, preceded, tuple},
    IResult,
};
use regex::Regex;

use super::keywords::action_for_phrase;
use formrule_types::{ActionKind, Condition, ConditionOperator};

/// One parsed conditional directive: the controlling condition plus the
/// action hints of its stated and (optional) otherwise branch.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionClause {
    pub condition: Condition,
    pub then_action: Option<ActionKind>,
    pub otherwise_action: Option<ActionKind>,
}

static IF_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bif\b").unwrap());
static OTHERWISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(otherwise|else)\b").unwrap());

/// Extract every parseable condition clause from the text, in order.
pub(crate) fn parse_clauses(text: &str) -> Vec<ConditionClause> {
    let mut clauses = Vec::new();
    let mut rest = text;
    while let Some(m) = IF_RE.find(rest) {
        let candidate = &rest[m.start()..];
        match clause(candidate) {
            Ok((remaining, parsed)) => {
                clauses.push(parsed);
                rest = remaining;
            }
            // Not a conditional directive; skip past this "if".
            Err(_) => rest = &candidate[m.len()..],
        }
    }
    clauses
}

fn clause(input: &str) -> IResult<&str, ConditionClause> {
    let (input, _) = tag_no_case("if")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, _) = opt(tuple((tag_no_case("the"), multispace1)))(input)?;
    let (input, _) = opt(tuple((tag_no_case("field"), multispace1)))(input)?;
    let (input, field_ref) = reference(input)?;
    let (input, _) = multispace0(input)?;
    let (input, operator) = operator(input)?;
    let (input, _) = multispace1(input)?;
    let (input, value) = value_token(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = opt(tuple((char(','), multispace0)))(input)?;
    let (input, _) = tag_no_case("then")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, then_phrase) = branch_phrase(input)?;
    let (input, otherwise_phrase) = opt(preceded(
        tuple((multispace0, otherwise_keyword, multispace1)),
        branch_phrase,
    ))(input)?;

    let then_action = action_for_phrase(then_phrase);
    // An otherwise branch whose phrase maps to no action still means "the
    // logical inverse of the stated branch".
    let otherwise_action = otherwise_phrase
        .and_then(|p| action_for_phrase(p).or_else(|| then_action.and_then(ActionKind::inverse)));

    Ok((
        input,
        ConditionClause {
            condition: Condition {
                field_ref,
                operator,
                value,
            },
            then_action,
            otherwise_action,
        },
    ))
}

fn otherwise_keyword(input: &str) -> IResult<&str, &str> {
    alt((tag_no_case("otherwise"), tag_no_case("else")))(input)
}

fn quoted(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(char('\''), take_till1(|c| c == '\''), char('\'')),
            delimited(char('"'), take_till1(|c| c == '"'), char('"')),
        )),
        |s: &str| s.trim().to_string(),
    )(input)
}

fn reference(input: &str) -> IResult<&str, String> {
    alt((quoted, bare_reference))(input)
}

/// Unquoted reference: words up to the comparison operator. Bounded, since
/// real references are short.
fn bare_reference(input: &str) -> IResult<&str, String> {
    let mut words: Vec<&str> = Vec::new();
    let mut rest = input;
    loop {
        let trimmed = rest.trim_start();
        let end = trimmed
            .find(char::is_whitespace)
            .unwrap_or(trimmed.len());
        let word = &trimmed[..end];
        if word.is_empty() || words.len() >= 6 {
            break;
        }
        let lower = word.to_ascii_lowercase();
        if matches!(lower.as_str(), "is" | "equals" | "contains" | "does" | "=") {
            break;
        }
        words.push(word);
        rest = &trimmed[end..];
    }
    if words.is_empty() {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TakeWhile1,
        )))
    } else {
        Ok((rest, words.join(" ")))
    }
}

fn operator(input: &str) -> IResult<&str, ConditionOperator> {
    alt((
        map(
            tuple((tag_no_case("is"), multispace1, tag_no_case("not"))),
            |_| ConditionOperator::NotEquals,
        ),
        map(
            tuple((
                tag_no_case("does"),
                multispace1,
                tag_no_case("not"),
                multispace1,
                tag_no_case("equal"),
            )),
            |_| ConditionOperator::NotEquals,
        ),
        map(tag_no_case("equals"), |_| ConditionOperator::Equals),
        map(tag_no_case("contains"), |_| ConditionOperator::Contains),
        map(tag_no_case("is"), |_| ConditionOperator::Equals),
        map(tag("="), |_| ConditionOperator::Equals),
    ))(input)
}

fn value_token(input: &str) -> IResult<&str, String> {
    alt((quoted, bare_value))(input)
}

fn bare_value(input: &str) -> IResult<&str, String> {
    map(
        take_till1(|c: char| c.is_whitespace() || c == ',' || c == '.' || c == ';'),
        |s: &str| s.to_string(),
    )(input)
}

/// A branch phrase runs to the next `otherwise`/`else`, sentence
/// punctuation, or end of input.
fn branch_phrase(input: &str) -> IResult<&str, &str> {
    let stop_at_otherwise = OTHERWISE_RE.find(input).map(|m| m.start());
    let stop_at_punct = input.find(['.', ';']);
    let end = [stop_at_otherwise, stop_at_punct, Some(input.len())]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(input.len());
    let phrase = input[..end].trim();
    if phrase.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TakeTill1,
        )));
    }
    Ok((&input[end..], phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_clause_with_otherwise() {
        let clauses =
            parse_clauses("if field 'GST Option' is 'Registered' then visible otherwise invisible");
        assert_eq!(clauses.len(), 1);
        let c = &clauses[0];
        assert_eq!(c.condition.field_ref, "GST Option");
        assert_eq!(c.condition.operator, ConditionOperator::Equals);
        assert_eq!(c.condition.value, "Registered");
        assert_eq!(c.then_action, Some(ActionKind::MakeVisible));
        assert_eq!(c.otherwise_action, Some(ActionKind::MakeInvisible));
    }

    #[test]
    fn parses_bare_reference_and_negation() {
        let clauses = parse_clauses("If Constitution is not 'Proprietorship' then mandatory");
        assert_eq!(clauses.len(), 1);
        let c = &clauses[0];
        assert_eq!(c.condition.field_ref, "Constitution");
        assert_eq!(c.condition.operator, ConditionOperator::NotEquals);
        assert_eq!(c.then_action, Some(ActionKind::MakeMandatory));
        assert_eq!(c.otherwise_action, None);
    }

    #[test]
    fn parses_contains_operator() {
        let clauses =
            parse_clauses("if 'Business Type' contains 'Export' then show, hidden otherwise");
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].condition.operator, ConditionOperator::Contains);
    }

    #[test]
    fn parses_else_variant_and_comma_before_then() {
        let clauses = parse_clauses("if 'Turnover' equals '0', then read-only else editable");
        assert_eq!(clauses.len(), 1);
        let c = &clauses[0];
        assert_eq!(c.then_action, Some(ActionKind::MakeReadonly));
        assert_eq!(c.otherwise_action, Some(ActionKind::MakeEditable));
    }

    #[test]
    fn parses_multiple_clauses() {
        let text = "if 'A' is 'x' then visible. if 'B' is 'y' then mandatory";
        let clauses = parse_clauses(text);
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].condition.field_ref, "A");
        assert_eq!(clauses[1].condition.field_ref, "B");
    }

    #[test]
    fn non_conditional_if_is_skipped() {
        assert!(parse_clauses("check if uploaded").is_empty());
        assert!(parse_clauses("").is_empty());
    }
}
