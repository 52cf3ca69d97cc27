//! Token parser functions are used to define and recognize the particular tokens of
//! the language, so that { a + b } gets recognized into LEFT_BRACKET ID ADD ID RIGHT_BRACKET
//! and so on. This module consists of a lot of uninteresting helper/wrapper functions

use ast::Operator;
use nom::Err::Error as NomError;
use nom::{
    branch::alt, bytes::complete::tag, bytes::complete::take_until, bytes::complete::take_while,
    bytes::complete::take_while1, character::complete::anychar, character::complete::char,
    character::is_alphanumeric, character::is_digit, combinator::not, combinator::opt,
    combinator::peek,
};

use super::{located, Error};
use super::{ParseInput, ParseResult};

/// Reserved Keywords by genko
const RESERVED_KEYWORDS: &[&str] = &[
    "func", "type", "mut", "true", "false", "return", "where", "if", "else",
];

/// Function used to recognize a specific character such as '[' or '>'. A function
/// calling this is specifically trying to recognize the given character
fn specific_char(input: ParseInput, character: char) -> ParseResult<ParseInput, char> {
    char::<ParseInput, Error>(character)(input)
}

/// Match a simple token. No rules apply to the characters following it, unlike
/// specific_token
fn token<'input>(
    input: ParseInput<'input>,
    token: &'input str,
) -> ParseResult<'input, ParseInput<'input>, ParseInput<'input>> {
    tag(token)(input)
}

/// Function used to recognize a specific string token such as "func" or "where"
/// When a function calls specific_token(_, "token"), that means it's trying to
/// recognize specifically the word "token".
fn specific_token<'tok>(
    input: ParseInput<'tok>,
    token: &'tok str,
) -> ParseResult<'tok, ParseInput<'tok>, ParseInput<'tok>> {
    let (input, tag) = tag(token)(input)?;

    if let Some(next_char) = input.chars().next() {
        if next_char.is_alphanumeric() || next_char == '_' {
            return Err(NomError(Error::Msg(format!(
                "unexpected character `{next_char}` after `{token}`"
            ))));
        }
    }
    Ok((input, tag))
}

pub fn single_quote(input: ParseInput) -> ParseResult<ParseInput, char> {
    specific_char(input, '\'')
}

pub fn double_quote(input: ParseInput) -> ParseResult<ParseInput, char> {
    specific_char(input, '"')
}

pub fn equal(input: ParseInput) -> ParseResult<ParseInput, char> {
    let (input, token) = specific_char(input, '=')?;
    if !input.is_empty() {
        peek(not(char('=')))(input)?;
    }

    Ok((input, token))
}

pub fn comma(input: ParseInput) -> ParseResult<ParseInput, char> {
    specific_char(input, ',')
}

pub fn left_curly_bracket(input: ParseInput) -> ParseResult<ParseInput, char> {
    specific_char(input, '{')
}

pub fn right_curly_bracket(input: ParseInput) -> ParseResult<ParseInput, char> {
    specific_char(input, '}')
}

pub fn left_bracket(input: ParseInput) -> ParseResult<ParseInput, char> {
    specific_char(input, '[')
}

pub fn right_bracket(input: ParseInput) -> ParseResult<ParseInput, char> {
    specific_char(input, ']')
}

pub fn colon(input: ParseInput) -> ParseResult<ParseInput, char> {
    specific_char(input, ':')
}

pub fn semicolon(input: ParseInput) -> ParseResult<ParseInput, char> {
    specific_char(input, ';')
}

pub fn func_tok(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    specific_token(input, "func")
}

pub fn mut_tok(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    specific_token(input, "mut")
}

pub fn if_tok(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    specific_token(input, "if")
}

pub fn else_tok(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    specific_token(input, "else")
}

pub fn return_tok(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    specific_token(input, "return")
}

pub fn type_tok(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    specific_token(input, "type")
}

pub fn where_tok(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    specific_token(input, "where")
}

pub fn add(input: ParseInput) -> ParseResult<ParseInput, Operator> {
    token(input, "+").map(|(input, _)| (input, Operator::Add))
}

pub fn sub(input: ParseInput) -> ParseResult<ParseInput, Operator> {
    token(input, "-").map(|(input, _)| (input, Operator::Sub))
}

pub fn mul(input: ParseInput) -> ParseResult<ParseInput, Operator> {
    token(input, "*").map(|(input, _)| (input, Operator::Mul))
}

pub fn div(input: ParseInput) -> ParseResult<ParseInput, Operator> {
    token(input, "/").map(|(input, _)| (input, Operator::Div))
}

pub fn left_parenthesis(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    token(input, "(")
}

pub fn right_parenthesis(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    token(input, ")")
}

pub fn lt(input: ParseInput) -> ParseResult<ParseInput, Operator> {
    token(input, "<").map(|(input, _)| (input, Operator::Lt))
}

pub fn gt(input: ParseInput) -> ParseResult<ParseInput, Operator> {
    token(input, ">").map(|(input, _)| (input, Operator::Gt))
}

pub fn lt_eq(input: ParseInput) -> ParseResult<ParseInput, Operator> {
    token(input, "<=").map(|(input, _)| (input, Operator::LtEq))
}

pub fn gt_eq(input: ParseInput) -> ParseResult<ParseInput, Operator> {
    token(input, ">=").map(|(input, _)| (input, Operator::GtEq))
}

pub fn equals(input: ParseInput) -> ParseResult<ParseInput, Operator> {
    token(input, "==").map(|(input, _)| (input, Operator::Equals))
}

pub fn not_equals(input: ParseInput) -> ParseResult<ParseInput, Operator> {
    token(input, "!=").map(|(input, _)| (input, Operator::NotEquals))
}

pub fn true_tok(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    specific_token(input, "true")
}

pub fn false_tok(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    specific_token(input, "false")
}

pub fn arrow(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    token(input, "->")
}

pub fn comment_multi_start(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    tag("/*")(input)
}

pub fn comment_multi_end(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    tag("*/")(input)
}

pub fn comment_single(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    tag("//")(input)
}

pub fn comment_shebang(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    tag("#")(input)
}

pub fn dot(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    token(input, ".")
}

pub fn identifier(input: ParseInput) -> ParseResult<ParseInput, String> {
    let start = input;
    let (input, id) = take_while1(|c| is_alphanumeric(c as u8) || c == '_')(input)?;

    if RESERVED_KEYWORDS.contains(id.fragment()) {
        return Err(located(
            start,
            &format!("identifier cannot be keyword `{}`", id.fragment()),
        ));
    }

    // At least one alphabetical character is required
    if id.chars().any(|c| c.is_alphabetic()) {
        return Ok((input, id.fragment().to_string()));
    }

    Err(located(
        start,
        &format!("invalid identifier `{}`", id.fragment()),
    ))
}

fn non_neg_num(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    take_while1(|c| is_digit(c as u8))(input)
}

pub fn bool_constant(input: ParseInput) -> ParseResult<ParseInput, bool> {
    let (input, b) = alt((true_tok, false_tok))(input)?;

    Ok((input, *b.fragment() == "true"))
}

pub fn float_constant(input: ParseInput) -> ParseResult<ParseInput, f64> {
    let (input, negative_sign) = opt(char('-'))(input)?;
    let (input, whole) = non_neg_num(input)?;
    let (input, _) = char('.')(input)?;
    let (input, decimal) = non_neg_num(input)?;

    match format!("{}.{}", whole.fragment(), decimal.fragment()).parse::<f64>() {
        Ok(value) => match negative_sign {
            Some(_) => Ok((input, -value)),
            None => Ok((input, value)),
        },
        Err(_) => Err(NomError(Error::Msg(format!(
            "invalid floating point number: {}.{}",
            whole.fragment(),
            decimal.fragment()
        )))),
    }
}

pub fn int_constant(input: ParseInput) -> ParseResult<ParseInput, i64> {
    let (input, negative_sign) = opt(char('-'))(input)?;
    let (input, num) = non_neg_num(input)?;

    match num.fragment().parse::<i64>() {
        Ok(value) => match negative_sign {
            Some(_) => Ok((input, -value)),
            None => Ok((input, value)),
        },
        Err(_) => Err(NomError(Error::Msg(format!(
            "invalid integer: {}",
            num.fragment()
        )))),
    }
}

/// Parse a single character constant and return the character inside the quotes
pub fn char_constant(input: ParseInput) -> ParseResult<ParseInput, char> {
    let (input, _) = single_quote(input)?;
    let (input, character) = anychar(input)?;
    let (input, _) = single_quote(input)?;

    Ok((input, character))
}

#[inline(always)]
pub fn consume_multi_comment(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    let (input, _) = comment_multi_start(input)?;
    let (input, content) = take_until("*/")(input)?;
    let (input, _) = comment_multi_end(input)?;

    Ok((input, content))
}

#[inline(always)]
pub fn consume_single_comment(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    let (input, _) = comment_single(input)?;

    take_while(|c| c != '\n' && c != '\0')(input)
}

#[inline(always)]
pub fn consume_shebang_comment(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    let (input, _) = comment_shebang(input)?;

    take_while(|c| c != '\n' && c != '\0')(input)
}

/// Consumes all kinds of comments: Multi-line or single-line
pub fn consume_comment(input: ParseInput) -> ParseResult<ParseInput, ParseInput> {
    alt((
        consume_shebang_comment,
        consume_single_comment,
        consume_multi_comment,
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span;

    macro_rules! frag_first {
        ($span:expr) => {
            $span.map(|(s0, s1)| (*s0.fragment(), s1))
        };
    }

    #[test]
    fn t_char_constant_valid() {
        assert_eq!(frag_first!(char_constant(span!("'a'"))), Ok(("", 'a')));
        assert_eq!(frag_first!(char_constant(span!("'9'"))), Ok(("", '9')));
    }

    #[test]
    fn t_char_constant_invalid() {
        // Multiple characters
        assert!(char_constant(span!("'abc'")).is_err());
    }

    #[test]
    fn t_int_constant_valid() {
        assert_eq!(frag_first!(int_constant(span!("12"))), Ok(("", 12)));
        assert_eq!(frag_first!(int_constant(span!("-45"))), Ok(("", -45)));
    }

    #[test]
    fn t_int_constant_invalid() {
        assert!(int_constant(span!("ff2")).is_err());
        assert!(int_constant(span!("99999999999999999999999")).is_err());
    }

    #[test]
    fn t_float_constant_valid() {
        assert_eq!(
            frag_first!(float_constant(span!("12.2"))),
            Ok(("", 12.2f64))
        );
        assert_eq!(
            frag_first!(float_constant(span!("-45.06"))),
            Ok(("", -45.06f64))
        );
    }

    #[test]
    fn t_float_constant_invalid() {
        assert!(float_constant(span!("ff2")).is_err());

        assert!(float_constant(span!("12")).is_err());
    }

    #[test]
    fn t_id() {
        assert_eq!(
            frag_first!(identifier(span!("x"))),
            Ok(("", "x".to_string()))
        );
        assert_eq!(
            frag_first!(identifier(span!("x_99"))),
            Ok(("", "x_99".to_string()))
        );
        assert_eq!(
            frag_first!(identifier(span!("99x"))),
            Ok(("", "99x".to_string()))
        );
        assert_eq!(
            frag_first!(identifier(span!("T]"))),
            Ok(("]", "T".to_string()))
        );
        assert_eq!(
            frag_first!(identifier(span!("func_ x"))),
            Ok((" x", "func_".to_string()))
        );
    }

    #[test]
    fn t_id_invalid() {
        assert!(identifier(span!("99")).is_err());
        assert!(identifier(span!("__99_")).is_err());
        assert!(identifier(span!("func")).is_err());
        assert!(identifier(span!("where")).is_err());
    }

    #[test]
    fn t_bool_valid() {
        assert_eq!(frag_first!(bool_constant(span!("true"))), Ok(("", true)));
        assert_eq!(frag_first!(bool_constant(span!("false"))), Ok(("", false)));
        assert_eq!(
            frag_first!(bool_constant(span!("true; false"))),
            Ok(("; false", true))
        );
        assert_eq!(
            frag_first!(bool_constant(span!("true*false"))),
            Ok(("*false", true))
        );
    }

    #[test]
    fn t_bool_invalid() {
        assert!(bool_constant(span!("tru")).is_err());
        assert!(bool_constant(span!("trueast")).is_err());
    }

    #[test]
    fn t_multi_comment_valid() {
        assert!(consume_comment(span!("/* */")).is_ok());
        assert!(consume_comment(span!("/**/")).is_ok());
        assert!(consume_comment(span!("/* a bbbb a something   */")).is_ok());
    }

    #[test]
    fn t_multi_comment_unclosed() {
        assert!(consume_comment(span!("/* never closed")).is_err());
    }

    #[test]
    fn t_single_comment_valid() {
        assert!(consume_comment(span!("//")).is_ok());
        assert!(consume_comment(span!("//          \nhey")).is_ok());
        assert!(consume_comment(span!("// a bbbb a something  /* hey */")).is_ok());
        assert!(consume_comment(span!("# shebang")).is_ok());
    }

    #[test]
    fn t_operators() {
        assert_eq!(frag_first!(lt_eq(span!("<= b"))), Ok((" b", Operator::LtEq)));
        assert_eq!(frag_first!(not_equals(span!("!="))), Ok(("", Operator::NotEquals)));
        assert!(equal(span!("== b")).is_err());
        assert!(equal(span!("= b")).is_ok());
    }
}
