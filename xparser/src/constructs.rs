//! A `Construct` is a complex set of tokens. For example, `fn()` is an identifier, a
//! left parenthesis and a right parenthesis. Together, they constitute a function call.
//! In the same vein, `x = 12;` is 4 tokens used to represent variable assignment.
//! Therefore, constructs use tokens while the parser only uses constructs. This is an
//! abstraction for all possible ways to parse a line in genko.
//!
//! Each of the functions in that module contain the grammar they represent above their
//! name. The syntax used for the grammar is loosely based on regular instructions and
//! globbing. One can use * to indicate 0 or more, ? to indicate 1 or more, etc etc.
//! Optional parameters are included between brackets. For example,
//!
//! `'where' [mut] <identifier> = <expr>`
//!
//! is the grammar for a variable declaration.

use super::tokens;
use super::{located, Error, ParseInput, ParseResult};

use ast::{Ast, Call, Declaration, GenericParameter, Node, Type, TypedValue, Value};
use location::{Location, SpanTuple};
use nom::Slice;
use nom_locate::position;
use symbol::Symbol;

use nom::{
    branch::alt, character::complete::multispace0, combinator::opt, multi::many0,
    sequence::preceded, sequence::terminated,
};

pub(crate) fn pos_to_loc(
    input: ParseInput,
    start: impl Into<Location>,
    end: impl Into<Location>,
) -> SpanTuple {
    SpanTuple::with_source_ref(input.extra, start.into(), end.into())
}

/// Parse as many instructions as possible
/// many_expr = ( expr_semicolon )*
pub fn many_exprs(mut input: ParseInput) -> ParseResult<ParseInput, Vec<Ast>> {
    let mut exprs = vec![];
    loop {
        input = next(input);
        if input.is_empty() {
            return Ok((input, exprs));
        }
        let (new_input, expr) = expr_semicolon(input)?;
        input = new_input;
        exprs.push(expr);
    }
}

/// Parse an instruction and maybe the semicolon that follows.
///
/// expr_semicolon = expr [ ';' ]
pub fn expr_semicolon(input: ParseInput) -> ParseResult<ParseInput, Ast> {
    let (input, expr) = expr(input)?;
    let (input, _) = opt(tokens::semicolon)(input)?;

    Ok((input, expr))
}

/// expr = cmp ( '<' cmp | '>' cmp | '<=' cmp | '>=' cmp | '==' cmp | '!=' cmp)*
pub fn expr(input: ParseInput) -> ParseResult<ParseInput, Ast> {
    let input = next(input);
    let (input, start_loc) = position(input)?;
    let (mut input, mut expr) = cmp(input)?;
    while let Ok((new_input, op)) = alt((
        tokens::lt_eq,
        tokens::gt_eq,
        tokens::equals,
        tokens::not_equals,
        tokens::lt,
        tokens::gt,
    ))(input)
    {
        let (new_input, rhs) = cmp(new_input)?;
        let (new_input, end_loc) = position(new_input)?;
        input = new_input;
        let b_op = Ast {
            location: pos_to_loc(input, start_loc, end_loc),
            node: Node::BinaryOp(op, Box::new(expr), Box::new(rhs)),
        };
        expr = b_op;
    }
    Ok((input, expr))
}

/// cmp = term ( '+' term | '-' term )*
pub fn cmp(input: ParseInput) -> ParseResult<ParseInput, Ast> {
    let input = next(input);
    let (input, start_loc) = position(input)?;
    let (mut input, mut expr) = term(input)?;
    while let Ok((new_input, op)) = alt((tokens::add, tokens::sub))(input) {
        let (new_input, rhs) = term(new_input)?;
        let (new_input, end_loc) = position(new_input)?;
        input = new_input;
        let b_op = Ast {
            location: pos_to_loc(input, start_loc, end_loc),
            node: Node::BinaryOp(op, Box::new(expr), Box::new(rhs)),
        };
        expr = b_op;
    }
    Ok((input, expr))
}

/// term = factor next ( '*' factor next | '/' factor next )*
fn term(input: ParseInput) -> ParseResult<ParseInput, Ast> {
    let input = next(input);
    let (input, start_loc) = position(input)?;
    let (input, mut term) = factor(input)?;
    let mut input = next(input);
    while let Ok((new_input, op)) = alt((tokens::mul, tokens::div))(input) {
        let (new_input, rhs) = factor(new_input)?;
        let (new_input, end_loc) = position(new_input)?;
        let new_input = next(new_input);
        input = new_input;
        let b_op = Ast {
            location: pos_to_loc(input, start_loc, end_loc),
            node: Node::BinaryOp(op, Box::new(term), Box::new(rhs)),
        };
        term = b_op;
    }
    Ok((input, term))
}

/// factor = next unit factor_rest
fn factor(input: ParseInput) -> ParseResult<ParseInput, Ast> {
    let input = next(input);
    let (input, start_loc) = position(input)?;
    let (input, unit) = unit(input)?;
    factor_rest(input, unit, start_loc.into())
}

/// factor_rest = '.' IDENTIFIER next method_or_field factor_rest
///             | ε
fn factor_rest(input: ParseInput, expr: Ast, start_loc: Location) -> ParseResult<ParseInput, Ast> {
    match tokens::dot(input) {
        Ok((input, _)) => {
            let (input, id) = tokens::identifier(next(input))?;
            let input = next(input);
            let (input, expr) = method_or_field(input, expr, id, start_loc.clone())?;
            factor_rest(input, expr, start_loc)
        }
        _ => Ok((input, expr)),
    }
}

/// method_or_field = '(' next args
///                 | '[' next generic_list next '(' next args
///                 | ε
fn method_or_field(
    input: ParseInput,
    expr: Ast,
    id: String,
    start_loc: Location,
) -> ParseResult<ParseInput, Ast> {
    let (input, generics) = if let Ok((input, _)) = tokens::left_bracket(input) {
        let input = next(input);
        let (input, generics) = generic_list(input)?;
        let input = next(input);
        let (input, _) = tokens::left_parenthesis(input)?;

        (input, Some(generics))
    } else if let Ok((input, _)) = tokens::left_parenthesis(input) {
        (input, Some(vec![]))
    } else {
        (input, None)
    };

    match generics {
        Some(generics) => {
            let input = next(input);
            let (input, args) = args(input)?;
            let (input, end_loc) = position(input)?;
            let method_call = Ast {
                location: pos_to_loc(input, start_loc, end_loc),
                node: Node::MethodCall {
                    instance: Box::new(expr),
                    call: Call {
                        to: Symbol::from(id),
                        generics,
                        args,
                    },
                },
            };

            Ok((input, method_call))
        }
        None => {
            let (input, end_loc) = position(input)?;
            let f_a = Ast {
                location: pos_to_loc(input, start_loc, end_loc),
                node: Node::FieldAccess(Box::new(expr), Symbol::from(id)),
            };

            Ok((input, f_a))
        }
    }
}

/// ```ignore
/// unit = 'if' expr block next [ 'else' next block ]
///      | 'func' function_declaration block
///      | 'type' spaced_identifier [ generic_arguments ] [ '(' typed_args ]
///      | 'where' [ 'mut' ] spaced_identifier '=' expr
///      | 'return' [ expr ]
///      | '{' next inner_block
///      | '(' expr ')'
///
///      | 'true'
///      | 'false'
///      | "'" CHAR "'"
///      | '"' [^"] '"'
///      | INT
///      | DOUBLE
///
///      | IDENTIFIER next func_type_or_var
/// ```
fn unit(input: ParseInput) -> ParseResult<ParseInput, Ast> {
    let (input, start_loc) = position(input)?;
    if let Ok((input, _)) = tokens::if_tok(input) {
        unit_if(input, start_loc.into())
    } else if let Ok((input, _)) = tokens::func_tok(input) {
        unit_func(input, start_loc.into())
    } else if let Ok((input, _)) = tokens::type_tok(input) {
        unit_type_decl(input, start_loc.into())
    } else if let Ok((input, _)) = tokens::where_tok(input) {
        unit_var_decl(input, start_loc.into())
    } else if let Ok((input, _)) = tokens::return_tok(input) {
        unit_return(input, start_loc.into())
    } else if let Ok((input, _)) = tokens::left_curly_bracket(input) {
        unit_block(input, start_loc.into())
    } else if let Ok((input, _)) = tokens::left_parenthesis(input) {
        terminated(expr, tokens::right_parenthesis)(input)
    } else if let Ok(res) = constant(input) {
        Ok(res)
    } else {
        let (input, id) = tokens::identifier(input)?;
        let input = next(input);
        func_type_or_var(input, id, start_loc.into())
    }
}

fn unit_if(input: ParseInput, start_loc: Location) -> ParseResult<ParseInput, Ast> {
    let (input, cond) = expr(input)?;
    let (input, success) = block(input)?;
    let input = next(input);
    let (input, else_block) = if let Ok((input, _)) = tokens::else_tok(input) {
        let input = next(input);
        let (input, else_body) = block(input)?;

        (input, Some(Box::new(else_body)))
    } else {
        (input, None)
    };
    let (input, end_loc) = position(input)?;

    let if_else = Ast {
        location: pos_to_loc(input, start_loc, end_loc),
        node: Node::IfElse {
            if_condition: Box::new(cond),
            if_block: Box::new(success),
            else_block,
        },
    };

    Ok((input, if_else))
}

fn unit_func(input: ParseInput, start_loc: Location) -> ParseResult<ParseInput, Ast> {
    let (input, decl) = func_declaration(input)?;
    let input = next(input);
    let (input, block) = block(input)?;
    let (input, end_loc) = position(input)?;
    let function = Node::Function {
        decl,
        block: Box::new(block),
    };

    Ok((
        input,
        Ast {
            location: pos_to_loc(input, start_loc, end_loc),
            node: function,
        },
    ))
}

/// type_id = IDENTIFIER [ '[' generic_list ]
fn type_id(input: ParseInput) -> ParseResult<ParseInput, Type> {
    let input = next(input);
    let (input, start_loc) = position(input)?;
    let (input, name) = tokens::identifier(input)?;
    let (input, end_loc) = position(input)?;
    let (input, generics, end_loc) = match maybe_generic_application(next(input))? {
        (after, generics) if !generics.is_empty() => {
            let (after, end_loc) = position(after)?;
            (after, generics, end_loc)
        }
        _ => (input, vec![], end_loc),
    };

    Ok((
        input,
        Type {
            name: Symbol::from(name),
            generics,
            location: pos_to_loc(input, start_loc, end_loc),
        },
    ))
}

/// ```text
/// type_declaration ::=
///     // record type
///     | "type" id_and_generics "(" [ identifier ":" type ]","* ")" ";"
///     // empty type
///     | "type" id_and_generics ";"
/// ```
fn unit_type_decl(input: ParseInput, start_loc: Location) -> ParseResult<ParseInput, Ast> {
    let (input, (name, _)) = spaced_identifier(input)?;
    let (input, generics) = maybe_generic_arguments(input)?;
    let input = next(input);

    let (input, fields) = if let Ok((input, _)) = tokens::left_parenthesis(input) {
        typed_args(next(input))?
    } else {
        (input, vec![])
    };
    let (input, end_loc) = position(input)?;

    Ok((
        input,
        Ast {
            location: pos_to_loc(input, start_loc, end_loc),
            node: Node::Type {
                name: Symbol::from(name),
                generics,
                fields,
            },
        },
    ))
}

/// mut? [`spaced_identifier`] '=' expr
fn unit_var_decl(input: ParseInput, start_loc: Location) -> ParseResult<ParseInput, Ast> {
    let input = next(input);
    let (input, mutable) = opt(tokens::mut_tok)(input)?;
    let mutable = mutable.is_some();

    let (input, (symbol, _)) = spaced_identifier(input)?;
    let (input, _) = tokens::equal(input)?;
    let (input, value) = expr(input)?;
    let (input, end_loc) = position(input)?;

    let declaration = Node::VarDeclaration {
        mutable,
        to_declare: Symbol::from(symbol),
        value: Box::new(value),
    };

    Ok((
        input,
        Ast {
            location: pos_to_loc(input, start_loc, end_loc),
            node: declaration,
        },
    ))
}

///  [ expr ]                      (* Not LL(1) but this entry is subject to change *)
fn unit_return(input: ParseInput, start_loc: Location) -> ParseResult<ParseInput, Ast> {
    let (input, expr) = opt(expr)(input)?;
    let (input, end_loc) = position(input)?;

    let ret = Node::Return(expr.map(Box::new));

    Ok((
        input,
        Ast {
            location: pos_to_loc(input, start_loc, end_loc),
            node: ret,
        },
    ))
}

fn unit_block(input: ParseInput, start_loc: Location) -> ParseResult<ParseInput, Ast> {
    let (input, (stmts, last_is_expr)) = inner_block(next(input))?;
    let (input, end_loc) = position(input)?;

    Ok((
        input,
        Ast {
            location: pos_to_loc(input, start_loc, end_loc),
            node: Node::Block {
                stmts,
                last_is_expr,
            },
        },
    ))
}

/// generic_list = type_id ( ',' type_id )* ']'
fn generic_list(input: ParseInput) -> ParseResult<ParseInput, Vec<Type>> {
    fn whitespace_plus_type(input: ParseInput) -> ParseResult<ParseInput, Type> {
        let input = next(input);
        let (input, ty) = type_id(input)?;
        let input = next(input);

        Ok((input, ty))
    }

    let (input, first_type) = whitespace_plus_type(input)?;
    let (input, mut generics) = many0(preceded(tokens::comma, whitespace_plus_type))(input)?;
    let (input, _) = tokens::right_bracket(input)?;

    generics.insert(0, first_type);
    Ok((input, generics))
}

/// generic_arguments = spaced_identifier ( ',' spaced_identifier )* ']'
fn generic_arguments(input: ParseInput) -> ParseResult<ParseInput, Vec<GenericParameter>> {
    fn whitespace_plus_generic(input: ParseInput) -> ParseResult<ParseInput, GenericParameter> {
        let (input, (id, (start_loc, end_loc))) = spaced_identifier(input)?;

        Ok((
            input,
            GenericParameter {
                name: Symbol::from(id),
                location: pos_to_loc(input, start_loc, end_loc),
            },
        ))
    }

    let (input, first_type) = whitespace_plus_generic(input)?;
    let (input, mut generics) = many0(preceded(tokens::comma, whitespace_plus_generic))(input)?;
    let (input, _) = tokens::right_bracket(input)?;

    generics.insert(0, first_type);
    Ok((input, generics))
}

fn maybe_generic_arguments(input: ParseInput) -> ParseResult<ParseInput, Vec<GenericParameter>> {
    if let Ok((input, _)) = tokens::left_bracket(input) {
        generic_arguments(input)
    } else {
        Ok((input, vec![]))
    }
}

fn maybe_generic_application(input: ParseInput) -> ParseResult<ParseInput, Vec<Type>> {
    if let Ok((input, _)) = tokens::left_bracket(input) {
        generic_list(input)
    } else {
        Ok((input, vec![]))
    }
}

/// function_declaration = next spaced_identifier [ next '[' spaced_identifier ( ',' spaced_identifier )* ']' ] next '(' next typed_arg next return_type
fn func_declaration(input: ParseInput) -> ParseResult<ParseInput, Declaration> {
    let input = next(input);
    let (input, (id, _)) = spaced_identifier(input)?;
    let input = next(input);

    let (input, generics) = maybe_generic_arguments(input)?;
    let input = next(input);

    let (input, _) = tokens::left_parenthesis(input)?;
    let input = next(input);
    let (input, args) = typed_args(input)?;
    let input = next(input);
    let (input, return_type) = return_type(input)?;

    let decl = Declaration {
        name: Symbol::from(id),
        generics,
        args,
        return_type,
    };

    Ok((input, decl))
}

/// return_type = '->' type_id
///             | ε
fn return_type(input: ParseInput) -> ParseResult<ParseInput, Option<Type>> {
    match tokens::arrow(input) {
        Ok((input, _)) => {
            let (input, ty_id) = type_id(input)?;
            Ok((input, Some(ty_id)))
        }
        _ => Ok((input, None)),
    }
}

/// block = '{' next inner_block
pub fn block(input: ParseInput) -> ParseResult<ParseInput, Ast> {
    let (input, start_loc) = position(input)?;
    let (input, _) = tokens::left_curly_bracket(input)?;

    unit_block(input, start_loc.into())
}

/// Declarations and branches end with a block, and do not need to be followed by a
/// semicolon when used as statements
fn ends_with_block(ast: &Ast) -> bool {
    matches!(
        ast.node,
        Node::Function { .. } | Node::IfElse { .. } | Node::Block { .. }
    )
}

/// inner_block = '}'
///             | expr '}'                  (* The only case where block is an expr *)
///             | expr ';' next inner_block
///             | expr next inner_block     (* if expr ends with a block *)
fn inner_block(mut input: ParseInput) -> ParseResult<ParseInput, (Vec<Ast>, bool)> {
    let mut stmts = vec![];

    loop {
        input = next(input);
        if let Ok((input, _)) = tokens::right_curly_bracket(input) {
            return Ok((input, (stmts, false)));
        }

        let (new_input, inst) = expr(input)?;
        let new_input = next(new_input);
        if let Ok((new_input, _)) = tokens::right_curly_bracket(new_input) {
            stmts.push(inst);
            return Ok((new_input, (stmts, true)));
        }

        input = match tokens::semicolon(new_input) {
            Ok((new_input, _)) => new_input,
            Err(_) if ends_with_block(&inst) => new_input,
            Err(_) => return Err(located(new_input, "expected `;` or `}` after statement")),
        };

        stmts.push(inst);
    }
}

/// func_type_or_var = '[' next generic_func_or_type_inst_args
///                  | '(' next func_or_type_inst_args
///                  | '=' expr                   (* variable assigment *)
///                  | ε                          (* variable or empty type instantiation *)
fn func_type_or_var(
    input: ParseInput,
    id: String,
    start_loc: Location,
) -> ParseResult<ParseInput, Ast> {
    if let Ok((input, _)) = tokens::left_bracket(input) {
        generic_func_or_type_inst_args(next(input), id, start_loc)
    } else if let Ok((input, _)) = tokens::left_parenthesis(input) {
        func_or_type_inst_args(next(input), id, vec![], start_loc)
    } else if let Ok((input, _)) = tokens::equal(input) {
        let (input, value) = expr(input)?;
        let (input, end_loc) = position(input)?;
        let var_assign = Node::VarAssign {
            to_assign: Symbol::from(id),
            value: Box::new(value),
        };
        Ok((
            input,
            Ast {
                location: pos_to_loc(input, start_loc, end_loc),
                node: var_assign,
            },
        ))
    } else {
        let (input, end_loc) = position(input)?;
        let var_or_et = Node::VarOrEmptyType(Symbol::from(id));
        Ok((
            input,
            Ast {
                location: pos_to_loc(input, start_loc, end_loc),
                node: var_or_et,
            },
        ))
    }
}

/// func_or_type_inst_args = IDENTIFIER next ':' expr (',' type_inst_arg )* ')'  (* type_instantiation *)
///                  | args                                            (* function_call *)
fn func_or_type_inst_args(
    input: ParseInput,
    id: String,
    generics: Vec<Type>,
    start_loc: Location,
) -> ParseResult<ParseInput, Ast> {
    let (input, first_attr_start_loc) = position(input)?;
    if let Ok((input, first_attr)) =
        terminated(terminated(tokens::identifier, nom_next), tokens::colon)(input)
    {
        let input = next(input);
        let (input, first_attr_val) = expr(input)?;
        let (input, first_attr_end_loc) = position(input)?;
        let (input, mut attrs) = many0(preceded(tokens::comma, type_inst_arg))(input)?;
        let (input, _) = tokens::right_parenthesis(input)?;
        let (input, end_loc) = position(input)?;

        attrs.insert(
            0,
            Ast {
                location: pos_to_loc(input, first_attr_start_loc, first_attr_end_loc),
                node: Node::VarAssign {
                    to_assign: Symbol::from(first_attr),
                    value: Box::new(first_attr_val),
                },
            },
        );

        let type_inst = Node::TypeInstantiation(Call {
            to: Symbol::from(id),
            generics,
            args: attrs,
        });

        Ok((
            input,
            Ast {
                location: pos_to_loc(input, start_loc, end_loc),
                node: type_inst,
            },
        ))
    } else {
        let (input, args) = args(input)?;
        let (input, end_loc) = position(input)?;
        let func_call = Node::FunctionCall(Call {
            to: Symbol::from(id),
            generics,
            args,
        });

        Ok((
            input,
            Ast {
                location: pos_to_loc(input, start_loc, end_loc),
                node: func_call,
            },
        ))
    }
}

fn generic_func_or_type_inst_args(
    input: ParseInput,
    id: String,
    start_loc: Location,
) -> ParseResult<ParseInput, Ast> {
    let (input, generics) = generic_list(input)?;
    let input = next(input);
    let (input, _) = tokens::left_parenthesis(input)?;

    func_or_type_inst_args(next(input), id, generics, start_loc)
}

///
/// ARGS
///

/// args = expr ( ',' expr )* ')'
///      | ')'
fn args(input: ParseInput) -> ParseResult<ParseInput, Vec<Ast>> {
    if let Ok((input, _)) = tokens::right_parenthesis(input) {
        return Ok((input, vec![]));
    }
    let (input, first_arg) = expr(input)?;
    let (input, mut args) = many0(preceded(tokens::comma, expr))(input)?;
    let (input, _) = tokens::right_parenthesis(input)?;

    args.insert(0, first_arg);
    Ok((input, args))
}

/// typed_args = typed_arg ( ',' typed_arg )* ')'
///           | ')'
fn typed_args(input: ParseInput) -> ParseResult<ParseInput, Vec<TypedValue>> {
    if let Ok((input, _)) = tokens::right_parenthesis(input) {
        return Ok((input, vec![]));
    }
    let (input, first_arg) = typed_arg(input)?;
    let (input, mut args) = many0(preceded(tokens::comma, typed_arg))(input)?;
    let (input, _) = tokens::right_parenthesis(input)?;

    args.insert(0, first_arg);
    Ok((input, args))
}

/// typed_arg = spaced_identifier ':' type_id
fn typed_arg(input: ParseInput) -> ParseResult<ParseInput, TypedValue> {
    let (input, (id, (start_loc, _))) = spaced_identifier(input)?;
    let (input, _) = tokens::colon(input)?;
    let (input, ty) = type_id(input)?;
    let (input, end_loc) = position(input)?;
    let input = next(input);

    let dec_arg = TypedValue {
        location: pos_to_loc(input, start_loc, end_loc),
        symbol: Symbol::from(id),
        ty,
    };

    Ok((input, dec_arg))
}

/// type_inst_arg = spaced_identifier ':' expr
fn type_inst_arg(input: ParseInput) -> ParseResult<ParseInput, Ast> {
    let input = next(input);
    let (input, start_loc) = position(input)?;
    let (input, (id, _)) = spaced_identifier(input)?;
    let (input, _) = tokens::colon(input)?;
    let input = next(input);
    let (input, value) = expr(input)?;
    let (input, end_loc) = position(input)?;
    let input = next(input);

    let location = pos_to_loc(input, start_loc, end_loc);
    let node = Node::VarAssign {
        to_assign: Symbol::from(id),
        value: Box::new(value),
    };

    Ok((input, Ast { location, node }))
}

fn spaced_identifier(input: ParseInput) -> ParseResult<ParseInput, (String, (Location, Location))> {
    let input = next(input);
    let (input, start_loc) = position(input)?;
    let (input, id) = tokens::identifier(input)?;
    let (input, end_loc) = position(input)?;
    let input = next(input);

    Ok((input, (id, (start_loc.into(), end_loc.into()))))
}

/// next = extra*
/// extra = WHITESPACE
///       | '/*' [^'*/'] '*/'
///       | '//' [^\n]   '\n'
///       | '#'  [^\n]   '\n'
pub fn next(input: ParseInput) -> ParseInput {
    let input = match multispace0::<_, Error>(input) {
        Ok((input, _)) => input,
        Err(_) => input,
    };

    match tokens::consume_comment(input) {
        Ok((input, _)) => next(input),
        _ => input,
    }
}

fn nom_next(input: ParseInput) -> ParseResult<ParseInput, ()> {
    Ok((next(input), ()))
}

/// Constants are raw values in the source code. For example, `"string"`, `12` and
/// `0.5`.
///
/// `'<any_char>' | "<any_char>*" | <num>? | <num>?.<num>?`
pub(crate) fn constant(input: ParseInput) -> ParseResult<ParseInput, Ast> {
    alt((
        char_constant,
        string_constant,
        float_constant,
        int_constant,
        bool_constant,
    ))(input)
}

pub(crate) fn char_constant(input: ParseInput) -> ParseResult<ParseInput, Ast> {
    let (input, start) = position(input)?;
    let (input, char_value) = tokens::char_constant(input)?;
    let (input, end) = position(input)?;

    Ok((
        input,
        Ast {
            location: pos_to_loc(input, start, end),
            node: Node::Constant(Value::Char(char_value)),
        },
    ))
}

pub(crate) fn string_constant(input: ParseInput) -> ParseResult<ParseInput, Ast> {
    let (input, start_loc) = position(input)?;
    let (input, _) = tokens::double_quote(input)?;
    let (input, inner) = inner_string(input)?;
    let (input, end_loc) = position(input)?;

    Ok((
        input,
        Ast {
            location: pos_to_loc(input, start_loc, end_loc),
            node: Node::Constant(Value::Str(inner)),
        },
    ))
}

/// inner_string = ( '\' CHAR | [^"] )* '"'
fn inner_string(input: ParseInput) -> ParseResult<ParseInput, String> {
    let mut value = String::new();
    let mut chars = input.fragment().char_indices();

    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return Ok((input.slice(idx + 1..), value)),
            '\\' => match chars.next() {
                Some((_, escaped)) => value.push(escape(input, escaped)?),
                None => break,
            },
            c => value.push(c),
        }
    }

    Err(located(input, "undelimited string"))
}

fn escape(input: ParseInput, escaped: char) -> Result<char, nom::Err<Error>> {
    match escaped {
        '"' => Ok('"'),
        '\\' => Ok('\\'),
        'n' => Ok('\n'),
        'r' => Ok('\r'),
        't' => Ok('\t'),
        unknown => Err(located(
            input,
            &format!("unknown character escape: `{unknown}`"),
        )),
    }
}

pub(crate) fn float_constant(input: ParseInput) -> ParseResult<ParseInput, Ast> {
    let (input, start) = position(input)?;
    let (input, value) = tokens::float_constant(input)?;
    let (input, end) = position(input)?;

    Ok((
        input,
        Ast {
            location: pos_to_loc(input, start, end),
            node: Node::Constant(Value::Float(value)),
        },
    ))
}

pub(crate) fn int_constant(input: ParseInput) -> ParseResult<ParseInput, Ast> {
    let (input, start) = position(input)?;
    let (input, value) = tokens::int_constant(input)?;
    let (input, end) = position(input)?;

    Ok((
        input,
        Ast {
            location: pos_to_loc(input, start, end),
            node: Node::Constant(Value::Integer(value)),
        },
    ))
}

pub(crate) fn bool_constant(input: ParseInput) -> ParseResult<ParseInput, Ast> {
    let (input, start) = position(input)?;
    let (input, value) = tokens::bool_constant(input)?;
    let (input, end) = position(input)?;

    Ok((
        input,
        Ast {
            location: pos_to_loc(input, start, end),
            node: Node::Constant(Value::Bool(value)),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span;

    use ast::Node::*;
    use ast::Operator;
    use ast::Value::*;

    #[test]
    fn block_expr() {
        let (_, ast) = expr(span!("{ a }")).unwrap();
        assert!(matches!(
            ast.node,
            Block {
                last_is_expr: true,
                ..
            }
        ));

        let (_, ast) = expr(span!("{ }")).unwrap();
        assert!(matches!(
            ast.node,
            Block {
                last_is_expr: false,
                ..
            }
        ));

        let (_, ast) = expr(span!("{ a; b; c; }")).unwrap();
        assert!(matches!(
            ast.node,
            Block {
                last_is_expr: false,
                ..
            }
        ));

        let (_, ast) = expr(span!("{ a; b; c }")).unwrap();
        assert!(matches!(
            ast.node,
            Block {
                last_is_expr: true,
                ..
            }
        ));
    }

    #[test]
    fn consume_whitespace() {
        assert_eq!(
            nom_next(span!("   input")).map(|(input, _)| *input.fragment()),
            Ok("input")
        );
        assert_eq!(
            nom_next(span!(" \t input")).map(|(input, _)| *input.fragment()),
            Ok("input")
        );
    }

    #[test]
    fn simple_int_sum() {
        let (input, expr) = expr(span!(" 401 + 809 ")).unwrap();

        let (op, lhs, rhs) = match expr.node {
            BinaryOp(op, lhs, rhs) => match (lhs.node, rhs.node) {
                (Constant(Integer(lhs)), Constant(Integer(rhs))) => (op, lhs, rhs),
                _ => unreachable!(),
            },
            _ => unreachable!(),
        };

        assert_eq!(*input.fragment(), "");
        assert_eq!(op, Operator::Add);
        assert_eq!(lhs, 401);
        assert_eq!(rhs, 809);
    }

    #[test]
    fn simple_float_mul() {
        let (input, expr) = expr(span!("3.15 * 9.999")).unwrap();

        let (op, lhs, rhs) = match expr.node {
            BinaryOp(op, lhs, rhs) => match (lhs.node, rhs.node) {
                (Constant(Float(lhs)), Constant(Float(rhs))) => (op, lhs, rhs),
                _ => unreachable!(),
            },
            _ => unreachable!(),
        };

        assert_eq!(*input.fragment(), "");
        assert_eq!(op, Operator::Mul);
        assert_eq!(lhs, 3.15);
        assert_eq!(rhs, 9.999);
    }

    #[test]
    fn math_precedence() {
        let (_, expr) = expr(span!("1 + 2 * 3 == 7")).unwrap();

        let (lhs, rhs) = match expr.node {
            BinaryOp(Operator::Equals, lhs, rhs) => (lhs, rhs),
            _ => unreachable!(),
        };

        assert!(matches!(rhs.node, Constant(Integer(7))));
        assert!(matches!(
            lhs.node,
            BinaryOp(Operator::Add, _, ref mul) if matches!(mul.node, BinaryOp(Operator::Mul, _, _))
        ));
    }

    #[test]
    fn method_call_and_field_access() {
        let (_, expr) = expr(span!("p.inner.describe(1, 2)")).unwrap();

        let (instance, call) = match expr.node {
            MethodCall { instance, call } => (instance, call),
            _ => unreachable!(),
        };

        assert_eq!(call.to, Symbol::from("describe"));
        assert_eq!(call.args.len(), 2);
        assert!(matches!(instance.node, FieldAccess(_, ref f) if f == &Symbol::from("inner")));
    }

    #[test]
    fn function_call_missing_paren() {
        assert!(expr(span!("concat( 'h','e', 'l' , 'l', 'o'")).is_err());
    }

    #[test]
    fn function_call_double_paren() {
        assert!(expr(span!("fn((")).is_err());
    }

    #[test]
    fn multi_comment_multi_line() {
        let input = span!(
            r#"/**
        * This function does nothing
        */
        func void() { }"#
        );

        let (input, expr) = expr(input).unwrap();
        assert!(matches!(expr.node, Function { .. }));

        assert_eq!(*input.fragment(), "");
    }

    #[test]
    fn sing_comment_multi_line() {
        let input = span!(
            r#" // Comment
        func void() { }"#
        );

        let (input, expr) = expr(input).unwrap();
        assert!(matches!(expr.node, Function { .. }));

        assert_eq!(*input.fragment(), "");
    }

    #[test]
    fn hashtag_comment_multi_line() {
        let input = span!(
            r##"# Comment
    func void() { }"##
        );

        let (input, expr) = expr(input).unwrap();
        assert!(matches!(expr.node, Function { .. }));

        assert_eq!(*input.fragment(), "");
    }

    #[test]
    fn comparison_exprs() {
        assert!(expr(span!("a < b")).is_ok());
        assert!(expr(span!("a > b")).is_ok());
        assert!(expr(span!("lhs <= rhs")).is_ok());
        assert!(expr(span!("lhs >= rhs")).is_ok());
        assert!(expr(span!("lhs == rhs")).is_ok());
        assert!(expr(span!("lhs != rhs")).is_ok());
    }

    #[test]
    fn parentheses() {
        let (input, expr) = expr(span!("4 * (3 + 5)")).unwrap();
        assert!(matches!(expr.node, BinaryOp { .. }));

        assert_eq!(*input.fragment(), "");
    }

    #[test]
    fn if_else() {
        let (_, expr) = expr(span!("if a < b { a } else { b }")).unwrap();

        assert!(matches!(
            expr.node,
            IfElse {
                else_block: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn if_no_else() {
        let (_, expr) = expr(span!("if is_done { x = 1; }")).unwrap();

        assert!(matches!(
            expr.node,
            IfElse {
                else_block: None,
                ..
            }
        ));
    }

    #[test]
    fn func_dec_one_generic() {
        let (_, expr) = expr(span!("func id[T](value: T) -> T { value }")).unwrap();

        let decl = match expr.node {
            Function { decl, .. } => decl,
            _ => unreachable!(),
        };

        assert_eq!(decl.generics.len(), 1);
        assert_eq!(decl.generics[0].name, Symbol::from("T"));
        assert_eq!(decl.args[0].ty.name, Symbol::from("T"));
        assert_eq!(
            decl.return_type.map(|ty| ty.name),
            Some(Symbol::from("T"))
        );
    }

    #[test]
    fn func_dec_multiple_generic() {
        assert!(expr(span!("func a[T, U, V]() {}")).is_ok())
    }

    #[test]
    fn func_dec_generic_and_whitespace() {
        assert!(expr(span!("func a[    T]() {}")).is_ok());
        assert!(expr(span!("func a[    T  ]() {}")).is_ok());
        assert!(expr(span!("func a[   T , U    , V]() {}")).is_ok())
    }

    #[test]
    fn func_dec_empty_generic_list() {
        assert!(expr(span!("func a[]() {}")).is_err())
    }

    #[test]
    fn func_dec_no_generic_delimiter() {
        assert!(expr(span!("func a[T, U() {}")).is_err())
    }

    #[test]
    fn func_dec_without_block() {
        assert!(expr(span!("func a(x: int) -> int;")).is_err())
    }

    #[test]
    fn func_call_generics() {
        assert!(expr(span!("fn_call[T]()")).is_ok());
        assert!(expr(span!("fn_call[T, U, V]()")).is_ok());
        assert!(expr(span!("fn_call[T, U, V](a, b, c)")).is_ok());
    }

    #[test]
    fn type_inst_generics_multi_and_args() {
        let (_, expr) = expr(span!("TypeInst[T, U, V](a: 0, b: 1, c: 2)")).unwrap();

        let call = match expr.node {
            TypeInstantiation(call) => call,
            _ => unreachable!(),
        };

        assert_eq!(call.generics.len(), 3);
        assert_eq!(call.args.len(), 3);
        assert!(call
            .args
            .iter()
            .all(|arg| matches!(arg.node, VarAssign { .. })));
    }

    #[test]
    fn empty_type_declaration() {
        let (_, expr) = expr(span!("type CustomType;")).unwrap();

        assert!(matches!(expr.node, Node::Type { ref fields, .. } if fields.is_empty()));
    }

    #[test]
    fn empty_type_instantiation() {
        assert!(expr(span!("a = CustomType;")).is_ok())
    }

    #[test]
    fn generic_type_decl() {
        let (_, expr) = expr(span!("type Generic[T](inner: T);")).unwrap();

        assert!(matches!(
            expr.node,
            Node::Type { ref generics, ref fields, .. } if generics.len() == 1 && fields.len() == 1
        ));
    }

    #[test]
    fn multi_generic_type_decl() {
        assert!(expr(span!(
            "type Generic[T, U, V](inner: T, outer: int, something: W);"
        ))
        .is_ok());
    }

    #[test]
    fn generic_empty_type_decl() {
        assert!(expr(span!("type Generic[T];")).is_ok());
    }

    #[test]
    fn generic_method_call() {
        assert!(expr(span!("expr.call[T, U, V](arg0, arg1)")).is_ok());
        assert!(expr(span!("call[W, Y, Z]().call[T, U, V](arg0, arg1)")).is_ok());
        assert!(expr(span!("value.call[primitive]()")).is_ok());
        assert!(expr(span!("value.call  [primitive]   ()")).is_ok());
    }

    #[test]
    fn type_id_simple() {
        assert!(type_id(span!("int")).is_ok());
        assert!(type_id(span!("Custom")).is_ok());
    }

    #[test]
    fn type_id_generic() {
        let (_, ty) = type_id(span!("Pair[Box[int], string]")).unwrap();

        assert_eq!(ty.generics.len(), 2);
        assert_eq!(ty.generics[0].generics[0].name, Symbol::from("int"));
    }

    #[test]
    fn type_id_unclosed() {
        assert!(type_id(span!("Vec[T")).is_err());
    }

    #[test]
    fn nested_generic_type() {
        assert!(expr(span!("a = Pair[Pair[int], int](a: 15, b: 14)")).is_ok());
    }

    #[test]
    fn assign_call_to_generic_fn() {
        assert!(expr(span!("int_size = size_of[int](15)")).is_ok());
        assert!(expr(span!("int_size = size_of [int] (15)")).is_ok());
    }

    #[test]
    fn nested_declarations_without_semicolons() {
        let input = span!(
            r#"func outer[T](value: T) -> T {
                type Wrapper(inner: T);
                func unwrap(w: Wrapper) -> T {
                    w.inner
                }
                if true { 1 } else { 2 }
                unwrap(Wrapper(inner: value))
            }"#
        );

        let (input, expr) = expr(input).unwrap();
        assert_eq!(*input.fragment(), "");

        let block = match expr.node {
            Function { block, .. } => block,
            _ => unreachable!(),
        };

        assert!(matches!(
            block.node,
            Block { ref stmts, last_is_expr: true } if stmts.len() == 4
        ));
    }

    #[test]
    fn missing_semicolon_between_statements() {
        assert!(expr(span!("{ a b }")).is_err());
    }

    #[test]
    fn empty_string() {
        let input = span!("\"\"");

        let (input, expr) = string_constant(input).unwrap();
        assert_eq!(*input.fragment(), "");
        assert!(matches!(expr.node, Node::Constant(Value::Str(ref s)) if s.is_empty()));
    }

    #[test]
    fn basic_string() {
        let input = span!("\"hello\" + rest");

        let (input, expr) = string_constant(input).unwrap();
        assert_eq!(*input.fragment(), " + rest");
        assert!(matches!(expr.node, Node::Constant(Value::Str(ref s)) if s == "hello"));
    }

    #[test]
    fn escaped_string() {
        let input = span!("\"say \\\"hi\\\"\\n\"");

        let (input, expr) = string_constant(input).unwrap();
        assert_eq!(*input.fragment(), "");
        assert!(matches!(expr.node, Node::Constant(Value::Str(ref s)) if s == "say \"hi\"\n"));
    }

    #[test]
    fn basic_not_delimited() {
        let input = span!("\"Rust Transmute Task Force");

        assert!(string_constant(input).is_err());
    }

    #[test]
    fn escape_unexpected_end_of_string() {
        let input = span!("\"Rust Transmute Task Force\\");

        assert!(string_constant(input).is_err());
    }

    #[test]
    fn invalid_escape() {
        let input = span!("\"Rust Transmute \\a Task Force\"");

        assert!(string_constant(input).is_err());
    }

    #[test]
    fn immutable_declaration() {
        let (_, expr) = expr(span!("where x = 14")).unwrap();

        assert!(matches!(expr.node, VarDeclaration { mutable: false, .. }));
    }

    #[test]
    fn mutable_declaration() {
        let (_, expr) = expr(span!("where mut x = 14")).unwrap();

        assert!(matches!(expr.node, VarDeclaration { mutable: true, .. }));
    }

    #[test]
    fn mutable_declaration_complex() {
        assert!(expr(span!("where mut x = if value { 14 } else { 15 }")).is_ok());
    }

    #[test]
    fn return_nothing_and_something() {
        let (_, ret) = expr(span!("return;")).unwrap();
        assert!(matches!(ret.node, Return(None)));

        let (_, ret) = expr(span!("return a + b")).unwrap();
        assert!(matches!(ret.node, Return(Some(_))));
    }

    #[test]
    fn parse_whole_program() {
        let program = "type Box[T](inner: T);\nfunc id[T](v: T) -> T { v }\nwhere b = Box(inner: id(15));\nb.inner";
        let ast = crate::parse(program, location::Source::Input(program)).unwrap();

        assert!(matches!(ast.node, Block { ref stmts, .. } if stmts.len() == 4));
    }

    #[test]
    fn parse_error_has_location() {
        let program = "func f() {\n    where = 4;\n}";
        let err = crate::parse(program, location::Source::Input(program)).unwrap_err();
        let err = error::Error::from(err);

        assert_eq!(err.kind(), error::ErrKind::Parsing);
        assert!(err.loc().is_some());
    }
}
