//! Display the result of monomorphization, either as a listing of the specializations
//! which were created or as genko source code without any generics left.

use colored::Colorize;

use ast::{Ast, Node, TypedValue};
use generics::{original_name, MonoProgram, Specialization};

const INDENT: &str = "    ";

#[derive(Default)]
pub struct MonoDebug {
    header: Option<&'static str>,
    show_bindings: bool,
    show_bodies: bool,
}

fn fmt_type(ty: &ast::Type) -> String {
    match ty.generics.is_empty() {
        true => ty.name.to_string(),
        false => format!(
            "{}[{}]",
            ty.name,
            ty.generics
                .iter()
                .map(fmt_type)
                .collect::<Vec<String>>()
                .join(", ")
        ),
    }
}

fn fmt_typed_values(values: &[TypedValue]) -> String {
    values
        .iter()
        .map(|value| format!("{}: {}", value.symbol, fmt_type(&value.ty)))
        .collect::<Vec<String>>()
        .join(", ")
}

fn fmt_args(args: &[Ast], indent: usize) -> String {
    args.iter()
        .map(|arg| fmt_node(arg, indent))
        .collect::<Vec<String>>()
        .join(", ")
}

fn fmt_generics(generics: &[ast::Type]) -> String {
    match generics.is_empty() {
        true => String::new(),
        false => format!(
            "[{}]",
            generics
                .iter()
                .map(fmt_type)
                .collect::<Vec<String>>()
                .join(", ")
        ),
    }
}

/// Operands which are operations themselves get parenthesized, so that the printed code
/// keeps the structure of the tree
fn fmt_operand(ast: &Ast, indent: usize) -> String {
    match &ast.node {
        Node::BinaryOp(..) => format!("({})", fmt_node(ast, indent)),
        _ => fmt_node(ast, indent),
    }
}

fn needs_semicolon(ast: &Ast) -> bool {
    !matches!(
        ast.node,
        Node::Function { .. } | Node::IfElse { .. } | Node::Block { .. } | Node::Empty
    )
}

fn fmt_block(stmts: &[Ast], last_is_expr: bool, indent: usize) -> String {
    if stmts.is_empty() {
        return String::from("{}");
    }

    let mut s = String::from("{\n");
    for (i, stmt) in stmts.iter().enumerate() {
        let is_last = i + 1 == stmts.len();

        s.push_str(&INDENT.repeat(indent + 1));
        s.push_str(&fmt_node(stmt, indent + 1));
        if needs_semicolon(stmt) && !(is_last && last_is_expr) {
            s.push(';');
        }
        s.push('\n');
    }
    s.push_str(&INDENT.repeat(indent));
    s.push('}');

    s
}

fn fmt_node(ast: &Ast, indent: usize) -> String {
    match &ast.node {
        Node::Block {
            stmts,
            last_is_expr,
        } => fmt_block(stmts, *last_is_expr, indent),
        Node::Function { decl, block } => {
            let generics = match decl.generics.is_empty() {
                true => String::new(),
                false => format!(
                    "[{}]",
                    decl.generics
                        .iter()
                        .map(|generic| generic.name.to_string())
                        .collect::<Vec<String>>()
                        .join(", ")
                ),
            };
            let return_type = decl
                .return_type
                .as_ref()
                .map_or(String::new(), |ty| format!(" -> {}", fmt_type(ty)));

            format!(
                "func {}{generics}({}){return_type} {}",
                decl.name,
                fmt_typed_values(&decl.args),
                fmt_node(block, indent)
            )
        }
        Node::Type { name, fields, .. } => match fields.is_empty() {
            true => format!("type {name}"),
            false => format!("type {name}({})", fmt_typed_values(fields)),
        },
        Node::TypeInstantiation(call) => format!(
            "{}{}({})",
            call.to,
            fmt_generics(&call.generics),
            call.args
                .iter()
                .map(|field| match &field.node {
                    Node::VarAssign { to_assign, value } => {
                        format!("{to_assign}: {}", fmt_node(value, indent))
                    }
                    _ => fmt_node(field, indent),
                })
                .collect::<Vec<String>>()
                .join(", ")
        ),
        Node::FunctionCall(call) => format!(
            "{}{}({})",
            call.to,
            fmt_generics(&call.generics),
            fmt_args(&call.args, indent)
        ),
        Node::MethodCall { instance, call } => format!(
            "{}.{}{}({})",
            fmt_operand(instance, indent),
            call.to,
            fmt_generics(&call.generics),
            fmt_args(&call.args, indent)
        ),
        Node::BinaryOp(op, lhs, rhs) => format!(
            "{} {} {}",
            fmt_operand(lhs, indent),
            op.as_str(),
            fmt_operand(rhs, indent)
        ),
        Node::FieldAccess(instance, field) => {
            format!("{}.{field}", fmt_operand(instance, indent))
        }
        Node::IfElse {
            if_condition,
            if_block,
            else_block,
        } => {
            let mut s = format!(
                "if {} {}",
                fmt_node(if_condition, indent),
                fmt_node(if_block, indent)
            );
            if let Some(else_block) = else_block {
                s.push_str(&format!(" else {}", fmt_node(else_block, indent)));
            }

            s
        }
        Node::VarDeclaration {
            mutable,
            to_declare,
            value,
        } => format!(
            "where {}{to_declare} = {}",
            if *mutable { "mut " } else { "" },
            fmt_node(value, indent)
        ),
        Node::VarAssign { to_assign, value } => {
            format!("{to_assign} = {}", fmt_node(value, indent))
        }
        Node::VarOrEmptyType(name) => name.to_string(),
        Node::Return(value) => match value {
            Some(value) => format!("return {}", fmt_node(value, indent)),
            None => String::from("return"),
        },
        Node::Constant(value) => value.to_string(),
        Node::Empty => String::new(),
    }
}

/// Print a program as source code, one top-level statement per line
pub fn emit(program: &Ast) -> String {
    let stmts = match &program.node {
        Node::Block { stmts, .. } => stmts.as_slice(),
        _ => std::slice::from_ref(program),
    };

    stmts
        .iter()
        .map(|stmt| match needs_semicolon(stmt) {
            true => format!("{};\n", fmt_node(stmt, 0)),
            false => format!("{}\n", fmt_node(stmt, 0)),
        })
        .collect()
}

impl MonoDebug {
    pub fn header(self, header: &'static str) -> MonoDebug {
        MonoDebug {
            header: Some(header),
            ..self
        }
    }

    pub fn show_bindings(self) -> MonoDebug {
        MonoDebug {
            show_bindings: true,
            ..self
        }
    }

    pub fn show_bodies(self) -> MonoDebug {
        MonoDebug {
            show_bodies: true,
            ..self
        }
    }

    fn render_specialization(&self, spec: &Specialization, program: &MonoProgram) -> String {
        let kind = match spec {
            Specialization::Function { .. } => "func".blue(),
            Specialization::Type { .. } => "type".blue(),
        };

        let mut s = format!("{INDENT}{kind} {}", spec.name().green());
        if original_name(spec.name()) != spec.name() {
            s.push_str(&format!(" <- {}", original_name(spec.name()).yellow()));
        }
        if self.show_bindings && !spec.binding().is_empty() {
            s.push_str(&format!(" {}", spec.binding()));
        }
        s.push_str(&format!(
            " ({} {})",
            program.check_count(spec.name()),
            match program.check_count(spec.name()) {
                1 => "check",
                _ => "checks",
            }
        ));

        if let (true, Specialization::Function { block, .. }) = (self.show_bodies, spec) {
            s.push(' ');
            s.push_str(&fmt_node(block, 1));
        }

        s
    }

    pub fn render(&self, program: &MonoProgram) -> String {
        let mut s = format!(
            "{}{}: [\n",
            "Mono".purple(),
            self.header
                .map_or(String::new(), |header| format!(" ({header})"))
        );

        program.specializations().iter().for_each(|spec| {
            s.push_str(&self.render_specialization(spec, program));
            s.push_str(",\n");
        });
        s.push_str("]\n");

        s
    }

    pub fn display(&self, program: &MonoProgram) {
        eprint!("{}", self.render(program));
    }
}
