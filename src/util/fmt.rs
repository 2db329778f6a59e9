use crate::ast::Term;
use std::io::Write;

const INDENT_WIDTH: usize = 2;

fn sp(w: &mut impl Write, i: usize) -> std::io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}

pub fn print_term_string(term: &Term) -> String {
    let mut buf = Vec::with_capacity(512);
    print_term(&mut buf, 0, term).unwrap();
    String::from_utf8(buf).unwrap()
}

/// Prints a term as an indented tree, one node per line. Variables show
/// their de Bruijn index next to the printing name.
pub fn print_term(w: &mut impl Write, i: usize, term: &Term) -> std::io::Result<()> {
    sp(w, i)?;
    match term {
        Term::True => writeln!(w, "true"),
        Term::False => writeln!(w, "false"),
        Term::Zero => writeln!(w, "zero"),
        Term::Unit => writeln!(w, "unit"),
        Term::Succ(arg) => {
            writeln!(w, "succ")?;
            print_term(w, i + 1, arg)
        }
        Term::Pred(arg) => {
            writeln!(w, "pred")?;
            print_term(w, i + 1, arg)
        }
        Term::IsZero(arg) => {
            writeln!(w, "iszero")?;
            print_term(w, i + 1, arg)
        }
        Term::If {
            predicate,
            then_arm,
            else_arm,
        } => {
            writeln!(w, "conditional")?;
            print_term(w, i + 1, predicate)?;
            print_term(w, i + 1, then_arm)?;
            print_term(w, i + 1, else_arm)
        }
        Term::Var { name, index } => writeln!(w, "var {name}[{index}]"),
        Term::Lambda {
            param,
            param_ty,
            body,
        } => {
            writeln!(w, "lambda {param} : {param_ty}")?;
            print_term(w, i + 1, body)
        }
        Term::App(callee, arg) => {
            writeln!(w, "apply")?;
            print_term(w, i + 1, callee)?;
            print_term(w, i + 1, arg)
        }
        Term::Record(fields) => {
            writeln!(w, "record")?;
            for (label, value) in fields {
                sp(w, i + 1)?;
                writeln!(w, "field {label}")?;
                print_term(w, i + 2, value)?;
            }
            Ok(())
        }
        Term::Proj(record, label) => {
            writeln!(w, "proj .{label}")?;
            print_term(w, i + 1, record)
        }
        Term::Let { binding, bound, body } => {
            writeln!(w, "let {binding}")?;
            print_term(w, i + 1, bound)?;
            print_term(w, i + 1, body)
        }
        Term::Ref(init) => {
            writeln!(w, "ref")?;
            print_term(w, i + 1, init)
        }
        Term::Deref(loc) => {
            writeln!(w, "deref")?;
            print_term(w, i + 1, loc)
        }
        Term::Assign(lhs, rhs) => {
            writeln!(w, "assign")?;
            print_term(w, i + 1, lhs)?;
            print_term(w, i + 1, rhs)
        }
        Term::Seq(first, second) => {
            writeln!(w, "seq")?;
            print_term(w, i + 1, first)?;
            print_term(w, i + 1, second)
        }
        Term::Fix(generator) => {
            writeln!(w, "fix")?;
            print_term(w, i + 1, generator)
        }
        Term::Loc(location) => writeln!(w, "loc[{location}]"),
        Term::Paren(inner) => {
            writeln!(w, "paren")?;
            print_term(w, i + 1, inner)
        }
    }
}
