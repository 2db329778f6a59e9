// statement ::= term
// term ::= assign (';' term)?
// assign ::= appseq (':=' appseq)?
// appseq ::= unary unary*
// unary ::= prefix ('.' ID)*
// prefix ::= ('!' | 'ref' | 'fix' | 'succ' | 'pred' | 'iszero') unary
//          | atom
// atom ::= '0' | 'true' | 'false' | 'unit'
//        | 'if' term 'then' term 'else' term
//        | 'let' ID '=' term 'in' term
//        | 'l' ID ':' type '.' term
//        | '{' ID '=' term (',' ID '=' term)* '}'
//        | ID
//        | '(' term ')'
// type ::= tatom ('->' type)?
// tatom ::= 'Bool' | 'Nat' | 'Unit' | 'Top'
//         | 'Ref' tatom
//         | '(' type ')'
//         | '{' ID ':' type (',' ID ':' type)* '}'

// Precedence, tightest first
//
// .
// ! ref fix succ pred iszero
// application (juxtaposition)
// :=
// ;

use std::fmt;

use crate::types::Type;

/// A term in de Bruijn representation. Bound variables carry the distance
/// to their binder; names are kept only for printing.
#[derive(Clone, Debug)]
pub enum Term {
    True,
    False,
    Zero,
    Unit,
    Succ(Box<Term>),
    Pred(Box<Term>),
    IsZero(Box<Term>),
    If {
        predicate: Box<Term>,
        then_arm: Box<Term>,
        else_arm: Box<Term>,
    },
    Var {
        name: String,
        index: usize,
    },
    Lambda {
        param: String,
        param_ty: Type,
        body: Box<Term>,
    },
    App(Box<Term>, Box<Term>),
    Record(Vec<(String, Term)>),
    Proj(Box<Term>, String),
    Let {
        binding: String,
        bound: Box<Term>,
        body: Box<Term>,
    },
    Ref(Box<Term>),
    Deref(Box<Term>),
    Assign(Box<Term>, Box<Term>),
    Seq(Box<Term>, Box<Term>),
    Fix(Box<Term>),
    /// A store location. Never produced by the parser; the evaluator
    /// creates these when reducing `ref`.
    Loc(usize),
    /// Preserved so that unreduced terms print the way they were written.
    Paren(Box<Term>),
}

impl Term {
    pub fn var(name: impl Into<String>, index: usize) -> Term {
        Term::Var {
            name: name.into(),
            index,
        }
    }

    pub fn lambda(param: impl Into<String>, param_ty: Type, body: Term) -> Term {
        Term::Lambda {
            param: param.into(),
            param_ty,
            body: Box::new(body),
        }
    }

    pub fn app(callee: Term, arg: Term) -> Term {
        Term::App(Box::new(callee), Box::new(arg))
    }

    pub fn conditional(predicate: Term, then_arm: Term, else_arm: Term) -> Term {
        Term::If {
            predicate: Box::new(predicate),
            then_arm: Box::new(then_arm),
            else_arm: Box::new(else_arm),
        }
    }

    pub fn succ(arg: Term) -> Term {
        Term::Succ(Box::new(arg))
    }

    pub fn pred(arg: Term) -> Term {
        Term::Pred(Box::new(arg))
    }

    pub fn is_zero(arg: Term) -> Term {
        Term::IsZero(Box::new(arg))
    }

    pub fn record<L: Into<String>>(fields: impl IntoIterator<Item = (L, Term)>) -> Term {
        Term::Record(
            fields
                .into_iter()
                .map(|(label, value)| (label.into(), value))
                .collect(),
        )
    }

    pub fn proj(record: Term, label: impl Into<String>) -> Term {
        Term::Proj(Box::new(record), label.into())
    }

    pub fn let_in(binding: impl Into<String>, bound: Term, body: Term) -> Term {
        Term::Let {
            binding: binding.into(),
            bound: Box::new(bound),
            body: Box::new(body),
        }
    }

    pub fn reference(init: Term) -> Term {
        Term::Ref(Box::new(init))
    }

    pub fn deref(loc: Term) -> Term {
        Term::Deref(Box::new(loc))
    }

    pub fn assign(lhs: Term, rhs: Term) -> Term {
        Term::Assign(Box::new(lhs), Box::new(rhs))
    }

    pub fn seq(first: Term, second: Term) -> Term {
        Term::Seq(Box::new(first), Box::new(second))
    }

    pub fn fix(generator: Term) -> Term {
        Term::Fix(Box::new(generator))
    }

    pub fn paren(inner: Term) -> Term {
        Term::Paren(Box::new(inner))
    }
}

impl Term {
    /// Shifts the de Bruijn index of every free variable by `distance`.
    pub fn shift(&mut self, distance: isize) {
        self.shift_above(distance, 0);
    }

    // A variable is free at a given depth when its index reaches past the
    // binders walked so far; `cutoff` tracks that count.
    fn shift_above(&mut self, distance: isize, cutoff: usize) {
        match self {
            Term::Var { index, .. } => {
                if *index >= cutoff {
                    *index = (*index as isize + distance) as usize;
                }
            }
            Term::Lambda { body, .. } => body.shift_above(distance, cutoff + 1),
            Term::Let { bound, body, .. } => {
                bound.shift_above(distance, cutoff);
                body.shift_above(distance, cutoff + 1);
            }
            Term::If {
                predicate,
                then_arm,
                else_arm,
            } => {
                predicate.shift_above(distance, cutoff);
                then_arm.shift_above(distance, cutoff);
                else_arm.shift_above(distance, cutoff);
            }
            Term::App(callee, arg) => {
                callee.shift_above(distance, cutoff);
                arg.shift_above(distance, cutoff);
            }
            Term::Assign(lhs, rhs) | Term::Seq(lhs, rhs) => {
                lhs.shift_above(distance, cutoff);
                rhs.shift_above(distance, cutoff);
            }
            Term::Record(fields) => {
                for (_, value) in fields {
                    value.shift_above(distance, cutoff);
                }
            }
            Term::Succ(arg)
            | Term::Pred(arg)
            | Term::IsZero(arg)
            | Term::Ref(arg)
            | Term::Deref(arg)
            | Term::Fix(arg)
            | Term::Paren(arg) => arg.shift_above(distance, cutoff),
            Term::Proj(record, _) => record.shift_above(distance, cutoff),
            Term::True | Term::False | Term::Zero | Term::Unit | Term::Loc(_) => {}
        }
    }

    /// Replaces every free occurrence of variable `target` with `sub`,
    /// shifting `sub` by the binder depth at each occurrence.
    pub fn substitute(&mut self, target: usize, sub: &Term) {
        self.substitute_at(target, sub, 0);
    }

    fn substitute_at(&mut self, target: usize, sub: &Term, depth: usize) {
        match self {
            Term::Var { index, .. } if *index == target + depth => {
                let mut replacement = sub.clone();
                replacement.shift(depth as isize);
                *self = replacement;
            }
            Term::Var { .. } => {}
            Term::Lambda { body, .. } => body.substitute_at(target, sub, depth + 1),
            Term::Let { bound, body, .. } => {
                bound.substitute_at(target, sub, depth);
                body.substitute_at(target, sub, depth + 1);
            }
            Term::If {
                predicate,
                then_arm,
                else_arm,
            } => {
                predicate.substitute_at(target, sub, depth);
                then_arm.substitute_at(target, sub, depth);
                else_arm.substitute_at(target, sub, depth);
            }
            Term::App(callee, arg) => {
                callee.substitute_at(target, sub, depth);
                arg.substitute_at(target, sub, depth);
            }
            Term::Assign(lhs, rhs) | Term::Seq(lhs, rhs) => {
                lhs.substitute_at(target, sub, depth);
                rhs.substitute_at(target, sub, depth);
            }
            Term::Record(fields) => {
                for (_, value) in fields {
                    value.substitute_at(target, sub, depth);
                }
            }
            Term::Succ(arg)
            | Term::Pred(arg)
            | Term::IsZero(arg)
            | Term::Ref(arg)
            | Term::Deref(arg)
            | Term::Fix(arg)
            | Term::Paren(arg) => arg.substitute_at(target, sub, depth),
            Term::Proj(record, _) => record.substitute_at(target, sub, depth),
            Term::True | Term::False | Term::Zero | Term::Unit | Term::Loc(_) => {}
        }
    }

    /// Top-level substitution used by beta-reduction and by `let`/`fix`
    /// unfolding: `self` is a binder body whose bound variable (index 0)
    /// is replaced by `sub`, peeling one level of abstraction.
    pub fn subst_top(&mut self, mut sub: Term) {
        sub.shift(1);
        self.substitute(0, &sub);
        self.shift(-1);
    }
}

// Variables compare by de Bruijn index, not name, and binder names are
// ignored; everything else is positional and structural.
impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        use Term::*;
        match (self, other) {
            (True, True) | (False, False) | (Zero, Zero) | (Unit, Unit) => true,
            (Succ(a), Succ(b)) | (Pred(a), Pred(b)) | (IsZero(a), IsZero(b)) => a == b,
            (
                If {
                    predicate: p1,
                    then_arm: t1,
                    else_arm: e1,
                },
                If {
                    predicate: p2,
                    then_arm: t2,
                    else_arm: e2,
                },
            ) => p1 == p2 && t1 == t2 && e1 == e2,
            (Var { index: a, .. }, Var { index: b, .. }) => a == b,
            (
                Lambda {
                    param_ty: ty1,
                    body: b1,
                    ..
                },
                Lambda {
                    param_ty: ty2,
                    body: b2,
                    ..
                },
            ) => ty1 == ty2 && b1 == b2,
            (App(f1, a1), App(f2, a2)) => f1 == f2 && a1 == a2,
            (Record(a), Record(b)) => a == b,
            (Proj(r1, l1), Proj(r2, l2)) => r1 == r2 && l1 == l2,
            (
                Let {
                    bound: e1, body: b1, ..
                },
                Let {
                    bound: e2, body: b2, ..
                },
            ) => e1 == e2 && b1 == b2,
            (Ref(a), Ref(b)) | (Deref(a), Deref(b)) | (Fix(a), Fix(b)) | (Paren(a), Paren(b)) => {
                a == b
            }
            (Assign(l1, r1), Assign(l2, r2)) | (Seq(l1, r1), Seq(l2, r2)) => l1 == l2 && r1 == r2,
            (Loc(a), Loc(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Term {}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::True => f.write_str("true"),
            Term::False => f.write_str("false"),
            Term::Zero => f.write_str("0"),
            Term::Unit => f.write_str("unit"),
            Term::Succ(arg) => write!(f, "succ {arg}"),
            Term::Pred(arg) => write!(f, "pred {arg}"),
            Term::IsZero(arg) => write!(f, "iszero {arg}"),
            Term::If {
                predicate,
                then_arm,
                else_arm,
            } => write!(f, "if {predicate} then {then_arm} else {else_arm}"),
            Term::Var { name, .. } => f.write_str(name),
            Term::Lambda {
                param,
                param_ty,
                body,
            } => write!(f, "{{l {param} : {param_ty}. {body}}}"),
            Term::App(callee, arg) => write!(f, "({callee} <- {arg})"),
            Term::Record(fields) => {
                f.write_str("{")?;
                for (i, (label, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{label}={value}")?;
                }
                f.write_str("}")
            }
            Term::Proj(record, label) => write!(f, "{record}.{label}"),
            Term::Let {
                binding,
                bound,
                body,
            } => write!(f, "let {binding} = {bound} in {body}"),
            Term::Ref(init) => write!(f, "ref {init}"),
            Term::Deref(loc) => write!(f, "!{loc}"),
            Term::Assign(lhs, rhs) => write!(f, "{lhs} := {rhs}"),
            Term::Seq(first, second) => write!(f, "{first}; {second}"),
            Term::Fix(generator) => write!(f, "fix {generator}"),
            Term::Loc(location) => write!(f, "l[{location}]"),
            Term::Paren(inner) => write!(f, "({inner})"),
        }
    }
}
