use crate::{
    ast::Term,
    parser,
    token::Spanned,
    type_checker::Checker,
    types::Type,
};

/// Interprets a source program: parse, type the original term under an
/// empty context, then reduce to a normal form in a fresh store. An
/// ill-typed program still evaluates; the sentinel type is reported
/// alongside whatever term reduction ends on.
pub fn interpret(src: &str) -> Result<(String, Type), Spanned<parser::Error>> {
    let term = parser::parse(src)?;
    let ty = Checker::new().type_of(&term);
    let normal_form = Interpreter::new().eval(term);
    Ok((render(&normal_form), ty))
}

/// Small-step call-by-value evaluator. Owns the store backing reference
/// cells for the duration of one evaluation.
#[derive(Default)]
pub struct Interpreter {
    store: Vec<Term>,
    /// The type each cell's initial referent had at allocation time.
    /// Assignments do not update this; see [`Checker::with_store_types`].
    store_types: Vec<Type>,
}

impl Interpreter {
    pub fn new() -> Interpreter {
        Interpreter::default()
    }

    pub fn store_types(&self) -> &[Type] {
        &self.store_types
    }

    /// Reduces until no rule applies. Diverging terms make this loop
    /// forever; callers wanting a bound should drive [`Interpreter::step`]
    /// themselves.
    pub fn eval(&mut self, mut term: Term) -> Term {
        loop {
            match self.step(term) {
                Ok(next) => term = next,
                Err(normal_form) => return normal_form,
            }
        }
    }

    /// Performs exactly one rewrite. `Ok` carries the reduct; `Err` hands
    /// the term back unchanged when no rule applies.
    pub fn step(&mut self, term: Term) -> Result<Term, Term> {
        match term {
            Term::App(callee, arg) => match (*callee, *arg) {
                (Term::Lambda { body, .. }, arg) if is_value(&arg) => {
                    let mut body = *body;
                    body.subst_top(arg);
                    Ok(body)
                }
                (callee, arg) if is_value(&callee) => {
                    self.step_in(arg, |arg| Term::app(callee, arg))
                }
                (callee, arg) => self.step_in(callee, |callee| Term::app(callee, arg)),
            },
            Term::If {
                predicate,
                then_arm,
                else_arm,
            } => match *predicate {
                Term::True => Ok(*then_arm),
                Term::False => Ok(*else_arm),
                predicate => self.step_in(predicate, |predicate| {
                    Term::conditional(predicate, *then_arm, *else_arm)
                }),
            },
            Term::Succ(arg) => self.step_in(*arg, Term::succ),
            Term::Pred(arg) => match *arg {
                Term::Zero => Ok(Term::Zero),
                Term::Succ(inner) if is_nat_value(&inner) => Ok(*inner),
                arg => self.step_in(arg, Term::pred),
            },
            Term::IsZero(arg) => match *arg {
                Term::Zero => Ok(Term::True),
                Term::Succ(inner) if is_nat_value(&inner) => Ok(Term::False),
                arg => self.step_in(arg, Term::is_zero),
            },
            Term::Let {
                binding,
                bound,
                body,
            } => {
                if is_value(&bound) {
                    let mut body = *body;
                    body.subst_top(*bound);
                    Ok(body)
                } else {
                    self.step_in(*bound, |bound| Term::let_in(binding, bound, *body))
                }
            }
            Term::Record(mut fields) => {
                // Fields reduce left to right.
                match fields.iter().position(|(_, value)| !is_value(value)) {
                    Some(active) => {
                        let value = std::mem::replace(&mut fields[active].1, Term::Unit);
                        match self.step(value) {
                            Ok(next) => {
                                fields[active].1 = next;
                                Ok(Term::Record(fields))
                            }
                            Err(stuck) => {
                                fields[active].1 = stuck;
                                Err(Term::Record(fields))
                            }
                        }
                    }
                    None => Err(Term::Record(fields)),
                }
            }
            Term::Proj(record, label) => {
                let record = *record;
                if let Term::Record(fields) = &record {
                    if fields.iter().all(|(_, value)| is_value(value)) {
                        match fields.iter().find(|(l, _)| *l == label) {
                            Some((_, value)) => return Ok(value.clone()),
                            None => return Err(Term::proj(record, label)),
                        }
                    }
                }
                self.step_in(record, |record| Term::proj(record, label))
            }
            Term::Ref(init) => {
                let init = *init;
                if is_value(&init) {
                    let cell_ty = Checker::with_store_types(&self.store_types).type_of(&init);
                    let location = self.store.len();
                    self.store.push(init);
                    self.store_types.push(cell_ty);
                    Ok(Term::Loc(location))
                } else {
                    self.step_in(init, Term::reference)
                }
            }
            Term::Deref(loc) => match *loc {
                Term::Loc(location) => match self.store.get(location) {
                    Some(value) => Ok(value.clone()),
                    None => Err(Term::deref(Term::Loc(location))),
                },
                loc => self.step_in(loc, Term::deref),
            },
            Term::Assign(lhs, rhs) => match (*lhs, *rhs) {
                (Term::Loc(location), rhs) if is_value(&rhs) && location < self.store.len() => {
                    self.store[location] = rhs;
                    Ok(Term::Unit)
                }
                (lhs, rhs) if is_value(&lhs) => self.step_in(rhs, |rhs| Term::assign(lhs, rhs)),
                (lhs, rhs) => self.step_in(lhs, |lhs| Term::assign(lhs, rhs)),
            },
            Term::Seq(first, second) => match *first {
                Term::Unit => Ok(*second),
                first => self.step_in(first, |first| Term::seq(first, *second)),
            },
            Term::Fix(generator) => {
                let generator = *generator;
                if let Term::Lambda { body, .. } = &generator {
                    let mut unfolded = (**body).clone();
                    unfolded.subst_top(Term::fix(generator.clone()));
                    return Ok(unfolded);
                }
                self.step_in(generator, Term::fix)
            }
            Term::Paren(inner) => Ok(*inner),
            term => Err(term),
        }
    }

    /// Steps a subterm and rebuilds the enclosing term around the result,
    /// preserving whether progress was made.
    fn step_in(
        &mut self,
        term: Term,
        rebuild: impl FnOnce(Term) -> Term,
    ) -> Result<Term, Term> {
        match self.step(term) {
            Ok(next) => Ok(rebuild(next)),
            Err(stuck) => Err(rebuild(stuck)),
        }
    }
}

/// A value: a lambda, a boolean or unit constant, a natural, a record of
/// values, or a store location.
pub fn is_value(term: &Term) -> bool {
    match term {
        Term::Lambda { .. } | Term::True | Term::False | Term::Unit | Term::Loc(_) => true,
        Term::Record(fields) => fields.iter().all(|(_, value)| is_value(value)),
        _ => is_nat_value(term),
    }
}

pub fn is_nat_value(term: &Term) -> bool {
    match term {
        Term::Zero => true,
        Term::Succ(inner) => is_nat_value(inner),
        _ => false,
    }
}

/// Renders a normal form. Natural values print as decimal numbers;
/// anything else prints in surface syntax.
pub fn render(term: &Term) -> String {
    if is_nat_value(term) {
        let mut n = 0u64;
        let mut current = term;
        while let Term::Succ(inner) = current {
            n += 1;
            current = inner;
        }
        return n.to_string();
    }
    term.to_string()
}
