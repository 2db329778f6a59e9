use crate::{ast::Term, types::Type};

/// The typing context. A binding is pushed when the checker enters a
/// binder and popped on exit; a de Bruijn index addresses the stack from
/// the top.
#[derive(Default)]
struct Context {
    bindings: Vec<(String, Type)>,
}

impl Context {
    fn push(&mut self, name: String, ty: Type) {
        self.bindings.push((name, ty));
    }

    fn pop(&mut self) {
        self.bindings.pop();
    }

    fn get(&self, index: usize) -> Option<&(String, Type)> {
        self.bindings
            .len()
            .checked_sub(index + 1)
            .map(|slot| &self.bindings[slot])
    }
}

/// The type checker. Total: it never fails, it answers [`Type::Ill`]
/// instead, and `Ill` is absorbing through every rule that constrains a
/// premise.
pub struct Checker<'sto> {
    context: Context,
    /// Types of the store cells' initial referents, for re-checking terms
    /// that already contain store locations after partial evaluation.
    store_types: &'sto [Type],
}

impl Checker<'_> {
    pub fn new() -> Checker<'static> {
        Checker {
            context: Context::default(),
            store_types: &[],
        }
    }

    pub fn with_store_types(store_types: &[Type]) -> Checker<'_> {
        Checker {
            context: Context::default(),
            store_types,
        }
    }

    pub fn type_of(&mut self, term: &Term) -> Type {
        match term {
            Term::True | Term::False => Type::Bool,
            Term::Zero => Type::Nat,
            Term::Unit => Type::Unit,
            Term::Succ(arg) | Term::Pred(arg) => match self.type_of(arg) {
                Type::Nat => Type::Nat,
                _ => Type::Ill,
            },
            Term::IsZero(arg) => match self.type_of(arg) {
                Type::Nat => Type::Bool,
                _ => Type::Ill,
            },
            Term::If {
                predicate,
                then_arm,
                else_arm,
            } => {
                if self.type_of(predicate) != Type::Bool {
                    return Type::Ill;
                }
                let then_ty = self.type_of(then_arm);
                let else_ty = self.type_of(else_arm);
                if then_ty.is_ill() || else_ty.is_ill() {
                    return Type::Ill;
                }
                then_ty.join(&else_ty)
            }
            Term::Var { name, index } => match self.context.get(*index) {
                Some((bound_name, ty)) if bound_name == name => ty.clone(),
                _ => Type::Ill,
            },
            Term::Lambda {
                param,
                param_ty,
                body,
            } => {
                self.context.push(param.clone(), param_ty.clone());
                let body_ty = self.type_of(body);
                self.context.pop();
                // An ill-typed body still yields a function type; the
                // sentinel surfaces in the codomain.
                Type::function(param_ty.clone(), body_ty)
            }
            Term::App(callee, arg) => {
                let callee_ty = self.type_of(callee);
                let arg_ty = self.type_of(arg);
                match callee_ty {
                    Type::Function(domain, codomain)
                        if !arg_ty.is_ill() && arg_ty.is_subtype_of(&domain) =>
                    {
                        *codomain
                    }
                    _ => Type::Ill,
                }
            }
            Term::Record(fields) => {
                let mut field_types = Vec::with_capacity(fields.len());
                for (label, value) in fields {
                    let ty = self.type_of(value);
                    if ty.is_ill() {
                        return Type::Ill;
                    }
                    field_types.push((label.clone(), ty));
                }
                Type::Record(field_types)
            }
            Term::Proj(record, label) => match self.type_of(record) {
                Type::Record(fields) => fields
                    .into_iter()
                    .find(|(l, _)| l == label)
                    .map(|(_, ty)| ty)
                    .unwrap_or(Type::Ill),
                _ => Type::Ill,
            },
            Term::Let {
                binding,
                bound,
                body,
            } => {
                let bound_ty = self.type_of(bound);
                if bound_ty.is_ill() {
                    return Type::Ill;
                }
                self.context.push(binding.clone(), bound_ty);
                let body_ty = self.type_of(body);
                self.context.pop();
                body_ty
            }
            Term::Ref(init) => match self.type_of(init) {
                Type::Ill => Type::Ill,
                init_ty => Type::reference(init_ty),
            },
            Term::Deref(loc) => match self.type_of(loc) {
                Type::Reference(inner) => *inner,
                _ => Type::Ill,
            },
            Term::Assign(lhs, rhs) => {
                let lhs_ty = self.type_of(lhs);
                let rhs_ty = self.type_of(rhs);
                match lhs_ty {
                    Type::Reference(cell) if !rhs_ty.is_ill() && rhs_ty.is_subtype_of(&cell) => {
                        Type::Unit
                    }
                    _ => Type::Ill,
                }
            }
            Term::Seq(first, second) => {
                if self.type_of(first) != Type::Unit {
                    return Type::Ill;
                }
                self.type_of(second)
            }
            Term::Fix(generator) => match self.type_of(generator) {
                Type::Function(domain, codomain) if domain == codomain => *codomain,
                _ => Type::Ill,
            },
            Term::Loc(location) => match self.store_types.get(*location) {
                Some(cell) => Type::reference(cell.clone()),
                None => Type::Ill,
            },
            Term::Paren(inner) => self.type_of(inner),
        }
    }
}

impl Default for Checker<'static> {
    fn default() -> Self {
        Checker::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::{ast::Term, parser};

    fn type_of(src: &str) -> Type {
        let term = parser::parse(src).unwrap_or_else(|e| panic!("parse failed for {src:?}: {e:#}"));
        Checker::new().type_of(&term)
    }

    fn func(domain: Type, codomain: Type) -> Type {
        Type::function(domain, codomain)
    }

    fn rec(fields: &[(&str, Type)]) -> Type {
        Type::record(fields.iter().map(|(l, t)| (*l, t.clone())))
    }

    #[track_caller]
    fn assert_types(cases: &[(&str, Type)]) {
        for (src, expected) in cases {
            assert_eq!(type_of(src), *expected, "program: {src}");
        }
    }

    #[test]
    fn constants_and_arithmetic() {
        assert_types(&[
            ("true", Type::Bool),
            ("false", Type::Bool),
            ("0", Type::Nat),
            ("unit", Type::Unit),
            ("succ 0", Type::Nat),
            ("pred 0", Type::Nat),
            ("iszero 0", Type::Bool),
            ("iszero pred 0", Type::Bool),
            ("pred iszero 0", Type::Ill),
            ("succ true", Type::Ill),
        ]);
    }

    #[test]
    fn free_variables_do_not_type() {
        assert_types(&[("x", Type::Ill), ("x y", Type::Ill)]);
    }

    #[test]
    fn lambdas_and_applications() {
        assert_types(&[
            ("(l x:Bool. x)", func(Type::Bool, Type::Bool)),
            ("(l x:Bool. x x)", func(Type::Bool, Type::Ill)),
            ("(l x:Bool. x a)", func(Type::Bool, Type::Ill)),
            (
                "(l x:Bool. l y:Bool. y)",
                func(Type::Bool, func(Type::Bool, Type::Bool)),
            ),
            ("(l x:Bool. x) (l y:Bool. y)", Type::Ill),
            ("(l x:Bool. x) true", Type::Bool),
            (
                "(l x:Bool->Bool. x) (l y:Bool. y)",
                func(Type::Bool, Type::Bool),
            ),
            ("(l x:Bool. x) x", Type::Ill),
            (
                "l x:Bool. (l y:Bool. ((x y) x))",
                func(Type::Bool, func(Type::Bool, Type::Ill)),
            ),
            ("l x:Bool. (l y:Bool. y) x", func(Type::Bool, Type::Bool)),
            (
                "l x:Bool->Bool. l y:Bool. x y",
                func(func(Type::Bool, Type::Bool), func(Type::Bool, Type::Bool)),
            ),
            ("(l z:Bool. l x:Bool. x) (l y:Bool. y)", Type::Ill),
            ("(l x:Nat. pred pred x) succ succ succ 0", Type::Nat),
        ]);
    }

    #[test]
    fn conditionals_join_their_arms() {
        assert_types(&[
            ("if true then true else false", Type::Bool),
            ("if true then 0 else false", Type::Top),
            (
                "if (if true then true else false) then (l y:Bool. y) else (l x:Bool. false)",
                func(Type::Bool, Type::Bool),
            ),
            (
                "if (if true then true else false) then (l y:Bool->Bool. y) else (l x:Bool. false)",
                Type::Ill,
            ),
            ("if (l x:Bool. x) then true else false", Type::Ill),
            (
                "l x:Bool. if true then true else false",
                func(Type::Bool, Type::Bool),
            ),
            ("if true then (l x:Bool. x) true else false", Type::Bool),
        ]);
    }

    #[test]
    fn applications_accept_subtyped_arguments() {
        assert_types(&[
            ("(l r:{x:Nat}. r.x) {x=0, y=true}", Type::Nat),
            ("(l t:Top. t) 0", Type::Top),
            ("(l t:Top. t) (l x:Bool. x)", Type::Top),
            // Top is not a function type, so it cannot be applied.
            ("(l t:Top. t 0) (l x:Nat. x)", Type::Ill),
        ]);
    }

    #[test]
    fn records_and_projections() {
        assert_types(&[
            ("{x=0}", rec(&[("x", Type::Nat)])),
            ("{x=0, y=true}", rec(&[("x", Type::Nat), ("y", Type::Bool)])),
            (
                "{x=0, y=true, z=l x:Bool. x}",
                rec(&[
                    ("x", Type::Nat),
                    ("y", Type::Bool),
                    ("z", func(Type::Bool, Type::Bool)),
                ]),
            ),
            (
                "{x=if true then 0 else pred (succ succ 0)}",
                rec(&[("x", Type::Nat)]),
            ),
            (
                "{x=if true then 0 else iszero 0}",
                rec(&[("x", Type::Top)]),
            ),
            ("{x=succ true}", Type::Ill),
            ("{x=0}.x", Type::Nat),
            ("{x=0}.y", Type::Ill),
            ("{x=0, y=true}.y", Type::Bool),
            ("0.x", Type::Ill),
        ]);
    }

    #[test]
    fn let_bindings() {
        assert_types(&[
            ("let x = true in l y:Nat. x", func(Type::Nat, Type::Bool)),
            (
                "let x = l x:Bool. x in l y:Nat. x",
                func(Type::Nat, func(Type::Bool, Type::Bool)),
            ),
            ("let x = true in l x:Nat. x", func(Type::Nat, Type::Nat)),
            ("(l y:Nat. (let x = y in x)) 0", Type::Nat),
            ("(l y:Nat. (let x = succ y in x)) 0", Type::Nat),
            ("(l y:Nat. (let x = succ y in succ x)) 0", Type::Nat),
            ("(l y:Nat. (let x = succ false in succ x)) 0", Type::Ill),
        ]);
    }

    #[test]
    fn reference_types() {
        assert_types(&[
            (
                "l x:Ref Bool. x",
                func(Type::reference(Type::Bool), Type::reference(Type::Bool)),
            ),
            (
                "l x:Ref Ref Bool. x",
                func(
                    Type::reference(Type::reference(Type::Bool)),
                    Type::reference(Type::reference(Type::Bool)),
                ),
            ),
            ("l x:Unit. x", func(Type::Unit, Type::Unit)),
            ("(l x:Unit. x) unit", Type::Unit),
            ("ref 0", Type::reference(Type::Nat)),
            ("ref succ true", Type::Ill),
            ("let x = ref 0 in x := succ 0", Type::Unit),
            ("let x = ref 0 in x := true", Type::Ill),
            ("let x = ref 0 in !x", Type::Nat),
            ("l x:Ref Bool. !x", func(Type::reference(Type::Bool), Type::Bool)),
            ("l x:Bool. ref x", func(Type::Bool, Type::reference(Type::Bool))),
            ("(l x:Nat. ref x) 0", Type::reference(Type::Nat)),
            ("!ref l x:Nat. x", func(Type::Nat, Type::Nat)),
            (
                "!ref l x:Nat. !ref l y:Bool. y",
                func(Type::Nat, func(Type::Bool, Type::Bool)),
            ),
            ("!0", Type::Ill),
            ("0 := succ 0", Type::Ill),
        ]);
    }

    #[test]
    fn assignment_uses_subtyping_on_the_written_value() {
        assert_types(&[
            (
                "let x = ref {a=0, b=false} in ((l y:Unit. ((!x).a)) (x := {a=succ 0, b=false}))",
                Type::Nat,
            ),
            // Field order is irrelevant on the written record.
            (
                "let x = ref {a=0, b=false} in ((l y:Unit. ((!x).a)) (x := {b=false, a=succ 0}))",
                Type::Nat,
            ),
            // A missing field is not.
            (
                "let x = ref {a=0, b=false} in ((l y:Unit. ((!x).a)) (x := {a=succ 0, c=false}))",
                Type::Ill,
            ),
        ]);
    }

    #[test]
    fn sequencing_requires_unit_on_the_left() {
        assert_types(&[
            ("(x := succ (!x)); !x", Type::Ill),
            ("let x = ref 0 in (x := succ (!x)); !x", Type::Nat),
            (
                "let x = ref 0 in (x := succ (!x)); (x := succ (!x)); !x",
                Type::Nat,
            ),
            ("0; true", Type::Ill),
            ("unit; 0", Type::Nat),
        ]);
    }

    #[test]
    fn fix_requires_an_endofunction() {
        assert_types(&[
            (
                "fix l ie:Nat->Bool. l x:Nat. if iszero x then true else \
                 if iszero (pred x) then false else (ie (pred (pred x)))",
                func(Type::Nat, Type::Bool),
            ),
            ("fix l x:Nat. succ x", Type::Nat),
            ("fix (l x:Nat. true)", Type::Ill),
            ("fix 0", Type::Ill),
        ]);
    }

    #[test]
    fn store_locations_type_through_the_store_typing() {
        let store_types = [Type::Nat, Type::Bool];
        let mut checker = Checker::with_store_types(&store_types);

        assert_eq!(checker.type_of(&Term::Loc(0)), Type::reference(Type::Nat));
        assert_eq!(
            checker.type_of(&Term::deref(Term::Loc(1))),
            Type::Bool
        );
        assert_eq!(
            checker.type_of(&Term::assign(Term::Loc(0), Term::succ(Term::Zero))),
            Type::Unit
        );
        // Unknown locations are ill-typed rather than a panic.
        assert_eq!(checker.type_of(&Term::Loc(7)), Type::Ill);
    }

    #[test]
    fn variable_lookup_requires_a_matching_name() {
        // A variable whose index points at a binder with a different name
        // indicates a malformed term and must not type.
        let term = Term::lambda("x", Type::Bool, Term::var("y", 0));
        assert_eq!(
            Checker::new().type_of(&term),
            Type::function(Type::Bool, Type::Ill)
        );
    }
}
