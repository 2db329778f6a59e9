use std::fmt;

/// A structural type. Two types are equal exactly when their components
/// are; record equality compares label-type pairs positionally, while the
/// subtype relation treats records as unordered sets of labelled fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Bool,
    Nat,
    Unit,
    /// The universal supertype.
    Top,
    /// Sentinel for terms that fail to type. The checker is total and
    /// propagates this value instead of raising an error.
    Ill,
    Function(Box<Type>, Box<Type>),
    Record(Vec<(String, Type)>),
    Reference(Box<Type>),
}

impl Type {
    pub fn function(domain: Type, codomain: Type) -> Type {
        Type::Function(Box::new(domain), Box::new(codomain))
    }

    pub fn record<L: Into<String>>(fields: impl IntoIterator<Item = (L, Type)>) -> Type {
        Type::Record(
            fields
                .into_iter()
                .map(|(label, ty)| (label.into(), ty))
                .collect(),
        )
    }

    pub fn reference(inner: Type) -> Type {
        Type::Reference(Box::new(inner))
    }

    pub fn is_ill(&self) -> bool {
        *self == Type::Ill
    }

    /// The subtype relation `self <: other`.
    ///
    /// Functions are contravariant in the domain and covariant in the
    /// codomain. Records admit width, depth and permutation subtyping.
    /// References are invariant, which the structural equality fast path
    /// already covers.
    pub fn is_subtype_of(&self, other: &Type) -> bool {
        if self == other {
            return true;
        }
        match (self, other) {
            (_, Type::Top) => true,
            (Type::Function(s_dom, s_cod), Type::Function(t_dom, t_cod)) => {
                t_dom.is_subtype_of(s_dom) && s_cod.is_subtype_of(t_cod)
            }
            (Type::Record(sub), Type::Record(sup)) => sup.iter().all(|(label, t)| {
                sub.iter()
                    .any(|(l, s)| l == label && s.is_subtype_of(t))
            }),
            _ => false,
        }
    }

    /// The least common supertype `self v other`.
    pub fn join(&self, other: &Type) -> Type {
        if self.is_ill() || other.is_ill() {
            return Type::Ill;
        }
        if self == other {
            return self.clone();
        }
        match (self, other) {
            (Type::Function(s_dom, s_cod), Type::Function(t_dom, t_cod)) => {
                match s_dom.meet(t_dom) {
                    Some(domain) => Type::function(domain, s_cod.join(t_cod)),
                    None => Type::Ill,
                }
            }
            (Type::Record(s_fields), Type::Record(t_fields)) => {
                // Joining keeps the labels common to both sides; a shared
                // label whose field join fails is dropped instead of
                // poisoning the whole record.
                let fields = s_fields
                    .iter()
                    .filter_map(|(label, s)| {
                        let (_, t) = t_fields.iter().find(|(l, _)| l == label)?;
                        match s.join(t) {
                            Type::Ill => None,
                            joined => Some((label.clone(), joined)),
                        }
                    })
                    .collect();
                Type::Record(fields)
            }
            _ => Type::Top,
        }
    }

    /// The greatest common subtype `self ^ other`, used on function domains
    /// when joining. Not every pair of types has one.
    pub fn meet(&self, other: &Type) -> Option<Type> {
        if self == other {
            return Some(self.clone());
        }
        match (self, other) {
            (Type::Top, t) | (t, Type::Top) => Some(t.clone()),
            (Type::Function(s_dom, s_cod), Type::Function(t_dom, t_cod)) => {
                Some(Type::function(s_dom.join(t_dom), s_cod.meet(t_cod)?))
            }
            (Type::Record(s_fields), Type::Record(t_fields)) => {
                // The meet of two records is the union of their fields.
                let mut fields = Vec::with_capacity(s_fields.len() + t_fields.len());
                for (label, s) in s_fields {
                    match t_fields.iter().find(|(l, _)| l == label) {
                        Some((_, t)) => fields.push((label.clone(), s.meet(t)?)),
                        None => fields.push((label.clone(), s.clone())),
                    }
                }
                for (label, t) in t_fields {
                    if !s_fields.iter().any(|(l, _)| l == label) {
                        fields.push((label.clone(), t.clone()));
                    }
                }
                Some(Type::Record(fields))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("Bool"),
            Type::Nat => f.write_str("Nat"),
            Type::Unit => f.write_str("Unit"),
            Type::Top => f.write_str("Top"),
            Type::Ill => f.write_str("<ill-typed>"),
            Type::Function(domain, codomain) => write!(f, "({domain} -> {codomain})"),
            Type::Record(fields) => {
                f.write_str("{")?;
                for (i, (label, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{label}:{ty}")?;
                }
                f.write_str("}")
            }
            Type::Reference(inner) => write!(f, "Ref {inner}"),
        }
    }
}
