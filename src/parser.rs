use std::fmt;

use crate::{
    ast::Term,
    lexer,
    token::{Span, Spanned, Token, TokenKind},
    types::Type,
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Parses a whole source string into a single term.
pub fn parse(src: &str) -> Result<Term> {
    let tokens = lexer::lex(src);
    Parser::new(&tokens).parse_statement()
}

pub struct Parser<'tok> {
    tokens: &'tok [Token],
    cursor: usize,
    /// Names of the binders enclosing the current position, innermost
    /// last. Drives de Bruijn resolution.
    bound: Vec<String>,
}

impl Parser<'_> {
    pub fn parse_statement(&mut self) -> Result<Term> {
        let term = self.parse_term()?;
        self.consume(TokenKind::Eof)?;
        Ok(term)
    }

    fn parse_term(&mut self) -> Result<Term> {
        let first = self.parse_assign()?;
        if self.eat(TokenKind::Semicolon) {
            let second = self.parse_term()?;
            return Ok(Term::seq(first, second));
        }
        Ok(first)
    }

    fn parse_assign(&mut self) -> Result<Term> {
        let lhs = self.parse_app_seq()?;
        if self.eat(TokenKind::ColonEq) {
            let rhs = self.parse_app_seq()?;
            return Ok(Term::assign(lhs, rhs));
        }
        Ok(lhs)
    }

    // Application is juxtaposition: keep absorbing operands for as long as
    // the next token can start one.
    fn parse_app_seq(&mut self) -> Result<Term> {
        let mut term = self.parse_unary()?;
        while self.starts_term() {
            let arg = self.parse_unary()?;
            term = Term::app(term, arg);
        }
        Ok(term)
    }

    fn starts_term(&self) -> bool {
        use TokenKind::*;
        matches!(
            self.peek().kind,
            Bang | Ref
                | Fix
                | Succ
                | Pred
                | IsZero
                | Zero
                | True
                | False
                | Unit
                | If
                | Let
                | Lambda
                | LBrace
                | LParen
                | Identifier(_)
        )
    }

    fn parse_unary(&mut self) -> Result<Term> {
        use TokenKind::*;
        let mut term = match self.peek().kind.clone() {
            Bang => {
                self.advance();
                Term::deref(self.parse_unary()?)
            }
            Ref => {
                self.advance();
                Term::reference(self.parse_unary()?)
            }
            Fix => {
                self.advance();
                Term::fix(self.parse_unary()?)
            }
            Succ => {
                self.advance();
                Term::succ(self.parse_unary()?)
            }
            Pred => {
                self.advance();
                Term::pred(self.parse_unary()?)
            }
            IsZero => {
                self.advance();
                Term::is_zero(self.parse_unary()?)
            }
            _ => self.parse_atom()?,
        };
        while self.eat(Dot) {
            let label = self.parse_ident()?;
            term = Term::proj(term, label);
        }
        Ok(term)
    }

    fn parse_atom(&mut self) -> Result<Term> {
        use TokenKind::*;
        let token = self.peek().clone();
        let span = token.span();
        match token.kind {
            Zero => {
                self.advance();
                Ok(Term::Zero)
            }
            True => {
                self.advance();
                Ok(Term::True)
            }
            False => {
                self.advance();
                Ok(Term::False)
            }
            Unit => {
                self.advance();
                Ok(Term::Unit)
            }
            If => {
                self.advance();
                let predicate = self.parse_term()?;
                self.consume(Then)?;
                let then_arm = self.parse_term()?;
                self.consume(Else)?;
                let else_arm = self.parse_term()?;
                Ok(Term::conditional(predicate, then_arm, else_arm))
            }
            Let => {
                self.advance();
                let binding = self.parse_ident()?;
                self.consume(Equal)?;
                let bound = self.parse_term()?;
                self.consume(In)?;
                self.bound.push(binding.clone());
                let body = self.parse_term();
                self.bound.pop();
                Ok(Term::let_in(binding, bound, body?))
            }
            Lambda => {
                self.advance();
                let param = self.parse_ident()?;
                self.consume(Colon)?;
                let param_ty = self.parse_type()?;
                self.consume(Dot)?;
                self.bound.push(param.clone());
                // The body extends as far right as possible.
                let body = self.parse_term();
                self.bound.pop();
                Ok(Term::lambda(param, param_ty, body?))
            }
            LBrace => self.parse_record(),
            LParen => {
                self.advance();
                let inner = self.parse_term()?;
                self.consume(RParen)?;
                Ok(Term::paren(inner))
            }
            Identifier(name) => {
                self.advance();
                self.resolve_variable(name, span)
            }
            got => Err(span.wrap(Error::UnexpectedToken { got })),
        }
    }

    fn parse_record(&mut self) -> Result<Term> {
        self.consume(TokenKind::LBrace)?;
        if self.peek().kind == TokenKind::RBrace {
            return Err(self.peek().span().wrap(Error::EmptyRecord));
        }
        let mut fields: Vec<(String, Term)> = Vec::with_capacity(4);
        loop {
            let label_span = self.peek().span();
            let label = self.parse_ident()?;
            if fields.iter().any(|(l, _)| *l == label) {
                return Err(label_span.wrap(Error::DuplicateLabel { label }));
            }
            self.consume(TokenKind::Equal)?;
            let value = self.parse_term()?;
            fields.push((label, value));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::RBrace)?;
        Ok(Term::Record(fields))
    }

    /// Resolves an identifier: the innermost matching binder wins. An
    /// unbound identifier is a free variable indexed by its initial into
    /// the naming context past the bound ones; only single-letter names
    /// are accepted there.
    fn resolve_variable(&mut self, name: String, span: Span) -> Result<Term> {
        if let Some(position) = self.bound.iter().rposition(|bound| *bound == name) {
            let index = self.bound.len() - 1 - position;
            return Ok(Term::var(name, index));
        }

        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(initial), None) if initial.is_ascii_alphabetic() => {
                let index =
                    self.bound.len() + (initial.to_ascii_lowercase() as usize - 'a' as usize);
                Ok(Term::var(name, index))
            }
            _ => Err(span.wrap(Error::UnboundIdentifier { name })),
        }
    }

    fn parse_type(&mut self) -> Result<Type> {
        let lhs = self.parse_type_atom()?;
        // One token of lookahead decides between an arrow and the many
        // tokens that may legally follow a type (`.`, `)`, `}`, `,`).
        let token = self.advance();
        if token.kind == TokenKind::Arrow {
            let rhs = self.parse_type()?;
            return Ok(Type::function(lhs, rhs));
        }
        self.put_back();
        Ok(lhs)
    }

    fn parse_type_atom(&mut self) -> Result<Type> {
        use TokenKind::*;
        let token = self.peek().clone();
        let span = token.span();
        match token.kind {
            Bool => {
                self.advance();
                Ok(Type::Bool)
            }
            Nat => {
                self.advance();
                Ok(Type::Nat)
            }
            UnitType => {
                self.advance();
                Ok(Type::Unit)
            }
            Top => {
                self.advance();
                Ok(Type::Top)
            }
            RefType => {
                self.advance();
                Ok(Type::reference(self.parse_type_atom()?))
            }
            LParen => {
                self.advance();
                let ty = self.parse_type()?;
                self.consume(RParen)?;
                Ok(ty)
            }
            LBrace => self.parse_record_type(),
            got => Err(span.wrap(Error::UnexpectedToken { got })),
        }
    }

    fn parse_record_type(&mut self) -> Result<Type> {
        self.consume(TokenKind::LBrace)?;
        if self.peek().kind == TokenKind::RBrace {
            return Err(self.peek().span().wrap(Error::EmptyRecord));
        }
        let mut fields: Vec<(String, Type)> = Vec::with_capacity(4);
        loop {
            let label_span = self.peek().span();
            let label = self.parse_ident()?;
            if fields.iter().any(|(l, _)| *l == label) {
                return Err(label_span.wrap(Error::DuplicateLabel { label }));
            }
            self.consume(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            fields.push((label, ty));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.consume(TokenKind::RBrace)?;
        Ok(Type::Record(fields))
    }
}

impl Parser<'_> {
    /// Expects `tokens` to end with an `Eof` token, as [`lexer::lex`]
    /// guarantees.
    pub fn new(tokens: &[Token]) -> Parser<'_> {
        Parser {
            tokens,
            cursor: 0,
            bound: Vec::with_capacity(8),
        }
    }

    /// Returns the current token without advancing.
    #[inline]
    fn peek(&self) -> &Token {
        &self.tokens[self.cursor.min(self.tokens.len() - 1)]
    }

    /// Returns the current token and advances.
    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.cursor < self.tokens.len() {
            self.cursor += 1;
        }
        token
    }

    /// Undoes the last `advance`, making the token current again.
    fn put_back(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Advances if the provided token matches the current token. Errors if
    /// not.
    fn consume(&mut self, want: TokenKind) -> Result<Token> {
        let token = self.peek().clone();
        if token.kind == want {
            self.advance();
            Ok(token)
        } else {
            Err(token.span().wrap(Error::Unexpected {
                got: token.kind,
                want,
            }))
        }
    }

    /// Advances over the provided token if it is current.
    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse_ident(&mut self) -> Result<String> {
        let token = self.peek().clone();
        let span = token.span();
        match token.kind {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            got => Err(span.wrap(Error::ExpectedIdentifier { got })),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    Unexpected { got: TokenKind, want: TokenKind },
    UnexpectedToken { got: TokenKind },
    ExpectedIdentifier { got: TokenKind },
    UnboundIdentifier { name: String },
    DuplicateLabel { label: String },
    EmptyRecord,
}

impl fmt::Display for Spanned<Error> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            write!(f, "{span}: ")?;
        }

        use Error::*;
        match error {
            Unexpected { got, want } => write!(f, "expected token {want:?}, but got {got:?}"),
            UnexpectedToken { got } => write!(f, "unexpected token {got:?}"),
            ExpectedIdentifier { got } => write!(f, "expected an identifier, but got {got:?}"),
            UnboundIdentifier { name } => write!(
                f,
                "{name} is not bound; free variables must be single letters"
            ),
            DuplicateLabel { label } => write!(f, "label {label} already used in this record"),
            EmptyRecord => write!(f, "empty record"),
        }
    }
}
