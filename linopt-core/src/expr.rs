//! Symbolic expressions over named free variables
//!
//! [`Expr`] is the value carried by symbolic matrix cells and symbolic
//! component parameters. It supports the four capabilities the codec needs:
//! - parse text into an expression ([`Expr::parse`])
//! - render an expression back to text ([`fmt::Display`])
//! - substitute free variables with numbers ([`Expr::subs`])
//! - evaluate a fully-bound expression ([`Expr::evaluate`])
//!
//! Rendering is exact: `Expr::parse(&e.to_string())` yields a structurally
//! equal expression for any expression built by the parser or by the smart
//! constructors ([`Expr::add`], [`Expr::mul`], ...).
//!
//! # Example
//! ```
//! use linopt_core::expr::{Bindings, Expr};
//!
//! let e = Expr::parse("cos(theta/2)*exp(I*phi)").unwrap();
//! assert_eq!(e.free_symbols().len(), 2);
//!
//! let mut b = Bindings::new();
//! b.insert("theta".to_string(), 0.0);
//! b.insert("phi".to_string(), 0.0);
//! assert_eq!(e.evaluate(&b).unwrap().re, 1.0);
//! ```

use crate::{OpticsError, Result};
use num_complex::Complex64;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops;
use std::str::FromStr;

/// Assignment of numeric values to free-variable names
pub type Bindings = BTreeMap<String, f64>;

/// Named constants understood by the parser
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Constant {
    /// Imaginary unit
    I,
    Pi,
    E,
}

impl Constant {
    fn name(self) -> &'static str {
        match self {
            Constant::I => "I",
            Constant::Pi => "pi",
            Constant::E => "E",
        }
    }

    fn value(self) -> Complex64 {
        match self {
            Constant::I => Complex64::new(0.0, 1.0),
            Constant::Pi => Complex64::new(std::f64::consts::PI, 0.0),
            Constant::E => Complex64::new(std::f64::consts::E, 0.0),
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "I" => Some(Constant::I),
            "pi" => Some(Constant::Pi),
            "E" => Some(Constant::E),
            _ => None,
        }
    }
}

/// Binary operators, lowest precedence first
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "**",
        }
    }

    fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => PREC_ADD,
            BinaryOp::Mul | BinaryOp::Div => PREC_MUL,
            BinaryOp::Pow => PREC_POW,
        }
    }
}

/// Elementary functions
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Exp,
    Sqrt,
    Log,
}

impl Function {
    fn name(self) -> &'static str {
        match self {
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Exp => "exp",
            Function::Sqrt => "sqrt",
            Function::Log => "log",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(Function::Sin),
            "cos" => Some(Function::Cos),
            "tan" => Some(Function::Tan),
            "exp" => Some(Function::Exp),
            "sqrt" => Some(Function::Sqrt),
            "log" => Some(Function::Log),
            _ => None,
        }
    }

    fn apply(self, z: Complex64) -> Complex64 {
        match self {
            Function::Sin => z.sin(),
            Function::Cos => z.cos(),
            Function::Tan => z.tan(),
            Function::Exp => z.exp(),
            Function::Sqrt => z.sqrt(),
            Function::Log => z.ln(),
        }
    }

    /// Real-valued fold, only where the result stays real
    fn apply_real(self, x: f64) -> Option<f64> {
        let y = match self {
            Function::Sin => x.sin(),
            Function::Cos => x.cos(),
            Function::Tan => x.tan(),
            Function::Exp => x.exp(),
            Function::Sqrt if x >= 0.0 => x.sqrt(),
            Function::Log if x > 0.0 => x.ln(),
            _ => return None,
        };
        y.is_finite().then_some(y)
    }
}

const PREC_ADD: u8 = 1;
const PREC_MUL: u8 = 2;
const PREC_UNARY: u8 = 3;
const PREC_POW: u8 = 4;
const PREC_ATOM: u8 = 5;

/// A symbolic expression tree
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f64),
    Constant(Constant),
    Symbol(String),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Box<Expr>),
}

impl Expr {
    /// Parse expression text
    ///
    /// # Errors
    /// Returns [`OpticsError::Parse`] naming the offending position
    pub fn parse(text: &str) -> Result<Self> {
        let tokens = tokenize(text)?;
        let mut parser = Parser {
            text,
            tokens,
            pos: 0,
            nesting: 0,
        };
        let (expr, _) = parser.parse_sum()?;
        if let Some((tok, at)) = parser.tokens.get(parser.pos) {
            return Err(OpticsError::parse(
                format!("expression '{}'", text),
                format!("unexpected {} at offset {}", tok.describe(), at),
            ));
        }
        Ok(expr)
    }

    /// A free variable
    ///
    /// The name is not checked; encoding rejects names that would not parse
    /// back as the same variable (see [`Expr::is_valid_symbol`]).
    pub fn symbol(name: impl Into<String>) -> Self {
        Expr::Symbol(name.into())
    }

    /// A free variable with a checked name
    ///
    /// # Errors
    /// Returns [`OpticsError::Parse`] unless [`Expr::is_valid_symbol`] holds
    pub fn try_symbol(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !Self::is_valid_symbol(&name) {
            return Err(invalid_symbol(&name));
        }
        Ok(Expr::Symbol(name))
    }

    /// Whether `name` is an identifier that is neither a function nor a
    /// constant (`I`, `E`, `pi`), i.e. it reparses as the same free variable
    pub fn is_valid_symbol(name: &str) -> bool {
        let mut chars = name.chars();
        let starts_ident = matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_');
        starts_ident
            && chars.all(|c| c.is_alphanumeric() || c == '_')
            && Function::from_name(name).is_none()
            && Constant::from_name(name).is_none()
    }

    /// Check every free variable with [`Expr::is_valid_symbol`]
    ///
    /// # Errors
    /// Returns [`OpticsError::Parse`] naming the first invalid variable
    pub fn check_symbols(&self) -> Result<()> {
        match self.free_symbols().into_iter().find(|n| !Self::is_valid_symbol(n)) {
            Some(name) => Err(invalid_symbol(&name)),
            None => Ok(()),
        }
    }

    /// The imaginary unit
    pub fn i() -> Self {
        Expr::Constant(Constant::I)
    }

    /// π
    pub fn pi() -> Self {
        Expr::Constant(Constant::Pi)
    }

    /// Real value, if this expression is a plain number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Expr::Number(v) => Some(*v),
            _ => None,
        }
    }

    fn is_number(&self, value: f64) -> bool {
        self.as_number() == Some(value)
    }

    pub fn neg(e: Expr) -> Expr {
        match e {
            Expr::Number(v) => Expr::Number(-v),
            Expr::Neg(inner) => *inner,
            other => Expr::Neg(Box::new(other)),
        }
    }

    pub fn add(a: Expr, b: Expr) -> Expr {
        if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
            return fold(x + y).unwrap_or_else(|| binary(BinaryOp::Add, a, b));
        }
        if a.is_number(0.0) {
            return b;
        }
        if b.is_number(0.0) {
            return a;
        }
        binary(BinaryOp::Add, a, b)
    }

    pub fn sub(a: Expr, b: Expr) -> Expr {
        if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
            return fold(x - y).unwrap_or_else(|| binary(BinaryOp::Sub, a, b));
        }
        if b.is_number(0.0) {
            return a;
        }
        if a.is_number(0.0) {
            return Expr::neg(b);
        }
        binary(BinaryOp::Sub, a, b)
    }

    pub fn mul(a: Expr, b: Expr) -> Expr {
        if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
            return fold(x * y).unwrap_or_else(|| binary(BinaryOp::Mul, a, b));
        }
        if a.is_number(0.0) || b.is_number(0.0) {
            return Expr::Number(0.0);
        }
        if a.is_number(1.0) {
            return b;
        }
        if b.is_number(1.0) {
            return a;
        }
        if a.is_number(-1.0) {
            return Expr::neg(b);
        }
        if b.is_number(-1.0) {
            return Expr::neg(a);
        }
        binary(BinaryOp::Mul, a, b)
    }

    pub fn div(a: Expr, b: Expr) -> Expr {
        if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
            if y != 0.0 {
                return fold(x / y).unwrap_or_else(|| binary(BinaryOp::Div, a, b));
            }
        }
        if b.is_number(1.0) {
            return a;
        }
        binary(BinaryOp::Div, a, b)
    }

    pub fn pow(a: Expr, b: Expr) -> Expr {
        if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
            if x >= 0.0 || y.fract() == 0.0 {
                return fold(x.powf(y)).unwrap_or_else(|| binary(BinaryOp::Pow, a, b));
            }
        }
        if b.is_number(1.0) {
            return a;
        }
        if b.is_number(0.0) {
            return Expr::Number(1.0);
        }
        binary(BinaryOp::Pow, a, b)
    }

    pub fn call(f: Function, arg: Expr) -> Expr {
        if let Some(y) = arg.as_number().and_then(|x| f.apply_real(x)) {
            return Expr::Number(y);
        }
        Expr::Call(f, Box::new(arg))
    }

    pub fn sin(arg: Expr) -> Expr {
        Expr::call(Function::Sin, arg)
    }

    pub fn cos(arg: Expr) -> Expr {
        Expr::call(Function::Cos, arg)
    }

    pub fn exp(arg: Expr) -> Expr {
        Expr::call(Function::Exp, arg)
    }

    /// `exp(I*phase)`, folded to 1 for a zero phase
    pub fn cis(phase: Expr) -> Expr {
        if phase.is_number(0.0) {
            return Expr::Number(1.0);
        }
        Expr::exp(Expr::mul(Expr::i(), phase))
    }

    /// Names of all free variables, sorted
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Symbol(name) => {
                out.insert(name.clone());
            },
            Expr::Neg(inner) | Expr::Call(_, inner) => inner.collect_symbols(out),
            Expr::Binary(_, a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            },
            Expr::Number(_) | Expr::Constant(_) => {},
        }
    }

    /// Whether the expression has no free variable
    pub fn is_closed(&self) -> bool {
        match self {
            Expr::Symbol(_) => false,
            Expr::Neg(inner) | Expr::Call(_, inner) => inner.is_closed(),
            Expr::Binary(_, a, b) => a.is_closed() && b.is_closed(),
            Expr::Number(_) | Expr::Constant(_) => true,
        }
    }

    /// Replace bound free variables with their values, folding constants
    pub fn subs(&self, bindings: &Bindings) -> Expr {
        match self {
            Expr::Symbol(name) => match bindings.get(name) {
                Some(v) => Expr::Number(*v),
                None => self.clone(),
            },
            Expr::Number(_) | Expr::Constant(_) => self.clone(),
            Expr::Neg(inner) => Expr::neg(inner.subs(bindings)),
            Expr::Call(f, inner) => Expr::call(*f, inner.subs(bindings)),
            Expr::Binary(op, a, b) => {
                let (a, b) = (a.subs(bindings), b.subs(bindings));
                match op {
                    BinaryOp::Add => Expr::add(a, b),
                    BinaryOp::Sub => Expr::sub(a, b),
                    BinaryOp::Mul => Expr::mul(a, b),
                    BinaryOp::Div => Expr::div(a, b),
                    BinaryOp::Pow => Expr::pow(a, b),
                }
            },
        }
    }

    /// Evaluate to a complex number
    ///
    /// # Errors
    /// - [`OpticsError::UnboundSymbol`] if a free variable has no binding
    /// - [`OpticsError::NonFinite`] if the result is NaN or infinite
    pub fn evaluate(&self, bindings: &Bindings) -> Result<Complex64> {
        let z = self.eval_inner(bindings)?;
        if !(z.re.is_finite() && z.im.is_finite()) {
            return Err(OpticsError::NonFinite(format!("'{}' evaluates to {}", self, z)));
        }
        Ok(z)
    }

    fn eval_inner(&self, bindings: &Bindings) -> Result<Complex64> {
        Ok(match self {
            Expr::Number(v) => Complex64::new(*v, 0.0),
            Expr::Constant(c) => c.value(),
            Expr::Symbol(name) => match bindings.get(name) {
                Some(v) => Complex64::new(*v, 0.0),
                None => return Err(OpticsError::UnboundSymbol(name.clone())),
            },
            Expr::Neg(inner) => -inner.eval_inner(bindings)?,
            Expr::Call(f, inner) => f.apply(inner.eval_inner(bindings)?),
            Expr::Binary(op, a, b) => {
                let (x, y) = (a.eval_inner(bindings)?, b.eval_inner(bindings)?);
                match op {
                    BinaryOp::Add => x + y,
                    BinaryOp::Sub => x - y,
                    BinaryOp::Mul => x * y,
                    BinaryOp::Div => x / y,
                    BinaryOp::Pow => complex_pow(x, y),
                }
            },
        })
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Number(v) if v.is_sign_negative() => PREC_UNARY,
            Expr::Neg(_) => PREC_UNARY,
            Expr::Binary(op, _, _) => op.precedence(),
            _ => PREC_ATOM,
        }
    }

    fn is_negated(&self) -> bool {
        self.precedence() == PREC_UNARY
    }

    fn write_child(&self, f: &mut fmt::Formatter<'_>, parens: bool) -> fmt::Result {
        if parens {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

fn invalid_symbol(name: &str) -> OpticsError {
    OpticsError::parse(
        format!("symbol '{}'", name),
        "not an identifier, or reserved for a function or constant",
    )
}

fn binary(op: BinaryOp, a: Expr, b: Expr) -> Expr {
    Expr::Binary(op, Box::new(a), Box::new(b))
}

fn fold(value: f64) -> Option<Expr> {
    value.is_finite().then_some(Expr::Number(value))
}

fn complex_pow(x: Complex64, y: Complex64) -> Complex64 {
    if x.im == 0.0 && y.im == 0.0 && (x.re >= 0.0 || y.re.fract() == 0.0) {
        Complex64::new(x.re.powf(y.re), 0.0)
    } else if x == Complex64::new(0.0, 0.0) {
        x
    } else {
        x.powc(y)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(v) => write!(f, "{:?}", v),
            Expr::Constant(c) => write!(f, "{}", c.name()),
            Expr::Symbol(name) => write!(f, "{}", name),
            Expr::Neg(inner) => {
                write!(f, "-")?;
                inner.write_child(f, inner.precedence() <= PREC_UNARY)
            },
            Expr::Call(func, inner) => write!(f, "{}({})", func.name(), inner),
            Expr::Binary(BinaryOp::Pow, a, b) => {
                a.write_child(f, a.precedence() <= PREC_POW)?;
                write!(f, "**")?;
                b.write_child(f, b.precedence() < PREC_POW)
            },
            Expr::Binary(op, a, b) => {
                let prec = op.precedence();
                a.write_child(f, a.precedence() < prec)?;
                write!(f, "{}", op.symbol())?;
                b.write_child(f, b.precedence() <= prec || b.is_negated())
            },
        }
    }
}

impl FromStr for Expr {
    type Err = OpticsError;

    fn from_str(s: &str) -> Result<Self> {
        Expr::parse(s)
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        Expr::Number(v)
    }
}

impl ops::Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        Expr::add(self, rhs)
    }
}

impl ops::Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        Expr::sub(self, rhs)
    }
}

impl ops::Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        Expr::mul(self, rhs)
    }
}

impl ops::Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        Expr::div(self, rhs)
    }
}

impl ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::neg(self)
    }
}

// ============================================================================
// Tokenizer and recursive-descent parser
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(v) => format!("number {}", v),
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Caret => "'**'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<(Token, usize)>> {
    let context = || format!("expression '{}'", text);
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (at, c) = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '+' => {
                tokens.push((Token::Plus, at));
                i += 1;
            },
            '-' => {
                tokens.push((Token::Minus, at));
                i += 1;
            },
            '/' => {
                tokens.push((Token::Slash, at));
                i += 1;
            },
            '^' => {
                tokens.push((Token::Caret, at));
                i += 1;
            },
            '*' => {
                if matches!(chars.get(i + 1), Some((_, '*'))) {
                    tokens.push((Token::Caret, at));
                    i += 2;
                } else {
                    tokens.push((Token::Star, at));
                    i += 1;
                }
            },
            '(' => {
                tokens.push((Token::LParen, at));
                i += 1;
            },
            ')' => {
                tokens.push((Token::RParen, at));
                i += 1;
            },
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].1.is_ascii_digit() || chars[i].1 == '.') {
                    i += 1;
                }
                // exponent part: e[+-]digits
                if i < chars.len() && matches!(chars[i].1, 'e' | 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && matches!(chars[j].1, '+' | '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].1.is_ascii_digit() {
                        while j < chars.len() && chars[j].1.is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let end = chars.get(i).map(|(pos, _)| *pos).unwrap_or(text.len());
                let literal = &text[at..end];
                let value: f64 = literal.parse().map_err(|_| {
                    OpticsError::parse(
                        context(),
                        format!("invalid number '{}' at offset {}", literal, chars[start].0),
                    )
                })?;
                if !value.is_finite() {
                    return Err(OpticsError::parse(
                        context(),
                        format!("number '{}' at offset {} is out of range", literal, at),
                    ));
                }
                tokens.push((Token::Number(value), at));
            },
            c if c.is_alphabetic() || c == '_' => {
                while i < chars.len() && (chars[i].1.is_alphanumeric() || chars[i].1 == '_') {
                    i += 1;
                }
                let end = chars.get(i).map(|(pos, _)| *pos).unwrap_or(text.len());
                tokens.push((Token::Ident(text[at..end].to_string()), at));
            },
            other => {
                return Err(OpticsError::parse(
                    context(),
                    format!("unexpected character '{}' at offset {}", other, at),
                ))
            },
        }
    }

    Ok(tokens)
}

/// Deepest expression tree the parser builds; deeper text is a parse error
pub const MAX_EXPR_DEPTH: usize = 128;

/// Parsed subtree and its depth
type Parsed = (Expr, usize);

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<(Token, usize)>,
    pos: usize,
    /// Current recursion depth of `parse_unary`
    nesting: usize,
}

impl Parser<'_> {
    fn error(&self, message: impl Into<String>) -> OpticsError {
        OpticsError::parse(format!("expression '{}'", self.text), message)
    }

    fn too_deep(&self) -> OpticsError {
        self.error(format!("nesting deeper than {} levels", MAX_EXPR_DEPTH))
    }

    /// Depth of a node over children of depth `child`
    fn deeper(&self, child: usize) -> Result<usize> {
        if child >= MAX_EXPR_DEPTH {
            return Err(self.too_deep());
        }
        Ok(child + 1)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(tok, _)| tok)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).map(|(tok, _)| tok.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.next() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(self.error(format!(
                "expected {}, found {}",
                expected.describe(),
                tok.describe()
            ))),
            None => Err(self.error(format!("expected {}, found end of input", expected.describe()))),
        }
    }

    fn parse_sum(&mut self) -> Result<Parsed> {
        let (mut lhs, mut depth) = self.parse_product()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok((lhs, depth)),
            };
            self.pos += 1;
            let (rhs, rhs_depth) = self.parse_product()?;
            depth = self.deeper(depth.max(rhs_depth))?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_product(&mut self) -> Result<Parsed> {
        let (mut lhs, mut depth) = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok((lhs, depth)),
            };
            self.pos += 1;
            let (rhs, rhs_depth) = self.parse_unary()?;
            depth = self.deeper(depth.max(rhs_depth))?;
            lhs = binary(op, lhs, rhs);
        }
    }

    // All recursion (parentheses, calls, signs, exponents) passes through here
    fn parse_unary(&mut self) -> Result<Parsed> {
        if self.nesting >= MAX_EXPR_DEPTH {
            return Err(self.too_deep());
        }
        self.nesting += 1;
        let parsed = self.parse_signed();
        self.nesting -= 1;
        parsed
    }

    fn parse_signed(&mut self) -> Result<Parsed> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                let (operand, depth) = self.parse_unary()?;
                Ok(match operand {
                    Expr::Number(v) => (Expr::Number(-v), depth),
                    other => (Expr::Neg(Box::new(other)), self.deeper(depth)?),
                })
            },
            Some(Token::Plus) => {
                self.pos += 1;
                self.parse_unary()
            },
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Parsed> {
        let (base, base_depth) = self.parse_atom()?;
        if self.peek() == Some(&Token::Caret) {
            self.pos += 1;
            let (exponent, exp_depth) = self.parse_unary()?;
            let depth = self.deeper(base_depth.max(exp_depth))?;
            return Ok((binary(BinaryOp::Pow, base, exponent), depth));
        }
        Ok((base, base_depth))
    }

    fn parse_atom(&mut self) -> Result<Parsed> {
        match self.next() {
            Some(Token::Number(v)) => Ok((Expr::Number(v), 1)),
            Some(Token::LParen) => {
                let inner = self.parse_sum()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            },
            Some(Token::Ident(name)) => {
                if let Some(func) = Function::from_name(&name) {
                    self.expect(Token::LParen)?;
                    let (arg, depth) = self.parse_sum()?;
                    self.expect(Token::RParen)?;
                    return Ok((Expr::Call(func, Box::new(arg)), self.deeper(depth)?));
                }
                if self.peek() == Some(&Token::LParen) {
                    return Err(self.error(format!("unknown function '{}'", name)));
                }
                Ok(match Constant::from_name(&name) {
                    Some(c) => (Expr::Constant(c), 1),
                    None => (Expr::Symbol(name), 1),
                })
            },
            Some(tok) => Err(self.error(format!("unexpected {}", tok.describe()))),
            None => Err(self.error("unexpected end of input")),
        }
    }
}
