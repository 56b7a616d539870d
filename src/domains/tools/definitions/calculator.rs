//! Calculator tool - safe arithmetic evaluation.
//!
//! Expressions are tokenized and evaluated by a small recursive-descent
//! parser; nothing is ever handed to an interpreter. Integer and float
//! arithmetic follow the usual scripting-language rules: `/` always yields a
//! float, `%` takes the sign of the divisor, `**` binds tighter than unary
//! minus and is right-associative. `^` is accepted as a synonym for `**`.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Number, Value, json};
use tracing::debug;

use crate::domains::tools::callable::{Arguments, BlockingTool, parse_params};
use crate::domains::tools::descriptor::ToolDescriptor;
use crate::domains::tools::error::ToolResult;

/// Parameters for the calculator tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CalculatorParams {
    /// The mathematical expression to evaluate
    pub expression: String,
}

/// Calculator tool implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalculatorTool;

impl CalculatorTool {
    pub const NAME: &'static str = "calculator";
    pub const DESCRIPTION: &'static str = "Evaluate a mathematical expression. Supports + - * / % ** (or ^), \
         parentheses and the functions sqrt, sin, cos, tan.";

    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::from_params::<CalculatorParams>(Self::NAME, Self::DESCRIPTION)
    }

    /// Evaluate an expression into `{"result", "expression"}` or `{"error", "expression"}`.
    pub fn evaluate(expression: &str) -> Value {
        let expression = expression.replace('^', "**");
        let outcome = tokenize(&expression)
            .and_then(|tokens| Parser::new(tokens).parse())
            .and_then(Num::into_json);

        match outcome {
            Ok(result) => json!({ "result": result, "expression": expression }),
            Err(message) => {
                debug!("calculator rejected {:?}: {}", expression, message);
                json!({ "error": message, "expression": expression })
            }
        }
    }
}

impl BlockingTool for CalculatorTool {
    fn call(&self, arguments: Arguments) -> ToolResult<Value> {
        let params: CalculatorParams = parse_params(arguments)?;
        Ok(Self::evaluate(&params.expression))
    }
}

type Eval<T> = Result<T, String>;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    fn into_json(self) -> Eval<Value> {
        match self {
            Self::Int(i) => Ok(Value::Number(i.into())),
            Self::Float(f) => Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| "Numerical result out of range".to_string()),
        }
    }

    fn finite(value: f64) -> Eval<Num> {
        if value.is_finite() {
            Ok(Self::Float(value))
        } else {
            Err("Numerical result out of range".to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

fn apply(op: BinOp, lhs: Num, rhs: Num) -> Eval<Num> {
    use Num::{Float, Int};

    match (op, lhs, rhs) {
        (BinOp::Add, Int(a), Int(b)) => Ok(a.checked_add(b).map_or(Float(a as f64 + b as f64), Int)),
        (BinOp::Sub, Int(a), Int(b)) => Ok(a.checked_sub(b).map_or(Float(a as f64 - b as f64), Int)),
        (BinOp::Mul, Int(a), Int(b)) => Ok(a.checked_mul(b).map_or(Float(a as f64 * b as f64), Int)),
        (BinOp::Add, a, b) => Num::finite(a.as_f64() + b.as_f64()),
        (BinOp::Sub, a, b) => Num::finite(a.as_f64() - b.as_f64()),
        (BinOp::Mul, a, b) => Num::finite(a.as_f64() * b.as_f64()),
        (BinOp::Div, a, b) => {
            if b.as_f64() == 0.0 {
                Err("division by zero".to_string())
            } else {
                Num::finite(a.as_f64() / b.as_f64())
            }
        }
        (BinOp::FloorDiv, _, _) => Err("Unsupported operation: //".to_string()),
        (BinOp::Mod, Int(a), Int(b)) => {
            if b == 0 {
                return Err("integer modulo by zero".to_string());
            }
            let r = a.wrapping_rem(b);
            Ok(Int(if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r }))
        }
        (BinOp::Mod, a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            if b == 0.0 {
                return Err("float modulo".to_string());
            }
            let r = a % b;
            Num::finite(if r != 0.0 && ((r < 0.0) != (b < 0.0)) { r + b } else { r })
        }
        (BinOp::Pow, Int(a), Int(b)) if b >= 0 => {
            match u32::try_from(b).ok().and_then(|e| a.checked_pow(e)) {
                Some(i) => Ok(Int(i)),
                None => Num::finite((a as f64).powf(b as f64)),
            }
        }
        (BinOp::Pow, a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            if a == 0.0 && b < 0.0 {
                return Err("0.0 cannot be raised to a negative power".to_string());
            }
            if a < 0.0 && b.fract() != 0.0 {
                return Err("Unsupported operation: complex result".to_string());
            }
            Num::finite(a.powf(b))
        }
    }
}

fn call_function(name: &str, argument: Num) -> Eval<Num> {
    let x = argument.as_f64();
    let value = match name {
        "sqrt" if x < 0.0 => return Err("math domain error".to_string()),
        "sqrt" => x.sqrt(),
        "sin" | "cos" | "tan" if x.is_infinite() => return Err("math domain error".to_string()),
        "sin" => x.sin(),
        "cos" => x.cos(),
        "tan" => x.tan(),
        other => return Err(format!("Function {other} not supported")),
    };
    Num::finite(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(Num),
    Ident(String),
    Op(BinOp),
    LParen,
    RParen,
    Comma,
}

fn tokenize(input: &str) -> Eval<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                let mut is_float = false;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    is_float |= chars[i] == '.';
                    i += 1;
                }
                if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && matches!(chars[j], '+' | '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        is_float = true;
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                tokens.push(Token::Num(parse_number(&literal, is_float)?));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Op(BinOp::Pow));
                i += 2;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                tokens.push(Token::Op(BinOp::FloorDiv));
                i += 2;
            }
            '+' | '-' | '*' | '/' | '%' => {
                tokens.push(Token::Op(match c {
                    '+' => BinOp::Add,
                    '-' => BinOp::Sub,
                    '*' => BinOp::Mul,
                    '/' => BinOp::Div,
                    _ => BinOp::Mod,
                }));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            _ => return Err("invalid syntax".to_string()),
        }
    }

    Ok(tokens)
}

fn parse_number(literal: &str, is_float: bool) -> Eval<Num> {
    if literal == "." || literal.matches('.').count() > 1 {
        return Err("invalid syntax".to_string());
    }
    if !is_float {
        if let Ok(i) = literal.parse::<i64>() {
            return Ok(Num::Int(i));
        }
    }
    literal
        .parse::<f64>()
        .map(Num::Float)
        .map_err(|_| "invalid syntax".to_string())
}

/// Deepest nesting of parentheses, unary signs and function calls accepted.
const MAX_DEPTH: usize = 200;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0, depth: 0 }
    }

    fn parse(mut self) -> Eval<Num> {
        let value = self.expr()?;
        if self.pos != self.tokens.len() {
            return Err("invalid syntax".to_string());
        }
        Ok(value)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn peek_op(&self, ops: &[BinOp]) -> Option<BinOp> {
        match self.peek() {
            Some(Token::Op(op)) if ops.contains(op) => Some(*op),
            _ => None,
        }
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Eval<Num> {
        let mut value = self.term()?;
        while let Some(op) = self.peek_op(&[BinOp::Add, BinOp::Sub]) {
            self.pos += 1;
            let rhs = self.term()?;
            value = apply(op, value, rhs)?;
        }
        Ok(value)
    }

    // term := unary (('*' | '/' | '//' | '%') unary)*
    fn term(&mut self) -> Eval<Num> {
        let mut value = self.unary()?;
        while let Some(op) = self.peek_op(&[BinOp::Mul, BinOp::Div, BinOp::FloorDiv, BinOp::Mod]) {
            self.pos += 1;
            let rhs = self.unary()?;
            value = apply(op, value, rhs)?;
        }
        Ok(value)
    }

    // unary := ('+' | '-') unary | power
    fn unary(&mut self) -> Eval<Num> {
        if self.depth >= MAX_DEPTH {
            return Err("too many nested parentheses".to_string());
        }
        self.depth += 1;
        let value = self.signed();
        self.depth -= 1;
        value
    }

    fn signed(&mut self) -> Eval<Num> {
        match self.peek_op(&[BinOp::Add, BinOp::Sub]) {
            Some(BinOp::Sub) => {
                self.pos += 1;
                Ok(match self.unary()? {
                    Num::Int(i) => i.checked_neg().map_or(Num::Float(-(i as f64)), Num::Int),
                    Num::Float(f) => Num::Float(-f),
                })
            }
            Some(_) => {
                self.pos += 1;
                self.unary()
            }
            None => self.power(),
        }
    }

    // power := primary ('**' unary)?
    fn power(&mut self) -> Eval<Num> {
        let base = self.primary()?;
        if self.peek_op(&[BinOp::Pow]).is_some() {
            self.pos += 1;
            let exponent = self.unary()?;
            return apply(BinOp::Pow, base, exponent);
        }
        Ok(base)
    }

    fn primary(&mut self) -> Eval<Num> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err("invalid syntax".to_string()),
                }
            }
            Some(Token::Ident(name)) => {
                if self.peek() != Some(&Token::LParen) {
                    return Err(format!("Unsupported operation: {name}"));
                }
                self.pos += 1;
                let mut args = Vec::new();
                if self.peek() != Some(&Token::RParen) {
                    loop {
                        args.push(self.expr()?);
                        match self.next() {
                            Some(Token::Comma) => continue,
                            Some(Token::RParen) => break,
                            _ => return Err("invalid syntax".to_string()),
                        }
                    }
                } else {
                    self.pos += 1;
                }
                match args.first() {
                    Some(&argument) => call_function(&name, argument),
                    None if matches!(name.as_str(), "sqrt" | "sin" | "cos" | "tan") => {
                        Err(format!("Function {name} requires an argument"))
                    }
                    None => Err(format!("Function {name} not supported")),
                }
            }
            _ => Err("invalid syntax".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(expression: &str) -> Value {
        CalculatorTool::evaluate(expression)["result"].clone()
    }

    fn error(expression: &str) -> Value {
        CalculatorTool::evaluate(expression)["error"].clone()
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(
            CalculatorTool::evaluate("2 + 2"),
            json!({"result": 4, "expression": "2 + 2"})
        );
        assert_eq!(result("2 + 3 * 4"), json!(14));
        assert_eq!(result("(2 + 3) * 4"), json!(20));
        assert_eq!(result("10 - 20"), json!(-10));
    }

    #[test]
    fn test_true_division_yields_float() {
        assert_eq!(result("7 / 2"), json!(3.5));
        assert_eq!(result("4 / 2"), json!(2.0));
    }

    #[test]
    fn test_power_and_caret() {
        assert_eq!(
            CalculatorTool::evaluate("2^3"),
            json!({"result": 8, "expression": "2**3"})
        );
        assert_eq!(result("-2**2"), json!(-4));
        assert_eq!(result("2**3**2"), json!(512));
        assert_eq!(result("2**-1"), json!(0.5));
    }

    #[test]
    fn test_modulo_sign_follows_divisor() {
        assert_eq!(result("10 % 3"), json!(1));
        assert_eq!(result("-7 % 3"), json!(2));
        assert_eq!(result("7 % -3"), json!(-2));
    }

    #[test]
    fn test_functions() {
        assert_eq!(result("sqrt(16)"), json!(4.0));
        assert_eq!(result("sin(0)"), json!(0.0));
        assert_eq!(result("cos(0)"), json!(1.0));
    }

    #[test]
    fn test_reported_errors() {
        assert_eq!(error("1 / 0"), json!("division by zero"));
        assert_eq!(error("sqrt(-1)"), json!("math domain error"));
        assert_eq!(error("log(10)"), json!("Function log not supported"));
        assert_eq!(error("x + 1"), json!("Unsupported operation: x"));
        assert_eq!(error("2 +"), json!("invalid syntax"));
        assert_eq!(error("2 $ 3"), json!("invalid syntax"));
        assert_eq!(
            CalculatorTool::evaluate("1/0")["expression"],
            json!("1/0")
        );
    }

    #[test]
    fn test_deep_nesting_is_reported() {
        let nested = format!("{}1{}", "(".repeat(5000), ")".repeat(5000));
        let outcome = CalculatorTool::evaluate(&nested);
        assert_eq!(outcome["error"], json!("too many nested parentheses"));
        assert_eq!(outcome["expression"], json!(nested));

        assert_eq!(error(&format!("{}1", "-".repeat(100_000))), json!("too many nested parentheses"));
        assert_eq!(error(&format!("{}1{}", "sqrt(".repeat(1000), ")".repeat(1000))), json!("too many nested parentheses"));

        let shallow = format!("{}1{}", "(".repeat(150), ")".repeat(150));
        assert_eq!(result(&shallow), json!(1));
    }

    #[test]
    fn test_call_binds_params() {
        let mut args = Arguments::new();
        args.insert("expression".into(), json!("1.5 * 2"));
        assert_eq!(
            CalculatorTool.call(args).unwrap(),
            json!({"result": 3.0, "expression": "1.5 * 2"})
        );
    }

    #[test]
    fn test_descriptor() {
        let descriptor = CalculatorTool::descriptor();
        assert_eq!(descriptor.name(), "calculator");
        assert!(!descriptor.is_suspending());
        assert!(descriptor.parameter("expression").unwrap().required);
    }
}
