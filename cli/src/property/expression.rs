//! Arithmetic over number literals: `+ - * / % **` and parentheses.

#[derive(Debug, Clone, Copy, PartialEq)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

impl std::fmt::Display for Num {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Num::Int(i) => write!(f, "{i}"),
            Num::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 => {
                write!(f, "{v:.1}")
            }
            Num::Float(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(Num),
    Op(&'static str),
    LParen,
    RParen,
}

fn lex(input: &str) -> Result<Vec<Tok>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                out.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                out.push(Tok::RParen);
                i += 1;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                out.push(Tok::Op("**"));
                i += 2;
            }
            '+' => {
                out.push(Tok::Op("+"));
                i += 1;
            }
            '-' => {
                out.push(Tok::Op("-"));
                i += 1;
            }
            '*' => {
                out.push(Tok::Op("*"));
                i += 1;
            }
            '/' => {
                out.push(Tok::Op("/"));
                i += 1;
            }
            '%' => {
                out.push(Tok::Op("%"));
                i += 1;
            }
            d if d.is_ascii_digit() || d == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    i += 1;
                    if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
                        i += 1;
                    }
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let num = match text.parse::<i64>() {
                    Ok(n) => Num::Int(n),
                    Err(_) => Num::Float(
                        text.parse::<f64>()
                            .map_err(|_| format!("invalid number `{text}`"))?,
                    ),
                };
                out.push(Tok::Num(num));
            }
            other => return Err(format!("unexpected character `{other}`")),
        }
    }
    Ok(out)
}

struct Parser {
    toks: Vec<Tok>,
    pos: usize,
}

impl Parser {
    fn peek_op(&self) -> Option<&'static str> {
        match self.toks.get(self.pos) {
            Some(Tok::Op(op)) => Some(op),
            _ => None,
        }
    }

    fn expr(&mut self) -> Result<Num, String> {
        let mut left = self.term()?;
        while let Some(op @ ("+" | "-")) = self.peek_op() {
            self.pos += 1;
            let right = self.term()?;
            left = apply(op, left, right)?;
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Num, String> {
        let mut left = self.unary()?;
        while let Some(op @ ("*" | "/" | "%")) = self.peek_op() {
            self.pos += 1;
            let right = self.unary()?;
            left = apply(op, left, right)?;
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Num, String> {
        match self.peek_op() {
            Some("-") => {
                self.pos += 1;
                Ok(match self.unary()? {
                    Num::Int(i) => Num::Int(-i),
                    Num::Float(f) => Num::Float(-f),
                })
            }
            Some("+") => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Num, String> {
        let base = self.atom()?;
        if self.peek_op() == Some("**") {
            self.pos += 1;
            let exp = self.unary()?;
            return apply("**", base, exp);
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Num, String> {
        match self.toks.get(self.pos).cloned() {
            Some(Tok::Num(n)) => {
                self.pos += 1;
                Ok(n)
            }
            Some(Tok::LParen) => {
                self.pos += 1;
                let v = self.expr()?;
                if self.toks.get(self.pos) != Some(&Tok::RParen) {
                    return Err("missing `)`".into());
                }
                self.pos += 1;
                Ok(v)
            }
            Some(tok) => Err(format!("unexpected token {tok:?}")),
            None => Err("unexpected end of expression".into()),
        }
    }
}

fn apply(op: &str, a: Num, b: Num) -> Result<Num, String> {
    use Num::{Float, Int};
    let result = match (op, a, b) {
        ("+", Int(x), Int(y)) => x.checked_add(y).map(Int),
        ("-", Int(x), Int(y)) => x.checked_sub(y).map(Int),
        ("*", Int(x), Int(y)) => x.checked_mul(y).map(Int),
        ("%", Int(_), Int(0)) | ("/", _, Int(0)) => return Err("division by zero".into()),
        ("%", Int(x), Int(y)) => Some(Int(floor_mod(x, y))),
        ("**", Int(x), Int(y)) if y >= 0 => u32::try_from(y)
            .ok()
            .and_then(|e| x.checked_pow(e))
            .map(Int),
        _ => None,
    };
    if let Some(v) = result {
        return Ok(v);
    }
    let (x, y) = (a.as_f64(), b.as_f64());
    let v = match op {
        "+" => x + y,
        "-" => x - y,
        "*" => x * y,
        "/" => {
            if y == 0.0 {
                return Err("division by zero".into());
            }
            x / y
        }
        "%" => {
            if y == 0.0 {
                return Err("division by zero".into());
            }
            x - y * (x / y).floor()
        }
        "**" => x.powf(y),
        _ => return Err(format!("unknown operator `{op}`")),
    };
    Ok(Float(v))
}

/// Remainder with the sign of the divisor.
fn floor_mod(x: i64, y: i64) -> i64 {
    let r = x % y;
    if r != 0 && ((r < 0) != (y < 0)) {
        r + y
    } else {
        r
    }
}

/// Evaluates an arithmetic expression and renders the result.
pub fn evaluate(expression: &str) -> Result<String, String> {
    let toks = lex(expression)?;
    if toks.is_empty() {
        return Err("empty expression".into());
    }
    let mut parser = Parser { toks, pos: 0 };
    let value = parser.expr()?;
    if parser.pos != parser.toks.len() {
        return Err("unexpected trailing input".into());
    }
    Ok(value.to_string())
}
