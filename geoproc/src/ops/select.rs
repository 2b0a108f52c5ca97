//! Operações de seleção e extração de feições

use geo::Intersects;

use crate::types::{Layer, OpOutput, Params};
use crate::GeoProcError;

/// `native:saveselectedfeatures` — isola as feições selecionadas da camada
pub fn save_selected_features(params: &Params) -> Result<OpOutput, GeoProcError> {
    const OP: &str = "native:saveselectedfeatures";
    let input = params.layer(OP, "INPUT")?;

    let features = input
        .features
        .iter()
        .enumerate()
        .filter(|(idx, _)| input.selected.contains(idx))
        .map(|(_, f)| f.clone())
        .collect();

    Ok(OpOutput::from_layer(Layer::from_features(
        features, input.epsg,
    )))
}

/// `native:extractbylocation` — feições de INPUT que satisfazem o predicado
/// espacial contra qualquer feição de INTERSECT. Apenas o predicado 0
/// (intersects) é suportado, que é o único usado pelo encadeamento.
pub fn extract_by_location(params: &Params) -> Result<OpOutput, GeoProcError> {
    const OP: &str = "native:extractbylocation";
    let input = params.layer(OP, "INPUT")?;
    let intersect = params.layer(OP, "INTERSECT")?;
    input.ensure_same_crs(intersect)?;

    let features = input
        .features
        .iter()
        .filter(|f| {
            intersect
                .features
                .iter()
                .any(|other| f.geometry.intersects(&other.geometry))
        })
        .cloned()
        .collect();

    Ok(OpOutput::from_layer(Layer::from_features(
        features, input.epsg,
    )))
}

/// `native:extractbyexpression` — filtra feições pela expressão de comparação
pub fn extract_by_expression(params: &Params) -> Result<OpOutput, GeoProcError> {
    const OP: &str = "native:extractbyexpression";
    let input = params.layer(OP, "INPUT")?;
    let expression = params.text(OP, "EXPRESSION")?;

    let comparison = Comparison::parse(expression)?;

    let features = input
        .features
        .iter()
        .filter(|f| comparison.evaluate(f).unwrap_or(false))
        .cloned()
        .collect();

    Ok(OpOutput::from_layer(Layer::from_features(
        features, input.epsg,
    )))
}

/// Operador de comparação
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

/// Operando numérico: campo, constante ou produto
#[derive(Debug, Clone)]
enum Operand {
    Field(String),
    Number(f64),
    Mul(Box<Operand>, Box<Operand>),
}

impl Operand {
    /// Avalia o operando para uma feição. `None` quando algum campo
    /// referenciado é nulo ou não numérico (comparação indefinida).
    fn evaluate(&self, feature: &crate::types::Feature) -> Option<f64> {
        match self {
            Operand::Number(v) => Some(*v),
            Operand::Field(name) => feature.attribute(name).and_then(|v| v.as_f64()),
            Operand::Mul(a, b) => Some(a.evaluate(feature)? * b.evaluate(feature)?),
        }
    }
}

/// Comparação binária no estilo `"area_lote" < ("area_quadra" * 0.95)`
#[derive(Debug, Clone)]
struct Comparison {
    lhs: Operand,
    op: CmpOp,
    rhs: Operand,
}

impl Comparison {
    fn parse(text: &str) -> Result<Self, GeoProcError> {
        let tokens = tokenize(text)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            source: text,
        };
        let comparison = parser.comparison()?;
        if parser.pos != tokens.len() {
            return Err(GeoProcError::UnsupportedExpression(text.to_string()));
        }
        Ok(comparison)
    }

    fn evaluate(&self, feature: &crate::types::Feature) -> Option<bool> {
        let lhs = self.lhs.evaluate(feature)?;
        let rhs = self.rhs.evaluate(feature)?;
        Some(match self.op {
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Field(String),
    Number(f64),
    Cmp(CmpOp),
    Star,
    Open,
    Close,
}

fn tokenize(text: &str) -> Result<Vec<Token>, GeoProcError> {
    let unsupported = || GeoProcError::UnsupportedExpression(text.to_string());
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '"' => {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some(ch) => name.push(ch),
                        None => return Err(unsupported()),
                    }
                }
                tokens.push(Token::Field(name));
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Cmp(CmpOp::Le));
                } else if chars.peek() == Some(&'>') {
                    chars.next();
                    tokens.push(Token::Cmp(CmpOp::Ne));
                } else {
                    tokens.push(Token::Cmp(CmpOp::Lt));
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Cmp(CmpOp::Ge));
                } else {
                    tokens.push(Token::Cmp(CmpOp::Gt));
                }
            }
            '=' => {
                chars.next();
                tokens.push(Token::Cmp(CmpOp::Eq));
            }
            '!' => {
                chars.next();
                if chars.next() != Some('=') {
                    return Err(unsupported());
                }
                tokens.push(Token::Cmp(CmpOp::Ne));
            }
            c if c.is_ascii_digit() || c == '.' || c == '-' => {
                let mut literal = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_digit() || ch == '.' || ch == '-' || ch == 'e' || ch == 'E' {
                        literal.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value: f64 = literal.parse().map_err(|_| unsupported())?;
                tokens.push(Token::Number(value));
            }
            _ => return Err(unsupported()),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn error(&self) -> GeoProcError {
        GeoProcError::UnsupportedExpression(self.source.to_string())
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn comparison(&mut self) -> Result<Comparison, GeoProcError> {
        let lhs = self.operand()?;
        let op = match self.next() {
            Some(Token::Cmp(op)) => *op,
            _ => return Err(self.error()),
        };
        let rhs = self.operand()?;
        Ok(Comparison { lhs, op, rhs })
    }

    /// operand := term ('*' term)*
    fn operand(&mut self) -> Result<Operand, GeoProcError> {
        let mut lhs = self.term()?;
        while self.peek() == Some(&Token::Star) {
            self.next();
            let rhs = self.term()?;
            lhs = Operand::Mul(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Operand, GeoProcError> {
        match self.next() {
            Some(Token::Field(name)) => Ok(Operand::Field(name.clone())),
            Some(Token::Number(v)) => Ok(Operand::Number(*v)),
            Some(Token::Open) => {
                let inner = self.operand()?;
                match self.next() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err(self.error()),
                }
            }
            _ => Err(self.error()),
        }
    }
}
