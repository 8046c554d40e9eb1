// query/parser.rs - PQL 语法解析器
//! 文本 <-> 语法树
//!
//! 支持的语法:
//! - 过滤: eq(donor.gender,"male"), in(donor.gender,"male","female")
//! - 组合: and(eq(...),in(...))
//! - 投影: select(*), select(transcripts,consequences)
//! - 聚合开关: facets(*)
//! - 排序: sort(+donor.age,-donor.gender,type)（无符号默认升序）
//! - 分页: limit(from) 或 limit(from,size)
//! - 计数: count(...)，只能出现在顶层
//!
//! 顶层节点之间用逗号分隔，序列化结果不含空白。

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::*;
use crate::engine::{PqlError, PqlResult};

// 正则表达式预编译
static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^\s*(?:(?P<punct>[(),])|"(?P<string>(?:[^"\\]|\\.)*)"|(?P<number>-?[0-9]+(?:\.[0-9]+)?(?:[eE][+-]?[0-9]+)?)|(?P<word>[A-Za-z_*+\-][A-Za-z0-9_.*\-]*))"#,
    )
    .unwrap()
});

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    Comma,
    Str(String),
    Number(Scalar),
    Word(String),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::LParen => "`(`".to_string(),
            Token::RParen => "`)`".to_string(),
            Token::Comma => "`,`".to_string(),
            Token::Str(s) => format!("string \"{}\"", s),
            Token::Number(n) => format!("number {}", n),
            Token::Word(w) => format!("`{}`", w),
        }
    }
}

/// 解析 PQL 文本，返回顶层节点列表
pub fn parse(input: &str) -> PqlResult<Vec<Node>> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0, end: input.len() };
    parser.parse_query()
}

/// 将节点列表序列化为 PQL 文本
pub fn serialize(nodes: &[Node]) -> String {
    nodes.iter().map(node_to_pql).collect::<Vec<_>>().join(",")
}

fn tokenize(input: &str) -> PqlResult<Vec<(usize, Token)>> {
    let mut tokens = Vec::new();
    let mut offset = 0;

    while offset < input.len() {
        let rest = &input[offset..];
        if rest.trim().is_empty() {
            break;
        }
        let cap = TOKEN_PATTERN.captures(rest).ok_or_else(|| {
            let skipped = rest.len() - rest.trim_start().len();
            PqlError::parse(offset + skipped, "unexpected character")
        })?;
        let full = cap.get(0).unwrap();
        let start = offset + (full.as_str().len() - full.as_str().trim_start().len());

        let token = if let Some(p) = cap.name("punct") {
            match p.as_str() {
                "(" => Token::LParen,
                ")" => Token::RParen,
                _ => Token::Comma,
            }
        } else if let Some(s) = cap.name("string") {
            Token::Str(unescape(s.as_str()))
        } else if let Some(n) = cap.name("number") {
            Token::Number(parse_number(n.as_str(), start)?)
        } else {
            // 正则保证四个分支必有一个命中
            Token::Word(cap.name("word").map(|w| w.as_str().to_string()).unwrap_or_default())
        };

        tokens.push((start, token));
        offset += full.end();
    }

    Ok(tokens)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_number(raw: &str, position: usize) -> PqlResult<Scalar> {
    if raw.contains(['.', 'e', 'E']) {
        let value = raw
            .parse::<f64>()
            .map_err(|e| PqlError::parse(position, format!("invalid number `{}`: {}", raw, e)))?;
        // inf / NaN 无法序列化回 PQL 数字
        if !value.is_finite() {
            return Err(PqlError::parse(position, format!("number `{}` is out of range", raw)));
        }
        Ok(Scalar::Float(value))
    } else {
        raw.parse::<i64>()
            .map(Scalar::Int)
            .map_err(|e| PqlError::parse(position, format!("invalid number `{}`: {}", raw, e)))
    }
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    /// 输入长度，用于报告“意外结束”的位置
    end: usize,
}

impl Parser {
    fn parse_query(&mut self) -> PqlResult<Vec<Node>> {
        let mut nodes = Vec::new();
        if self.peek().is_none() {
            return Ok(nodes);
        }
        loop {
            nodes.push(self.parse_node(true)?);
            match self.next() {
                None => return Ok(nodes),
                Some((_, Token::Comma)) => continue,
                Some((at, token)) => {
                    return Err(PqlError::parse(at, format!("expected `,` but found {}", token.describe())));
                }
            }
        }
    }

    fn parse_node(&mut self, top_level: bool) -> PqlResult<Node> {
        let (at, name) = self.expect_word()?;
        self.expect(Token::LParen)?;

        let node = match name.to_ascii_lowercase().as_str() {
            "and" => Node::And(self.separated(|p| p.parse_node(false))?),
            "count" => {
                if !top_level {
                    return Err(PqlError::parse(at, "count() is only allowed at the top level"));
                }
                Node::Count(self.separated(|p| p.parse_node(false))?)
            }
            "eq" => {
                let field = self.expect_word()?.1;
                self.expect(Token::Comma)?;
                let value = self.expect_value()?;
                self.expect(Token::RParen)?;
                Node::Term { op: TermOp::Eq, field, values: vec![value] }
            }
            "in" => {
                let field = self.expect_word()?.1;
                let mut values = Vec::new();
                while self.eat(&Token::Comma) {
                    values.push(self.expect_value()?);
                }
                self.expect(Token::RParen)?;
                if values.is_empty() {
                    return Err(PqlError::parse(at, "in() requires at least one value"));
                }
                Node::Term { op: TermOp::In, field, values }
            }
            "select" => Node::Select(self.separated(|p| p.expect_word().map(|(_, w)| w))?),
            "facets" => Node::Facets(self.separated(|p| p.expect_word().map(|(_, w)| w))?),
            "sort" => Node::Sort(self.separated(|p| p.expect_word().map(|(_, w)| sort_spec(&w)))?),
            "limit" => {
                let numbers = self.separated(|p| p.expect_index())?;
                match numbers.as_slice() {
                    [] => Node::Limit(Limit::default()),
                    [from] => Node::Limit(Limit { from: Some(*from), size: None }),
                    [from, size] => Node::Limit(Limit::new(*from, *size)),
                    _ => return Err(PqlError::parse(at, "limit() takes at most two arguments")),
                }
            }
            other => return Err(PqlError::parse(at, format!("unknown operator `{}`", other))),
        };

        Ok(node)
    }

    /// 解析逗号分隔的参数，直到 `)`
    fn separated<T, F>(&mut self, mut item: F) -> PqlResult<Vec<T>>
    where
        F: FnMut(&mut Self) -> PqlResult<T>,
    {
        let mut items = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(items);
        }
        loop {
            items.push(item(self)?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(Token::RParen)?;
            return Ok(items);
        }
    }

    fn expect_value(&mut self) -> PqlResult<Scalar> {
        match self.next() {
            Some((_, Token::Str(s))) => Ok(Scalar::Str(s)),
            Some((_, Token::Number(n))) => Ok(n),
            Some((_, Token::Word(w))) => Ok(match w.as_str() {
                "true" => Scalar::Bool(true),
                "false" => Scalar::Bool(false),
                _ => Scalar::Str(w),
            }),
            Some((at, token)) => Err(PqlError::parse(at, format!("expected a value but found {}", token.describe()))),
            None => Err(PqlError::parse(self.end, "expected a value but reached end of input")),
        }
    }

    fn expect_index(&mut self) -> PqlResult<u64> {
        match self.next() {
            Some((at, Token::Number(Scalar::Int(n)))) => {
                u64::try_from(n).map_err(|_| PqlError::parse(at, format!("expected a non-negative integer, found {}", n)))
            }
            Some((at, token)) => Err(PqlError::parse(at, format!("expected an integer but found {}", token.describe()))),
            None => Err(PqlError::parse(self.end, "expected an integer but reached end of input")),
        }
    }

    fn expect_word(&mut self) -> PqlResult<(usize, String)> {
        match self.next() {
            Some((at, Token::Word(w))) => Ok((at, w)),
            Some((at, token)) => Err(PqlError::parse(at, format!("expected a name but found {}", token.describe()))),
            None => Err(PqlError::parse(self.end, "expected a name but reached end of input")),
        }
    }

    fn expect(&mut self, expected: Token) -> PqlResult<()> {
        match self.next() {
            Some((_, token)) if token == expected => Ok(()),
            Some((at, token)) => Err(PqlError::parse(
                at,
                format!("expected {} but found {}", expected.describe(), token.describe()),
            )),
            None => Err(PqlError::parse(
                self.end,
                format!("expected {} but reached end of input", expected.describe()),
            )),
        }
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn next(&mut self) -> Option<(usize, Token)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }
}

fn sort_spec(word: &str) -> SortSpec {
    if let Some(field) = word.strip_prefix('-') {
        SortSpec::desc(field)
    } else {
        SortSpec::asc(word.strip_prefix('+').unwrap_or(word))
    }
}

fn node_to_pql(node: &Node) -> String {
    match node {
        Node::And(values) => format!("and({})", serialize(values)),
        Node::Count(values) => format!("count({})", serialize(values)),
        Node::Term { op, field, values } => {
            let mut parts = vec![field.clone()];
            parts.extend(values.iter().map(|v| v.to_string()));
            format!("{}({})", op.name(), parts.join(","))
        }
        Node::Select(fields) => format!("select({})", fields.join(",")),
        Node::Facets(fields) => format!("facets({})", fields.join(",")),
        Node::Sort(specs) => {
            let specs: Vec<String> = specs.iter().map(|s| s.to_string()).collect();
            format!("sort({})", specs.join(","))
        }
        Node::Limit(limit) => match (limit.from, limit.size) {
            (Some(from), Some(size)) => format!("limit({},{})", from, size),
            (Some(from), None) => format!("limit({})", from),
            (None, Some(size)) => format!("limit(0,{})", size),
            (None, None) => "limit()".to_string(),
        },
    }
}
