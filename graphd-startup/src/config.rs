// Config files use the same line-oriented, brace-delimited shape as the
// wire protocol's own request grammar (spec.md §1 notes the wire
// lexer/AST itself is out of scope, but the config file is read with
// the same recursive-descent technique applied to directives instead of
// query terms): bare-word or quoted-string values, semicolon-terminated
// statements, and `{ ... }` blocks that nest.
//
//   database-path "/var/graphd/db";
//   port 8100;
//   replica {
//       of "master.example.com:8100";
//       write-through true;
//   }

use std::path::PathBuf;

use graphd_base::{err, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Number(i64),
    Bare(String),
}

impl Value {
    pub fn as_str(&self) -> &str {
        match self {
            Value::String(s) | Value::Bare(s) => s,
            Value::Number(_) => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub name: String,
    pub args: Vec<Value>,
    pub children: Vec<Directive>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tok<'a> {
    Ident(&'a str),
    Str(&'a str),
    Num(i64),
    LBrace,
    RBrace,
    Semi,
}

fn tokenize(text: &str) -> Result<Vec<Tok<'_>>> {
    let mut toks = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            c if c.is_whitespace() => i += 1,
            '#' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            '{' => {
                toks.push(Tok::LBrace);
                i += 1;
            }
            '}' => {
                toks.push(Tok::RBrace);
                i += 1;
            }
            ';' => {
                toks.push(Tok::Semi);
                i += 1;
            }
            '"' => {
                let start = i + 1;
                let mut j = start;
                while j < bytes.len() && bytes[j] != b'"' {
                    j += 1;
                }
                if j >= bytes.len() {
                    return Err(err("unterminated string literal in config"));
                }
                toks.push(Tok::Str(&text[start..j]));
                i = j + 1;
            }
            c if c.is_ascii_digit() || (c == '-' && i + 1 < bytes.len() && (bytes[i + 1] as char).is_ascii_digit()) => {
                let start = i;
                i += 1;
                while i < bytes.len() && (bytes[i] as char).is_ascii_digit() {
                    i += 1;
                }
                let n: i64 = text[start..i]
                    .parse()
                    .map_err(|_| err("malformed number in config"))?;
                toks.push(Tok::Num(n));
            }
            _ => {
                let start = i;
                while i < bytes.len() {
                    let c = bytes[i] as char;
                    if c.is_whitespace() || matches!(c, '{' | '}' | ';' | '"' | '#') {
                        break;
                    }
                    i += 1;
                }
                toks.push(Tok::Ident(&text[start..i]));
            }
        }
    }
    Ok(toks)
}

/// Recursive-descent parse of a token stream into a directive tree.
/// `parse_block` consumes statements until it hits an unmatched `}` (or
/// the end of input at the top level).
fn parse_block<'a>(toks: &[Tok<'a>], pos: &mut usize) -> Result<Vec<Directive>> {
    let mut directives = Vec::new();
    while *pos < toks.len() {
        match toks[*pos] {
            Tok::RBrace => return Ok(directives),
            Tok::Ident(name) => {
                *pos += 1;
                let mut args = Vec::new();
                loop {
                    match toks.get(*pos) {
                        Some(Tok::Str(s)) => {
                            args.push(Value::String((*s).to_string()));
                            *pos += 1;
                        }
                        Some(Tok::Num(n)) => {
                            args.push(Value::Number(*n));
                            *pos += 1;
                        }
                        Some(Tok::Ident(s)) => {
                            args.push(Value::Bare((*s).to_string()));
                            *pos += 1;
                        }
                        _ => break,
                    }
                }
                let children = match toks.get(*pos) {
                    Some(Tok::LBrace) => {
                        *pos += 1;
                        let inner = parse_block(toks, pos)?;
                        if toks.get(*pos) != Some(&Tok::RBrace) {
                            return Err(err("unterminated block in config"));
                        }
                        *pos += 1;
                        inner
                    }
                    Some(Tok::Semi) => {
                        *pos += 1;
                        Vec::new()
                    }
                    _ => return Err(err("expected ';' or '{' after config directive")),
                };
                directives.push(Directive { name: name.to_string(), args, children });
            }
            _ => return Err(err("unexpected token in config")),
        }
    }
    Ok(directives)
}

pub fn parse_directives(text: &str) -> Result<Vec<Directive>> {
    let toks = tokenize(text)?;
    let mut pos = 0;
    let directives = parse_block(&toks, &mut pos)?;
    if pos != toks.len() {
        return Err(err("unexpected closing brace in config"));
    }
    Ok(directives)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaConfig {
    pub of: String,
    pub write_through: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: PathBuf,
    pub port: u16,
    pub log_level: String,
    pub replica: Option<ReplicaConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from("/var/lib/graphd/db"),
            port: 8100,
            log_level: "info".to_string(),
            replica: None,
        }
    }
}

impl Config {
    pub fn from_text(text: &str) -> Result<Config> {
        let directives = parse_directives(text)?;
        let mut config = Config::default();
        for directive in &directives {
            config.apply(directive)?;
        }
        Ok(config)
    }

    fn apply(&mut self, directive: &Directive) -> Result<()> {
        match directive.name.as_str() {
            "database-path" => {
                let value = directive.args.first().ok_or_else(|| err("database-path needs a value"))?;
                self.database_path = PathBuf::from(value.as_str());
            }
            "port" => {
                let Some(Value::Number(n)) = directive.args.first() else {
                    return Err(err("port needs a numeric value"));
                };
                self.port = u16::try_from(*n).map_err(|_| err("port out of range"))?;
            }
            "log-level" => {
                let value = directive.args.first().ok_or_else(|| err("log-level needs a value"))?;
                self.log_level = value.as_str().to_string();
            }
            "replica" => {
                let mut of = None;
                let mut write_through = false;
                for child in &directive.children {
                    match child.name.as_str() {
                        "of" => {
                            of = child.args.first().map(|v| v.as_str().to_string());
                        }
                        "write-through" => {
                            write_through = matches!(child.args.first(), Some(Value::Bare(s)) if s == "true");
                        }
                        _ => return Err(err("unknown directive inside replica block")),
                    }
                }
                let of = of.ok_or_else(|| err("replica block needs an 'of' directive"))?;
                self.replica = Some(ReplicaConfig { of, write_through });
            }
            other => return Err(err(format!("unknown config directive: {other}"))),
        }
        Ok(())
    }
}
