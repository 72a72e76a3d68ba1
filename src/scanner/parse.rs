//! Import-header parser for Go source files.
//!
//! Reads the package clause and the import declarations that follow it, and
//! stops at the first other top-level declaration. Function bodies are never
//! looked at.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

/// One `import` spec, e.g. `json "encoding/json"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Local name: an identifier, `_` or `.`.
    pub name: Option<String>,
    pub path: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

type ParseResult<T> = Result<T, ParseError>;

/// Parse the import header of a single file.
pub fn parse_imports(src: &str) -> ParseResult<Vec<ImportSpec>> {
    let mut cur = Cursor::new(src);

    cur.skip_trivia(true)?;
    let keyword = cur.ident();
    if keyword.as_deref() != Some("package") {
        return Err(cur.error("expected 'package' clause"));
    }
    cur.skip_trivia(false)?;
    if cur.ident().is_none() {
        return Err(cur.error("expected package name"));
    }
    cur.end_of_statement()?;

    let mut specs = Vec::new();
    loop {
        cur.skip_trivia(true)?;
        // `ident` consumes, so peek on a copy before committing.
        let mut lookahead = cur.clone();
        if lookahead.ident().as_deref() != Some("import") {
            break;
        }
        cur = lookahead;
        cur.skip_trivia(true)?;

        if cur.eat('(') {
            loop {
                cur.skip_trivia(true)?;
                if cur.eat(')') {
                    break;
                }
                if cur.at_end() {
                    return Err(cur.error("unterminated import group"));
                }
                specs.push(cur.import_spec()?);
                let ended = cur.skip_trivia(false)?;
                if ended || cur.peek() == Some(')') {
                    continue;
                }
                cur.end_of_statement()?;
            }
            cur.end_of_statement()?;
        } else {
            specs.push(cur.import_spec()?);
            cur.end_of_statement()?;
        }
    }

    Ok(specs)
}

#[derive(Clone)]
struct Cursor<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        let src = src.strip_prefix('\u{feff}').unwrap_or(src);
        Self {
            src,
            chars: src.char_indices().peekable(),
            line: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.line,
            message: message.into(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn at_end(&mut self) -> bool {
        self.peek().is_none()
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn eat(&mut self, want: char) -> bool {
        if self.peek() == Some(want) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn rest(&mut self) -> &'a str {
        match self.chars.peek() {
            Some(&(i, _)) => &self.src[i..],
            None => "",
        }
    }

    /// Skip blanks and comments. Newlines are only crossed when asked to;
    /// a block comment spanning lines counts as a newline.
    fn skip_trivia(&mut self, newlines: bool) -> ParseResult<bool> {
        let mut crossed = false;
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r') => {
                    self.bump();
                }
                Some('\n') if newlines => {
                    self.bump();
                    crossed = true;
                }
                Some('/') if self.rest().starts_with("//") => {
                    while !matches!(self.peek(), None | Some('\n')) {
                        self.bump();
                    }
                }
                Some('/') if self.rest().starts_with("/*") => {
                    let start = self.line;
                    self.bump();
                    self.bump();
                    loop {
                        if self.rest().starts_with("*/") {
                            self.bump();
                            self.bump();
                            break;
                        }
                        if self.bump().is_none() {
                            return Err(ParseError {
                                line: start,
                                message: "unterminated block comment".to_string(),
                            });
                        }
                    }
                    if self.line != start {
                        if !newlines {
                            return Ok(true);
                        }
                        crossed = true;
                    }
                }
                _ => return Ok(crossed),
            }
        }
    }

    fn ident(&mut self) -> Option<String> {
        let first = self.peek()?;
        if !(first == '_' || first.is_alphabetic()) {
            return None;
        }
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == '_' || c.is_alphanumeric() {
                out.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Some(out)
    }

    /// A statement ends at `;`, a newline, or end of input.
    fn end_of_statement(&mut self) -> ParseResult<()> {
        if self.skip_trivia(false)? {
            return Ok(());
        }
        match self.peek() {
            None => Ok(()),
            Some(';') | Some('\n') => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.error(format!("unexpected {c:?} after declaration"))),
        }
    }

    fn import_spec(&mut self) -> ParseResult<ImportSpec> {
        let name = if self.eat('.') {
            Some(".".to_string())
        } else {
            self.ident()
        };
        if name.is_some() {
            self.skip_trivia(false)?;
        }
        let line = self.line;
        let path = match self.peek() {
            Some('"') => self.interpreted_string()?,
            Some('`') => self.raw_string()?,
            _ => return Err(self.error("missing import path")),
        };
        validate_import_path(&path).map_err(|m| ParseError { line, message: m })?;
        Ok(ImportSpec { name, path, line })
    }

    fn raw_string(&mut self) -> ParseResult<String> {
        let line = self.line;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('`') => return Ok(out),
                Some('\r') => {}
                Some(c) => out.push(c),
                None => {
                    return Err(ParseError {
                        line,
                        message: "unterminated raw string literal".to_string(),
                    });
                }
            }
        }
    }

    fn interpreted_string(&mut self) -> ParseResult<String> {
        let line = self.line;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\n') | None => {
                    return Err(ParseError {
                        line,
                        message: "unterminated string literal".to_string(),
                    });
                }
                Some('\\') => out.push(self.escape()?),
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self) -> ParseResult<char> {
        let c = self.bump().ok_or_else(|| self.error("unterminated escape"))?;
        let simple = match c {
            'a' => Some('\u{7}'),
            'b' => Some('\u{8}'),
            'f' => Some('\u{c}'),
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            'v' => Some('\u{b}'),
            '\\' => Some('\\'),
            '"' => Some('"'),
            _ => None,
        };
        if let Some(ch) = simple {
            return Ok(ch);
        }
        let (digits, radix) = match c {
            'x' => (2, 16),
            'u' => (4, 16),
            'U' => (8, 16),
            '0'..='7' => (2, 8),
            _ => return Err(self.error(format!("unknown escape sequence \\{c}"))),
        };
        let mut value = if radix == 8 { c.to_digit(8).unwrap_or(0) } else { 0 };
        for _ in 0..digits {
            let d = self
                .bump()
                .and_then(|d| d.to_digit(radix))
                .ok_or_else(|| self.error("invalid escape sequence"))?;
            value = value * radix + d;
        }
        char::from_u32(value).ok_or_else(|| self.error("escape is not a valid character"))
    }
}

/// Characters the Go toolchain refuses in import paths.
const INVALID_PATH_CHARS: &str = "!\"#$%&'()*,:;<=>?[\\]^{|}`\u{fffd}";

fn validate_import_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("empty import path".to_string());
    }
    if let Some(c) = path
        .chars()
        .find(|&c| c.is_whitespace() || c.is_control() || INVALID_PATH_CHARS.contains(c))
    {
        return Err(format!("invalid import path {path:?}: illegal character {c:?}"));
    }
    Ok(())
}
