//! Parser for the small expression language used inside templates.
//!
//! ```text
//! expr  := string | integer | call | path
//! call  := ident '(' [expr (',' expr)*] ')'
//! path  := ident ('.' ident)*
//! ```
//!
//! `@format` bodies are text with `{expr}` or `{expr:strftime}` placeholders;
//! `{{` and `}}` stand for literal braces.

/// A parsed expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Str(String),
    Int(i64),
    Path(Vec<String>),
    Call { name: String, args: Vec<Expr> },
}

/// One piece of an `@format` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Placeholder { expr: Expr, spec: Option<String> },
}

/// Parse a standalone expression (the body of an `@eval` template).
pub fn parse_expr(source: &str) -> Result<Expr, String> {
    let mut parser = Parser::new(source);
    let expr = parser.expr()?;
    parser.skip_ws();
    if let Some(c) = parser.peek() {
        return Err(format!(
            "unexpected '{c}' at position {} in '{source}'",
            parser.pos
        ));
    }
    Ok(expr)
}

/// Split an `@format` body into literal text and placeholders.
pub fn parse_format(source: &str) -> Result<Vec<Segment>, String> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut chars = source.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '{' if matches!(chars.peek(), Some((_, '{'))) => {
                chars.next();
                text.push('{');
            }
            '}' if matches!(chars.peek(), Some((_, '}'))) => {
                chars.next();
                text.push('}');
            }
            '}' => return Err(format!("unmatched '}}' at position {i}")),
            '{' => {
                let start = i + 1;
                let end = placeholder_end(source, start)
                    .ok_or_else(|| format!("unclosed '{{' at position {i}"))?;
                let (expr_src, spec) = split_spec(&source[start..end]);
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Placeholder {
                    expr: parse_expr(expr_src)?,
                    spec: spec.map(str::to_owned),
                });
                // Skip the consumed placeholder body and its closing brace.
                while let Some(&(j, _)) = chars.peek() {
                    if j > end {
                        break;
                    }
                    chars.next();
                }
            }
            other => text.push(other),
        }
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

/// Byte index of the `}` closing a placeholder that starts at `start`.
/// Braces inside quoted strings do not count.
fn placeholder_end(source: &str, start: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (offset, c) in source[start..].char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '}') => return Some(start + offset),
            (None, _) => {}
        }
    }
    None
}

/// Split `expr:spec` at the first colon outside quotes and parentheses.
fn split_spec(body: &str) -> (&str, Option<&str>) {
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ':') if depth == 0 => return (&body[..i], Some(&body[i + 1..])),
            (None, _) => {}
        }
    }
    (body, None)
}

// ── Recursive-descent parser ──────────────────────────────────────────────────

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    const fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, want: char) -> Result<(), String> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(format!("expected '{want}' but found '{c}'")),
            None => Err(format!("expected '{want}' but input ended")),
        }
    }

    fn expr(&mut self) -> Result<Expr, String> {
        self.skip_ws();
        match self.peek() {
            Some(q @ ('\'' | '"')) => self.string(q),
            Some(c) if c.is_ascii_digit() || c == '-' => self.integer(),
            Some(c) if is_ident_start(c) => self.path_or_call(),
            Some(c) => Err(format!("unexpected '{c}' at position {}", self.pos)),
            None => Err("empty expression".into()),
        }
    }

    fn string(&mut self, quote: char) -> Result<Expr, String> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some(c) => out.push(c),
                    None => return Err("unterminated escape in string literal".into()),
                },
                Some(c) if c == quote => return Ok(Expr::Str(out)),
                Some(c) => out.push(c),
                None => return Err("unterminated string literal".into()),
            }
        }
    }

    fn integer(&mut self) -> Result<Expr, String> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        let digits = &self.src[start..self.pos];
        digits
            .parse()
            .map(Expr::Int)
            .map_err(|_| format!("invalid integer '{digits}'"))
    }

    fn ident(&mut self) -> Result<String, String> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            Some(c) if is_ident_start(c) => {
                self.bump();
            }
            Some(c) => return Err(format!("expected a name but found '{c}'")),
            None => return Err("expected a name but input ended".into()),
        }
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        Ok(self.src[start..self.pos].to_owned())
    }

    fn path_or_call(&mut self) -> Result<Expr, String> {
        let first = self.ident()?;
        self.skip_ws();

        if self.peek() == Some('(') {
            self.bump();
            let args = self.arguments()?;
            return Ok(Expr::Call { name: first, args });
        }

        let mut path = vec![first];
        while self.peek() == Some('.') {
            self.bump();
            path.push(self.ident()?);
            self.skip_ws();
        }
        if self.peek() == Some('(') {
            return Err(format!("'{}' is not callable", path.join(".")));
        }
        Ok(Expr::Path(path))
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();
        self.skip_ws();
        if self.peek() == Some(')') {
            self.bump();
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            self.skip_ws();
            if self.peek() != Some(',') {
                break;
            }
            self.bump();
        }
        self.expect(')')?;
        Ok(args)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(parts: &[&str]) -> Expr {
        Expr::Path(parts.iter().map(|s| (*s).to_string()).collect())
    }

    #[test]
    fn parses_paths() {
        assert_eq!(parse_expr("this.tz").unwrap(), path(&["this", "tz"]));
        assert_eq!(parse_expr(" base_dir ").unwrap(), path(&["base_dir"]));
    }

    #[test]
    fn parses_calls_with_arguments() {
        assert_eq!(
            parse_expr("now('Asia/Kolkata')").unwrap(),
            Expr::Call {
                name: "now".into(),
                args: vec![Expr::Str("Asia/Kolkata".into())],
            }
        );
        assert_eq!(
            parse_expr("upper(this.name)").unwrap(),
            Expr::Call {
                name: "upper".into(),
                args: vec![path(&["this", "name"])],
            }
        );
        assert_eq!(
            parse_expr("now()").unwrap(),
            Expr::Call {
                name: "now".into(),
                args: vec![],
            }
        );
    }

    #[test]
    fn rejects_trailing_input_and_bad_calls() {
        assert!(parse_expr("now() extra").is_err());
        assert!(parse_expr("this.tz()").is_err());
        assert!(parse_expr("now('UTC'").is_err());
        assert!(parse_expr("'open").is_err());
        assert!(parse_expr("").is_err());
    }

    #[test]
    fn format_splits_text_and_placeholders() {
        let segments = parse_format("{base_dir}/logs/{date_partition}").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Placeholder {
                    expr: path(&["base_dir"]),
                    spec: None,
                },
                Segment::Text("/logs/".into()),
                Segment::Placeholder {
                    expr: path(&["date_partition"]),
                    spec: None,
                },
            ]
        );
    }

    #[test]
    fn format_spec_is_split_outside_quotes() {
        let segments = parse_format("{now('Etc/GMT+5'):%H:%M}").unwrap();
        assert_eq!(
            segments,
            vec![Segment::Placeholder {
                expr: Expr::Call {
                    name: "now".into(),
                    args: vec![Expr::Str("Etc/GMT+5".into())],
                },
                spec: Some("%H:%M".into()),
            }]
        );
    }

    #[test]
    fn doubled_braces_are_literal() {
        let segments = parse_format("{{literal}} {project_name}").unwrap();
        assert_eq!(segments[0], Segment::Text("{literal} ".into()));
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn unbalanced_braces_are_errors() {
        assert!(parse_format("{base_dir").is_err());
        assert!(parse_format("oops}").is_err());
    }
}
