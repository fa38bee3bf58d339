// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static allowlist over user-supplied snippets.
//!
//! A small token walker, not a semantic analysis: it tokenises the
//! source (comments and string contents set aside) and checks imports,
//! a handful of banned calls, and `open()` targets. A source that cannot
//! be tokenised is allowed through; the child's runtime import hook and
//! kernel resource limits are the backstop.

/// Standard-library module roots user code may import.
pub const ALLOWED_IMPORTS: &[&str] = &[
    "json",
    "csv",
    "os",
    "time",
    "math",
    "statistics",
    "random",
];

/// Builtins that must never be called directly.
const BANNED_CALLS: &[&str] = &["eval", "exec", "compile", "input", "breakpoint", "__import__"];

/// `os.<attr>(...)` calls that execute, destroy, or re-point the process.
const BANNED_OS_CALLS: &[&str] = &[
    "system",
    "popen",
    "spawnv",
    "spawnve",
    "spawnvp",
    "spawnvpe",
    "remove",
    "unlink",
    "rmdir",
    "removedirs",
    "rename",
    "renames",
    "chdir",
    "chmod",
    "chown",
];

/// The one file literal `open()` may name: the injected context file.
const CONTEXT_FILE: &str = "in.json";

/// The one variable `open()` may name: the bound dataset path.
const DATASET_VAR: &str = "dataset_path";

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Number,
    Punct(char),
    Newline,
}

/// Scan a snippet against the allowlist.
///
/// `Err(reason)` means the snippet must be rejected as a forbidden
/// import/call; `Ok(())` means the static pass found nothing (which
/// includes sources the tokeniser could not process).
pub fn scan(source: &str) -> Result<(), String> {
    let Some(tokens) = tokenize(source) else {
        return Ok(());
    };
    walk(&tokens)
}

fn walk(tokens: &[Token]) -> Result<(), String> {
    let mut i = 0;
    while i < tokens.len() {
        let prev = previous_significant(tokens, i);
        match &tokens[i] {
            Token::Ident(word) if word == "import" && !matches!(prev, Some(Token::Punct('.'))) => {
                check_import_list(tokens, i + 1)?;
            }
            Token::Ident(word) if word == "from" => {
                if let Some(Token::Ident(root)) = next_significant(tokens, i + 1) {
                    if !ALLOWED_IMPORTS.contains(&root.as_str()) {
                        return Err(format!("forbidden import: {root}"));
                    }
                }
                // A leading '.' is a relative import; nothing to check.
                // Skip past this statement's `import` keyword: the names it
                // introduces are not module roots.
                let mut j = i + 1;
                while j < tokens.len() {
                    match &tokens[j] {
                        Token::Newline | Token::Punct(';') => break,
                        Token::Ident(w) if w == "import" => {
                            i = j;
                            break;
                        }
                        _ => j += 1,
                    }
                }
            }
            Token::Ident(name)
                if BANNED_CALLS.contains(&name.as_str())
                    && !matches!(prev, Some(Token::Punct('.')))
                    && is_call(tokens, i + 1) =>
            {
                return Err(format!("forbidden call: {name}"));
            }
            Token::Ident(word) if word == "os" && !matches!(prev, Some(Token::Punct('.'))) => {
                if let Some((attr, after)) = attribute_of(tokens, i + 1) {
                    if BANNED_OS_CALLS.contains(&attr.as_str()) && is_call(tokens, after) {
                        return Err(format!("forbidden os call: os.{attr}"));
                    }
                }
            }
            Token::Ident(word)
                if word == "open"
                    && !matches!(prev, Some(Token::Punct('.')))
                    && is_call(tokens, i + 1) =>
            {
                check_open_call(tokens, i + 1)?;
            }
            _ => {}
        }
        i += 1;
    }
    Ok(())
}

/// Validate the module roots of `import a.b as c, d` style statements.
fn check_import_list(tokens: &[Token], mut i: usize) -> Result<(), String> {
    loop {
        match tokens.get(i) {
            Some(Token::Ident(root)) => {
                if !ALLOWED_IMPORTS.contains(&root.as_str()) {
                    return Err(format!("forbidden import: {root}"));
                }
            }
            _ => return Ok(()),
        }
        // Skip the dotted tail and any alias until ',' or end of statement.
        i += 1;
        loop {
            match tokens.get(i) {
                Some(Token::Punct(',')) => {
                    i += 1;
                    break;
                }
                Some(Token::Newline) | Some(Token::Punct(';')) | None => return Ok(()),
                _ => i += 1,
            }
        }
    }
}

/// Inspect the arguments of an `open(` call starting at the `(` token.
fn check_open_call(tokens: &[Token], open_paren: usize) -> Result<(), String> {
    let args = split_call_args(tokens, open_paren);
    let mut positionals: Vec<&[Token]> = Vec::new();
    let mut mode_arg: Option<&[Token]> = None;

    for arg in &args {
        match keyword_of(arg) {
            Some(("mode", rest)) => mode_arg = Some(rest),
            Some(_) => {} // encoding=, newline=, ... irrelevant
            None => positionals.push(arg.as_slice()),
        }
    }

    match positionals.first() {
        Some([Token::Str(path)]) if path == CONTEXT_FILE => {}
        Some([Token::Ident(name)]) if name == DATASET_VAR => {}
        _ => return Err("forbidden open target".to_string()),
    }

    if mode_arg.is_none() {
        if let Some(second) = positionals.get(1) {
            mode_arg = Some(second);
        }
    }
    if let Some(arg) = mode_arg {
        match arg {
            [Token::Str(mode)] if mode.chars().all(|c| matches!(c, 'r' | 'b' | 't')) => {}
            [Token::Str(mode)] => return Err(format!("forbidden open mode: {mode}")),
            _ => return Err("forbidden open mode".to_string()),
        }
    }
    Ok(())
}

/// Split a call's top-level arguments. `open_paren` indexes the `(`.
fn split_call_args(tokens: &[Token], open_paren: usize) -> Vec<Vec<Token>> {
    let mut args = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0usize;
    let mut i = open_paren;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Punct(c @ ('(' | '[' | '{')) => {
                depth += 1;
                if depth > 1 {
                    current.push(Token::Punct(*c));
                }
            }
            Token::Punct(c @ (')' | ']' | '}')) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
                current.push(Token::Punct(*c));
            }
            Token::Punct(',') if depth == 1 => {
                args.push(std::mem::take(&mut current));
                i += 1;
                continue;
            }
            Token::Newline => {}
            tok => current.push(tok.clone()),
        }
        i += 1;
    }
    if !current.is_empty() {
        args.push(current);
    }
    args
}

/// `name=<rest>` keyword argument, if this arg is one. `==` is not a keyword.
fn keyword_of(arg: &[Token]) -> Option<(&str, &[Token])> {
    match arg {
        [Token::Ident(name), Token::Punct('='), rest @ ..]
            if !matches!(rest.first(), Some(Token::Punct('='))) =>
        {
            Some((name.as_str(), rest))
        }
        _ => None,
    }
}

fn is_call(tokens: &[Token], i: usize) -> bool {
    matches!(next_significant(tokens, i), Some(Token::Punct('(')))
}

/// `.attr` immediately following, returning the attribute and the index after it.
fn attribute_of(tokens: &[Token], i: usize) -> Option<(String, usize)> {
    match (tokens.get(i), tokens.get(i + 1)) {
        (Some(Token::Punct('.')), Some(Token::Ident(attr))) => Some((attr.clone(), i + 2)),
        _ => None,
    }
}

fn next_significant(tokens: &[Token], mut i: usize) -> Option<&Token> {
    while let Some(tok) = tokens.get(i) {
        if *tok != Token::Newline {
            return Some(tok);
        }
        i += 1;
    }
    None
}

fn previous_significant(tokens: &[Token], i: usize) -> Option<&Token> {
    tokens[..i].iter().rev().find(|t| **t != Token::Newline)
}

/// Tokenise enough Python to walk imports and calls.
///
/// Returns `None` when the source cannot be processed (unterminated
/// string); the caller treats that as "analysis unavailable".
fn tokenize(source: &str) -> Option<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                tokens.push(Token::Newline);
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '\'' | '"' => {
                let (content, next) = read_string(&chars, i)?;
                tokens.push(Token::Str(content));
                i = next;
            }
            c if c.is_ascii_digit() => {
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                    i += 1;
                }
                tokens.push(Token::Number);
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                // String prefixes (r"", b'', f-strings) glue onto the literal.
                let is_prefix = word.len() <= 2
                    && word
                        .chars()
                        .all(|c| matches!(c.to_ascii_lowercase(), 'r' | 'b' | 'f' | 'u'));
                if is_prefix && matches!(chars.get(i), Some('\'' | '"')) {
                    let (content, next) = read_string(&chars, i)?;
                    tokens.push(Token::Str(content));
                    i = next;
                } else {
                    tokens.push(Token::Ident(word));
                }
            }
            c => {
                tokens.push(Token::Punct(c));
                i += 1;
            }
        }
    }
    Some(tokens)
}

/// Read a quoted literal starting at `start`; handles triple quotes and
/// backslash escapes. Returns the content and the index past the close.
fn read_string(chars: &[char], start: usize) -> Option<(String, usize)> {
    let quote = chars[start];
    let triple = chars.get(start + 1) == Some(&quote) && chars.get(start + 2) == Some(&quote);
    let mut i = start + if triple { 3 } else { 1 };
    let mut content = String::new();
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            if let Some(next) = chars.get(i + 1) {
                content.push(*next);
            }
            i += 2;
            continue;
        }
        if c == quote {
            if triple {
                if chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote) {
                    return Some((content, i + 3));
                }
            } else {
                return Some((content, i + 1));
            }
        }
        if !triple && c == '\n' {
            return None;
        }
        content.push(c);
        i += 1;
    }
    None
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
