//! Corefile tokens and the cursor plugins parse them with

use crate::error::ConfigError;

/// A single Corefile token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub line: usize,
}

/// Split Corefile text into tokens
///
/// Tokens are separated by whitespace. `#` starts a comment running to the end
/// of the line, and double quotes group text (including newlines) into one
/// token, with `\"` escaping a quote.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ConfigError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    let mut line = 1;

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            '#' => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '"' => {
                let start = line;
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') if chars.peek() == Some(&'"') => {
                            chars.next();
                            text.push('"');
                        }
                        Some(c) => {
                            if c == '\n' {
                                line += 1;
                            }
                            text.push(c);
                        }
                        None => return Err(ConfigError::UnterminatedQuote { line: start }),
                    }
                }
                tokens.push(Token { text, line: start });
            }
            c => {
                let mut text = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() {
                        break;
                    }
                    text.push(next);
                    chars.next();
                }
                tokens.push(Token { text, line });
            }
        }
    }

    Ok(tokens)
}

/// Cursor over the tokens of one plugin's directives
///
/// The cursor starts before the first token; call [`next`](Self::next) to load
/// the directive name.
#[derive(Clone, Debug)]
pub struct Dispenser {
    tokens: Vec<Token>,
    cursor: Option<usize>,
    nesting: usize,
}

impl Dispenser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            cursor: None,
            nesting: 0,
        }
    }

    /// Tokenize `input` and wrap the tokens in a dispenser
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(tokenize(input)?))
    }

    fn current(&self) -> Option<&Token> {
        self.cursor.and_then(|c| self.tokens.get(c))
    }

    fn peek(&self) -> Option<&Token> {
        let next = self.cursor.map_or(0, |c| c + 1);
        self.tokens.get(next)
    }

    /// Advance to the next token, returning false at the end of input
    pub fn next(&mut self) -> bool {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next < self.tokens.len() {
            self.cursor = Some(next);
            true
        } else {
            false
        }
    }

    /// Advance through the block that follows the current token
    ///
    /// Returns true while positioned on a line inside the block, leaving the
    /// cursor on the first token of that line.
    pub fn next_block(&mut self) -> bool {
        if self.nesting > 0 {
            if !self.next() {
                return false;
            }
            if self.val() == "}" {
                self.nesting -= 1;
                return false;
            }
            return true;
        }

        let opens_block = match (self.current(), self.peek()) {
            (Some(current), Some(next)) => current.line == next.line && next.text == "{",
            _ => false,
        };
        if !opens_block {
            return false;
        }
        self.next();
        if !self.next() {
            return false;
        }
        if self.val() == "}" {
            return false;
        }
        self.nesting += 1;
        true
    }

    /// Text of the current token, or an empty string before the first token
    pub fn val(&self) -> &str {
        self.current().map(|t| t.text.as_str()).unwrap_or_default()
    }

    /// Line of the current token
    pub fn line(&self) -> usize {
        self.current().map(|t| t.line).unwrap_or_default()
    }

    /// Collect the remaining tokens on the current line, stopping before `{`
    pub fn remaining_args(&mut self) -> Vec<String> {
        let mut args = Vec::new();
        while let Some(next) = self.peek() {
            let same_line = self.current().is_some_and(|c| c.line == next.line);
            if !same_line || next.text == "{" || next.text == "}" {
                break;
            }
            self.next();
            args.push(self.val().to_string());
        }
        args
    }

    /// Error for a directive with the wrong number of arguments
    pub fn arg_err(&self) -> ConfigError {
        ConfigError::ArgumentCount {
            line: self.line(),
            token: self.val().to_string(),
        }
    }
}
