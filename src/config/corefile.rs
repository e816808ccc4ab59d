//! Selection of one plugin's directives from a whole Corefile

use crate::config::dispenser::{Dispenser, Token, tokenize};
use crate::error::ConfigError;

/// Collect every `plugin` directive from the server blocks of a Corefile
///
/// Each occurrence keeps its arguments and its block, so the returned
/// dispenser sees the directives exactly as a plugin's setup function would.
pub fn extract(input: &str, plugin: &str) -> Result<Dispenser, ConfigError> {
    let tokens = tokenize(input)?;
    let mut selected = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        match token.text.as_str() {
            "{" => depth += 1,
            "}" => {
                depth = depth
                    .checked_sub(1)
                    .ok_or(ConfigError::UnbalancedBrace { line: token.line })?;
            }
            text if depth == 1 && text == plugin && starts_line(&tokens, i) => {
                i = take_directive(&tokens, i, &mut selected);
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    if depth != 0 {
        let line = tokens.last().map(|t| t.line).unwrap_or_default();
        return Err(ConfigError::UnbalancedBrace { line });
    }

    Ok(Dispenser::new(selected))
}

fn starts_line(tokens: &[Token], i: usize) -> bool {
    i == 0 || tokens[i - 1].line != tokens[i].line
}

/// Copy the directive starting at `start` into `out`, returning the index of
/// the first token after it
fn take_directive(tokens: &[Token], start: usize, out: &mut Vec<Token>) -> usize {
    let line = tokens[start].line;
    let mut nested = 0usize;
    let mut j = start;

    while let Some(token) = tokens.get(j) {
        if nested == 0 && j > start && token.line != line {
            break;
        }
        match token.text.as_str() {
            "{" => nested += 1,
            // Closes the enclosing server block, leave it to the caller
            "}" if nested == 0 => break,
            "}" => {
                nested -= 1;
                if nested == 0 {
                    out.push(token.clone());
                    return j + 1;
                }
            }
            _ => {}
        }
        out.push(token.clone());
        j += 1;
    }
    j
}
