use crate::error::{Result, ScoopError};

use super::lexer::{tokenize, Token};

/// Makes concatenation explicit and rejects patterns the shunting-yard pass
/// cannot turn into a well-formed postfix stream: unbalanced groups, empty
/// groups or alternatives, and quantifiers without an operand.
///
/// Error positions are token indices.
pub fn insert_concatenation(pattern: &str, tokens: &[Token]) -> Result<Vec<Token>> {
    let mut out = Vec::with_capacity(tokens.len() * 2);
    let mut depth = 0usize;
    let mut prev: Option<Token> = None;

    for (i, &token) in tokens.iter().enumerate() {
        let needs_operand = match prev {
            None | Some(Token::GroupOpen) | Some(Token::Alternate) => true,
            Some(_) => false,
        };

        if needs_operand && !token.starts_operand() {
            let message = match (prev, token) {
                (_, Token::GroupClose) if depth == 0 => "unbalanced ')'",
                (Some(Token::GroupOpen), Token::GroupClose) => "empty group",
                (_, Token::Alternate) => "empty alternative before '|'",
                (Some(Token::Alternate), Token::GroupClose) => "dangling '|'",
                _ => "quantifier without an operand",
            };
            return Err(ScoopError::pattern_syntax(pattern, i, message));
        }

        match token {
            Token::GroupOpen => depth += 1,
            Token::GroupClose => {
                if depth == 0 {
                    return Err(ScoopError::pattern_syntax(pattern, i, "unbalanced ')'"));
                }
                depth -= 1;
            }
            _ => {}
        }

        if let Some(p) = prev {
            if p.ends_operand() && token.starts_operand() {
                out.push(Token::Concat);
            }
        }
        out.push(token);
        prev = Some(token);
    }

    match prev {
        None => return Err(ScoopError::pattern_syntax(pattern, 0, "empty pattern")),
        Some(Token::Alternate) => {
            return Err(ScoopError::pattern_syntax(pattern, tokens.len(), "dangling '|'"));
        }
        _ => {}
    }
    if depth != 0 {
        return Err(ScoopError::pattern_syntax(
            pattern,
            tokens.len(),
            "unbalanced '('",
        ));
    }

    Ok(out)
}

/// Rewrites an explicit-concatenation infix stream into postfix order.
pub fn rearrange_to_postfix(pattern: &str, infix: &[Token]) -> Result<Vec<Token>> {
    let mut postfix = Vec::with_capacity(infix.len());
    let mut stack: Vec<Token> = Vec::new();

    for (i, &token) in infix.iter().enumerate() {
        match token {
            Token::Literal(_) | Token::Wildcard => postfix.push(token),
            Token::GroupOpen => stack.push(token),
            Token::GroupClose => loop {
                match stack.pop() {
                    Some(Token::GroupOpen) => break,
                    Some(op) => postfix.push(op),
                    None => {
                        return Err(ScoopError::pattern_syntax(pattern, i, "unexpected ')'"));
                    }
                }
            },
            op => {
                while let Some(&top) = stack.last() {
                    if !top.is_operator() || top.precedence() < op.precedence() {
                        break;
                    }
                    postfix.push(top);
                    stack.pop();
                }
                stack.push(op);
            }
        }
    }

    while let Some(op) = stack.pop() {
        if op == Token::GroupOpen {
            return Err(ScoopError::pattern_syntax(
                pattern,
                infix.len(),
                "unbalanced '('",
            ));
        }
        postfix.push(op);
    }

    Ok(postfix)
}

/// Tokenizes `pattern` and returns it in postfix order.
pub fn parse_to_postfix(pattern: &str) -> Result<Vec<Token>> {
    let tokens = tokenize(pattern)?;
    let infix = insert_concatenation(pattern, &tokens)?;
    rearrange_to_postfix(pattern, &infix)
}
