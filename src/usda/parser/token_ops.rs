use anyhow::{anyhow, ensure, Context, Result};

use crate::sdf::ListEditQual;
use crate::usda::token::Token;

use super::value::types::keyword_lexeme;

type LexResult<'source> = std::result::Result<Token<'source>, ()>;

/// Token stream operations.
impl<'a> super::Parser<'a> {
    /// Fetch the next token from the stream and update the last span.
    #[inline]
    pub(super) fn fetch_next(&mut self) -> Result<Token<'a>> {
        let (token, span) = self.iter.next().context("Unexpected end of tokens")?;
        self.last_span = Some(span);
        token.map_err(|e| anyhow!("Logos error: {e:?}"))
    }

    /// Peek at the next token without consuming it.
    #[inline]
    pub(super) fn peek_next(&mut self) -> Option<&LexResult<'a>> {
        self.iter.peek().map(|(token, _)| token)
    }

    /// Peek at the next token, failing at end of input or on a lexer error.
    pub(super) fn peek_token(&mut self) -> Result<&Token<'a>> {
        self.peek_next()
            .context("Unexpected end of tokens")?
            .as_ref()
            .map_err(|e| anyhow!("Logos error: {e:?}"))
    }

    #[inline]
    pub(super) fn is_next(&mut self, expected: Token) -> bool {
        matches!(self.peek_next(), Some(Ok(t)) if *t == expected)
    }

    /// Ensure the next token matches the expected token and consume it.
    pub(super) fn ensure_next(&mut self, expected_token: Token) -> Result<()> {
        let token = self.fetch_next()?;
        ensure!(
            token == expected_token,
            "Unexpected token (want: {expected_token:?}, got {token:?})"
        );
        Ok(())
    }

    #[inline]
    pub(super) fn ensure_pun(&mut self, value: char) -> Result<()> {
        self.ensure_next(Token::Punctuation(value))
            .with_context(|| format!("Punctuation '{value}' expected"))
    }

    /// Fetch the next token and ensure it's a string, returning the raw source text.
    pub(super) fn fetch_str(&mut self) -> Result<&'a str> {
        let token = self.fetch_next()?;
        token
            .clone()
            .try_as_string()
            .ok_or_else(|| anyhow!("Unexpected token {token:?} (want String)"))
    }

    /// Fetch the next string token with escape sequences resolved.
    pub(super) fn fetch_string(&mut self) -> Result<String> {
        self.fetch_str().map(unescape)
    }

    /// Fetch a name: an identifier, a namespaced identifier or a keyword used as a name.
    pub(super) fn fetch_name(&mut self) -> Result<&'a str> {
        let token = self.fetch_next()?;
        match token {
            Token::Identifier(name) | Token::NamespacedIdentifier(name) => Ok(name),
            other => keyword_lexeme(&other).ok_or_else(|| anyhow!("Name expected, got {other:?}")),
        }
    }

    /// Consume a list-edit keyword (`prepend`, `append`, ...) if one is next.
    pub(super) fn fetch_list_edit_qual(&mut self) -> Result<ListEditQual> {
        let qual = match self.peek_next() {
            Some(Ok(Token::Prepend)) => ListEditQual::Prepend,
            Some(Ok(Token::Append)) => ListEditQual::Append,
            Some(Ok(Token::Add)) => ListEditQual::Add,
            Some(Ok(Token::Delete)) => ListEditQual::Delete,
            Some(Ok(Token::Reorder)) => ListEditQual::Order,
            _ => return Ok(ListEditQual::ResetToExplicit),
        };
        self.fetch_next()?;
        Ok(qual)
    }
}

/// Resolves backslash escapes in a quoted string body.
pub(super) fn unescape(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_owned();
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
