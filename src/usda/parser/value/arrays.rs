use anyhow::{bail, ensure, Context, Result};
use std::fmt::Debug;
use std::str::FromStr;

use crate::usda::token::Token;

/// Array, tuple, and matrix parsing functions.
impl<'a> super::super::Parser<'a> {
    /// Generic array parser that delegates element parsing while handling delimiters.
    /// Accepts a trailing comma before `]`.
    pub(in crate::usda::parser) fn parse_array_fn(
        &mut self,
        mut read_element: impl FnMut(&mut Self) -> Result<()>,
    ) -> Result<()> {
        self.ensure_pun('[').context("Array must start with [")?;

        let mut index = 0;
        loop {
            if self.is_next(Token::Punctuation(']')) {
                self.fetch_next()?;
                break;
            }

            read_element(self).with_context(|| format!("Unable to read array element {index}"))?;
            index += 1;

            match self.fetch_next()? {
                Token::Punctuation(',') => continue,
                Token::Punctuation(']') => break,
                t => bail!("Either comma or closing bracket expected after value, got: {t:?}"),
            }
        }
        Ok(())
    }

    /// Parse delimiter-separated sequences like `(a, b)` or `(offset = ...; scale = ...)`.
    pub(in crate::usda::parser) fn parse_seq_fn(
        &mut self,
        delim: char,
        mut read_element: impl FnMut(&mut Self, usize) -> Result<()>,
    ) -> Result<()> {
        self.ensure_pun('(').context("Open brace expected")?;

        let mut index = 0;
        loop {
            if self.is_next(Token::Punctuation(')')) {
                self.fetch_next()?;
                break;
            }

            read_element(self, index).with_context(|| format!("Unable to read element {index}"))?;
            index += 1;

            match self.fetch_next()? {
                Token::Punctuation(')') => break,
                Token::Punctuation(d) if d == delim => continue,
                t => bail!("Unexpected token between (): {t:?}"),
            }
        }
        Ok(())
    }

    /// Parse a fixed-size tuple such as `(1, 2, 3)`.
    pub(in crate::usda::parser) fn parse_tuple<T, const N: usize>(&mut self) -> Result<[T; N]>
    where
        T: FromStr + Debug,
        <T as FromStr>::Err: Debug,
    {
        let mut values = Vec::with_capacity(N);
        self.parse_seq_fn(',', |this, _| {
            values.push(this.parse_token::<T>()?);
            Ok(())
        })?;

        let len = values.len();
        match <[T; N]>::try_from(values) {
            Ok(tuple) => Ok(tuple),
            Err(_) => bail!("Tuple of {N} elements expected, got {len}"),
        }
    }

    pub(in crate::usda::parser) fn parse_array<T>(&mut self) -> Result<Vec<T>>
    where
        T: FromStr,
        <T as FromStr>::Err: Debug,
    {
        let mut out = Vec::new();
        self.parse_array_fn(|this| {
            out.push(this.parse_token::<T>()?);
            Ok(())
        })?;
        Ok(out)
    }

    /// Parse an array of tuples, flattening it into one vector.
    pub(in crate::usda::parser) fn parse_array_of_tuples<T, const N: usize>(&mut self) -> Result<Vec<T>>
    where
        T: FromStr + Debug,
        <T as FromStr>::Err: Debug,
    {
        let mut out = Vec::new();
        self.parse_array_fn(|this| {
            out.extend(this.parse_tuple::<T, N>()?);
            Ok(())
        })?;
        Ok(out)
    }

    /// Parse a single matrix literal, flattening rows in row-major order.
    pub(in crate::usda::parser) fn parse_matrix<const N: usize>(&mut self) -> Result<Vec<f64>> {
        let mut values = Vec::with_capacity(N * N);
        self.parse_seq_fn(',', |this, _| {
            values.extend(this.parse_tuple::<f64, N>()?);
            Ok(())
        })?;

        ensure!(values.len() == N * N, "matrix{N}d literal must contain {N} rows");

        Ok(values)
    }

    /// Parse either a single matrix or an array of matrices.
    pub(in crate::usda::parser) fn parse_matrix_value<const N: usize>(&mut self) -> Result<Vec<f64>> {
        if !self.is_next(Token::Punctuation('[')) {
            return self.parse_matrix::<N>();
        }

        let mut matrices = Vec::new();
        self.parse_array_fn(|this| {
            matrices.extend(this.parse_matrix::<N>()?);
            Ok(())
        })?;
        Ok(matrices)
    }
}
