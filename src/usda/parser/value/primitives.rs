use anyhow::{anyhow, bail, Context, Result};
use std::{any::type_name, str::FromStr};

use crate::usda::token::Token;

use super::types::Type;

/// Primitive value parsing functions.
impl<'a> super::super::Parser<'a> {
    /// Maps a declared type name onto its storage type.
    /// See <https://openusd.org/dev/api/_usd__page__datatypes.html>.
    pub(in crate::usda::parser) fn parse_data_type(ty: &str) -> Result<Type> {
        let data_type = match ty {
            "bool" => Type::Bool,
            "bool[]" => Type::BoolVec,

            "uchar" => Type::Uchar,
            "uchar[]" => Type::UcharVec,
            "int" => Type::Int,
            "int2" => Type::Int2,
            "int3" => Type::Int3,
            "int4" => Type::Int4,
            "int[]" => Type::IntVec,
            "int2[]" => Type::Int2Vec,
            "int3[]" => Type::Int3Vec,
            "int4[]" => Type::Int4Vec,
            "uint" => Type::Uint,
            "int64" => Type::Int64,
            "int64[]" => Type::Int64Vec,
            "uint64" => Type::Uint64,

            "half" | "float" => Type::Float,
            "half2" | "float2" | "texCoord2h" | "texCoord2f" => Type::Float2,
            "half3" | "float3" | "point3h" | "point3f" | "normal3h" | "normal3f" | "vector3h" | "vector3f"
            | "color3h" | "color3f" | "texCoord3h" | "texCoord3f" => Type::Float3,
            "half4" | "float4" | "color4h" | "color4f" => Type::Float4,
            "half[]" | "float[]" => Type::FloatVec,
            "half2[]" | "float2[]" | "texCoord2h[]" | "texCoord2f[]" => Type::Float2Vec,
            "half3[]" | "float3[]" | "point3h[]" | "point3f[]" | "normal3h[]" | "normal3f[]" | "vector3h[]"
            | "vector3f[]" | "color3h[]" | "color3f[]" | "texCoord3h[]" | "texCoord3f[]" => Type::Float3Vec,
            "half4[]" | "float4[]" | "color4h[]" | "color4f[]" => Type::Float4Vec,

            "double" | "timecode" => Type::Double,
            "double2" | "texCoord2d" => Type::Double2,
            "double3" | "point3d" | "normal3d" | "vector3d" | "color3d" | "texCoord3d" => Type::Double3,
            "double4" | "color4d" => Type::Double4,
            "double[]" | "timecode[]" => Type::DoubleVec,
            "double2[]" | "texCoord2d[]" => Type::Double2Vec,
            "double3[]" | "point3d[]" | "normal3d[]" | "vector3d[]" | "color3d[]" | "texCoord3d[]" => {
                Type::Double3Vec
            }
            "double4[]" | "color4d[]" => Type::Double4Vec,

            "quath" | "quatf" => Type::Quatf,
            "quatd" => Type::Quatd,
            "quath[]" | "quatf[]" => Type::QuatfVec,
            "quatd[]" => Type::QuatdVec,

            "matrix2d" | "matrix2d[]" => Type::Matrix2d,
            "matrix3d" | "matrix3d[]" => Type::Matrix3d,
            "matrix4d" | "matrix4d[]" | "frame4d" | "frame4d[]" => Type::Matrix4d,

            "string" => Type::String,
            "string[]" => Type::StringVec,
            "token" => Type::Token,
            "token[]" => Type::TokenVec,
            "asset" => Type::Asset,
            "asset[]" => Type::AssetVec,

            "dictionary" => Type::Dictionary,

            _ => bail!("Unsupported data type: {ty}"),
        };

        Ok(data_type)
    }

    /// Parse a single token as `T` (`int`, `float`, ...), accepting signed `inf`.
    pub(in crate::usda::parser) fn parse_token<T: FromStr>(&mut self) -> Result<T>
    where
        <T as FromStr>::Err: std::fmt::Debug,
    {
        let token = self.fetch_next()?;
        let value_str = match token {
            Token::Number(s) | Token::Identifier(s) | Token::String(s) | Token::NamespacedIdentifier(s) => s,
            Token::Inf => "inf",
            Token::Punctuation(sign @ ('-' | '+')) => {
                let next = self.fetch_next()?;
                match (sign, next) {
                    ('-', Token::Inf) => "-inf",
                    ('+', Token::Inf) => "inf",
                    (_, other) => bail!("Expected inf after '{sign}', got {other:?}"),
                }
            }
            _ => bail!("Expected a number, identifier, or string, got {token:?}"),
        };

        T::from_str(value_str)
            .map_err(|err| anyhow!("Failed to parse {} from '{}': {:?}", type_name::<T>(), value_str, err))
    }

    /// Parse the boolean literal forms: `true`/`false` (bare or quoted) and `0`/`1`.
    pub(in crate::usda::parser) fn parse_bool(&mut self) -> Result<bool> {
        let token = self.fetch_next()?;
        match token {
            Token::Identifier(value) | Token::String(value) => match value {
                "true" => Ok(true),
                "false" => Ok(false),
                other => bail!("Unexpected bool literal: {other}"),
            },
            Token::Number(value) => {
                let parsed = value.parse::<f64>().context("Unable to parse numeric bool")?;
                if parsed == 0.0 {
                    Ok(false)
                } else if parsed == 1.0 {
                    Ok(true)
                } else {
                    bail!("Numeric bool literals must be 0 or 1, got {value}");
                }
            }
            other => bail!("Unexpected token for bool literal: {other:?}"),
        }
    }

    pub(in crate::usda::parser) fn parse_bool_array(&mut self) -> Result<Vec<bool>> {
        let mut out = Vec::new();
        self.parse_array_fn(|this| {
            out.push(this.parse_bool()?);
            Ok(())
        })?;
        Ok(out)
    }

    pub(in crate::usda::parser) fn parse_asset_path(&mut self) -> Result<String> {
        let token = self.fetch_next()?;
        token
            .clone()
            .try_as_asset_ref()
            .map(str::to_owned)
            .ok_or_else(|| anyhow!("Asset reference expected, got {token:?}"))
    }

    pub(in crate::usda::parser) fn parse_asset_path_array(&mut self) -> Result<Vec<String>> {
        let mut result = Vec::new();
        self.parse_array_fn(|this| {
            result.push(this.parse_asset_path()?);
            Ok(())
        })?;
        Ok(result)
    }

    /// Parse an array of strings, unescaping each entry.
    pub(in crate::usda::parser) fn parse_string_array(&mut self) -> Result<Vec<String>> {
        let mut result = Vec::new();
        self.parse_array_fn(|this| {
            result.push(this.fetch_string()?);
            Ok(())
        })?;
        Ok(result)
    }
}
