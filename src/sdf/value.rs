use std::collections::HashMap;
use strum::EnumTryAs;

/// Free-form nested metadata, such as `customData` or `assetInfo`.
pub type Dictionary = HashMap<String, Value>;

/// Attribute and metadata values.
///
/// Tuple types (`float3`, `matrix4d`, ...) and arrays of tuples share one
/// flattened storage; the declared type name tells them apart.
#[derive(Debug, Clone, PartialEq, EnumTryAs)]
pub enum Value {
    Bool(bool),
    BoolVec(Vec<bool>),

    Uchar(u8),
    UcharVec(Vec<u8>),
    Int(i32),
    IntVec(Vec<i32>),
    Uint(u32),
    Int64(i64),
    Int64Vec(Vec<i64>),
    Uint64(u64),

    Float(f32),
    FloatVec(Vec<f32>),
    Double(f64),
    DoubleVec(Vec<f64>),

    Vec2i(Vec<i32>),
    Vec3i(Vec<i32>),
    Vec4i(Vec<i32>),
    Vec2f(Vec<f32>),
    Vec3f(Vec<f32>),
    Vec4f(Vec<f32>),
    Vec2d(Vec<f64>),
    Vec3d(Vec<f64>),
    Vec4d(Vec<f64>),

    Quatf(Vec<f32>),
    Quatd(Vec<f64>),

    Matrix2d(Vec<f64>),
    Matrix3d(Vec<f64>),
    Matrix4d(Vec<f64>),

    String(String),
    StringVec(Vec<String>),
    Token(String),
    TokenVec(Vec<String>),
    AssetPath(String),
    AssetPathVec(Vec<String>),

    Dictionary(Dictionary),
}

impl Value {
    /// Scalar type name used when a value is written without a declared type,
    /// for example inside a dictionary.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::BoolVec(_) => "bool[]",
            Value::Uchar(_) => "uchar",
            Value::UcharVec(_) => "uchar[]",
            Value::Int(_) => "int",
            Value::IntVec(_) => "int[]",
            Value::Uint(_) => "uint",
            Value::Int64(_) => "int64",
            Value::Int64Vec(_) => "int64[]",
            Value::Uint64(_) => "uint64",
            Value::Float(_) => "float",
            Value::FloatVec(_) => "float[]",
            Value::Double(_) => "double",
            Value::DoubleVec(_) => "double[]",
            Value::Vec2i(v) => tuple_or_array(v.len(), 2, "int2", "int2[]"),
            Value::Vec3i(v) => tuple_or_array(v.len(), 3, "int3", "int3[]"),
            Value::Vec4i(v) => tuple_or_array(v.len(), 4, "int4", "int4[]"),
            Value::Vec2f(v) => tuple_or_array(v.len(), 2, "float2", "float2[]"),
            Value::Vec3f(v) => tuple_or_array(v.len(), 3, "float3", "float3[]"),
            Value::Vec4f(v) => tuple_or_array(v.len(), 4, "float4", "float4[]"),
            Value::Vec2d(v) => tuple_or_array(v.len(), 2, "double2", "double2[]"),
            Value::Vec3d(v) => tuple_or_array(v.len(), 3, "double3", "double3[]"),
            Value::Vec4d(v) => tuple_or_array(v.len(), 4, "double4", "double4[]"),
            Value::Quatf(v) => tuple_or_array(v.len(), 4, "quatf", "quatf[]"),
            Value::Quatd(v) => tuple_or_array(v.len(), 4, "quatd", "quatd[]"),
            Value::Matrix2d(v) => tuple_or_array(v.len(), 4, "matrix2d", "matrix2d[]"),
            Value::Matrix3d(v) => tuple_or_array(v.len(), 9, "matrix3d", "matrix3d[]"),
            Value::Matrix4d(v) => tuple_or_array(v.len(), 16, "matrix4d", "matrix4d[]"),
            Value::String(_) => "string",
            Value::StringVec(_) => "string[]",
            Value::Token(_) => "token",
            Value::TokenVec(_) => "token[]",
            Value::AssetPath(_) => "asset",
            Value::AssetPathVec(_) => "asset[]",
            Value::Dictionary(_) => "dictionary",
        }
    }
}

#[inline]
fn tuple_or_array(len: usize, width: usize, tuple: &'static str, array: &'static str) -> &'static str {
    if len == width {
        tuple
    } else {
        array
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Dictionary> for Value {
    fn from(value: Dictionary) -> Self {
        Value::Dictionary(value)
    }
}

/// Merges `src` into `dst`.
///
/// Nested dictionaries merge recursively. For other keys present on both
/// sides the `src` value wins only when `override_existing` is set.
pub fn merge_dictionary(dst: &mut Dictionary, src: &Dictionary, override_existing: bool) {
    for (key, value) in src {
        match (dst.get_mut(key), value) {
            (Some(Value::Dictionary(dst_dict)), Value::Dictionary(src_dict)) => {
                merge_dictionary(dst_dict, src_dict, override_existing);
            }
            (Some(existing), _) => {
                if override_existing {
                    *existing = value.clone();
                }
            }
            (None, _) => {
                dst.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_as_accessors() {
        let value = Value::Double(2.5);
        assert_eq!(value.try_as_double_ref(), Some(&2.5));
        assert_eq!(value.try_as_float_ref(), None);

        let token = Value::Token("Xform".into());
        assert_eq!(token.try_as_token(), Some("Xform".to_owned()));
    }

    #[test]
    fn tuple_type_names() {
        assert_eq!(Value::Vec3f(vec![0.0; 3]).type_name(), "float3");
        assert_eq!(Value::Vec3f(vec![0.0; 6]).type_name(), "float3[]");
        assert_eq!(Value::Matrix4d(vec![0.0; 16]).type_name(), "matrix4d");
    }

    #[test]
    fn merge_nested_dictionaries() {
        let mut dst = Dictionary::from([
            ("a".to_owned(), Value::Int(1)),
            (
                "nested".to_owned(),
                Value::Dictionary(Dictionary::from([("x".to_owned(), Value::Int(1))])),
            ),
        ]);
        let src = Dictionary::from([
            ("a".to_owned(), Value::Int(2)),
            ("b".to_owned(), Value::Int(3)),
            (
                "nested".to_owned(),
                Value::Dictionary(Dictionary::from([
                    ("x".to_owned(), Value::Int(5)),
                    ("y".to_owned(), Value::Int(6)),
                ])),
            ),
        ]);

        let mut weak = dst.clone();
        merge_dictionary(&mut weak, &src, false);
        assert_eq!(weak["a"], Value::Int(1));
        assert_eq!(weak["b"], Value::Int(3));
        let nested = weak["nested"].try_as_dictionary_ref().unwrap();
        assert_eq!(nested["x"], Value::Int(1));
        assert_eq!(nested["y"], Value::Int(6));

        merge_dictionary(&mut dst, &src, true);
        assert_eq!(dst["a"], Value::Int(2));
        let nested = dst["nested"].try_as_dictionary_ref().unwrap();
        assert_eq!(nested["x"], Value::Int(5));
    }
}
