use crate::usda::token::Token;

/// Value types understood by the text reader.
///
/// Role types (`point3f`, `color3f`, ...) map onto their storage type and
/// half precision types are read into `f32` storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Bool,
    BoolVec,

    Uchar,
    UcharVec,
    Int,
    Int2,
    Int3,
    Int4,
    IntVec,
    Int2Vec,
    Int3Vec,
    Int4Vec,
    Uint,
    Int64,
    Int64Vec,
    Uint64,

    Float,
    Float2,
    Float3,
    Float4,
    FloatVec,
    Float2Vec,
    Float3Vec,
    Float4Vec,

    Double,
    Double2,
    Double3,
    Double4,
    DoubleVec,
    Double2Vec,
    Double3Vec,
    Double4Vec,

    Quatf,
    Quatd,
    QuatfVec,
    QuatdVec,

    Matrix2d,
    Matrix3d,
    Matrix4d,

    String,
    StringVec,
    Token,
    TokenVec,
    Asset,
    AssetVec,

    Dictionary,
}

/// Source text of keyword tokens, so keywords can double as names
/// (`float scale = 1`, `customData = { int offset = 2 }`).
pub fn keyword_lexeme(token: &Token) -> Option<&'static str> {
    let lexeme = match token {
        Token::Def => "def",
        Token::Over => "over",
        Token::Class => "class",
        Token::VariantSet => "variantSet",
        Token::Rel => "rel",
        Token::Custom => "custom",
        Token::Uniform => "uniform",
        Token::Varying => "varying",
        Token::Add => "add",
        Token::Append => "append",
        Token::Delete => "delete",
        Token::Prepend => "prepend",
        Token::Reorder => "reorder",
        Token::References => "references",
        Token::Payload => "payload",
        Token::Inherits => "inherits",
        Token::Specializes => "specializes",
        Token::Variants => "variants",
        Token::VariantSets => "variantSets",
        Token::SubLayers => "subLayers",
        Token::Doc => "doc",
        Token::Kind => "kind",
        Token::CustomData => "customData",
        Token::Dictionary => "dictionary",
        Token::None => "None",
        Token::Inf => "inf",
        Token::Offset => "offset",
        Token::Scale => "scale",
        _ => return None,
    };
    Some(lexeme)
}
