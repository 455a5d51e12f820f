use logos::Logos;
use strum::EnumTryAs;

fn quoted<'source>(lex: &mut logos::Lexer<'source, Token<'source>>) -> &'source str {
    let slice = lex.slice();
    &slice[1..slice.len() - 1]
}

fn triple_quoted<'source>(lex: &mut logos::Lexer<'source, Token<'source>>) -> &'source str {
    let slice = lex.slice();
    &slice[3..slice.len() - 3]
}

/// Lexical tokens of the text layer format.
#[derive(Logos, Debug, Clone, PartialEq, EnumTryAs)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"#[^\n]*")]
pub enum Token<'source> {
    /// `#usda 1.0` header, holding the version.
    #[regex(r"#usda[ \t]+[0-9]+\.[0-9]+[^\n]*", |lex| lex.slice()[5..].split_whitespace().next())]
    Magic(&'source str),

    #[token("def")]
    Def,
    #[token("over")]
    Over,
    #[token("class")]
    Class,
    #[token("variantSet")]
    VariantSet,
    #[token("rel")]
    Rel,
    #[token("custom")]
    Custom,
    #[token("uniform")]
    Uniform,
    #[token("varying")]
    Varying,

    #[token("add")]
    Add,
    #[token("append")]
    Append,
    #[token("delete")]
    Delete,
    #[token("prepend")]
    Prepend,
    #[token("reorder")]
    Reorder,

    #[token("references")]
    References,
    #[token("payload")]
    Payload,
    #[token("inherits")]
    Inherits,
    #[token("specializes")]
    Specializes,
    #[token("variants")]
    Variants,
    #[token("variantSets")]
    VariantSets,
    #[token("subLayers")]
    SubLayers,

    #[token("doc")]
    Doc,
    #[token("kind")]
    Kind,
    #[token("customData")]
    CustomData,
    #[token("dictionary")]
    Dictionary,
    #[token("None")]
    None,
    #[token("inf")]
    Inf,
    #[token("offset")]
    Offset,
    #[token("scale")]
    Scale,

    #[regex(r#""([^"\\\n]|\\.)*""#, quoted)]
    #[regex(r#"'([^'\\\n]|\\.)*'"#, quoted)]
    #[regex(r#""""([^"]|"[^"]|""[^"])*""""#, triple_quoted)]
    String(&'source str),

    /// `@path/to/asset.usda@`, without the delimiters.
    #[regex(r"@[^@\n]*@", quoted)]
    AssetRef(&'source str),

    /// `</Prim/Path>`, without the delimiters.
    #[regex(r"<[^<>\n]*>", quoted)]
    PathRef(&'source str),

    #[regex(r"[-+]?([0-9]+\.?[0-9]*|\.[0-9]+)([eE][-+]?[0-9]+)?", |lex| lex.slice())]
    Number(&'source str),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*(\[\])?", |lex| lex.slice())]
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*\.(connect|timeSamples)", |lex| lex.slice())]
    Identifier(&'source str),

    #[regex(
        r"[A-Za-z_][A-Za-z0-9_]*(:[A-Za-z_][A-Za-z0-9_]*)+(\.(connect|timeSamples))?",
        |lex| lex.slice()
    )]
    NamespacedIdentifier(&'source str),

    #[regex(r"[()\[\]{}=,;:.+\-]", |lex| lex.slice().chars().next())]
    Punctuation(char),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token<'_>> {
        Token::lexer(source).map(|token| token.unwrap()).collect()
    }

    #[test]
    fn lex_header_and_prim() {
        let tokens = lex(
            r#"#usda 1.0
            # comment
            def Xform "World" (
                prepend references = @./chair.usda@</Chair>
            ) {}"#,
        );

        assert_eq!(
            tokens,
            vec![
                Token::Magic("1.0"),
                Token::Def,
                Token::Identifier("Xform"),
                Token::String("World"),
                Token::Punctuation('('),
                Token::Prepend,
                Token::References,
                Token::Punctuation('='),
                Token::AssetRef("./chair.usda"),
                Token::PathRef("/Chair"),
                Token::Punctuation(')'),
                Token::Punctuation('{'),
                Token::Punctuation('}'),
            ]
        );
    }

    #[test]
    fn lex_attribute_names() {
        let tokens = lex("float3[] inputs:diffuseColor.connect xformOp:translate.timeSamples points");
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("float3[]"),
                Token::NamespacedIdentifier("inputs:diffuseColor.connect"),
                Token::NamespacedIdentifier("xformOp:translate.timeSamples"),
                Token::Identifier("points"),
            ]
        );
    }

    #[test]
    fn lex_numbers_and_strings() {
        let tokens = lex(r#"-1.5e3 42 .5 "a \"b\"" 'single' """multi
line""""#);
        assert_eq!(
            tokens,
            vec![
                Token::Number("-1.5e3"),
                Token::Number("42"),
                Token::Number(".5"),
                Token::String(r#"a \"b\""#),
                Token::String("single"),
                Token::String("multi\nline"),
            ]
        );
    }
}
