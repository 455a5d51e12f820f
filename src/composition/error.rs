use thiserror::Error;

use crate::sdf::{ListEditQual, Specifier};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Composition arc kinds, in the order the driver resolves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ArcKind {
    #[strum(to_string = "subLayers")]
    Sublayers,
    #[strum(to_string = "references")]
    References,
    #[strum(to_string = "payload")]
    Payload,
    #[strum(to_string = "inherits")]
    Inherits,
    #[strum(to_string = "variantSets")]
    Variants,
    #[strum(to_string = "specializes")]
    Specializes,
}

/// Errors that abort a composition call. No partially composed layer is
/// returned alongside any of them.
#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("Circular sublayer reference: '{layer}' is already being composed (sublayered from '{parent}')")]
    CircularSublayer { layer: String, parent: String },

    #[error("{arc} composition exceeded max depth {max_depth} at '{path}'")]
    TooDeep {
        arc: ArcKind,
        path: String,
        max_depth: usize,
    },

    #[error("'{qual}' list edit on {arc} of '{path}' is not supported yet")]
    UnsupportedListEdit {
        arc: ArcKind,
        path: String,
        qual: ListEditQual,
    },

    #[error("Invalid list edit on {arc} of '{path}'")]
    InvalidListEdit { arc: ArcKind, path: String },

    #[error("Multiple inheritance is not supported: '{path}' inherits {count} prims")]
    MultipleInherits { path: String, count: usize },

    #[error("{arc} of '{path}' has no asset path, and prim path '{target}' is not absolute")]
    InvalidInternalArc {
        arc: ArcKind,
        path: String,
        target: String,
    },

    #[error("Inherit target '{target}' of '{path}' not found")]
    InheritTargetNotFound { path: String, target: String },

    #[error("{arc} target '{target}' of '{path}' not found in '{asset_path}'")]
    TargetNotFound {
        arc: ArcKind,
        path: String,
        asset_path: String,
        target: String,
    },

    #[error("{arc} asset '{asset_path}' of '{path}' not found ({context})")]
    AssetNotFound {
        arc: ArcKind,
        path: String,
        asset_path: String,
        context: String,
    },

    #[error("Unsupported file format for {arc} asset '{asset_path}' of '{path}'")]
    UnsupportedFormat {
        arc: ArcKind,
        path: String,
        asset_path: String,
    },

    #[error("{arc} asset '{asset_path}' of '{path}' contains no prims")]
    NoPrims {
        arc: ArcKind,
        path: String,
        asset_path: String,
    },

    #[error("Override source '{name}' must be an over, got '{specifier}'")]
    NotAnOver { name: String, specifier: Specifier },

    #[error("Failed to load '{asset_path}'")]
    Load {
        asset_path: String,
        #[source]
        source: BoxError,
    },

    #[error("Composition did not converge after {iterations} iterations, unresolved: {}", join(.remaining))]
    NotConverged { iterations: usize, remaining: Vec<ArcKind> },
}

fn join(arcs: &[ArcKind]) -> String {
    arcs.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl CompositionError {
    pub(crate) fn load(asset_path: impl Into<String>, source: anyhow::Error) -> Self {
        CompositionError::Load {
            asset_path: asset_path.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_path_and_arc() {
        let err = CompositionError::UnsupportedListEdit {
            arc: ArcKind::References,
            path: "/World".into(),
            qual: ListEditQual::Add,
        };
        assert_eq!(err.to_string(), "'add' list edit on references of '/World' is not supported yet");

        let err = CompositionError::NotConverged {
            iterations: 128,
            remaining: vec![ArcKind::References, ArcKind::Variants],
        };
        assert!(err.to_string().ends_with("unresolved: references, variantSets"));
    }

    #[test]
    fn load_keeps_source_chain() {
        let err = CompositionError::load("a.usda", anyhow::anyhow!("bad token").context("parse failed"));
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("parse failed"));
    }
}
