use thiserror::Error;

/// Errors produced while resolving entity types or building navigation trees.
///
/// Everything surfaces to the immediate caller. The metadata document is
/// already in memory, so there is nothing transient to retry; it is up to the
/// calling rule whether a malformed document invalidates the whole run.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The wrong kind of element was handed to a parser, e.g. a `ComplexType`
    /// node passed to the entity type resolver.
    #[error("expected an `{expected}` element, got `{found}`")]
    InvalidInput {
        expected: &'static str,
        found: String,
    },

    #[error("element `{element}` is missing the required attribute `{attribute}`")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    /// An attribute was present but its text does not parse as the expected
    /// primitive.
    #[error("attribute `{attribute}` value `{value}` is not a valid {expected}")]
    Format {
        attribute: String,
        value: String,
        expected: &'static str,
    },

    /// A referenced base type or navigation target is absent from the document.
    #[error("type `{0}` is not defined in the metadata document")]
    TypeNotFound(String),

    /// An enum type declares explicit `Value` attributes on some members but
    /// not others.
    #[error("enum type `{0}` mixes explicit and implicit member values")]
    MixedEnumMemberValues(String),

    #[error("malformed metadata document: {0}")]
    Xml(#[from] roxmltree::Error),
}

pub type Result<T> = std::result::Result<T, MetadataError>;
