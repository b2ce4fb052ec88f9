use std::io;
use thiserror::Error;

/// Everything that can go wrong while normalizing, splitting or grounding an effect.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EffectError {
    /// A condition is statically false under the known facts. Grounding
    /// catches this at the leaf and drops the branch.
    #[error("condition is impossible under the static facts")]
    Impossible,

    #[error("more than one cost effect among sibling effects")]
    MultipleCostEffects,

    /// Cost updates may only appear as a top-level conjunct.
    #[error("cost effect appears beneath a {0} effect")]
    CostBelowWrapper(&'static str),

    #[error("a choice effect appears below the top level of a canonical effect")]
    ChoiceBelowTopLevel,

    #[error("variable {variable} is unbound while instantiating {literal}")]
    UnresolvedVariable { variable: String, literal: String },

    #[error("no numeric value known for {0}")]
    UnknownNumericFluent(String),

    #[error("label \"{label}\" contains the reserved separator \"{separator}\"")]
    ReservedSeparator { label: String, separator: &'static str },
}

impl From<EffectError> for io::Error {
    fn from(e: EffectError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, e)
    }
}
