use crate::core::models::design::DesignError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimingError {
    #[error("The timing engine is not bound to a database")]
    NotBound,

    #[error("Timing view is stale (built at revision {view}, database is at revision {database})")]
    Stale { view: u64, database: u64 },

    #[error("Unknown net: {0}")]
    UnknownNet(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptimizeError {
    #[error("Timing view unavailable: {source}")]
    Timing {
        #[from]
        source: TimingError,
    },

    #[error("No design is loaded")]
    NoDesign,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("Top module '{0}' is not staged")]
    UnknownTop(String),

    #[error("Instance '{instance}' refers to cell '{cell}' which is neither a staged module nor a library master")]
    UnresolvedCell { instance: String, cell: String },

    #[error("Instance '{instance}' connects unknown pin '{pin}' of '{cell}'")]
    UnknownPin {
        instance: String,
        cell: String,
        pin: String,
    },

    #[error("Module '{0}' instantiates itself")]
    RecursiveHierarchy(String),

    #[error("Pin '{pin}' of instance '{instance}' is {expected} bit(s) wide but is connected to {found}")]
    WidthMismatch {
        instance: String,
        pin: String,
        expected: usize,
        found: usize,
    },

    #[error("Net '{net}' is not declared in module '{module}'")]
    UndeclaredNet { module: String, net: String },

    #[error("Bit {index} of '{net}' is outside its declared range in module '{module}'")]
    BitOutOfRange {
        module: String,
        net: String,
        index: i64,
    },

    #[error(transparent)]
    Design(#[from] DesignError),
}
