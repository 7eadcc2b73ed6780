use miette::Diagnostic;
use thiserror::Error;

/// A placeholder reached the output pass without a matching registered formula.
///
/// Every variant is a bug in how the hooks were wired into the host, not a
/// problem with the document. Conversion of the document is abandoned.
#[derive(Debug, Error, Diagnostic, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("placeholder {token:?} is not registered in this conversion")]
    #[diagnostic(
        code(mdkatex::shield::unknown),
        help("the token was never stashed, or it was already substituted once")
    )]
    Unknown { token: String },

    #[error("placeholder {token:?} belongs to conversion {owner}, not {context}")]
    #[diagnostic(
        code(mdkatex::shield::foreign),
        help("each document must be converted with its own ConversionContext")
    )]
    Foreign {
        token: String,
        owner: u64,
        context: u64,
    },

    #[error("malformed placeholder {fragment:?}")]
    #[diagnostic(code(mdkatex::shield::malformed))]
    Malformed { fragment: String },
}
