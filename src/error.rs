use thiserror::Error;

/// Failures surfaced to the caller.
///
/// Build-time problems (malformed raw XML handed to [`crate::ops::RawXml`])
/// and transport failures are the caller's to handle. Decode-time problems
/// never appear here: the reply parser downgrades them to `*BADPARSE` /
/// `*NOPARSE` markers inside the decoded structure instead.
#[derive(Debug, Error)]
pub enum ToolkitError {
    #[error("raw xml is not well formed: {snippet}")]
    MalformedRawXml {
        /// The offending markup, attached for diagnostics.
        snippet: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error("transport: {0}")]
    Transport(#[from] anyhow::Error),
}
