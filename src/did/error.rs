/// An error when parsing a DID.
#[derive(Debug, thiserror::Error)]
pub enum ParseDidError {
    #[error("not a valid Did prefix")]
    NoDid,

    #[error("invalid multibase encoding")]
    Multibase,

    #[error("unsupported multibase encoding, expected base58btc")]
    UnsupportedMultibase,

    #[error("unsupported multicodec, expected secp256k1-pub")]
    UnsupportedMulticodec,

    #[error("invalid public key length")]
    InvalidKeyLength,
}

/// An error when parsing a key URI.
#[derive(Debug, thiserror::Error)]
pub enum ParseKeyUriError {
    #[error("no fragment in key URI")]
    NoFragment,

    #[error("empty fragment in key URI")]
    EmptyFragment,

    #[error("invalid DID: {0}")]
    Did(#[from] ParseDidError),
}
