//! error types
use thiserror::Error;

/// the global error type for wafer tokens
#[derive(Error, Clone, Debug, PartialEq)]
pub enum Token {
    #[error("internal error")]
    InternalError,
    #[error("error deserializing or verifying the token")]
    Format(Format),
    #[error("the authority block must have the index 0, got {0}")]
    InvalidAuthorityIndex(u32),
    #[error("block index does not match its position")]
    InvalidBlockIndex(InvalidBlockIndex),
    #[error("multiple blocks declare the same symbols")]
    SymbolTableOverlap,
    #[error("the symbol table is missing either \"authority\" or \"ambient\"")]
    MissingSymbols,
    #[error("tried to resolve an id not present in the symbol table: {0}")]
    UnknownSymbol(u64),
    #[error("fact already present: {0}")]
    DuplicateFact(String),
    #[error("tried to append a block to a sealed token")]
    Sealed,
    #[error("reached the datalog execution limits")]
    RunLimit(RunLimit),
    #[error("verification failed")]
    FailedLogic(Logic),
    #[error("no block contains a fact named {0:?}")]
    FactNotFound(String),
}

impl From<Format> for Token {
    fn from(e: Format) -> Self {
        Token::Format(e)
    }
}

impl From<RunLimit> for Token {
    fn from(e: RunLimit) -> Self {
        Token::RunLimit(e)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InvalidBlockIndex {
    pub expected: u32,
    pub found: u32,
}

/// errors related to the serialization format
#[derive(Error, Clone, Debug, PartialEq)]
pub enum Format {
    #[error("signature error")]
    Signature(Signature),
    #[error("invalid signature on a sealed token")]
    SealedSignature,
    #[error("the token does not provide a public key")]
    EmptyKeys,
    #[error("the root public key was not recognized")]
    UnknownRoot,
    #[error("could not deserialize the container: {0}")]
    DeserializationError(String),
    #[error("could not serialize the container: {0}")]
    SerializationError(String),
    #[error("could not deserialize a block: {0}")]
    BlockDeserializationError(String),
    #[error("could not serialize a block: {0}")]
    BlockSerializationError(String),
}

/// signature aggregate errors
#[derive(Error, Clone, Debug, PartialEq)]
pub enum Signature {
    #[error("the signature, messages and keys have inconsistent lengths")]
    InvalidFormat,
    #[error("the aggregate signature did not match the blocks")]
    InvalidSignature,
}

/// engine budget errors
#[derive(Error, Clone, Debug, PartialEq)]
pub enum RunLimit {
    #[error("too many facts generated")]
    TooManyFacts,
    #[error("too many engine iterations")]
    TooManyIterations,
}

/// logical verification errors
#[derive(Error, Clone, Debug, PartialEq)]
pub enum Logic {
    #[error("a block fact cannot claim authority or ambient tags (block {0}): {1}")]
    InvalidBlockFact(u32, String),
    #[error("the following caveats failed: {0:?}")]
    FailedCaveats(Vec<FailedCaveat>),
}

#[derive(Error, Clone, Debug, PartialEq)]
pub enum FailedCaveat {
    #[error("{0}")]
    Block(FailedBlockCaveat),
    #[error("{0}")]
    Verifier(FailedVerifierCaveat),
}

#[derive(Error, Clone, Debug, PartialEq)]
#[error("failed to verify block #{block_id} caveat #{caveat_id}: {rule}")]
pub struct FailedBlockCaveat {
    pub block_id: u32,
    pub caveat_id: u32,
    /// pretty print of the caveat that failed
    pub rule: String,
}

#[derive(Error, Clone, Debug, PartialEq)]
#[error("failed to verify caveat #{caveat_id}: {rule}")]
pub struct FailedVerifierCaveat {
    pub caveat_id: u32,
    /// pretty print of the caveat that failed
    pub rule: String,
}
