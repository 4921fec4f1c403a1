//! main structures to interact with tokens
use super::crypto::{KeyPair, PublicKey};
use super::datalog::{Caveat, FactSet, Rule, SymbolTable, Term, World};
use super::error;
use super::format::SerializedWafer;
use builder::{BlockBuilder, WaferBuilder};
use prost::Message;
use rand_core::{CryptoRng, RngCore};

use crate::format::{convert::proto_block_to_token_block, schema};
use verifier::Verifier;

pub mod builder;
pub mod sealed;
pub mod verifier;

/// some symbols are predefined and available in every implementation, to
/// avoid transmitting them with every token
pub fn default_symbol_table() -> SymbolTable {
    let mut syms = SymbolTable::new();
    syms.insert("authority");
    syms.insert("ambient");
    syms.insert("resource");
    syms.insert("operation");
    syms.insert("right");
    syms.insert("time");
    syms.insert("revocation_id");

    syms
}

/// This structure represents a valid token
///
/// It contains the authority block, zero or more attenuation blocks, the
/// merged symbol table, and the serialized container whose exact bytes back
/// the aggregate signature.
///
/// ```rust
/// use wafer::{crypto::KeyPair, token::{Wafer, builder::*}, error};
///
/// fn main() -> Result<(), error::Token> {
///   let mut rng = rand::thread_rng();
///
///   // the root public key will be needed to verify the token
///   let root = KeyPair::new(&mut rng);
///
///   // the authority block holds the initial rights
///   let mut builder = Wafer::builder(&mut rng, &root);
///   builder.add_authority_fact(fact("right", &[string("/a/file1.txt"), s("read")]))?;
///
///   let token = builder.build()?;
///   let bytes = token.to_vec()?;
///
///   // the holder can attenuate the token offline
///   let parsed = Wafer::from(&bytes)?;
///   let mut block = parsed.create_block();
///   block.check_operation("read");
///
///   let keypair = KeyPair::new(&mut rng);
///   let attenuated = parsed.append(&mut rng, &keypair, block.build())?;
///
///   // a verifier mixes the token's program with the request context
///   let mut verifier = attenuated.verify(root.public())?;
///   verifier.add_resource("/a/file1.txt");
///   verifier.add_operation("read");
///   verifier.add_caveat(rule(
///     "valid",
///     &[var(0)],
///     &[
///       pred("right", &[s("authority"), var(0), s("read")]),
///       pred("resource", &[s("ambient"), var(0)]),
///     ],
///   ));
///
///   verifier.verify()?;
///   Ok(())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct Wafer {
    pub(crate) authority: Block,
    pub(crate) blocks: Vec<Block>,
    pub(crate) symbols: SymbolTable,
    container: Option<SerializedWafer>,
}

impl Wafer {
    /// creates the authority block's builder
    ///
    /// the RNG must be cryptographically secure and is always supplied by
    /// the caller
    pub fn builder<'a, 'b, R: RngCore + CryptoRng>(
        rng: &'a mut R,
        root: &'b KeyPair,
    ) -> WaferBuilder<'a, 'b, R> {
        Wafer::builder_with_symbols(rng, root, default_symbol_table())
    }

    /// creates the authority block's builder, with a custom symbol table
    pub fn builder_with_symbols<'a, 'b, R: RngCore + CryptoRng>(
        rng: &'a mut R,
        root: &'b KeyPair,
        symbols: SymbolTable,
    ) -> WaferBuilder<'a, 'b, R> {
        WaferBuilder::new(rng, root, symbols)
    }

    /// deserializes a token and checks its aggregate signature
    ///
    /// the root key is only compared at verification time, with
    /// [`Wafer::verify`]
    pub fn from<T: AsRef<[u8]>>(slice: T) -> Result<Self, error::Token> {
        Wafer::from_with_symbols(slice.as_ref(), default_symbol_table())
    }

    /// deserializes a token from URL-safe base64
    pub fn from_base64<T: AsRef<[u8]>>(slice: T) -> Result<Self, error::Token> {
        let decoded = base64::decode_config(slice, base64::URL_SAFE)
            .map_err(|e| error::Format::DeserializationError(format!("base64: {:?}", e)))?;
        Wafer::from(&decoded)
    }

    /// deserializes a token with a custom base symbol table
    ///
    /// structural invariants are checked in order: the container must
    /// decode, the authority block must carry the index 0, each following
    /// block must carry its position, and the aggregate signature must
    /// match the stored block bytes
    pub fn from_with_symbols(slice: &[u8], mut symbols: SymbolTable) -> Result<Self, error::Token> {
        let container = SerializedWafer::from_slice(slice).map_err(error::Token::Format)?;

        let (authority, blocks) = decode_blocks(&container.authority, &container.blocks)?;

        container.check_signature().map_err(error::Token::Format)?;

        symbols.extend(&authority.symbols);

        for block in blocks.iter() {
            symbols.extend(&block.symbols);
        }

        Ok(Wafer {
            authority,
            blocks,
            symbols,
            container: Some(container),
        })
    }

    /// seals the token with a shared secret, preventing further attenuation
    pub fn seal(&self, secret: &[u8]) -> Result<Vec<u8>, error::Token> {
        let sealed =
            sealed::SealedWafer::from_token(self, secret).map_err(error::Token::Format)?;
        sealed.to_vec().map_err(error::Token::Format)
    }

    /// parses a sealed token, checking its HMAC against the shared secret
    pub fn from_sealed(slice: &[u8], secret: &[u8]) -> Result<Self, error::Token> {
        Wafer::from_sealed_with_symbols(slice, secret, default_symbol_table())
    }

    /// parses a sealed token with a custom base symbol table
    pub fn from_sealed_with_symbols(
        slice: &[u8],
        secret: &[u8],
        mut symbols: SymbolTable,
    ) -> Result<Self, error::Token> {
        let sealed = sealed::SealedWafer::from_slice(slice, secret).map_err(error::Token::Format)?;

        let (authority, blocks) = decode_blocks(&sealed.authority, &sealed.blocks)?;

        symbols.extend(&authority.symbols);

        for block in blocks.iter() {
            symbols.extend(&block.symbols);
        }

        Ok(Wafer {
            authority,
            blocks,
            symbols,
            container: None,
        })
    }

    /// serializes the token
    pub fn to_vec(&self) -> Result<Vec<u8>, error::Token> {
        match self.container.as_ref() {
            None => Err(error::Token::InternalError),
            Some(c) => c.to_vec().map_err(error::Token::Format),
        }
    }

    /// serializes the token and encodes it to a (URL safe) base64 string
    pub fn to_base64(&self) -> Result<String, error::Token> {
        self.to_vec()
            .map(|v| base64::encode_config(v, base64::URL_SAFE))
    }

    pub fn serialized_size(&self) -> Result<usize, error::Token> {
        match self.container.as_ref() {
            None => Err(error::Token::InternalError),
            Some(c) => Ok(c.serialized_size()),
        }
    }

    /// checks the root public key and creates a verifier for this token
    ///
    /// sealed tokens carry no public keys; their integrity was already
    /// checked against the shared secret when parsing
    pub fn verify(&self, root: PublicKey) -> Result<Verifier, error::Token> {
        if let Some(container) = self.container.as_ref() {
            container.check_root_key(root).map_err(error::Token::Format)?;
        }

        Verifier::new(self)
    }

    /// creates the builder for a new attenuation block
    pub fn create_block(&self) -> BlockBuilder {
        BlockBuilder::new(1 + self.blocks.len() as u32, self.symbols.clone())
    }

    /// appends a block to the token, signing it with the provided keypair
    ///
    /// the keypair's public part is embedded in the token, so the keypair
    /// can be discarded right after this call
    pub fn append<T: RngCore + CryptoRng>(
        &self,
        rng: &mut T,
        keypair: &KeyPair,
        block: Block,
    ) -> Result<Self, error::Token> {
        let container = match self.container.as_ref() {
            None => return Err(error::Token::Sealed),
            Some(c) => c,
        };

        let expected = 1 + self.blocks.len() as u32;
        if block.index != expected {
            return Err(error::Token::InvalidBlockIndex(error::InvalidBlockIndex {
                expected,
                found: block.index,
            }));
        }

        if !self.symbols.is_disjoint(&block.symbols) {
            return Err(error::Token::SymbolTableOverlap);
        }

        let container = container
            .append(rng, keypair, &block)
            .map_err(error::Token::Format)?;

        let mut symbols = self.symbols.clone();
        symbols.extend(&block.symbols);

        let mut blocks = self.blocks.clone();
        blocks.push(block);

        Ok(Wafer {
            authority: self.authority.clone(),
            blocks,
            symbols,
            container: Some(container),
        })
    }

    /// the caveats of every block, authority first
    pub fn caveats(&self) -> Vec<&[Caveat]> {
        let mut res = vec![&self.authority.caveats[..]];
        res.extend(self.blocks.iter().map(|b| &b.caveats[..]));
        res
    }

    /// returns the list of context elements of each block
    ///
    /// the context is a free form text field in which application specific
    /// data can be stored; it takes no part in verification
    pub fn context(&self) -> Vec<Option<String>> {
        let mut res = vec![self.authority.context.clone()];

        for b in self.blocks.iter() {
            res.push(b.context.clone());
        }

        res
    }

    /// returns the number of blocks (at least 1)
    pub fn block_count(&self) -> usize {
        1 + self.blocks.len()
    }

    /// pretty printer for this token
    pub fn print(&self) -> String {
        let authority = print_block(&self.symbols, &self.authority);
        let blocks: Vec<_> = self
            .blocks
            .iter()
            .map(|b| print_block(&self.symbols, b))
            .collect();

        format!(
            "Wafer {{\n    symbols: {:?}\n    authority: {}\n    blocks: [\n        {}\n    ]\n}}",
            self.symbols.symbols,
            authority,
            blocks.join(",\n\t")
        )
    }

    /// returns the internal representation of the token
    pub fn container(&self) -> Option<&SerializedWafer> {
        self.container.as_ref()
    }

    /// builds the world every verifier starts from: the facts and rules of
    /// all blocks
    ///
    /// a non-authority block claiming the `#authority` or `#ambient` tag in
    /// one of its facts is rejected
    pub(crate) fn generate_world(&self, symbols: &SymbolTable) -> Result<World, error::Token> {
        let mut world = World::new();

        for fact in self.authority.facts.iter() {
            world.add_fact(fact.clone());
        }

        for rule in self.authority.rules.iter() {
            world.add_rule(rule.clone());
        }

        let authority_symbol = symbols.get("authority").map(Term::Symbol);
        let ambient_symbol = symbols.get("ambient").map(Term::Symbol);

        for block in self.blocks.iter() {
            for fact in block.facts.iter() {
                let first = fact.predicate.terms.first();
                if first.is_some() && (first == authority_symbol.as_ref() || first == ambient_symbol.as_ref())
                {
                    return Err(error::Token::FailedLogic(error::Logic::InvalidBlockFact(
                        block.index,
                        symbols.print_fact(fact),
                    )));
                }

                world.add_fact(fact.clone());
            }

            for rule in block.rules.iter() {
                world.add_rule(rule.clone());
            }
        }

        Ok(world)
    }

    /// creates a new token, using a provided CSPRNG
    ///
    /// the public part of the root keypair must be used for verification
    pub(crate) fn new_with_rng<T: RngCore + CryptoRng>(
        rng: &mut T,
        root: &KeyPair,
        mut symbols: SymbolTable,
        authority: Block,
    ) -> Result<Wafer, error::Token> {
        if !symbols.is_disjoint(&authority.symbols) {
            return Err(error::Token::SymbolTableOverlap);
        }

        symbols.extend(&authority.symbols);

        let container =
            SerializedWafer::new(rng, root, &authority).map_err(error::Token::Format)?;

        Ok(Wafer {
            authority,
            blocks: vec![],
            symbols,
            container: Some(container),
        })
    }
}

/// decodes the serialized blocks, checking that each one carries the index
/// matching its position
fn decode_blocks(
    authority_bytes: &[u8],
    block_bytes: &[Vec<u8>],
) -> Result<(Block, Vec<Block>), error::Token> {
    let authority: Block = schema::Block::decode(authority_bytes)
        .map_err(|e| {
            error::Token::Format(error::Format::BlockDeserializationError(format!(
                "error deserializing authority block: {:?}",
                e
            )))
        })
        .and_then(|b| proto_block_to_token_block(&b).map_err(error::Token::Format))?;

    if authority.index != 0 {
        return Err(error::Token::InvalidAuthorityIndex(authority.index));
    }

    let mut blocks = vec![];

    for (i, block) in block_bytes.iter().enumerate() {
        let deser: Block = schema::Block::decode(&block[..])
            .map_err(|e| {
                error::Token::Format(error::Format::BlockDeserializationError(format!(
                    "error deserializing block: {:?}",
                    e
                )))
            })
            .and_then(|b| proto_block_to_token_block(&b).map_err(error::Token::Format))?;

        let expected = i as u32 + 1;
        if deser.index != expected {
            return Err(error::Token::InvalidBlockIndex(error::InvalidBlockIndex {
                expected,
                found: deser.index,
            }));
        }

        blocks.push(deser);
    }

    Ok((authority, blocks))
}

fn print_block(symbols: &SymbolTable, block: &Block) -> String {
    let facts: Vec<_> = block.facts.iter().map(|f| symbols.print_fact(f)).collect();
    let rules: Vec<_> = block.rules.iter().map(|r| symbols.print_rule(r)).collect();
    let caveats: Vec<_> = block
        .caveats
        .iter()
        .map(|c| symbols.print_caveat(c))
        .collect();

    format!(
        "Block[{}] {{\n            symbols: {:?}\n            context: \"{}\"\n            facts: [\n                {}\n            ]\n            rules: [\n                {}\n            ]\n            caveats: [\n                {}\n            ]\n        }}",
        block.index,
        block.symbols.symbols,
        block.context.as_deref().unwrap_or(""),
        facts.join(",\n                "),
        rules.join(",\n                "),
        caveats.join(",\n                "),
    )
}

/// a block contained in a token
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    /// position of the block in the token; the authority block is 0
    pub index: u32,
    /// symbols introduced by this block, in the order they were added
    pub symbols: SymbolTable,
    /// facts provided by this block
    pub facts: FactSet,
    /// rules provided by this block
    pub rules: Vec<Rule>,
    /// caveats that the token and ambient data must validate
    pub caveats: Vec<Caveat>,
    /// contextual information that can be looked up before the verification
    /// (as an example, a user id to query rights into a database)
    pub context: Option<String>,
}
