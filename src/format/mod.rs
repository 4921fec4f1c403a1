//! token serialization: the container framing and its signature checks
//!
//! The container keeps the exact bytes each block was signed over. Blocks
//! are never re-serialized once signed: appending reuses the stored bytes so
//! the aggregate signature stays bit-stable.
use prost::Message;
use rand_core::{CryptoRng, RngCore};

use super::crypto::{KeyPair, PublicKey, TokenSignature};
use super::error;
use super::token::Block;

pub mod convert;
pub mod schema;

use self::convert::*;

/// wire-level representation of a token
#[derive(Clone, Debug)]
pub struct SerializedWafer {
    pub authority: Vec<u8>,
    pub blocks: Vec<Vec<u8>>,
    pub keys: Vec<PublicKey>,
    pub signature: TokenSignature,
}

impl SerializedWafer {
    /// decodes the container without checking the signature
    ///
    /// callers go through [`crate::token::Wafer::from`], which validates the
    /// block indexes before the aggregate signature is checked
    pub fn from_slice(slice: &[u8]) -> Result<Self, error::Format> {
        let data = schema::Wafer::decode(slice)
            .map_err(|e| error::Format::DeserializationError(format!("{:?}", e)))?;

        let mut keys = vec![];

        for key in data.keys {
            match PublicKey::from_bytes(&key[..]) {
                Some(k) => keys.push(k),
                None => {
                    return Err(error::Format::DeserializationError(format!(
                        "cannot decode public key of {} bytes",
                        key.len()
                    )))
                }
            }
        }

        let signature = proto_sig_to_token_sig(data.signature)?;

        Ok(SerializedWafer {
            authority: data.authority,
            blocks: data.blocks,
            keys,
            signature,
        })
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, error::Format> {
        let b = schema::Wafer {
            authority: self.authority.clone(),
            blocks: self.blocks.clone(),
            keys: self
                .keys
                .iter()
                .map(|k| Vec::from(&k.to_bytes()[..]))
                .collect(),
            signature: token_sig_to_proto_sig(&self.signature),
        };

        let mut v = Vec::new();

        b.encode(&mut v)
            .map(|_| v)
            .map_err(|e| error::Format::SerializationError(format!("{:?}", e)))
    }

    pub fn serialized_size(&self) -> usize {
        let b = schema::Wafer {
            authority: self.authority.clone(),
            blocks: self.blocks.clone(),
            keys: self
                .keys
                .iter()
                .map(|k| Vec::from(&k.to_bytes()[..]))
                .collect(),
            signature: token_sig_to_proto_sig(&self.signature),
        };

        b.encoded_len()
    }

    /// signs the authority block with the root key and assembles the
    /// container
    pub fn new<T: RngCore + CryptoRng>(
        rng: &mut T,
        root: &KeyPair,
        authority: &Block,
    ) -> Result<Self, error::Format> {
        let mut v = Vec::new();
        token_block_to_proto_block(authority)
            .encode(&mut v)
            .map_err(|e| error::Format::BlockSerializationError(format!("{:?}", e)))?;

        let signature = TokenSignature::new(rng, root, &v);

        Ok(SerializedWafer {
            authority: v,
            blocks: vec![],
            keys: vec![root.public()],
            signature,
        })
    }

    /// signs one more block under a fresh keypair and extends the aggregate
    pub fn append<T: RngCore + CryptoRng>(
        &self,
        rng: &mut T,
        keypair: &KeyPair,
        block: &Block,
    ) -> Result<Self, error::Format> {
        let mut v = Vec::new();
        token_block_to_proto_block(block)
            .encode(&mut v)
            .map_err(|e| error::Format::BlockSerializationError(format!("{:?}", e)))?;

        let signature = self.signature.sign(rng, keypair, &v);

        let mut t = SerializedWafer {
            authority: self.authority.clone(),
            blocks: self.blocks.clone(),
            keys: self.keys.clone(),
            signature,
        };

        t.blocks.push(v);
        t.keys.push(keypair.public());

        Ok(t)
    }

    /// checks the aggregate signature against the stored block bytes
    pub fn check_signature(&self) -> Result<(), error::Format> {
        if self.keys.is_empty() {
            return Err(error::Format::EmptyKeys);
        }

        if self.keys.len() != 1 + self.blocks.len() {
            return Err(error::Format::Signature(error::Signature::InvalidFormat));
        }

        let mut blocks = Vec::new();
        blocks.push(&self.authority[..]);
        blocks.extend(self.blocks.iter().map(|b| &b[..]));

        self.signature
            .verify(&self.keys, &blocks)
            .map_err(error::Format::Signature)
    }

    /// checks that the first signer is the expected root
    pub fn check_root_key(&self, root: PublicKey) -> Result<(), error::Format> {
        if self.keys.is_empty() {
            return Err(error::Format::EmptyKeys);
        }
        if self.keys[0] != root {
            return Err(error::Format::UnknownRoot);
        }

        Ok(())
    }
}
