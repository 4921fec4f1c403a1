//! sealed tokens: a token can be frozen with a shared secret, making it
//! verifiable only by holders of that secret and impossible to attenuate
use super::Wafer;
use crate::error;
use crate::format::schema;
use hmac::{Hmac, Mac};
use prost::Message;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, Debug)]
pub struct SealedWafer {
    pub authority: Vec<u8>,
    pub blocks: Vec<Vec<u8>>,
    pub signature: Vec<u8>,
}

impl SealedWafer {
    /// seals a token by replacing its aggregate signature with an HMAC of
    /// the block bytes under the secret
    pub fn from_token(token: &Wafer, secret: &[u8]) -> Result<Self, error::Format> {
        let container = match token.container() {
            Some(c) => c,
            None => return Err(error::Format::SealedSignature),
        };

        let authority = container.authority.clone();
        let blocks = container.blocks.clone();

        let mut mac = HmacSha256::new_varkey(secret)
            .map_err(|_| error::Format::SealedSignature)?;
        mac.input(&authority);
        for block in blocks.iter() {
            mac.input(block);
        }

        let signature: Vec<u8> = mac.result().code().to_vec();

        Ok(SealedWafer {
            authority,
            blocks,
            signature,
        })
    }

    pub fn from_slice(slice: &[u8], secret: &[u8]) -> Result<Self, error::Format> {
        let data = schema::SealedWafer::decode(slice)
            .map_err(|e| error::Format::DeserializationError(format!("{:?}", e)))?;

        let mut mac = HmacSha256::new_varkey(secret)
            .map_err(|_| error::Format::SealedSignature)?;
        mac.input(&data.authority);
        for block in data.blocks.iter() {
            mac.input(block);
        }

        mac.verify(&data.signature)
            .map_err(|_| error::Format::SealedSignature)?;

        Ok(SealedWafer {
            authority: data.authority,
            blocks: data.blocks,
            signature: data.signature,
        })
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, error::Format> {
        let b = schema::SealedWafer {
            authority: self.authority.clone(),
            blocks: self.blocks.clone(),
            signature: self.signature.clone(),
        };

        let mut v = Vec::new();

        b.encode(&mut v)
            .map(|_| v)
            .map_err(|e| error::Format::SerializationError(format!("{:?}", e)))
    }
}
