//! cryptographic operations
//!
//! Tokens are authenticated with [aggregated gamma signatures](https://eprint.iacr.org/2018/414/20180510:203542):
//! from a list of messages and a valid aggregate, a new signer can add a
//! message and produce a valid aggregate for the whole list, without access
//! to the previous private keys. This is the primitive behind offline
//! attenuation.
//!
//! The group is Ristretto over Curve25519, through
//! [curve25519_dalek](https://github.com/dalek-cryptography/curve25519-dalek).
use crate::error;
use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT,
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
    traits::{Identity, MultiscalarMul},
};
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha512};
use std::ops::Deref;

pub struct KeyPair {
    pub(crate) private: Scalar,
    pub(crate) public: RistrettoPoint,
}

impl KeyPair {
    pub fn new<T: RngCore + CryptoRng>(rng: &mut T) -> Self {
        let private = Scalar::random(rng);
        let public = private * RISTRETTO_BASEPOINT_POINT;

        KeyPair { private, public }
    }

    pub fn from(key: PrivateKey) -> Self {
        let private = key.0;
        let public = private * RISTRETTO_BASEPOINT_POINT;

        KeyPair { private, public }
    }

    pub fn private(&self) -> PrivateKey {
        PrivateKey(self.private)
    }

    pub fn public(&self) -> PublicKey {
        PublicKey(self.public)
    }
}

pub struct PrivateKey(pub(crate) Scalar);

impl PrivateKey {
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Option<Self> {
        Scalar::from_canonical_bytes(bytes).map(PrivateKey)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(pub(crate) RistrettoPoint);

impl PublicKey {
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.compress().to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 32 {
            return None;
        }
        CompressedRistretto::from_slice(bytes)
            .decompress()
            .map(PublicKey)
    }
}

/// aggregate signature over an ordered list of messages
///
/// `parameters[i]` holds the commitment point for message `i`, `z` is the
/// running sum of the individual signature scalars
#[derive(Clone, Debug)]
pub struct TokenSignature {
    pub parameters: Vec<RistrettoPoint>,
    pub z: Scalar,
}

impl TokenSignature {
    /// signs the first message of an aggregate
    pub fn new<T: RngCore + CryptoRng>(rng: &mut T, keypair: &KeyPair, message: &[u8]) -> Self {
        let (commitment_point, z) = sign_one(rng, keypair, message);

        TokenSignature {
            parameters: vec![commitment_point],
            z,
        }
    }

    /// adds a new signer's contribution for one more message
    pub fn sign<T: RngCore + CryptoRng>(
        &self,
        rng: &mut T,
        keypair: &KeyPair,
        message: &[u8],
    ) -> Self {
        let (commitment_point, z) = sign_one(rng, keypair, message);

        let mut parameters = self.parameters.clone();
        parameters.push(commitment_point);

        TokenSignature {
            parameters,
            z: self.z + z,
        }
    }

    /// checks the aggregate against the signers' public keys and the
    /// message bytes, where `messages[i]` was signed under `public_keys[i]`
    pub fn verify<M: Deref<Target = [u8]>>(
        &self,
        public_keys: &[PublicKey],
        messages: &[M],
    ) -> Result<(), error::Signature> {
        if public_keys.len() != messages.len() || public_keys.len() != self.parameters.len() {
            return Err(error::Signature::InvalidFormat);
        }

        // z·P + Σ e_i·X_i − Σ d_i·A_i must fold back to the identity
        let mut scalars = Vec::with_capacity(1 + 2 * public_keys.len());
        let mut points = Vec::with_capacity(1 + 2 * public_keys.len());

        scalars.push(self.z);
        points.push(RISTRETTO_BASEPOINT_POINT);

        for (public, message) in public_keys.iter().zip(messages) {
            scalars.push(challenge(public, message));
            points.push(public.0);
        }

        for point in self.parameters.iter() {
            scalars.push(-commitment(point));
            points.push(*point);
        }

        if RistrettoPoint::multiscalar_mul(scalars, points) == RistrettoPoint::identity() {
            Ok(())
        } else {
            Err(error::Signature::InvalidSignature)
        }
    }
}

/// one signer's contribution: the commitment point and the signature scalar
fn sign_one<T: RngCore + CryptoRng>(
    rng: &mut T,
    keypair: &KeyPair,
    message: &[u8],
) -> (RistrettoPoint, Scalar) {
    let r = Scalar::random(rng);
    let commitment_point = r * RISTRETTO_BASEPOINT_POINT;
    let d = commitment(&commitment_point);
    let e = challenge(&keypair.public(), message);

    (commitment_point, r * d - e * keypair.private)
}

fn commitment(point: &RistrettoPoint) -> Scalar {
    let mut h = Sha512::new();
    h.input(point.compress().as_bytes());
    Scalar::from_hash(h)
}

fn challenge(public: &PublicKey, message: &[u8]) -> Scalar {
    let h = Sha512::new()
        .chain(public.0.compress().as_bytes())
        .chain(message);
    Scalar::from_hash(h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand_core::SeedableRng;

    /// aggregate over raw messages, without the token layer
    struct Aggregate {
        pub messages: Vec<Vec<u8>>,
        pub keys: Vec<PublicKey>,
        pub signature: TokenSignature,
    }

    impl Aggregate {
        pub fn new<T: RngCore + CryptoRng>(
            rng: &mut T,
            keypair: &KeyPair,
            message: &[u8],
        ) -> Self {
            let signature = TokenSignature::new(rng, keypair, message);

            Aggregate {
                messages: vec![message.to_owned()],
                keys: vec![keypair.public()],
                signature,
            }
        }

        pub fn append<T: RngCore + CryptoRng>(
            &self,
            rng: &mut T,
            keypair: &KeyPair,
            message: &[u8],
        ) -> Self {
            let signature = self.signature.sign(rng, keypair, message);

            let mut t = Aggregate {
                messages: self.messages.clone(),
                keys: self.keys.clone(),
                signature,
            };

            t.messages.push(message.to_owned());
            t.keys.push(keypair.public());

            t
        }

        pub fn verify(&self) -> Result<(), error::Signature> {
            let messages = self
                .messages
                .iter()
                .map(|m| &m[..])
                .collect::<Vec<_>>();
            self.signature.verify(&self.keys, &messages)
        }
    }

    #[test]
    fn three_messages() {
        // keep the same values in tests
        let mut rng: StdRng = SeedableRng::seed_from_u64(0);

        let message1 = b"hello";
        let keypair1 = KeyPair::new(&mut rng);

        let token1 = Aggregate::new(&mut rng, &keypair1, &message1[..]);

        assert_eq!(token1.verify(), Ok(()), "cannot verify first token");

        let message2 = b"world";
        let keypair2 = KeyPair::new(&mut rng);

        let token2 = token1.append(&mut rng, &keypair2, &message2[..]);

        assert_eq!(token2.verify(), Ok(()), "cannot verify second token");

        let message3 = b"!!!";
        let keypair3 = KeyPair::new(&mut rng);

        let token3 = token2.append(&mut rng, &keypair3, &message3[..]);

        assert_eq!(token3.verify(), Ok(()), "cannot verify third token");
    }

    #[test]
    fn change_message() {
        let mut rng: StdRng = SeedableRng::seed_from_u64(0);

        let message1 = b"hello";
        let keypair1 = KeyPair::new(&mut rng);

        let token1 = Aggregate::new(&mut rng, &keypair1, &message1[..]);

        assert_eq!(token1.verify(), Ok(()), "cannot verify first token");

        let message2 = b"world";
        let keypair2 = KeyPair::new(&mut rng);

        let mut token2 = token1.append(&mut rng, &keypair2, &message2[..]);

        token2.messages[1] = Vec::from(&b"you"[..]);

        assert_eq!(
            token2.verify(),
            Err(error::Signature::InvalidSignature),
            "tampered message must not verify"
        );

        // adding a third message does not repair the aggregate
        let message3 = b"!!!";
        let keypair3 = KeyPair::new(&mut rng);

        let token3 = token2.append(&mut rng, &keypair3, &message3[..]);

        assert_eq!(
            token3.verify(),
            Err(error::Signature::InvalidSignature),
            "tampered aggregate must stay invalid"
        );
    }

    #[test]
    fn key_serialization() {
        let mut rng: StdRng = SeedableRng::seed_from_u64(5678);
        let keypair = KeyPair::new(&mut rng);

        let public = PublicKey::from_bytes(&keypair.public().to_bytes()).unwrap();
        assert_eq!(public, keypair.public());

        let private = PrivateKey::from_bytes(keypair.private().to_bytes()).unwrap();
        let restored = KeyPair::from(private);
        assert_eq!(restored.public(), keypair.public());

        assert!(PublicKey::from_bytes(&[0u8; 16]).is_none());
    }
}
