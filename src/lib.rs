//! Wafer authorization tokens
//!
//! A wafer is a bearer token for decentralized authorization:
//!
//! * any service holding the root public key can validate a token offline;
//! * the holder of a token can attenuate it (restrict its rights) without
//!   contacting the emitter, by appending a new block;
//! * rights and restrictions are expressed in a small Datalog dialect, so
//!   authorization decisions depend on the request's context (resource,
//!   operation, time) instead of an identity lookup;
//! * tokens are small enough to travel in cookies or headers.
//!
//! Non goals:
//!
//! * this is not an authentication protocol: wafers can be carried as opaque
//!   tokens by systems like OAuth;
//! * revocation: verifiers can refuse revocation identifiers, but managing
//!   the revocation list is external state.
//!
//! # Usage
//!
//! A token starts with an *authority block* holding the initial rights,
//! signed by the root keypair. Anyone can then append blocks carrying
//! *caveats*, queries that the verifier will require to match. Since the
//! verifier evaluates every caveat of every block, appending a block can
//! only restrict what the token allows:
//!
//! ```rust
//! use wafer::{crypto::KeyPair, token::{Wafer, builder::*}, error};
//!
//! fn main() -> Result<(), error::Token> {
//!   let mut rng = rand::thread_rng();
//!
//!   // the root public key is distributed to the services verifying tokens
//!   let root = KeyPair::new(&mut rng);
//!
//!   let token1 = {
//!     let mut builder = Wafer::builder(&mut rng, &root);
//!
//!     // authority facts describe the token's rights; the builder tags
//!     // them with the #authority symbol
//!     builder.add_authority_fact(fact("right", &[string("/a/file1.txt"), s("read")]))?;
//!     builder.add_authority_fact(fact("right", &[string("/a/file1.txt"), s("write")]))?;
//!     builder.add_authority_fact(fact("right", &[string("/a/file2.txt"), s("read")]))?;
//!
//!     builder.build()?.to_vec()?
//!   };
//!
//!   // the holder attenuates the token to read-only access on file1
//!   let token2 = {
//!     let deser = Wafer::from(&token1)?;
//!
//!     let mut builder = deser.create_block();
//!     builder.add_caveat(rule(
//!       "caveat",
//!       &[s("caveat")],
//!       &[
//!         pred("resource", &[s("ambient"), string("/a/file1.txt")]),
//!         pred("operation", &[s("ambient"), s("read")]),
//!       ],
//!     ));
//!
//!     let keypair = KeyPair::new(&mut rng);
//!     deser.append(&mut rng, &keypair, builder.build())?.to_vec()?
//!   };
//!
//!   let wafer = Wafer::from(&token2)?;
//!
//!   // a read request on file1 passes
//!   let mut v1 = wafer.verify(root.public())?;
//!   v1.add_resource("/a/file1.txt");
//!   v1.add_operation("read");
//!   assert!(v1.verify().is_ok());
//!
//!   // a write request fails on the appended caveat
//!   let mut v2 = wafer.verify(root.public())?;
//!   v2.add_resource("/a/file1.txt");
//!   v2.add_operation("write");
//!   assert!(v2.verify().is_err());
//!
//!   Ok(())
//! }
//! ```
//!
//! # Concepts
//!
//! ## Blocks
//!
//! A token is a list of blocks. Each block carries facts, rules and caveats,
//! along with the delta of symbols it introduced. Block 0 is the authority
//! block, signed by the root key; every following block is signed by a
//! one-off keypair whose public part is embedded in the token, and the
//! signatures aggregate: modifying or removing any block breaks the
//! cryptographic verification.
//!
//! ## Datalog with constraints
//!
//! Facts are ground predicates like `right(#authority, "file1", #read)`.
//! Rules derive new facts, optionally filtered by typed constraints on
//! their variables (integer comparisons and sets, string prefix/suffix/
//! regex/sets, strict date bounds, symbol sets, byte sets). A caveat is a
//! set of queries: it is satisfied when at least one query produces a fact.
//!
//! Two symbols are reserved: `#authority` tags facts from the authority
//! block, and `#ambient` tags facts provided by the verifier about the
//! current request (resource, operation, time). Attenuation blocks cannot
//! produce facts bearing either tag.
//!
//! ## Symbols
//!
//! Strings are interned in a per-token symbol table to keep tokens small:
//! facts and rules refer to strings by index. Implementations share a
//! default table holding the reserved symbols, and each block only ships
//! the symbols it added.
pub mod crypto;
pub mod datalog;
pub mod error;
pub mod format;
pub mod token;
