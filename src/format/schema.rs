//! Protobuf messages for the wire format
//!
//! Generated once with `prost-build` from `format/schema.proto` and checked
//! in, so downstream builds do not need protoc.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Wafer {
    #[prost(bytes = "vec", required, tag = "1")]
    pub authority: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub blocks: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub keys: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
    #[prost(message, required, tag = "4")]
    pub signature: Signature,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SealedWafer {
    #[prost(bytes = "vec", required, tag = "1")]
    pub authority: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub blocks: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
    #[prost(bytes = "vec", required, tag = "3")]
    pub signature: ::prost::alloc::vec::Vec<u8>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Signature {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub parameters: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
    #[prost(bytes = "vec", required, tag = "2")]
    pub z: ::prost::alloc::vec::Vec<u8>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Block {
    #[prost(uint32, required, tag = "1")]
    pub index: u32,
    #[prost(string, repeated, tag = "2")]
    pub symbols: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(message, repeated, tag = "3")]
    pub facts: ::prost::alloc::vec::Vec<Fact>,
    #[prost(message, repeated, tag = "4")]
    pub rules: ::prost::alloc::vec::Vec<Rule>,
    #[prost(message, repeated, tag = "5")]
    pub caveats: ::prost::alloc::vec::Vec<Caveat>,
    #[prost(string, optional, tag = "6")]
    pub context: ::core::option::Option<::prost::alloc::string::String>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Fact {
    #[prost(message, required, tag = "1")]
    pub predicate: Predicate,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Rule {
    #[prost(message, required, tag = "1")]
    pub head: Predicate,
    #[prost(message, repeated, tag = "2")]
    pub body: ::prost::alloc::vec::Vec<Predicate>,
    #[prost(message, repeated, tag = "3")]
    pub constraints: ::prost::alloc::vec::Vec<Constraint>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Caveat {
    #[prost(message, repeated, tag = "1")]
    pub queries: ::prost::alloc::vec::Vec<Rule>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Predicate {
    #[prost(uint64, required, tag = "1")]
    pub name: u64,
    #[prost(message, repeated, tag = "2")]
    pub terms: ::prost::alloc::vec::Vec<Term>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Term {
    #[prost(oneof = "term::Content", tags = "1, 2, 3, 4, 5, 6")]
    pub content: ::core::option::Option<term::Content>,
}
/// Nested message and enum types in `Term`.
pub mod term {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Content {
        #[prost(uint64, tag = "1")]
        Symbol(u64),
        #[prost(uint32, tag = "2")]
        Variable(u32),
        #[prost(int64, tag = "3")]
        Integer(i64),
        #[prost(string, tag = "4")]
        Str(::prost::alloc::string::String),
        #[prost(uint64, tag = "5")]
        Date(u64),
        #[prost(bytes = "vec", tag = "6")]
        Bytes(::prost::alloc::vec::Vec<u8>),
    }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Constraint {
    #[prost(uint32, required, tag = "1")]
    pub id: u32,
    #[prost(oneof = "constraint::Kind", tags = "2, 3, 4, 5, 6")]
    pub kind: ::core::option::Option<constraint::Kind>,
}
/// Nested message and enum types in `Constraint`.
pub mod constraint {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "2")]
        Int(super::IntConstraint),
        #[prost(message, tag = "3")]
        Str(super::StringConstraint),
        #[prost(message, tag = "4")]
        Date(super::DateConstraint),
        #[prost(message, tag = "5")]
        Symbol(super::SymbolConstraint),
        #[prost(message, tag = "6")]
        Bytes(super::BytesConstraint),
    }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IntSet {
    #[prost(int64, repeated, tag = "1")]
    pub set: ::prost::alloc::vec::Vec<i64>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StringSet {
    #[prost(string, repeated, tag = "1")]
    pub set: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SymbolSet {
    #[prost(uint64, repeated, tag = "1")]
    pub set: ::prost::alloc::vec::Vec<u64>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BytesSet {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub set: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IntConstraint {
    #[prost(oneof = "int_constraint::Op", tags = "1, 2, 3, 4, 5, 6, 7")]
    pub op: ::core::option::Option<int_constraint::Op>,
}
/// Nested message and enum types in `IntConstraint`.
pub mod int_constraint {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Op {
        #[prost(int64, tag = "1")]
        Lower(i64),
        #[prost(int64, tag = "2")]
        Larger(i64),
        #[prost(int64, tag = "3")]
        LowerOrEqual(i64),
        #[prost(int64, tag = "4")]
        LargerOrEqual(i64),
        #[prost(int64, tag = "5")]
        Equal(i64),
        #[prost(message, tag = "6")]
        InSet(super::IntSet),
        #[prost(message, tag = "7")]
        NotInSet(super::IntSet),
    }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StringConstraint {
    #[prost(oneof = "string_constraint::Op", tags = "1, 2, 3, 4, 5, 6")]
    pub op: ::core::option::Option<string_constraint::Op>,
}
/// Nested message and enum types in `StringConstraint`.
pub mod string_constraint {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Op {
        #[prost(string, tag = "1")]
        Prefix(::prost::alloc::string::String),
        #[prost(string, tag = "2")]
        Suffix(::prost::alloc::string::String),
        #[prost(string, tag = "3")]
        Equal(::prost::alloc::string::String),
        #[prost(message, tag = "4")]
        InSet(super::StringSet),
        #[prost(message, tag = "5")]
        NotInSet(super::StringSet),
        #[prost(string, tag = "6")]
        Regex(::prost::alloc::string::String),
    }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DateConstraint {
    #[prost(oneof = "date_constraint::Op", tags = "1, 2")]
    pub op: ::core::option::Option<date_constraint::Op>,
}
/// Nested message and enum types in `DateConstraint`.
pub mod date_constraint {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Op {
        #[prost(uint64, tag = "1")]
        Before(u64),
        #[prost(uint64, tag = "2")]
        After(u64),
    }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SymbolConstraint {
    #[prost(oneof = "symbol_constraint::Op", tags = "1, 2")]
    pub op: ::core::option::Option<symbol_constraint::Op>,
}
/// Nested message and enum types in `SymbolConstraint`.
pub mod symbol_constraint {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Op {
        #[prost(message, tag = "1")]
        InSet(super::SymbolSet),
        #[prost(message, tag = "2")]
        NotInSet(super::SymbolSet),
    }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BytesConstraint {
    #[prost(oneof = "bytes_constraint::Op", tags = "1, 2, 3")]
    pub op: ::core::option::Option<bytes_constraint::Op>,
}
/// Nested message and enum types in `BytesConstraint`.
pub mod bytes_constraint {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Op {
        #[prost(bytes = "vec", tag = "1")]
        Equal(::prost::alloc::vec::Vec<u8>),
        #[prost(message, tag = "2")]
        InSet(super::BytesSet),
        #[prost(message, tag = "3")]
        NotInSet(super::BytesSet),
    }
}
