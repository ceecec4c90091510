//! Chain module - on-chain verdict recording.
//!
//! Turns a verdict into a transaction against an operator-configured
//! contract: identifiers are parsed, the target function is located in the
//! configured ABI, arguments are bound to its parameters, and the call is
//! encoded, signed and confirmed.

pub mod identifier;
pub mod abi;
pub mod resolver;
pub mod codec;
pub mod memos;
pub mod gateway;

// Re-export main types
pub use identifier::{parse_unsigned_int, IdentifierError};
pub use abi::{ContractInterface, FunctionDescriptor, ParamDescriptor};
pub use resolver::{
    resolve_arguments, ArgumentBinding, BinderRule, BoundValue, ResolutionContext, BINDER_RULES,
};
pub use codec::{encode_call, CodecError};
pub use gateway::{
    resolve_chain, signer_from_key, AlloyGateway, Chain, ChainEndpoint, ChainGateway,
    SubmissionReceipt, SubmissionRequest,
};
