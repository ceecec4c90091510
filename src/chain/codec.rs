//! Calldata encoding for resolved verdict arguments.
//!
//! Parameter types come from the runtime-configured ABI, so encoding goes
//! through alloy's dynamic ABI types rather than generated bindings. Every
//! bound value is checked against its declared type before anything is
//! encoded.

use crate::chain::abi::FunctionDescriptor;
use crate::chain::resolver::{ArgumentBinding, BoundValue};
use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{keccak256, Address, Bytes};
use serde_json::Value;
use thiserror::Error;

/// Failure to encode a call against the declared parameter types.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("function {function} takes {expected} arguments, binding has {actual}")]
    ArityMismatch {
        function: String,
        expected: usize,
        actual: usize,
    },
    #[error("unsupported parameter type {ty:?}: {reason}")]
    UnsupportedType { ty: String, reason: String },
    #[error("argument {index} does not fit {ty}: {reason}")]
    ValueMismatch {
        index: usize,
        ty: String,
        reason: String,
    },
}

/// Canonical signature, e.g. `signMemo(uint256,bool,string)`.
pub fn function_signature(function: &FunctionDescriptor) -> Result<String, CodecError> {
    let types = parse_param_types(function)?;
    let names: Vec<String> = types.iter().map(|ty| ty.sol_type_name().into_owned()).collect();
    Ok(format!("{}({})", function.name, names.join(",")))
}

/// First four bytes of the keccak hash of the canonical signature.
pub fn function_selector(function: &FunctionDescriptor) -> Result<[u8; 4], CodecError> {
    let signature = function_signature(function)?;
    let hash = keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash[..4]);
    Ok(selector)
}

/// Encode selector plus ABI-encoded arguments.
pub fn encode_call(
    function: &FunctionDescriptor,
    binding: &ArgumentBinding,
) -> Result<Bytes, CodecError> {
    let types = parse_param_types(function)?;
    if types.len() != binding.len() {
        return Err(CodecError::ArityMismatch {
            function: function.name.clone(),
            expected: types.len(),
            actual: binding.len(),
        });
    }

    let values = types
        .iter()
        .zip(binding.values())
        .enumerate()
        .map(|(index, (ty, value))| to_sol_value(index, ty, value))
        .collect::<Result<Vec<_>, _>>()?;

    let selector = function_selector(function)?;
    let mut calldata = selector.to_vec();
    calldata.extend_from_slice(&DynSolValue::Tuple(values).abi_encode_params());
    Ok(Bytes::from(calldata))
}

fn parse_param_types(function: &FunctionDescriptor) -> Result<Vec<DynSolType>, CodecError> {
    function
        .params()
        .iter()
        .map(|param| {
            DynSolType::parse(&param.ty).map_err(|e| CodecError::UnsupportedType {
                ty: param.ty.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

fn to_sol_value(index: usize, ty: &DynSolType, value: &BoundValue) -> Result<DynSolValue, CodecError> {
    let mismatch = |reason: String| CodecError::ValueMismatch {
        index,
        ty: ty.sol_type_name().into_owned(),
        reason,
    };

    match (ty, value) {
        (DynSolType::Uint(bits), BoundValue::Uint(n)) => {
            if *bits < 256 && n.bit_len() > *bits {
                return Err(mismatch(format!("{} overflows uint{}", n, bits)));
            }
            Ok(DynSolValue::Uint(*n, *bits))
        }
        (DynSolType::Bool, BoundValue::Bool(b)) => Ok(DynSolValue::Bool(*b)),
        (DynSolType::String, BoundValue::Text(s)) => Ok(DynSolValue::String(s.clone())),
        (DynSolType::String, BoundValue::Literal(Value::String(s))) => {
            Ok(DynSolValue::String(s.clone()))
        }
        (DynSolType::Address, BoundValue::Address(s)) => s
            .trim()
            .parse::<Address>()
            .map(DynSolValue::Address)
            .map_err(|e| mismatch(e.to_string())),
        (_, BoundValue::Literal(literal)) => {
            let text = match literal {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            ty.coerce_str(&text).map_err(|e| mismatch(e.to_string()))
        }
        (_, other) => Err(mismatch(format!("cannot bind {:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::abi::ParamDescriptor as P;
    use alloy::primitives::{hex, U256};
    use serde_json::json;

    fn sign_memo() -> FunctionDescriptor {
        FunctionDescriptor::function(
            "signMemo",
            vec![
                P::new("memoId", "uint256"),
                P::new("isApproved", "bool"),
                P::new("reason", "string"),
            ],
        )
    }

    #[test]
    fn test_signature_is_canonical() {
        let f = FunctionDescriptor::function("approve", vec![P::new("jobId", "uint"), P::new("ok", "bool")]);
        assert_eq!(function_signature(&f).unwrap(), "approve(uint256,bool)");
    }

    #[test]
    fn test_known_selector() {
        let f = FunctionDescriptor::function(
            "transfer",
            vec![P::new("to", "address"), P::new("amount", "uint256")],
        );
        assert_eq!(function_selector(&f).unwrap(), hex!("a9059cbb"));
    }

    #[test]
    fn test_encodes_memo_verdict() {
        let binding = ArgumentBinding::from(vec![
            BoundValue::Uint(U256::from(42u64)),
            BoundValue::Bool(true),
            BoundValue::Text("ok".to_string()),
        ]);
        let calldata = encode_call(&sign_memo(), &binding).unwrap();

        // selector + three head words + string length word + one data word
        assert_eq!(calldata.len(), 4 + 32 * 5);
        assert_eq!(&calldata[..4], &function_selector(&sign_memo()).unwrap());
        assert_eq!(calldata[4 + 31], 42);
        assert_eq!(calldata[4 + 63], 1);
    }

    #[test]
    fn test_rejects_arity_mismatch() {
        let binding = ArgumentBinding::from(vec![BoundValue::Uint(U256::from(1u64))]);
        assert!(matches!(
            encode_call(&sign_memo(), &binding),
            Err(CodecError::ArityMismatch { expected: 3, actual: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_wrong_value_kind() {
        let binding = ArgumentBinding::from(vec![
            BoundValue::Bool(true),
            BoundValue::Bool(true),
            BoundValue::Text("x".to_string()),
        ]);
        assert!(matches!(
            encode_call(&sign_memo(), &binding),
            Err(CodecError::ValueMismatch { index: 0, .. })
        ));
    }

    #[test]
    fn test_rejects_narrow_uint_overflow() {
        let f = FunctionDescriptor::function("f", vec![P::new("memoId", "uint8")]);
        let binding = ArgumentBinding::from(vec![BoundValue::Uint(U256::from(300u64))]);
        assert!(encode_call(&f, &binding).is_err());
    }

    #[test]
    fn test_rejects_invalid_address() {
        let f = FunctionDescriptor::function("f", vec![P::new("evaluator", "address")]);
        let binding = ArgumentBinding::from(vec![BoundValue::Address("0xABC".to_string())]);
        assert!(encode_call(&f, &binding).is_err());
    }

    #[test]
    fn test_literals_are_coerced() {
        let f = FunctionDescriptor::function(
            "f",
            vec![P::new("a", "uint64"), P::new("b", "bool"), P::new("c", "string")],
        );
        let binding = ArgumentBinding::from(vec![
            BoundValue::Literal(json!(7)),
            BoundValue::Literal(json!(false)),
            BoundValue::Literal(json!("note")),
        ]);
        let calldata = encode_call(&f, &binding).unwrap();
        assert_eq!(calldata[4 + 31], 7);
        assert_eq!(calldata[4 + 63], 0);
    }

    #[test]
    fn test_unparseable_types_are_unsupported() {
        let f = FunctionDescriptor::function("f", vec![P::new("data", "bogus type")]);
        let binding = ArgumentBinding::from(vec![BoundValue::Literal(json!(1))]);
        assert!(matches!(
            encode_call(&f, &binding),
            Err(CodecError::UnsupportedType { .. })
        ));
    }
}
