//! Pending memo lookup support.
//!
//! Job events do not always name the memo awaiting a verdict. The memo list
//! of a job is read from the contract with `getAllMemos(jobId, offset,
//! limit)` and the newest memo that still requires approval is picked.

use crate::chain::abi::{FunctionDescriptor, ParamDescriptor};
use crate::chain::codec::encode_call;
use crate::chain::resolver::{ArgumentBinding, BoundValue};
use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{Bytes, U256};
use anyhow::{Context, Result};

/// Memos fetched per lookup.
pub const MEMO_PAGE_LIMIT: u64 = 50;

/// `(Memo[] memos, uint256 total)` as returned by `getAllMemos`.
const MEMO_PAGE_TYPE: &str = "((uint256,uint256,address,string,uint8,uint256,bool,address,uint256,bool,string,bool,uint8,uint256)[],uint256)";

const MEMO_ID: usize = 0;
const MEMO_IS_APPROVED: usize = 6;
const MEMO_REQUIRES_APPROVAL: usize = 9;

fn get_all_memos() -> FunctionDescriptor {
    FunctionDescriptor {
        kind: "function".to_string(),
        name: "getAllMemos".to_string(),
        state_mutability: Some("view".to_string()),
        inputs: Some(vec![
            ParamDescriptor::new("jobId", "uint256"),
            ParamDescriptor::new("offset", "uint256"),
            ParamDescriptor::new("limit", "uint256"),
        ]),
    }
}

/// Calldata for the first page of a job's memos.
pub fn memo_page_call(job_id: U256) -> Result<Bytes> {
    let binding = ArgumentBinding::from(vec![
        BoundValue::Uint(job_id),
        BoundValue::Uint(U256::ZERO),
        BoundValue::Uint(U256::from(MEMO_PAGE_LIMIT)),
    ]);
    encode_call(&get_all_memos(), &binding).context("Failed to encode getAllMemos call")
}

/// Decode the `getAllMemos` return data.
pub fn decode_memo_page(output: &[u8]) -> Result<DynSolValue> {
    let ty = DynSolType::parse(MEMO_PAGE_TYPE).context("Invalid memo page type")?;
    ty.abi_decode_params(output)
        .context("Failed to decode getAllMemos output")
}

/// Highest memo id that requires approval and is not approved yet.
///
/// Memos whose fields do not have the expected shape are ignored.
pub fn latest_pending_memo(page: &DynSolValue) -> Option<U256> {
    let DynSolValue::Tuple(outputs) = page else {
        return None;
    };
    let DynSolValue::Array(memos) = outputs.first()? else {
        return None;
    };

    memos
        .iter()
        .filter_map(|memo| {
            let DynSolValue::Tuple(fields) = memo else {
                return None;
            };
            let id = fields.get(MEMO_ID)?.as_uint()?.0;
            let approved = fields.get(MEMO_IS_APPROVED)?.as_bool()?;
            let requires_approval = fields.get(MEMO_REQUIRES_APPROVAL)?.as_bool()?;
            (requires_approval && !approved).then_some(id)
        })
        .max()
}
