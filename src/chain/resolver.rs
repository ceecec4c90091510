//! Argument resolution for verdict-recording functions.
//!
//! Maps the semantic values of a verdict (memo id, job id, approval flag,
//! reason, evaluator) onto a contract function's declared parameters. The
//! ABI is operator-configured and unknown at build time, so each parameter is
//! matched against an ordered list of [`BinderRule`]s and the first matching
//! rule binds it. Resolution is all-or-nothing: when a matched rule has no
//! value to bind, or no rule matches a parameter, no binding is produced.
//!
//! An operator-supplied override template bypasses the rules entirely.

use crate::chain::abi::{FunctionDescriptor, ParamDescriptor};
use alloy::primitives::U256;
use serde_json::Value;
use tracing::{debug, warn};

pub const MEMO_ID_PLACEHOLDER: &str = "$memoId";
pub const JOB_ID_PLACEHOLDER: &str = "$jobId";
pub const TARGET_ID_PLACEHOLDER: &str = "$targetId";
pub const APPROVED_PLACEHOLDER: &str = "$approved";
pub const REASON_PLACEHOLDER: &str = "$reason";
pub const EVALUATOR_PLACEHOLDER: &str = "$evaluator";

/// Semantic values available for binding, built once per submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionContext {
    pub memo_id: Option<U256>,
    pub job_id: Option<U256>,
    /// Memo id when present, else job id
    pub target_id: U256,
    pub approved: bool,
    pub reason: String,
    pub evaluator: Option<String>,
}

impl ResolutionContext {
    /// Build a context, deriving the target id from memo id then job id.
    ///
    /// Returns `None` when neither identifier is present.
    pub fn new(
        memo_id: Option<U256>,
        job_id: Option<U256>,
        approved: bool,
        reason: impl Into<String>,
        evaluator: Option<String>,
    ) -> Option<Self> {
        let target_id = memo_id.or(job_id)?;
        Some(Self {
            memo_id,
            job_id,
            target_id,
            approved,
            reason: reason.into(),
            evaluator,
        })
    }
}

/// A value bound to one parameter position.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Uint(U256),
    Bool(bool),
    Text(String),
    /// Address text, validated when the call is encoded
    Address(String),
    /// Literal entry from an override template
    Literal(Value),
}

/// Resolved arguments, one per declared parameter, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentBinding {
    values: Vec<BoundValue>,
}

impl ArgumentBinding {
    pub fn values(&self) -> &[BoundValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<BoundValue>> for ArgumentBinding {
    fn from(values: Vec<BoundValue>) -> Self {
        Self { values }
    }
}

/// Position of a parameter within the function being resolved.
#[derive(Debug, Clone, Copy)]
pub struct ParamSlot<'a> {
    pub param: &'a ParamDescriptor,
    pub index: usize,
    /// Total number of declared parameters
    pub total: usize,
    /// Number of parameters already bound before this one
    pub bound: usize,
}

/// A named binding rule: a predicate over the slot plus a bind action.
///
/// A rule whose predicate matches but whose bind action yields `None` fails
/// the whole resolution.
#[derive(Clone, Copy)]
pub struct BinderRule {
    pub name: &'static str,
    pub matches: fn(&ParamSlot<'_>) -> bool,
    pub bind: fn(&ResolutionContext) -> Option<BoundValue>,
}

impl std::fmt::Debug for BinderRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinderRule").field("name", &self.name).finish()
    }
}

/// Rules in evaluation order. Name-based rules come first; the positional
/// fallbacks only see parameters that no name-based rule claimed.
pub const BINDER_RULES: &[BinderRule] = &[
    BinderRule {
        name: "memo_id_by_name",
        matches: is_memo_uint,
        bind: bind_memo_id,
    },
    BinderRule {
        name: "job_id_by_name",
        matches: is_job_uint,
        bind: bind_job_id,
    },
    BinderRule {
        name: "approval_by_name",
        matches: is_approval_bool,
        bind: bind_approved,
    },
    BinderRule {
        name: "reason_by_name",
        matches: is_reason_string,
        bind: bind_reason,
    },
    BinderRule {
        name: "evaluator_by_name",
        matches: is_evaluator_address,
        bind: bind_evaluator,
    },
    BinderRule {
        name: "sole_uint_target",
        matches: is_sole_uint,
        bind: bind_target_id,
    },
    BinderRule {
        name: "paired_approval_flag",
        matches: is_paired_bool,
        bind: bind_approved,
    },
    BinderRule {
        name: "trailing_reason",
        matches: is_trailing_string,
        bind: bind_reason,
    },
];

fn is_memo_uint(slot: &ParamSlot<'_>) -> bool {
    slot.param.is_uint() && slot.param.name_contains_any(&["memo"])
}

fn is_job_uint(slot: &ParamSlot<'_>) -> bool {
    slot.param.is_uint() && slot.param.name_contains_any(&["job"])
}

fn is_approval_bool(slot: &ParamSlot<'_>) -> bool {
    slot.param.is_bool() && slot.param.name_contains_any(&["approved", "accept"])
}

fn is_reason_string(slot: &ParamSlot<'_>) -> bool {
    slot.param.is_string() && slot.param.name_contains_any(&["reason", "memo", "message"])
}

fn is_evaluator_address(slot: &ParamSlot<'_>) -> bool {
    slot.param.is_address() && slot.param.name_contains_any(&["evaluator", "judge", "signer"])
}

fn is_sole_uint(slot: &ParamSlot<'_>) -> bool {
    slot.total == 1 && slot.param.is_uint()
}

fn is_paired_bool(slot: &ParamSlot<'_>) -> bool {
    slot.total == 2 && slot.index == 1 && slot.bound == 1 && slot.param.is_bool()
}

fn is_trailing_string(slot: &ParamSlot<'_>) -> bool {
    slot.total >= 3 && slot.index >= 2 && slot.bound >= 2 && slot.param.is_string()
}

fn bind_memo_id(ctx: &ResolutionContext) -> Option<BoundValue> {
    ctx.memo_id.map(BoundValue::Uint)
}

fn bind_job_id(ctx: &ResolutionContext) -> Option<BoundValue> {
    ctx.job_id.map(BoundValue::Uint)
}

fn bind_target_id(ctx: &ResolutionContext) -> Option<BoundValue> {
    Some(BoundValue::Uint(ctx.target_id))
}

fn bind_approved(ctx: &ResolutionContext) -> Option<BoundValue> {
    Some(BoundValue::Bool(ctx.approved))
}

fn bind_reason(ctx: &ResolutionContext) -> Option<BoundValue> {
    Some(BoundValue::Text(ctx.reason.clone()))
}

fn bind_evaluator(ctx: &ResolutionContext) -> Option<BoundValue> {
    ctx.evaluator.clone().map(BoundValue::Address)
}

/// Find the first rule that claims a slot.
pub fn matching_rule(slot: &ParamSlot<'_>) -> Option<&'static BinderRule> {
    BINDER_RULES.iter().find(|rule| (rule.matches)(slot))
}

/// Bind every parameter of `function` using [`BINDER_RULES`].
pub fn resolve_heuristic(
    function: &FunctionDescriptor,
    ctx: &ResolutionContext,
) -> Option<ArgumentBinding> {
    let params = function.params();
    let mut values = Vec::with_capacity(params.len());

    for (index, param) in params.iter().enumerate() {
        let slot = ParamSlot {
            param,
            index,
            total: params.len(),
            bound: values.len(),
        };

        let Some(rule) = matching_rule(&slot) else {
            debug!("No binder rule for parameter {} ({} {})", index, param.ty, param.name);
            return None;
        };

        match (rule.bind)(ctx) {
            Some(value) => values.push(value),
            None => {
                debug!(
                    "Rule {} matched parameter {} ({}) but its value is absent",
                    rule.name, index, param.name
                );
                return None;
            }
        }
    }

    Some(ArgumentBinding { values })
}

/// Result of applying an override template.
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideOutcome {
    /// No template configured, or the template is not a JSON array
    NotApplicable,
    /// Every placeholder resolved
    Resolved(ArgumentBinding),
    /// The template is valid but a placeholder had no value
    Unresolvable(String),
}

/// Substitute placeholders in an override template.
pub fn apply_override(raw: Option<&str>, ctx: &ResolutionContext) -> OverrideOutcome {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return OverrideOutcome::NotApplicable;
    };

    let entries = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => {
            warn!("Argument override is not a JSON array; ignoring it");
            return OverrideOutcome::NotApplicable;
        }
        Err(e) => {
            warn!("Argument override is not valid JSON ({}); ignoring it", e);
            return OverrideOutcome::NotApplicable;
        }
    };

    let mut values = Vec::with_capacity(entries.len());
    for entry in entries {
        let value = match entry.as_str() {
            Some(MEMO_ID_PLACEHOLDER) => ctx.memo_id.map(BoundValue::Uint),
            Some(JOB_ID_PLACEHOLDER) => ctx.job_id.map(BoundValue::Uint),
            Some(TARGET_ID_PLACEHOLDER) => Some(BoundValue::Uint(ctx.target_id)),
            Some(APPROVED_PLACEHOLDER) => Some(BoundValue::Bool(ctx.approved)),
            Some(REASON_PLACEHOLDER) => Some(BoundValue::Text(ctx.reason.clone())),
            Some(EVALUATOR_PLACEHOLDER) => ctx.evaluator.clone().map(BoundValue::Address),
            _ if entry.is_null() => None,
            _ => Some(BoundValue::Literal(entry.clone())),
        };

        match value {
            Some(value) => values.push(value),
            None => return OverrideOutcome::Unresolvable(entry.to_string()),
        }
    }

    OverrideOutcome::Resolved(ArgumentBinding { values })
}

/// Resolve the arguments for `function`.
///
/// A syntactically valid override always wins over the binder rules, and an
/// override with an unresolved placeholder fails resolution outright.
pub fn resolve_arguments(
    function: &FunctionDescriptor,
    ctx: &ResolutionContext,
    override_template: Option<&str>,
) -> Option<ArgumentBinding> {
    match apply_override(override_template, ctx) {
        OverrideOutcome::Resolved(binding) => {
            if binding.len() != function.params().len() {
                warn!(
                    "Argument override has {} entries but {} takes {}",
                    binding.len(),
                    function.name,
                    function.params().len()
                );
                return None;
            }
            Some(binding)
        }
        OverrideOutcome::Unresolvable(entry) => {
            warn!("Argument override placeholder {} has no value", entry);
            None
        }
        OverrideOutcome::NotApplicable => resolve_heuristic(function, ctx),
    }
}
