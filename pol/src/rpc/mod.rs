//! JSON-RPC query handlers for loyalty state
//!
//! Transport-agnostic: the host node feeds parsed requests into
//! [`handle_rpc_method`] (or raw bodies into [`handle_json`]) and writes the
//! response back over whatever server it already runs.
//!
//! ## Methods
//! - `getpolallowedtag(miner_tag_hex, height?)` - allowed subsidy for a coinbase
//!   tag; height defaults to tip + 1
//! - `getpoladdressstatus(address, height?)` - status and subsidy for a payout
//!   address; height defaults to the tip
//! - `getpolconfig()` - effective loyalty parameters
//!
//! Params may be positional (`["abcd0123", 110]`) or named
//! (`{"miner_tag_hex": "abcd0123", "height": "110"}`).

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::emission::format_coin;
use crate::engine::Engine;
use crate::ledger::MAX_POINTS;
use crate::level::{level, level_label, MAX_LEVEL};
use crate::subsidy::SubsidySplit;
use crate::tag::{tag_from_address, MinerTag, TagError, TAG_MARKER};

/// Request body is not valid JSON
pub const PARSE_ERROR: i32 = -32700;
/// Unknown method
pub const METHOD_NOT_FOUND: i32 = -32601;
/// Bad parameter value
pub const INVALID_PARAMETER: i32 = -8;

/// JSON-RPC request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
}

/// JSON-RPC response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

/// JSON-RPC error
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, code: i32, message: &str) -> Self {
        Self {
            jsonrpc: "2.0",
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.to_string(),
            }),
            id,
        }
    }
}

/// Invalid request parameter, reported as [`INVALID_PARAMETER`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("Missing {0} parameter")]
    Missing(&'static str),

    #[error("{0} must be a string")]
    NotAString(&'static str),

    #[error("height must be a number")]
    HeightNotANumber,

    #[error("height out of range")]
    HeightOutOfRange,

    #[error(transparent)]
    Tag(#[from] TagError),
}

/// Shared query state
pub struct RpcState {
    pub engine: Engine,
    tip_height: RwLock<Option<u64>>,
}

impl RpcState {
    pub fn new(engine: Engine, tip_height: Option<u64>) -> Self {
        Self {
            engine,
            tip_height: RwLock::new(tip_height),
        }
    }

    /// Height of the best block, `None` before genesis.
    pub fn tip_height(&self) -> Option<u64> {
        *self.tip_height.read()
    }

    /// Called by the host after each connected block.
    pub fn set_tip_height(&self, height: u64) {
        *self.tip_height.write() = Some(height);
    }
}

/// Parse a height given as a JSON number or a decimal string.
///
/// Numbers may be negative (callers clamp them); strings must be
/// non-negative.
pub fn parse_height(value: &Value) -> Result<i64, ParamError> {
    match value {
        Value::Number(n) => {
            if let Some(h) = n.as_i64() {
                Ok(h)
            } else if n.is_u64() {
                Err(ParamError::HeightOutOfRange)
            } else {
                Err(ParamError::HeightNotANumber)
            }
        }
        Value::String(s) => {
            let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
            if digits(s) {
                s.parse::<i64>().map_err(|_| ParamError::HeightOutOfRange)
            } else if s.strip_prefix('-').is_some_and(digits) {
                Err(ParamError::HeightOutOfRange)
            } else {
                Err(ParamError::HeightNotANumber)
            }
        }
        _ => Err(ParamError::HeightNotANumber),
    }
}

fn clamp_height(height: i64) -> u64 {
    u64::try_from(height).unwrap_or(0)
}

/// Positional or named parameter, treating `null` as absent.
fn param<'a>(params: &'a Value, index: usize, name: &str) -> Option<&'a Value> {
    let value = match params {
        Value::Array(values) => values.get(index),
        Value::Object(map) => map.get(name),
        _ => None,
    };
    value.filter(|v| !v.is_null())
}

fn str_param<'a>(
    params: &'a Value,
    index: usize,
    name: &'static str,
) -> Result<&'a str, ParamError> {
    param(params, index, name)
        .ok_or(ParamError::Missing(name))?
        .as_str()
        .ok_or(ParamError::NotAString(name))
}

fn height_param(params: &Value, index: usize) -> Result<Option<u64>, ParamError> {
    param(params, index, "height")
        .map(parse_height)
        .transpose()
        .map(|height| height.map(clamp_height))
}

/// Handle a raw request body
pub fn handle_json(body: &str, state: &RpcState) -> JsonRpcResponse {
    match serde_json::from_str::<JsonRpcRequest>(body) {
        Ok(request) => handle_rpc_method(&request, state),
        Err(e) => JsonRpcResponse::error(Value::Null, PARSE_ERROR, &format!("Parse error: {e}")),
    }
}

/// Dispatch a parsed request
pub fn handle_rpc_method(request: &JsonRpcRequest, state: &RpcState) -> JsonRpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();
    debug!(method, "Handling loyalty query");

    let result = match method {
        "getpolallowedtag" => handle_allowed_tag(&request.params, state),
        "getpoladdressstatus" => handle_address_status(&request.params, state),
        "getpolconfig" => Ok(handle_config(state)),
        _ => {
            let metrics = state.engine.metrics();
            metrics.record_request("unknown");
            metrics.record_error("unknown");
            return JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                &format!("Method not found: {}", request.method),
            );
        }
    };

    let metrics = state.engine.metrics();
    metrics.record_request(method);
    match result {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => {
            metrics.record_error(method);
            JsonRpcResponse::error(id, INVALID_PARAMETER, &e.to_string())
        }
    }
}

fn handle_allowed_tag(params: &Value, state: &RpcState) -> Result<Value, ParamError> {
    let tag_hex = str_param(params, 0, "miner_tag_hex")?;
    let tag = MinerTag::from_hex(tag_hex)?;

    let tip = state.tip_height();
    let height = match height_param(params, 1)? {
        Some(height) => height,
        None => tip.map_or(0, |tip| tip.saturating_add(1)),
    };

    // One ledger read feeds both the points and the split
    let points = state.engine.ledger().points(&tag);
    let split = SubsidySplit::new(state.engine.block_subsidy(height), points);

    Ok(json!({
        "tipHeight": tip,
        "height": height,
        "minerTagHex": tag.to_hex(),
        "minerTagLen": tag.len(),
        "points": points,
        "allowedSubsidy": split.allowed,
        "allowedSubsidyCoin": format_coin(split.allowed),
    }))
}

fn handle_address_status(params: &Value, state: &RpcState) -> Result<Value, ParamError> {
    let address = str_param(params, 0, "address")?;

    let tip = state.tip_height();
    let height = match height_param(params, 1)? {
        Some(height) => height,
        None => tip.unwrap_or(0),
    };

    let tag = tag_from_address(address);
    let status = state.engine.status_or_default(&tag);
    let split = SubsidySplit::new(state.engine.block_subsidy(height), status.points);
    let lvl = level(status.seen, status.points);

    Ok(json!({
        "tipHeight": tip,
        "height": height,
        "address": address,
        "minerTagHex": tag.to_hex(),
        "minerTagLen": tag.len(),
        "minerTagU32": tag.prefix_u32(),
        "extranonce1Size": state.engine.extranonce1_size(),
        "seen": status.seen,
        "firstSeenHeight": status.first_seen_height,
        "lastSeenHeight": status.last_seen_height,
        "blocksSeen": status.blocks_seen,
        "lastSeenTime": status.last_seen_time,
        "points": status.points,
        "level": lvl,
        "levelText": level_label(lvl),
        "lastSeenPeriod": status.last_seen_period,
        "allowedSubsidy": split.allowed,
        "allowedSubsidyCoin": format_coin(split.allowed),
        "baseSubsidy": split.base,
        "baseSubsidyCoin": format_coin(split.base),
        "bonusSubsidy": split.bonus,
        "bonusSubsidyCoin": format_coin(split.bonus),
    }))
}

fn handle_config(state: &RpcState) -> Value {
    let engine = &state.engine;
    json!({
        "startHeight": engine.start_height(),
        "enforceHeight": engine.enforce_height(),
        "periodBlocks": engine.period_blocks(),
        "extranonce1Size": engine.extranonce1_size(),
        "tagMarker": String::from_utf8_lossy(&TAG_MARKER),
        "maxPoints": MAX_POINTS,
        "maxLevel": MAX_LEVEL,
        "trackedTags": engine.ledger().len(),
    })
}
