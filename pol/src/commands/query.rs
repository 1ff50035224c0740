use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

use super::load_engine;
use crate::rpc::{handle_rpc_method, JsonRpcRequest, RpcState};

/// Run one loyalty query against a rebuilt chain and print the response
///
/// Each parameter is parsed as JSON when possible and passed as a string
/// otherwise, so both `110` and `"110"` work as heights.
pub fn run(config_path: &Path, chain_path: &Path, method: &str, params: &[String]) -> Result<()> {
    let loaded = load_engine(config_path, chain_path)?;
    let tip = loaded.tip_height();
    let state = RpcState::new(loaded.engine, tip);

    let params: Vec<Value> = params
        .iter()
        .map(|p| serde_json::from_str(p).unwrap_or_else(|_| Value::String(p.clone())))
        .collect();

    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params: Value::Array(params),
        id: Value::from(1),
    };
    let response = handle_rpc_method(&request, &state);

    println!(
        "{}",
        serde_json::to_string_pretty(&response).context("Failed to encode response")?
    );

    if let Some(error) = response.error {
        anyhow::bail!("{} (code {})", error.message, error.code);
    }
    Ok(())
}
