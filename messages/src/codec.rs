//! Message codec: JSON objects on the wire, closed enum in memory.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use valchain_crypto::{canonicalize, canonicalize_value, CodecError};
use valchain_types::Block;

use crate::message::{BlockIdBody, EmptyBody, ErrorBody, KeyBody, ValidateBody};
use crate::{AssertionValue, MessageError, PutValidatedValue, WireMessage};

/// Maximum accepted message size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024; // 16 MiB

/// Encode a message as canonical JSON bytes.
pub fn encode(message: &WireMessage) -> Result<Vec<u8>, MessageError> {
    let value = match message {
        WireMessage::Block(block) => serde_json::to_value(block).map_err(CodecError::from)?,
        WireMessage::ChainTip { block_id } => tagged(
            message,
            &BlockIdBody {
                block_id: *block_id,
            },
        )?,
        WireMessage::GetChainTip => tagged(message, &EmptyBody {})?,
        WireMessage::GetBlock { block_id } | WireMessage::IHaveBlock { block_id } => tagged(
            message,
            &BlockIdBody {
                block_id: *block_id,
            },
        )?,
        WireMessage::Error { error } => tagged(
            message,
            &ErrorBody {
                error: error.clone(),
            },
        )?,
        WireMessage::Validate { data } => tagged(message, &ValidateBody { data: data.clone() })?,
        WireMessage::GetValidated { key } | WireMessage::GetConfirmed { key } => {
            tagged(message, &KeyBody { key: key.clone() })?
        }
        WireMessage::OnGetValidated(reply) | WireMessage::OnGetConfirmed(reply) => {
            tagged(message, reply)?
        }
    };
    Ok(canonicalize_value(&value).into_bytes())
}

fn tagged<T: Serialize>(message: &WireMessage, body: &T) -> Result<Value, MessageError> {
    let mut value = serde_json::to_value(body).map_err(CodecError::from)?;
    match &mut value {
        Value::Object(map) => {
            map.insert("type".into(), Value::String(message.type_name().into()));
            Ok(value)
        }
        _ => Err(MessageError::Malformed(format!(
            "{} body is not an object",
            message.type_name()
        ))),
    }
}

/// Decode and schema-check a message received from a peer.
///
/// Unknown members, missing members and ids that are not 64 lowercase hex
/// characters are all rejected.
pub fn decode(bytes: &[u8]) -> Result<WireMessage, MessageError> {
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(MessageError::TooLarge {
            size: bytes.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| MessageError::Malformed(format!("invalid JSON message received: {e}")))?;
    let Value::Object(mut object) = value else {
        return Err(MessageError::Malformed("message is not a JSON object".into()));
    };
    let kind = match object.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        _ => return Err(MessageError::Malformed("message has no type".into())),
    };

    if kind == "block" {
        // A null here would decode to an absent member and change the block id.
        for member in ["miner", "note"] {
            if matches!(object.get(member), Some(Value::Null)) {
                return Err(MessageError::Malformed(format!(
                    "block member {member} must be a string when present"
                )));
            }
        }
        let block: Block = payload(&kind, Value::Object(object))?;
        return Ok(WireMessage::Block(block));
    }

    object.remove("type");
    let body = Value::Object(object);
    let message = match kind.as_str() {
        "chainTip" => {
            let body: BlockIdBody = payload(&kind, body)?;
            WireMessage::ChainTip {
                block_id: body.block_id,
            }
        }
        "getChainTip" => {
            let _: EmptyBody = payload(&kind, body)?;
            WireMessage::GetChainTip
        }
        "getBlock" => {
            let body: BlockIdBody = payload(&kind, body)?;
            WireMessage::GetBlock {
                block_id: body.block_id,
            }
        }
        "iHaveBlock" => {
            let body: BlockIdBody = payload(&kind, body)?;
            WireMessage::IHaveBlock {
                block_id: body.block_id,
            }
        }
        "error" => {
            let body: ErrorBody = payload(&kind, body)?;
            WireMessage::Error { error: body.error }
        }
        "validate" => {
            let body: ValidateBody = payload(&kind, body)?;
            WireMessage::Validate { data: body.data }
        }
        "getValidated" => {
            let body: KeyBody = payload(&kind, body)?;
            WireMessage::GetValidated { key: body.key }
        }
        "getConfirmed" => {
            let body: KeyBody = payload(&kind, body)?;
            WireMessage::GetConfirmed { key: body.key }
        }
        "onGetValidated" => WireMessage::OnGetValidated(payload(&kind, body)?),
        "onGetConfirmed" => WireMessage::OnGetConfirmed(payload(&kind, body)?),
        _ => return Err(MessageError::UnsupportedType(kind)),
    };
    Ok(message)
}

fn payload<T: DeserializeOwned>(kind: &str, body: Value) -> Result<T, MessageError> {
    serde_json::from_value(body)
        .map_err(|e| MessageError::Malformed(format!("unsupported {kind} message received: {e}")))
}

/// Render the `data` member of a `validate` message.
pub fn encode_put_validated(key: &str, value: &AssertionValue) -> Result<String, MessageError> {
    Ok(canonicalize(&json!({ "key": key, "value": value }))?)
}

/// Parse the `data` member of a `validate` message.
pub fn parse_put_validated(data: &str) -> Result<PutValidatedValue, MessageError> {
    serde_json::from_str(data)
        .map_err(|e| MessageError::Malformed(format!("unsupported validate data: {e}")))
}
