//! The closed set of wire messages.

use serde::{Deserialize, Serialize};
use valchain_types::{Block, BlockId, Digest};

/// Application value attached to an assertion. Always a JSON object.
pub type AssertionValue = serde_json::Map<String, serde_json::Value>;

/// Every message a node may send or receive.
#[derive(Clone, Debug, PartialEq)]
pub enum WireMessage {
    /// A full block, validated on receipt.
    Block(Block),
    /// A peer's head; the receiver asks for that block.
    ChainTip { block_id: BlockId },
    /// Ask a peer for its head.
    GetChainTip,
    GetBlock { block_id: BlockId },
    /// Announcement of a newly stored block.
    IHaveBlock { block_id: BlockId },
    Error { error: String },
    /// A canonical `{key,value}` string to run through the application
    /// predicate.
    Validate { data: String },
    GetValidated { key: String },
    GetConfirmed { key: String },
    OnGetValidated(KeyHashReply),
    OnGetConfirmed(KeyHashReply),
}

impl WireMessage {
    /// Value of the `type` member on the wire.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Block(_) => "block",
            Self::ChainTip { .. } => "chainTip",
            Self::GetChainTip => "getChainTip",
            Self::GetBlock { .. } => "getBlock",
            Self::IHaveBlock { .. } => "iHaveBlock",
            Self::Error { .. } => "error",
            Self::Validate { .. } => "validate",
            Self::GetValidated { .. } => "getValidated",
            Self::GetConfirmed { .. } => "getConfirmed",
            Self::OnGetValidated(_) => "onGetValidated",
            Self::OnGetConfirmed(_) => "onGetConfirmed",
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }
}

/// Answer to a validated/confirmed query. `hash` is `null` when the
/// responder knows nothing about the key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyHashReply {
    pub key: String,
    #[serde(default)]
    pub hash: Option<Digest>,
}

/// The payload of a `validate` message once parsed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PutValidatedValue {
    pub key: String,
    pub value: AssertionValue,
}

// Bodies of the non-block messages, without their `type` tag.

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct BlockIdBody {
    #[serde(rename = "blockId")]
    pub block_id: BlockId,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct EmptyBody {}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ErrorBody {
    pub error: String,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ValidateBody {
    pub data: String,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct KeyBody {
    pub key: String,
}
