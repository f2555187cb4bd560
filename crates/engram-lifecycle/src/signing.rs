//! Memory signing and verification using HMAC-SHA256.
//!
//! Provides tamper evidence for memories when agents have signing keys. An
//! agent without a key creates unsigned memories and verification is
//! skipped. A failed verification is an expected outcome surfaced as a
//! boolean, never an error.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use engram_types::{Agent, Memory};

type HmacSha256 = Hmac<Sha256>;

/// Canonical payload for signing.
///
/// Covers exactly the fields that are immutable after creation — notably
/// `original_content` rather than `content` — so a signature stays valid
/// across content compaction.
fn signing_payload(memory: &Memory) -> Vec<u8> {
    let parts = [
        memory.id.to_string(),
        memory.agent_id.clone(),
        memory.region.as_str().to_string(),
        memory.project_id.clone().unwrap_or_default(),
        memory.kind.as_str().to_string(),
        memory.original_content.clone(),
        memory.impact.as_str().to_string(),
        memory.created_at.to_rfc3339(),
    ];
    parts.join("|").into_bytes()
}

/// Sign a memory, returning the lowercase hex HMAC-SHA256 digest.
pub fn sign_memory(memory: &Memory, signing_key: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(signing_key.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(&signing_payload(memory));
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a memory's signature with a constant-time comparison.
///
/// Returns `false` (not an error) when the memory carries no signature or
/// the signature is not valid hex.
pub fn verify_signature(memory: &Memory, signing_key: &str) -> bool {
    let Some(signature) = &memory.signature else {
        return false;
    };
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };

    let mut mac = HmacSha256::new_from_slice(signing_key.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(&signing_payload(memory));
    mac.verify_slice(&expected).is_ok()
}

/// Whether an agent signs the memories it creates.
pub fn should_sign(agent: &Agent) -> bool {
    agent.has_signing_key()
}

/// Whether a memory should be verified: the agent signs and the memory
/// carries a signature.
pub fn should_verify(memory: &Memory, agent: &Agent) -> bool {
    should_sign(agent) && memory.signature.is_some()
}
