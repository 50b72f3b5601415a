//! Interaction response envelopes.
//!
//! The formatter alone knows the wire encoding: response type codes and the
//! ephemeral visibility flag. Everything upstream works with a plain
//! [`ActionOutcome`](crate::dispatch::ActionOutcome).

use serde_json::{json, Value};

use crate::dispatch::ActionOutcome;

/// Response type acknowledging a liveness ping.
const RESPONSE_TYPE_PONG: u8 = 1;
/// Response type for an immediate message reply.
const RESPONSE_TYPE_MESSAGE_WITH_SOURCE: u8 = 4;
/// Message flag making the reply visible only to the invoking caller.
const FLAG_EPHEMERAL: u64 = 1 << 6;

/// Fixed acknowledgement for Discord's liveness ping.
pub fn pong() -> Value {
    json!({ "type": RESPONSE_TYPE_PONG })
}

/// Render an action outcome as a message-with-source envelope.
pub fn message(outcome: &ActionOutcome) -> Value {
    let mut data = json!({ "content": outcome.message });
    if !outcome.visible_to_all {
        data["flags"] = json!(FLAG_EPHEMERAL);
    }
    json!({
        "type": RESPONSE_TYPE_MESSAGE_WITH_SOURCE,
        "data": data,
    })
}
