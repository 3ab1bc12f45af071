//! Inbound/outbound message envelopes exchanged with the embedding host
//! (spec §6). Field names match the wire shapes in the spec exactly so a
//! host-bridge implementation can serialize/deserialize these directly
//! without a translation layer.

use serde::{Deserialize, Serialize};

use crate::value::VariablesReference;

/// The "run" message: binds `entryPoint`/`refCounting` and everything
/// else the ABI consumes from the evaluated program (spec §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunMessage {
    pub id: String,
    /// Opaque program blob; evaluating it is the code-loading
    /// collaborator's job (spec §1, §4.9) — the runtime never looks
    /// inside `code` itself.
    pub code: String,
    #[serde(default)]
    pub ref_counting_debug: bool,
}

/// Debugger command/request subtypes (spec §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "subtype", rename_all = "camelCase")]
pub enum DebuggerSubtype {
    Config { set_breakpoints: Vec<u32> },
    TraceConfig { interval: u32 },
    Pause,
    Resume,
    Stepover,
    Stepinto,
    Stepout,
    Variables {
        variables_reference: VariablesReference,
        seq: u32,
    },
}

/// Everything the host can post into the runtime.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundMessage {
    Run(RunMessage),
    Debugger(DebuggerSubtype),
    /// Dispatched to the optional `handleCustomMessage` hook (spec §6);
    /// the runtime does not interpret the payload.
    Custom(serde_json::Value),
}

/// Runtime lifecycle state posted in `status` messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Running,
    Killed,
}

/// A resolved variable, as returned by the debugger's `variables`
/// request (spec §4.7).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VariableEntry {
    pub name: String,
    pub value: String,
    /// Non-zero if this variable's own value is itself expandable
    /// (an object/array), echoing another `VariablesReference`.
    pub variables_reference: VariablesReference,
}

/// Payload computed by `getBreakpointMsg` (spec §4.7), decorated with
/// exception context on an uncaught error (spec §4.1, §7).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BreakpointPayload {
    pub breakpoint_id: u32,
    pub global_names: Vec<String>,
    pub locals: Vec<VariableEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_stack: Option<String>,
}

/// Everything the runtime can post to the host.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    Status {
        runtimeid: String,
        state: RunState,
    },
    Serial {
        data: String,
        id: String,
        sim: bool,
    },
    Breakpoint(BreakpointPayload),
    Debugger(DebuggerOutbound),
}

/// Outbound debugger traffic (trace positions, variables responses).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "subtype", rename_all = "camelCase")]
pub enum DebuggerOutbound {
    Trace { breakpoint_id: u32 },
    Variables {
        #[serde(rename = "req_seq")]
        req_seq: u32,
        variables: Vec<VariableEntry>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debugger_subtype_round_trips_through_json() {
        let msg = InboundMessage::Debugger(DebuggerSubtype::Config {
            set_breakpoints: vec![1, 2, 3],
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"subtype\":\"config\""));
        let back: InboundMessage = serde_json::from_str(&json).unwrap();
        match back {
            InboundMessage::Debugger(DebuggerSubtype::Config { set_breakpoints }) => {
                assert_eq!(set_breakpoints, vec![1, 2, 3]);
            }
            _ => panic!("unexpected variant"),
        }
    }

    #[test]
    fn status_message_serializes_expected_shape() {
        let msg = OutboundMessage::Status {
            runtimeid: "r1".into(),
            state: RunState::Killed,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["state"], "killed");
    }
}
