//! Calldata and event data as the EVM would see them, so gas is charged on real byte counts.

use crate::ledger::CallArgs;
use ethabi::{ParamType, Token};

/// Parameter list of each function the greeter exposes.
fn params(function: &str) -> Option<Vec<ParamType>> {
    match function {
        "sayHello" | "sendGreeting" => Some(vec![ParamType::String]),
        "sendBatchMessages" => Some(vec![
            ParamType::Array(Box::new(ParamType::String)),
            ParamType::Bool,
        ]),
        "getCounter" => Some(vec![]),
        _ => None,
    }
}

fn strings(items: &[String]) -> Token {
    Token::Array(items.iter().cloned().map(Token::String).collect())
}

/// Four-byte selector of `function`, or `None` if the greeter has no such function.
pub fn selector(function: &str) -> Option<[u8; 4]> {
    params(function).map(|p| ethabi::short_signature(function, &p))
}

/// Selector followed by the encoded arguments.
pub fn encode_call(selector: [u8; 4], args: &CallArgs) -> Vec<u8> {
    let tokens = match args {
        CallArgs::Empty => vec![],
        CallArgs::Text(s) => vec![Token::String(s.clone())],
        CallArgs::Batch { payloads, greeting } => vec![strings(payloads), Token::Bool(*greeting)],
    };
    let mut out = selector.to_vec();
    out.extend(ethabi::encode(&tokens));
    out
}

/// Non-indexed data of `HelloEvent` and `GreetingEvent`.
pub fn text_event_data(text: &str, timestamp: u64) -> Vec<u8> {
    ethabi::encode(&[Token::String(text.to_string()), Token::Uint(timestamp.into())])
}

/// Non-indexed data of `BatchMessagesEvent`.
pub fn batch_event_data(payloads: &[String], greeting: bool, timestamp: u64) -> Vec<u8> {
    ethabi::encode(&[
        strings(payloads),
        Token::Bool(greeting),
        Token::Uint(timestamp.into()),
    ])
}
