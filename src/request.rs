// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Decoding of inbound token transfers.
//!
//! A transfer into the converter is either an operator funding a reserve
//! before activation, or a trader asking for a conversion. The conversion
//! payload is JSON:
//!
//! ```text
//! { "toToken": "cx...", "minReturn": 1000 }
//! ```
//!
//! `minReturn` may also be given as a decimal or `0x`-prefixed hex string.

use serde::Deserialize;

use crate::error::ConverterError;
use crate::types::{Address, Amount};

/// What an inbound transfer asks the converter to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundRequest {
    /// Operator deposit into a reserve; nothing is converted.
    Deposit,
    /// Convert the received amount into `to_token`.
    Convert(ConversionParams),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionParams {
    pub to_token: Address,
    pub min_return: Amount,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NumericPayload {
    to_token: String,
    min_return: u128,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextPayload {
    to_token: String,
    min_return: String,
}

impl ConversionParams {
    /// Decode a transfer payload.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ConverterError> {
        let (to_token, min_return) = match serde_json::from_slice::<NumericPayload>(data) {
            Ok(payload) => (payload.to_token, payload.min_return),
            Err(numeric_err) => {
                let payload: TextPayload = serde_json::from_slice(data)
                    .map_err(|_| ConverterError::MalformedRequest(numeric_err.to_string()))?;
                (payload.to_token, parse_amount(&payload.min_return)?)
            }
        };
        let to_token = Address::parse(&to_token)
            .map_err(|_| ConverterError::MalformedRequest(format!("invalid toToken {to_token:?}")))?;
        Ok(Self { to_token, min_return })
    }
}

fn parse_amount(text: &str) -> Result<Amount, ConverterError> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x") {
        Some(hex) => Amount::from_str_radix(hex, 16),
        None => text.parse::<Amount>(),
    };
    parsed.map_err(|_| ConverterError::MalformedRequest(format!("invalid minReturn {text:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_token() -> Address {
        Address::contract(0xabc)
    }

    #[test]
    fn decodes_numeric_min_return() {
        let data = format!(r#"{{"toToken":"{}","minReturn":1000}}"#, to_token());
        let params = ConversionParams::from_bytes(data.as_bytes()).expect("test: decode");
        assert_eq!(params, ConversionParams { to_token: to_token(), min_return: 1000 });
    }

    #[test]
    fn decodes_large_and_textual_min_return() {
        let big = format!(r#"{{"toToken":"{}","minReturn":340282366920938463463374607431768211455}}"#, to_token());
        let params = ConversionParams::from_bytes(big.as_bytes()).expect("test: decode u128::MAX");
        assert_eq!(params.min_return, u128::MAX);

        let hex = format!(r#"{{"toToken":"{}","minReturn":"0x3e8"}}"#, to_token());
        let params = ConversionParams::from_bytes(hex.as_bytes()).expect("test: decode hex");
        assert_eq!(params.min_return, 1000);

        let dec = format!(r#"{{"toToken":"{}","minReturn":"42"}}"#, to_token());
        let params = ConversionParams::from_bytes(dec.as_bytes()).expect("test: decode decimal text");
        assert_eq!(params.min_return, 42);
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        let cases: Vec<Vec<u8>> = vec![
            b"".to_vec(),
            b"not json".to_vec(),
            vec![0xff, 0xfe],
            br#"{"minReturn":1}"#.to_vec(),
            br#"{"toToken":"cx12","minReturn":1}"#.to_vec(),
            format!(r#"{{"toToken":"{}","minReturn":"abc"}}"#, to_token()).into_bytes(),
            format!(r#"{{"toToken":"{}","minReturn":-5}}"#, to_token()).into_bytes(),
        ];
        for data in cases {
            let err = ConversionParams::from_bytes(&data);
            assert!(
                matches!(err, Err(ConverterError::MalformedRequest(_))),
                "expected MalformedRequest for {:?}, got {err:?}",
                String::from_utf8_lossy(&data)
            );
        }
    }
}
