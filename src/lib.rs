// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Weighted-reserve token converter.
//!
//! A converter issues and destroys one governed flexible token against a set
//! of reserve tokens, and exchanges reserves with each other, along a
//! constant-weight bonding curve.

pub mod types;
pub mod error;
pub mod formula;
pub mod fee;
pub mod reserve;
pub mod governance;
pub mod services;
pub mod events;
pub mod request;
pub mod config;
pub mod converter;

// In-memory host for sandboxes, stress runs and tests
pub mod memory;
pub mod wasm;

pub use config::{ConverterConfig, InitialReserve};
pub use converter::{ConversionPath, Converter, ConverterState};
pub use error::ConverterError;
pub use events::ConverterEvent;
pub use fee::ConversionQuote;
pub use memory::MemoryHost;
pub use request::{ConversionParams, InboundRequest};
pub use reserve::{ReserveInfo, ReserveRegistry, WeightedReserve};
pub use services::{EventSink, GovernedToken, Host, RegistryResolver, ReserveToken, ServiceError};
pub use types::{Address, Amount, ServiceName};
