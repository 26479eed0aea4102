// Copyright 2026 Pricewatch Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pricewatch runtime library — headless price acquisition with change gating.
//!
//! A run opens one browser session, visits every catalog product in order,
//! extracts its price with ordered selector fallback and bounded retries, and
//! hands the observations to the change gate before they reach the store.

pub mod acquire;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod gate;
pub mod price;
pub mod renderer;
pub mod session;
pub mod store;

pub use acquire::{Acquisition, AcquisitionConfig, RunReport};
pub use catalog::{Catalog, Product};
pub use error::{AcquireError, StoreError};
pub use gate::{should_persist, Observation, PriceHistory};
pub use price::{parse_price, ParseError, Price};
pub use store::ObservationStore;
