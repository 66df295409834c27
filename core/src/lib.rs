//! Typed client for the IFPA pinball tournament and ranking API.
//!
//! # Overview
//! Callers describe a search as an immutable [`Query`] (or a single-resource
//! [`Lookup`]) and hand it to an [`IfpaClient`], which validates, resolves,
//! executes and decodes it. Every terminal operation exists in a blocking and
//! an `async` form with identical semantics.
//!
//! ```no_run
//! use ifpa_core::{ClientConfig, IfpaClient, Query};
//!
//! # fn main() -> Result<(), ifpa_core::Error> {
//! let client = IfpaClient::new(ClientConfig::default().with_api_key("key"))?;
//! let base = Query::players().country("US");
//! for player in client.iterate(&base.state("OR"), 100) {
//!     let player = player?;
//!     println!("{} {}", player.first_name, player.last_name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! - Resolution is pure. `IfpaClient::resolve` produces an `HttpRequest`
//!   without touching the network, so requests can be inspected and tested
//!   deterministically.
//! - I/O happens behind the `Transport` trait only. The blocking and async
//!   paths share resolution, validation, classification and decoding; they
//!   differ in which transport method they call.
//! - Non-2xx responses become `ApiError` values refined by an ordered table
//!   of semantic descriptors (`classify`).
//! - No retries anywhere. A timeout or rate limit is reported once.
//! - Wire shapes are defined independently from the mock-server crate;
//!   integration tests catch schema drift.

pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod paginate;
pub mod query;
pub mod transport;
pub mod types;
pub mod validate;

pub use client::IfpaClient;
pub use config::ClientConfig;
pub use error::{ApiError, ApiErrorKind, ConfigError, Error, TransportError, ValidationError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestContext};
pub use paginate::{Pages, DEFAULT_PAGE_SIZE};
pub use query::{
    Directors, Lookup, Players, Query, RankingSystem, Rankings, SortOrder, TournamentSort,
    Tournaments,
};
pub use transport::{HttpTransport, Transport};
pub use types::{
    Director, Player, PlayerSummary, PvpRecord, RankingEntry, Tournament, TournamentResult,
    TournamentResults,
};

/// Re-exported so callers can build a token for `IfpaClient::stream_until`.
pub use tokio_util::sync::CancellationToken;
