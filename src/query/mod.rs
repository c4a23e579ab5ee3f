//! Shared polling cache for server data, in the spirit of TanStack Query.
//!
//! Every key has at most one background poller no matter how many views
//! subscribe to it. Subscribers observe [`QuerySnapshot`]s through a watch
//! channel and decide what to draw with [`QuerySnapshot::state`].
//!
//! ```ignore
//! let client = QueryClient::new();
//! let api = api.clone();
//! let mut statuses = client.subscribe(
//!   "statuses",
//!   QueryOptions::continuous(Duration::from_secs(1)),
//!   move || {
//!     let api = api.clone();
//!     async move { api.statuses().await }
//!   },
//! )?;
//!
//! // In the event loop tick
//! if statuses.poll() {
//!   // snapshot changed, redraw
//! }
//!
//! // In render
//! match statuses.snapshot().state() {
//!   QueryState::Loading => render_loading(),
//!   QueryState::Success(board) => render_board(board),
//!   QueryState::Error(e) => render_error(e),
//! }
//! ```

mod client;
mod mutation;
mod state;

pub use client::{QueryClient, QueryError, Subscription};
pub use mutation::{Mutation, MutationState};
pub use state::{QueryOptions, QuerySnapshot, QueryState};
