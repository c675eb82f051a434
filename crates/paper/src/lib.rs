//! Simulated market access for paper trading.
//!
//! `PaperBroker` fills orders locally with zero external calls; `SimFeed`
//! produces a random-walk quote stream. Together they let the full
//! orchestration path run end to end without a real brokerage session.

mod broker;
mod feed;

pub use broker::PaperBroker;
pub use feed::SimFeed;
