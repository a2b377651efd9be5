//! DSP chain routing: endpoint registries, chain fallback, sink feed.

mod handle;
mod router;

pub use handle::{Hub, HubBuilder};
pub use router::InfoKind;
