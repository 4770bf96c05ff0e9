//! # IP Statistics Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Router, store and request builders
//! └── integration/
//!     ├── http_flows.rs # Router driven with tower::ServiceExt::oneshot
//!     ├── store_flows.rs# Event Store behind the async adapter
//!     └── socket.rs     # Full node on a bound listener, via reqwest
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p stats-tests
//! cargo test -p stats-tests integration::http_flows::
//! ```

pub mod fixtures;
pub mod integration;
