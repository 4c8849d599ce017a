//! Cloud identity client
//!
//! devloop asks the cloud server who the current token belongs to, so the UI
//! can show the signed-in user and suggest upgrades.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────┐
//! │      CloudClient trait      │
//! │  - whoami()                 │
//! └─────────────────────────────┘
//!                │
//!        ┌───────┴────────┐
//!        ▼                ▼
//! ┌────────────────┐  ┌──────────────┐
//! │ HttpCloudClient│  │ test fakes   │
//! │ (reqwest)      │  │              │
//! └────────────────┘  └──────────────┘
//! ```

pub mod client;
pub mod error;
pub mod http_client;
pub mod token;
pub mod types;

pub use client::CloudClient;
pub use error::CloudError;
pub use http_client::{whoami_url, HttpCloudClient};
pub use token::TokenResolver;
pub use types::{WhoAmIRequest, WhoAmIResponse, TEAM_ID_HEADER, TOKEN_HEADER};
