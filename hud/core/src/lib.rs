//! HUD Core - Page Engine and Reading State for the Aozora HUD Companion
//!
//! This crate holds everything the companion needs to drive a pair of
//! smart glasses: the page manager that owns what is on the heads-up
//! display, the pages themselves, and the host-side state behind them
//! (archive access, pagination, reading progress). It talks to the glasses
//! only through the [`DeviceBridge`] trait, so it runs equally well against
//! real hardware or the in-process [`HeadlessBridge`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Companion (host)                         │
//! │   CLI / search input ──► SearchPipeline ──► ArchiveRepository │
//! │                                   │                           │
//! │                            ReadingSession ◄──► ProgressStore  │
//! │                                   │ PageLoader                │
//! └───────────────────────────────────┼───────────────────────────┘
//!                                     │
//! ┌───────────────────────────────────┼───────────────────────────┐
//! │                         PageManager                           │
//! │   active Box<dyn Page> ◄── dispatch(HubEvent) ◄── event stream │
//! │          │ render()                                           │
//! │          ▼                                                    │
//! │   RenderDescription ──► DeviceBridge (create / rebuild /      │
//! │                          text upgrade / image / audio)        │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Module Overview
//!
//! - [`archive`]: HTTP client and cached repository for the text archive
//! - [`bridge`]: device bridge contract, hardware events, headless bridge
//! - [`config`]: layered configuration (defaults, TOML, env, CLI)
//! - [`handshake`]: deadline race for acquiring the bridge
//! - [`imaging`]: image fetching and fitting for image containers
//! - [`manager`]: the page manager and event routing
//! - [`page`]: the [`Page`] trait and the handles a page receives
//! - [`pages`]: reader, splash and demo pages
//! - [`pagination`]: fixed-size text pagination
//! - [`progress`]: persisted reading progress
//! - [`render`]: container model shipped to the display
//! - [`search`]: debounce and throttle for search input
//! - [`session`]: opening works and the "currently reading" list

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod bridge;
pub mod config;
pub mod handshake;
pub mod imaging;
pub mod manager;
pub mod page;
pub mod pages;
pub mod pagination;
pub mod progress;
pub mod render;
pub mod search;
pub mod session;

// Re-exports for convenience
pub use archive::{ArchiveClient, ArchiveError, ArchiveRepository, HttpArchiveClient, Work, WorkSummary};
pub use bridge::{
    BridgeCall, BridgeError, DeviceBridge, DeviceStatus, HeadlessBridge, HubEvent, OsEventType,
};
pub use handshake::{with_timeout, HandshakeTimeout, DEFAULT_HANDSHAKE_TIMEOUT};
pub use manager::{HudError, PageManager, Reaction};
pub use page::{Page, PageContext, PageLoader};
pub use pagination::{page_count, paginate, MAX_CHARS_PER_PAGE};
pub use progress::{FileStore, KeyValueStore, MemoryStore, ProgressStore, ReadingProgress, StoreError};
pub use render::{RenderDescription, RenderError};
pub use search::SearchPipeline;
pub use session::{OpenedReader, ReadingEntry, ReadingSession, SessionError};

// Config exports
pub use config::{
    default_config_path, load_config, CompanionConfig, CompanionToml, ConfigError,
    ConfigOverrides, ConfigSource,
};
