#![doc = "Street-level imagery coverage: vector-tile decoding, coverage filtering, refresh scheduling and click resolution"]
pub mod api;
mod click;
mod color;
mod config;
pub mod coverage;
mod engine;
pub mod geom;
mod host;
mod refresh;
pub mod sequence;
pub mod spatial;
pub mod tile;

#[doc(inline)]
pub use click::{ClickDispatcher, ClickOutcome, Hit, OpenedImage};

#[doc(inline)]
pub use color::{sequence_color, year_color, Rgb};

#[doc(inline)]
pub use config::{Config, LayerSource, LayerSources, ACCESS_TOKEN_ENV};

#[doc(inline)]
pub use engine::Engine;

#[doc(inline)]
pub use host::{LayerData, LayerSink, Notifier, Viewer};

#[doc(inline)]
pub use refresh::{CoverageSession, MapSession, RefreshCycle, RefreshOutcome, RefreshState, Scheduler, Viewport};
