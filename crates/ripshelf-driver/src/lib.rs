pub mod error;
pub mod handbrake;
pub mod makemkv;
pub mod probe;
pub mod pushover;
pub mod tmdb;

pub use error::DriverError;
pub use handbrake::{EncodeProgress, HandBrakeTranscoder, Transcoder};
pub use makemkv::{MakemkvRipper, Ripper, TitleInfo};
pub use probe::{DiscProbe, DiscStatus, MakemkvProbe};
pub use pushover::{Notifier, NotifyReceipt, PushoverNotifier};
pub use tmdb::{Catalog, TmdbCatalog};
