pub mod cancel;
pub mod error;
pub mod events;
pub mod types;
pub mod url_norm;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use error::{classify_message, ErrorKind, Severity};
pub use events::{CollectingSink, Event, EventSink, NullSink};
pub use types::*;
pub use url_norm::{normalize_key, resolve_relative, sanitize_links, validate_absolute, InvalidUrl};
