//! Utility functions and helpers.

pub mod dates;
pub mod html;
pub mod http;
pub mod report;
pub mod text;
pub mod throttle;
pub mod url;

pub use dates::{parse_date, to_iso};
pub use html::{extract_links, strip_html};
pub use text::slugify;
pub use throttle::HostThrottle;
pub use url::{canonicalize, get_domain, url_hash};
