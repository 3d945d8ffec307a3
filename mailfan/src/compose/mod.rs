//! Message composition
//!
//! Turns a stored draft into per-recipient HTML: merge fields are
//! substituted by [`render`], and the result is wrapped in an
//! Outlook-compatible document frame by [`frame_html`].
//!
//! ```
//! use std::collections::HashMap;
//!
//! let fields = HashMap::from([("name".to_string(), "Priya".to_string())]);
//! let body = mailfan::compose::render("<p>Hi ${name}</p>", &fields);
//! assert_eq!(body, "<p>Hi Priya</p>");
//! ```

mod html;
mod template;

pub use html::frame_html;
pub use template::render;
