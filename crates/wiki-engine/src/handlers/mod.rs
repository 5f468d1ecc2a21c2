//! Handlers for the built-in constructs.
//!
//! Each handler turns one recognized construct into a [`HandlerResult`]. The
//! driver has already compiled the body of scoped constructs (styles,
//! headings) when their handler runs.
//!
//! [`HandlerResult`]: crate::HandlerResult

pub(crate) mod comment;
pub(crate) mod completion;
pub(crate) mod emoji;
pub(crate) mod heading;
pub(crate) mod link;
pub(crate) mod markup;
