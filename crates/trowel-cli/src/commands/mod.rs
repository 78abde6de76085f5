//! Command handlers grouped by concern.

pub(crate) mod media;
pub(crate) mod records;
