//! Byte-size primitives for video-fetch
//!
//! Media sizes reported by the extractor are plain byte counts. This component
//! wraps them in a type that knows the two renderings the front ends use:
//!
//! - a fixed mebibyte label with one decimal (`"123.4 MB"`) for quality lists
//! - a binary unit ladder (`"512.0 B"`, `"1.5 KB"`, ... `"TB"`) for download rows
//!
//! # Examples
//!
//! ```
//! use storage_primitives::ByteSize;
//!
//! let size = ByteSize::new(524_288_000);
//! assert_eq!(size.megabytes_label(), "500.0 MB");
//! assert_eq!(size.to_string(), "500.0 MB");
//!
//! let small = ByteSize::new(1_536);
//! assert_eq!(small.to_string(), "1.5 KB");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

const KIB: f64 = 1024.0;

/// Size in bytes with human-readable rendering
///
/// The inner value is private; construct with [`ByteSize::new`] or `From<u64>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ByteSize(u64);

impl ByteSize {
    /// Zero bytes, used for "size unknown" in quality listings
    pub const ZERO: ByteSize = ByteSize(0);

    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Get the raw byte value
    pub const fn bytes(&self) -> u64 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Size in mebibytes (1 MB = 1024 * 1024 bytes) with fractional part
    pub fn mebibytes_f64(&self) -> f64 {
        self.0 as f64 / KIB / KIB
    }

    /// Always-in-megabytes label, rounded to one decimal
    ///
    /// ```
    /// # use storage_primitives::ByteSize;
    /// assert_eq!(ByteSize::new(0).megabytes_label(), "0.0 MB");
    /// assert_eq!(ByteSize::new(3 * 1024 * 1024 * 1024).megabytes_label(), "3072.0 MB");
    /// ```
    pub fn megabytes_label(&self) -> String {
        format!("{:.1} MB", self.mebibytes_f64())
    }

    pub const fn saturating_add(self, other: ByteSize) -> ByteSize {
        ByteSize(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for ByteSize {
    /// Walks B, KB, MB, GB and stops at the first unit below 1024, else TB
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut size = self.0 as f64;
        for unit in ["B", "KB", "MB", "GB"] {
            if size < KIB {
                return write!(f, "{:.1} {}", size, unit);
            }
            size /= KIB;
        }
        write!(f, "{:.1} TB", size)
    }
}

impl From<u64> for ByteSize {
    fn from(bytes: u64) -> Self {
        ByteSize(bytes)
    }
}
