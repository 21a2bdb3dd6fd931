//! Configuration constants for the loader
//!
//! Centralized limits and well-known names used throughout the crate.
//!
//! # Security Considerations
//!
//! The limits prevent:
//! - Memory exhaustion from oversized configuration files
//! - Stack overflow from runaway import chains
//! - Infinite recursion in `%name%` placeholder resolution

/// XML namespace of the service container vocabulary.
///
/// Elements in this namespace (or in no namespace at all) are handled by the
/// loader itself; every other namespace is dispatched to an extension.
pub const SERVICES_NAMESPACE: &str = "http://servicewire.dev/schema/dic/services";

/// Root element of an XML configuration file.
pub const ROOT_ELEMENT: &str = "container";

/// Maximum configuration file size in bytes (10 MB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum nesting of imports.
///
/// Real configurations rarely nest more than a handful of levels; the limit
/// only exists to stop runaway chains that the cycle check cannot see
/// (e.g. generated file names).
pub const MAX_IMPORT_DEPTH: usize = 32;

/// Maximum depth for `%name%` parameter resolution.
pub const MAX_RESOLUTION_DEPTH: usize = 50;

/// Number of hex characters of the file hash used in anonymous service ids.
pub const ANONYMOUS_ID_HASH_LEN: usize = 16;
