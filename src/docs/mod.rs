//! Service Authorization Reference documentation pages
//!
//! The documentation site is the only source of operation descriptions and
//! dependent actions.
//!
//! # Module Structure
//!
//! - [`resolver`] - Maps a service id to its documentation page URL
//! - [`tables`] - Classifies page tables and parses their rows
//! - [`dependencies`] - Extracts `service:Action` references
//!
//! # Example
//!
//! ```ignore
//! use iamref::docs::tables::parse_page;
//!
//! let page = parse_page(&html);
//! let record = page.into_record("s3");
//! ```

pub mod dependencies;
pub mod resolver;
pub mod tables;

pub use dependencies::{
    extract_dependencies, extract_dependencies_from_markup, extract_dependencies_with_links,
};
pub use resolver::{normalize_service_id, PageResolver, ResolverConfig};
pub use tables::{parse_page, ParseAnomaly, ParsedPage};
