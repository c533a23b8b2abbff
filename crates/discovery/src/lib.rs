//! # Context Discovery
//!
//! Proposes the project files most relevant to a free-form task description.
//!
//! ```text
//! Task ──> Keyword Extractor ──> File Matcher ──> ranked CandidateFiles
//!                                     ^
//!          fresh project listing ─────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use context_discovery::{DiscoveryConfig, FileDiscoverer};
//!
//! let discoverer = FileDiscoverer::new("/path/to/project", DiscoveryConfig::default())?;
//! for candidate in discoverer.discover("add user authentication", 10) {
//!     println!("{:>6.1}  {}", candidate.score, candidate.path);
//! }
//! # Ok::<(), context_discovery::DiscoveryError>(())
//! ```

mod config;
mod discoverer;
mod error;
mod keywords;
mod matcher;
mod synonyms;

pub use config::{DiscoveryConfig, MatchWeights, DEFAULT_MAX_RESULTS};
pub use discoverer::FileDiscoverer;
pub use error::{DiscoveryError, Result};
pub use keywords::{Keyword, KeywordExtractor, KeywordTier};
pub use matcher::{CandidateFile, FileMatcher};
pub use synonyms::SynonymTable;
