//! # Stage Test Utilities
//!
//! Shared test utilities for the Stage Controller.
//!
//! ## Modules
//!
//! - `mock_container` - Scriptable `DisplayContainer` with call counters
//! - `fixtures` - Pre-populated conference state
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stage_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     // Video surface whose attach of "cam-slow" takes 50ms
//!     let video = MockContainer::builder()
//!         .with_prepare_delay("cam-slow", Duration::from_millis(50))
//!         .build();
//!
//!     // Local participant with all four feeds
//!     let conference = TestConference::new().with_local_quad("me");
//!
//!     // Run your test...
//! }
//! ```

pub mod fixtures;
pub mod mock_container;

// Re-export commonly used items
pub use fixtures::*;
pub use mock_container::*;
