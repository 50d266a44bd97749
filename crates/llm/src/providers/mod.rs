//! Provider implementations.

pub mod google;
pub mod mock;

pub use google::{GoogleChatClient, GoogleProvider};
pub use mock::MockProvider;
