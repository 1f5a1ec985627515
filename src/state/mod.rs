//! State module for page visit outcomes
//!
//! Every stored page record carries the state its single visit ended in.

mod page_state;

pub use page_state::PageState;
