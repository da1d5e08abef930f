//! 领域模型：操作与页面状态

pub mod action;
pub mod state;

pub use action::{click, extract, navigate, press, type_text, wait_for, Action, Signature};
pub use state::PageState;
