pub mod output;
pub mod retry;
