pub mod app_error;
pub mod call_error;

pub use app_error::{AppError, AppResult};
pub use call_error::{CallError, CallResult};
