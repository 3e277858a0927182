pub mod accounts;
pub mod session;

pub use accounts::{current_session, sign_in, sign_out, sign_up, SignedIn};
