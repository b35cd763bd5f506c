//! User accounts and authentication: registration, activation, log-in,
//! cookies, and password resets.

mod cookie;
mod forgot_password;
mod link_token;
mod log_in;
mod log_out;
mod middleware;
mod password;
mod redirect;
mod register;
mod reset_password;
mod token;
mod user;
mod verify;

pub(crate) use cookie::{
    DEFAULT_COOKIE_DURATION, REMEMBER_ME_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie,
};
pub use forgot_password::{get_forgot_password_page, post_forgot_password};
pub use link_token::LinkTokenKey;
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{AuthState, auth_guard, auth_guard_hx};
pub use password::{PasswordHash, ValidatedPassword};
pub use redirect::{build_log_in_redirect_url, normalize_redirect_url};
pub use register::{get_register_page, register_user};
pub use reset_password::{get_reset_password_page, post_reset_password};
pub use user::{User, UserID, create_user_table, get_user_by_id, get_user_by_username};
pub(super) use user::create_user;
#[cfg(test)]
pub(super) use user::activate_user;
pub use verify::get_verify_account;

#[cfg(test)]
pub(crate) use cookie::COOKIE_TOKEN;
