//! UI Components
//!
//! Leptos components for the session gate and the restaurants view.

mod auth_header;
mod loading_spinner;
mod restaurant_form;
mod restaurant_table;
mod session_shell;
mod sign_out_button;

pub use auth_header::AuthHeader;
pub use loading_spinner::LoadingSpinner;
pub use restaurant_form::RestaurantForm;
pub use restaurant_table::RestaurantTable;
pub use session_shell::SessionShell;
pub use sign_out_button::SignOutButton;
