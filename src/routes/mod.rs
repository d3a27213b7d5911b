mod customer;
mod health_check;
mod index;
mod login;

pub use customer::{create, delete_by_id, find_by_id, update_by_email, UpdatedCustomer};
pub use health_check::health_check;
pub use index::index;
pub use login::{callback, login, CallbackQuery};
