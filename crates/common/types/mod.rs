mod account;
mod account_update;
mod genesis;

pub use account::*;
pub use account_update::AccountUpdate;
pub use genesis::*;
