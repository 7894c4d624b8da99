mod account;
mod category;
mod goal;
mod incentive;
mod ledger;
mod money;
mod profile;
mod reminder;
mod transaction;
mod user;

pub use account::*;
pub use category::*;
pub use goal::*;
pub use incentive::*;
pub use ledger::*;
pub use money::*;
pub use profile::*;
pub use reminder::*;
pub use transaction::*;
pub use user::*;
