mod api_key;
mod customer;
mod license;
mod money;
mod request;
mod sale;

pub use api_key::*;
pub use customer::*;
pub use license::*;
pub use money::*;
pub use request::*;
pub use sale::*;
