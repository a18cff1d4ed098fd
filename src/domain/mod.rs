mod approval;
mod identity;
mod investment;
mod money;
mod request;
mod timestamp;
mod transaction;

pub use approval::*;
pub use identity::*;
pub use investment::*;
pub use money::*;
pub use request::*;
pub use timestamp::*;
pub use transaction::*;
