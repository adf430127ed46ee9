pub mod cmd;
pub mod errors;
pub mod fake;
pub mod ledger;
pub mod spec;

pub use fake::FakeLvm;
pub use ledger::{Invocation, Ledger};
pub use spec::{LabSpec, load_fake};
