pub mod promise;
pub mod reason;
pub mod state;

pub use promise::{Promise, Resolver};
pub use reason::Reason;
pub use state::PromiseState;
