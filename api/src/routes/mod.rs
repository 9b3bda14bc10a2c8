mod health_check;
mod unsubscribe;

pub use health_check::*;
pub use unsubscribe::*;
