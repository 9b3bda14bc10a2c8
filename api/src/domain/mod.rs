pub mod opt_out;
pub mod unsubscribe_store;
