pub mod cleanup;
pub mod connctx;
pub mod docstore;
pub mod roommeta;
pub mod sessionlock;
pub mod wscolab;
