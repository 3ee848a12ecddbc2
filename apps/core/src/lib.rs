pub mod codec;
pub mod collection;
pub mod column_sort;
pub mod config;
pub mod logging;
pub mod model;
pub mod persister;
pub mod runtime;
pub mod storage;
pub mod store;
pub mod tracker;
