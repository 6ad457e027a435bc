pub mod provider;
pub mod redis;
pub mod storage;
