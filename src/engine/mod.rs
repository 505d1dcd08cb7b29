pub mod gjt;
pub mod relation;
pub mod storage;
