pub(crate) mod coordinator;
pub(crate) mod worker;
