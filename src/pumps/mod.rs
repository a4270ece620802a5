pub(crate) mod keepalive;
pub(crate) mod receive;
