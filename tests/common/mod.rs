pub(crate) mod cluster;

pub(crate) mod logging;

pub(crate) mod mem_ledger;

pub(crate) mod network;
