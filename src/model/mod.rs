pub mod entry;
pub mod ledger;
