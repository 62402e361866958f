pub mod ledger_writer;
pub mod settlement_reader;
