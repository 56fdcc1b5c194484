pub mod operation_reader;
pub mod order_writer;
