//! Interface layer: CSV streaming of workflow operations in and final
//! order states out.

pub mod csv;
