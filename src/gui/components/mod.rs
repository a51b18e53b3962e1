pub mod dump_table;
pub mod paths;
