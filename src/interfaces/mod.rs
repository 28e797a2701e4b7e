//! Input and output formats at the edge of the tool.

pub mod csv;
