pub mod cell;
pub mod maze;
pub mod navigate;
pub mod path;
