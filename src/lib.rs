pub mod alias;
pub mod ir;
pub mod parser;
pub mod utils;
