pub mod cli;
pub mod listen;
pub mod run;
