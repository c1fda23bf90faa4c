use super::Function;

pub mod cse;

pub trait FunctionPass {
    fn name(&self) -> &'static str;

    /// Returns whether the function was modified.
    fn run(&mut self, function: &mut Function) -> bool;
}
