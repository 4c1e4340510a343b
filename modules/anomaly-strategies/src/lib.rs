pub mod big_jump;
pub mod cast;
pub mod jump_back;

pub use big_jump::BigJumpStrategy;
pub use jump_back::JumpBackStrategy;
