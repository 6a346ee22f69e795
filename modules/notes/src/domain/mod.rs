pub mod dto;
pub mod hooks;
