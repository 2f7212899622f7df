pub mod apfd;
pub mod classify;
pub mod compare;
pub mod transcript;
