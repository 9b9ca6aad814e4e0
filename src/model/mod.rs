//! Domain types: laptops, search filters and users.

mod filter;
mod laptop;
mod user;

pub use filter::Filter;
pub use laptop::{
    Cpu, Gpu, Keyboard, KeyboardLayout, Laptop, Memory, MemoryUnit, Panel, Resolution, Screen,
    Storage, StorageDriver, Weight,
};
pub use user::User;
