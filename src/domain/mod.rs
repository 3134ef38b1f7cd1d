//! Domain layer - Core business entities and logic
//!
//! Plain data types shared by repositories, services and handlers.
//! Nothing here talks to the database or the network.

pub mod file;
pub mod item;
pub mod password;
pub mod token;
pub mod user;

pub use file::{File, FileChanges, NewFile};
pub use item::{Item, ItemChanges, NewItem};
pub use password::Password;
pub use token::{Token, TokenKind};
pub use user::{NewUser, User, UserChanges, UserResponse};
