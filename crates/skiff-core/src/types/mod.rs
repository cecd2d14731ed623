//! Bot API data types used across the framework.

pub mod dto;
pub mod enums;
pub mod keyboard;

pub use dto::{ChatDto, DiceValue, MessageDto, MessageEntity, UserDto};
pub use enums::{ChatAction, Dice, ParseMode};
pub use keyboard::{Button, Key, WebAppInfo, keyboard};
