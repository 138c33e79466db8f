use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, FromRepr, IntoStaticStr};

/// Spriteling types as stored in `PlayerData.AcquiredSpritelingTypes`
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    FromRepr,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[repr(i32)]
pub enum Spriteling {
    Twigling = 1,
    Barbling = 2,
    Emberling = 3,
    Shiverling = 4,
    Lunaling = 5,
    ShiverlingClone = 100,
}

/// Split label of a raw spriteling id; ids the game adds later are labeled by number.
pub fn spriteling_label(id: i32) -> String {
    match Spriteling::from_repr(id) {
        Some(spriteling) => spriteling.to_string(),
        None => id.to_string(),
    }
}
