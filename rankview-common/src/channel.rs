//! Color channel identities
//!
//! The wire format and every per-channel array use the fixed order
//! red, green, blue (channel 0, 1, 2).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// One of the three color channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Red = 0,
    Green = 1,
    Blue = 2,
}

impl Channel {
    /// All channels in wire order
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    /// Position of this channel in wire order
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Red => "red",
            Channel::Green => "green",
            Channel::Blue => "blue",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed three-slot container indexed by [`Channel`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PerChannel<T>([T; 3]);

impl<T> PerChannel<T> {
    pub fn new(red: T, green: T, blue: T) -> Self {
        Self([red, green, blue])
    }

    /// Build by calling `f` once per channel, in wire order
    pub fn from_fn(mut f: impl FnMut(Channel) -> T) -> Self {
        Self([f(Channel::Red), f(Channel::Green), f(Channel::Blue)])
    }

    pub fn map<U>(self, mut f: impl FnMut(Channel, T) -> U) -> PerChannel<U> {
        let [r, g, b] = self.0;
        PerChannel([f(Channel::Red, r), f(Channel::Green, g), f(Channel::Blue, b)])
    }

    pub fn each_ref(&self) -> PerChannel<&T> {
        let [r, g, b] = &self.0;
        PerChannel([r, g, b])
    }

    /// Iterate `(channel, value)` pairs in wire order
    pub fn iter(&self) -> impl Iterator<Item = (Channel, &T)> {
        Channel::ALL.into_iter().zip(self.0.iter())
    }

    pub fn into_array(self) -> [T; 3] {
        self.0
    }
}

impl<T> PerChannel<Option<T>> {
    /// `Some` only when every slot is filled
    pub fn transpose(self) -> Option<PerChannel<T>> {
        let [r, g, b] = self.0;
        Some(PerChannel([r?, g?, b?]))
    }
}

impl<T> Index<Channel> for PerChannel<T> {
    type Output = T;

    fn index(&self, channel: Channel) -> &T {
        &self.0[channel.index()]
    }
}

impl<T> IndexMut<Channel> for PerChannel<T> {
    fn index_mut(&mut self, channel: Channel) -> &mut T {
        &mut self.0[channel.index()]
    }
}

impl<T> IntoIterator for PerChannel<T> {
    type Item = (Channel, T);
    type IntoIter = std::iter::Zip<std::array::IntoIter<Channel, 3>, std::array::IntoIter<T, 3>>;

    fn into_iter(self) -> Self::IntoIter {
        Channel::ALL.into_iter().zip(self.0)
    }
}
