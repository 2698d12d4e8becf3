//! Registry-domain fixtures shared by unit tests.

use crate::arena::Key;
use std::collections::BTreeMap;

///
/// Language
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Language {
    En,
    Fi,
    Sv,
}

entity! {
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Address {
        pub street: String,
    }

    path: "registry::Address",
}

entity! {
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Organization {
        pub name: String,
        pub address: Option<Key<Address>> => relation,
    }

    path: "registry::Organization",
}

entity! {
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Description {
        pub text: String,
    }

    path: "registry::Description",
}

entity! {
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Service {
        pub name: String,
        pub kind: u32,
        pub organization: Option<Key<Organization>> => relation,
        pub channels: Vec<Key<Channel>> => relation,
        pub descriptions: BTreeMap<Language, Key<Description>> => relation,
    }

    path: "registry::Service",
}

entity! {
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Channel {
        pub name: String,
        pub service: Option<Key<Service>> => relation,
    }

    path: "registry::Channel",
}

entity! {
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Node {
        pub label: String,
        pub children: Vec<Key<Node>> => relation,
    }

    path: "registry::Node",
}

entity! {
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Law {
        pub title: String,
    }

    path: "registry::Law",
}

impl Organization {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl Service {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_channels(mut self, channels: &[Key<Channel>]) -> Self {
        self.channels = channels.to_vec();
        self
    }
}

impl Channel {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl Node {
    pub fn new(label: &str, children: &[Key<Self>]) -> Self {
        Self {
            label: label.to_string(),
            children: children.to_vec(),
        }
    }
}
