//! Resource identity and the canonical locator format.
//!
//! ```text
//! spx://resources/backdrops/<name>
//! spx://resources/sounds/<name>
//! spx://resources/sprites/<name>
//! spx://resources/sprites/<sprite>/costumes/<name>
//! spx://resources/sprites/<sprite>/animations/<name>
//! spx://resources/widgets/<name>
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smol_str::SmolStr;

use crate::error::ResourceIdError;

const SCHEME: &str = "spx://resources/";

/// Kind of an asset resource
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Backdrop,
    Sound,
    Sprite,
    SpriteCostume,
    SpriteAnimation,
    Widget,
}

impl ResourceKind {
    /// Word used in diagnostics: `sprite resource "Ghost" not found`.
    pub fn display(self) -> &'static str {
        match self {
            Self::Backdrop => "backdrop",
            Self::Sound => "sound",
            Self::Sprite => "sprite",
            Self::SpriteCostume => "sprite costume",
            Self::SpriteAnimation => "sprite animation",
            Self::Widget => "widget",
        }
    }

    /// Whether names of this kind are scoped to a sprite.
    pub fn is_sprite_scoped(self) -> bool {
        matches!(self, Self::SpriteCostume | Self::SpriteAnimation)
    }
}

/// Structured resource identifier: a kind plus one or two name components
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    pub kind: ResourceKind,
    /// Owning sprite of a costume or animation
    pub sprite: Option<SmolStr>,
    pub name: SmolStr,
}

impl ResourceId {
    pub fn backdrop(name: impl Into<SmolStr>) -> Self {
        Self::top(ResourceKind::Backdrop, name)
    }

    pub fn sound(name: impl Into<SmolStr>) -> Self {
        Self::top(ResourceKind::Sound, name)
    }

    pub fn sprite(name: impl Into<SmolStr>) -> Self {
        Self::top(ResourceKind::Sprite, name)
    }

    pub fn widget(name: impl Into<SmolStr>) -> Self {
        Self::top(ResourceKind::Widget, name)
    }

    pub fn costume(sprite: impl Into<SmolStr>, name: impl Into<SmolStr>) -> Self {
        Self {
            kind: ResourceKind::SpriteCostume,
            sprite: Some(sprite.into()),
            name: name.into(),
        }
    }

    pub fn animation(sprite: impl Into<SmolStr>, name: impl Into<SmolStr>) -> Self {
        Self {
            kind: ResourceKind::SpriteAnimation,
            sprite: Some(sprite.into()),
            name: name.into(),
        }
    }

    fn top(kind: ResourceKind, name: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            sprite: None,
            name: name.into(),
        }
    }

    /// Canonical locator string
    pub fn to_locator(&self) -> String {
        self.to_string()
    }

    /// The same resource under a new name.
    pub fn renamed(&self, name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sprite = self.sprite.as_deref().unwrap_or_default();
        match self.kind {
            ResourceKind::Backdrop => write!(f, "{SCHEME}backdrops/{}", self.name),
            ResourceKind::Sound => write!(f, "{SCHEME}sounds/{}", self.name),
            ResourceKind::Sprite => write!(f, "{SCHEME}sprites/{}", self.name),
            ResourceKind::SpriteCostume => {
                write!(f, "{SCHEME}sprites/{sprite}/costumes/{}", self.name)
            }
            ResourceKind::SpriteAnimation => {
                write!(f, "{SCHEME}sprites/{sprite}/animations/{}", self.name)
            }
            ResourceKind::Widget => write!(f, "{SCHEME}widgets/{}", self.name),
        }
    }
}

impl FromStr for ResourceId {
    type Err = ResourceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix(SCHEME)
            .ok_or_else(|| ResourceIdError::Scheme(s.to_string()))?;
        let parts: Vec<&str> = rest.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(ResourceIdError::Malformed(s.to_string()));
        }
        match parts.as_slice() {
            ["backdrops", name] => Ok(Self::backdrop(*name)),
            ["sounds", name] => Ok(Self::sound(*name)),
            ["sprites", name] => Ok(Self::sprite(*name)),
            ["widgets", name] => Ok(Self::widget(*name)),
            ["sprites", sprite, "costumes", name] => Ok(Self::costume(*sprite, *name)),
            ["sprites", sprite, "animations", name] => Ok(Self::animation(*sprite, *name)),
            ["backdrops" | "sounds" | "sprites" | "widgets", ..] => {
                Err(ResourceIdError::Malformed(s.to_string()))
            }
            _ => Err(ResourceIdError::UnknownKind(s.to_string())),
        }
    }
}

impl Serialize for ResourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_locator())
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ResourceId::backdrop("stage"), "spx://resources/backdrops/stage")]
    #[case(ResourceId::sound("Meow"), "spx://resources/sounds/Meow")]
    #[case(ResourceId::sprite("Fido"), "spx://resources/sprites/Fido")]
    #[case(ResourceId::costume("Fido", "jump"), "spx://resources/sprites/Fido/costumes/jump")]
    #[case(ResourceId::animation("Fido", "walk"), "spx://resources/sprites/Fido/animations/walk")]
    #[case(ResourceId::widget("score"), "spx://resources/widgets/score")]
    fn test_locator_format(#[case] id: ResourceId, #[case] locator: &str) {
        assert_eq!(id.to_locator(), locator);
        assert_eq!(locator.parse::<ResourceId>().unwrap(), id);
    }

    #[rstest]
    #[case("file:///x", ResourceIdError::Scheme("file:///x".into()))]
    #[case("spx://resources/fonts/a", ResourceIdError::UnknownKind("spx://resources/fonts/a".into()))]
    #[case("spx://resources/sprites//costumes/a", ResourceIdError::Malformed("spx://resources/sprites//costumes/a".into()))]
    #[case("spx://resources/sounds/", ResourceIdError::Malformed("spx://resources/sounds/".into()))]
    #[case("spx://resources/sounds/a/b", ResourceIdError::Malformed("spx://resources/sounds/a/b".into()))]
    fn test_rejects_bad_locators(#[case] input: &str, #[case] expected: ResourceIdError) {
        assert_eq!(input.parse::<ResourceId>().unwrap_err(), expected);
    }

    #[test]
    fn test_serializes_as_locator() {
        let id = ResourceId::costume("Fido", "jump");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"spx://resources/sprites/Fido/costumes/jump\"");
        let back: ResourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
