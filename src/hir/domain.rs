//! Engine vocabulary shared by the checker, the resource resolver, completion
//! and the input-slot classifier.

use crate::resource::ResourceKind;

/// Name of the bundled engine package, dot-imported into every unit.
pub const ENGINE_PACKAGE: &str = "spx";

/// Class declared by the entry file
pub const GAME_CLASS: &str = "Game";

/// Engine class embedded by the game class
pub const GAME_BASE: &str = "Game";
/// Engine class embedded by every sprite class
pub const SPRITE_BASE: &str = "SpriteImpl";
/// Engine interface satisfied by every sprite class
pub const SPRITE_INTERFACE: &str = "Sprite";

/// A color constructor: engine function building a `Color` from numbers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorConstructor {
    pub name: &'static str,
    pub arity: usize,
}

pub const COLOR_CONSTRUCTORS: &[ColorConstructor] = &[
    ColorConstructor {
        name: "HSB",
        arity: 3,
    },
    ColorConstructor {
        name: "HSBA",
        arity: 4,
    },
];

/// The color constructor with this name and argument count.
pub fn color_constructor(name: &str, arity: usize) -> Option<&'static ColorConstructor> {
    COLOR_CONSTRUCTORS
        .iter()
        .find(|c| c.name == name && c.arity == arity)
}

/// Enumerated engine types whose constants collapse to in-place values
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnumDomain {
    Direction,
    Key,
    RotationStyle,
    SpecialObj,
    EffectKind,
    PlayAction,
}

impl EnumDomain {
    pub const ALL: [EnumDomain; 6] = [
        Self::Direction,
        Self::Key,
        Self::RotationStyle,
        Self::SpecialObj,
        Self::EffectKind,
        Self::PlayAction,
    ];

    /// Engine type name of the domain
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Direction => "Direction",
            Self::Key => "Key",
            Self::RotationStyle => "RotationStyle",
            Self::SpecialObj => "SpecialObj",
            Self::EffectKind => "EffectKind",
            Self::PlayAction => "PlayAction",
        }
    }

    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.type_name() == name)
    }

    /// Directions are edited as numbers, everything else by constant name.
    pub fn is_numeric(self) -> bool {
        self == Self::Direction
    }
}

/// Engine string types whose values name resources.
pub const RESOURCE_NAME_TYPES: &[(&str, ResourceKind)] = &[
    ("BackdropName", ResourceKind::Backdrop),
    ("SoundName", ResourceKind::Sound),
    ("SpriteName", ResourceKind::Sprite),
    ("SpriteCostumeName", ResourceKind::SpriteCostume),
    ("SpriteAnimationName", ResourceKind::SpriteAnimation),
    ("WidgetName", ResourceKind::Widget),
];

/// Resource kind named by values of the engine type `name`.
pub fn resource_name_kind(name: &str) -> Option<ResourceKind> {
    RESOURCE_NAME_TYPES
        .iter()
        .find(|(type_name, _)| *type_name == name)
        .map(|(_, kind)| *kind)
}

/// Engine struct types whose fields bind to resources by name
pub const RESOURCE_FIELD_TYPES: &[(&str, ResourceKind)] = &[
    ("Sound", ResourceKind::Sound),
    ("Monitor", ResourceKind::Widget),
];

pub fn resource_field_kind(name: &str) -> Option<ResourceKind> {
    RESOURCE_FIELD_TYPES
        .iter()
        .find(|(type_name, _)| *type_name == name)
        .map(|(_, kind)| *kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_constructor_lookup() {
        assert!(color_constructor("HSB", 3).is_some());
        assert!(color_constructor("HSB", 4).is_none());
        assert!(color_constructor("HSBA", 4).is_some());
        assert!(color_constructor("RGB", 3).is_none());
    }

    #[test]
    fn test_domain_names_round_trip() {
        for domain in EnumDomain::ALL {
            assert_eq!(EnumDomain::from_type_name(domain.type_name()), Some(domain));
        }
        assert!(EnumDomain::Direction.is_numeric());
        assert!(!EnumDomain::Key.is_numeric());
    }

    #[test]
    fn test_resource_name_kinds() {
        assert_eq!(resource_name_kind("SpriteName"), Some(ResourceKind::Sprite));
        assert_eq!(resource_name_kind("string"), None);
        assert_eq!(resource_field_kind("Monitor"), Some(ResourceKind::Widget));
    }
}
