//! Patient avatar identifiers.
//!
//! The presentation catalog is closed: three age brackets times two
//! presentation genders. Anything outside it renders as a generic figure.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeBracket {
    Child,
    Adult,
    Elderly,
}

impl AgeBracket {
    /// < 18 → child, 18..65 → adult, ≥ 65 → elderly.
    pub fn for_age(age: u32) -> Self {
        match age {
            0..=17 => AgeBracket::Child,
            18..=64 => AgeBracket::Adult,
            _ => AgeBracket::Elderly,
        }
    }
}

/// The gender a portrait and voice are rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresentationGender {
    Male,
    Female,
}

impl PresentationGender {
    pub fn as_str(self) -> &'static str {
        match self {
            PresentationGender::Male => "male",
            PresentationGender::Female => "female",
        }
    }
}

/// One of the six catalog portraits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AvatarId {
    #[serde(rename = "child-male")]
    ChildMale,
    #[serde(rename = "child-female")]
    ChildFemale,
    #[serde(rename = "adult-male")]
    AdultMale,
    #[serde(rename = "adult-female")]
    AdultFemale,
    #[serde(rename = "elderly-male")]
    ElderlyMale,
    #[serde(rename = "elderly-female")]
    ElderlyFemale,
}

impl AvatarId {
    pub const ALL: &'static [AvatarId] = &[
        AvatarId::ChildMale,
        AvatarId::ChildFemale,
        AvatarId::AdultMale,
        AvatarId::AdultFemale,
        AvatarId::ElderlyMale,
        AvatarId::ElderlyFemale,
    ];

    pub fn new(bracket: AgeBracket, gender: PresentationGender) -> Self {
        use AgeBracket::*;
        use PresentationGender::*;
        match (bracket, gender) {
            (Child, Male) => AvatarId::ChildMale,
            (Child, Female) => AvatarId::ChildFemale,
            (Adult, Male) => AvatarId::AdultMale,
            (Adult, Female) => AvatarId::AdultFemale,
            (Elderly, Male) => AvatarId::ElderlyMale,
            (Elderly, Female) => AvatarId::ElderlyFemale,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AvatarId::ChildMale => "child-male",
            AvatarId::ChildFemale => "child-female",
            AvatarId::AdultMale => "adult-male",
            AvatarId::AdultFemale => "adult-female",
            AvatarId::ElderlyMale => "elderly-male",
            AvatarId::ElderlyFemale => "elderly-female",
        }
    }

    /// Catalog lookup. Unknown identifiers return `None`, never an error.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        let wanted = identifier.trim().to_ascii_lowercase();
        Self::ALL.iter().copied().find(|id| id.as_str() == wanted)
    }

    pub fn gender(self) -> PresentationGender {
        match self {
            AvatarId::ChildMale | AvatarId::AdultMale | AvatarId::ElderlyMale => {
                PresentationGender::Male
            }
            _ => PresentationGender::Female,
        }
    }
}

impl fmt::Display for AvatarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved persona for a patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientAvatar {
    /// `None` selects the generic humanoid presentation.
    pub avatar_identifier: Option<AvatarId>,
    pub gender: PresentationGender,
}
